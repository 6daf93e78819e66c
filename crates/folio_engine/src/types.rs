use std::collections::BTreeMap;
use std::path::PathBuf;

use folio_core::{
    Answer, Citation, Epoch, Generation, ProgressMessage, RequestId, Role, SessionSummary, Turn,
    TurnTicket,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extraction::ExtractionError;
use crate::persist::PersistError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// `reason` is the server's own explanation and is empty when it gave none.
    #[error("http status {status}: {}", if reason.is_empty() { "request failed" } else { reason.as_str() })]
    HttpStatus { status: u16, reason: String },
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("unexpected content type {content_type}")]
    UnexpectedContent { content_type: String },
}

/// Previously extracted items for a document.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionablesStatus {
    /// Extraction never ran for this document.
    NotExtracted,
    /// Extraction ran; the result may hold zero items.
    Extracted(ActionablesResult),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionablesResult {
    pub doc_id: String,
    pub doc_name: String,
    pub actionables: Vec<ActionableItem>,
    pub total_extracted: u32,
    pub total_validated: u32,
    pub total_flagged: u32,
    pub nodes_processed: u32,
    pub nodes_with_actionables: u32,
    pub extraction_time_seconds: f64,
    pub llm_calls: u32,
    pub total_tokens: u64,
    pub extracted_at: String,
    pub by_modality: BTreeMap<String, u32>,
    pub by_workstream: BTreeMap<String, u32>,
}

/// One extracted obligation. `source_location` holds the page reference used
/// to navigate back to the source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionableItem {
    pub id: String,
    pub modality: String,
    pub actor: String,
    pub action: String,
    pub object: String,
    pub trigger_or_condition: String,
    pub thresholds: String,
    pub deadline_or_frequency: String,
    pub effective_date: String,
    pub reporting_or_notification_to: String,
    pub evidence_quote: String,
    pub source_location: String,
    pub source_node_id: String,
    pub implementation_notes: String,
    pub workstream: String,
    pub needs_legal_review: bool,
    pub validation_status: String,
    pub validation_notes: String,
}

impl ActionableItem {
    pub fn source_page_number(&self) -> Option<u32> {
        folio_core::leading_page_number(&self.source_location)
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct DocumentQueryRequest<'a> {
    pub query: &'a str,
    pub doc_id: &'a str,
    pub verify: bool,
    pub reflect: bool,
    pub conv_id: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CorpusQueryRequest<'a> {
    pub query: &'a str,
    pub verify: bool,
    pub conv_id: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FeedbackRequest<'a> {
    pub text: &'a str,
    pub rating: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AnswerResponse {
    pub answer: String,
    #[serde(default)]
    pub record_id: String,
    #[serde(default)]
    pub conv_id: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub verification_status: String,
}

impl From<AnswerResponse> for Answer {
    fn from(response: AnswerResponse) -> Self {
        Answer {
            conversation_id: response.conv_id,
            text: response.answer,
            record_id: response.record_id,
            citations: response.citations,
            verification_status: response.verification_status,
        }
    }
}

/// Stored conversation with its messages.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConversationRecord {
    #[serde(rename = "conv_id")]
    pub conversation_id: String,
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageRecord {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub record_id: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

impl ConversationRecord {
    pub fn into_turns(self) -> Vec<Turn> {
        self.messages
            .into_iter()
            .map(|message| Turn {
                role: message.role,
                content: message.content,
                record_id: Some(message.record_id).filter(|id| !id.is_empty()),
                citations: message.citations,
            })
            .collect()
    }
}

/// Document bytes saved locally for a viewer to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDocument {
    pub document_id: String,
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error(transparent)]
    Fetch(#[from] ApiError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Results reported back by the engine, tagged with the token the request
/// was issued under so stale replies can be told apart.
#[derive(Debug)]
pub enum EngineEvent {
    ExtractionRecord {
        generation: Generation,
        message: ProgressMessage,
    },
    ExtractionFinished {
        generation: Generation,
        result: Result<Value, ExtractionError>,
    },
    ActionablesLoaded {
        document_id: String,
        result: Result<ActionablesStatus, ApiError>,
    },
    SessionsLoaded {
        epoch: Epoch,
        result: Result<Vec<SessionSummary>, ApiError>,
    },
    ConversationLoaded {
        epoch: Epoch,
        conversation_id: String,
        result: Result<Vec<Turn>, ApiError>,
    },
    AnswerReady {
        ticket: TurnTicket,
        result: Result<Answer, ApiError>,
    },
    SessionDeleted {
        conversation_id: String,
        result: Result<(), ApiError>,
    },
    FeedbackSent {
        record_id: String,
        result: Result<(), ApiError>,
    },
    DocumentReady {
        document_id: String,
        result: Result<LocalDocument, DocumentError>,
    },
    FallbackElapsed {
        request_id: RequestId,
    },
}
