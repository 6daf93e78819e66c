use crate::{
    Answer, Citation, Epoch, Generation, ProgressMessage, RequestId, Scope, SessionSummary, Turn,
    TurnTicket,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User asked to (re-)extract items for a document.
    ExtractRequested { document_id: String, force: bool },
    /// One decoded record of the extraction stream.
    ExtractionRecord {
        generation: Generation,
        message: ProgressMessage,
    },
    /// Extraction transport closed; `failure` is set when it broke rather than ended.
    ExtractionStreamClosed {
        generation: Generation,
        failure: Option<String>,
    },
    /// Show page `page_number` (one-based) of a document.
    NavigateRequested { document_id: String, page_number: u32 },
    /// User clicked a citation of an answer in the active session.
    CitationSelected(Citation),
    /// A viewer bound to `document_id` mounted and exposed its handle.
    ViewerMounted { document_id: String },
    ViewerUnmounted { document_id: String },
    /// Single-shot fallback timer for a parked navigation fired.
    NavigationFallbackElapsed { request_id: RequestId },
    /// User switched to a document or the research scope.
    ScopeSelected(Scope),
    SessionsLoaded {
        epoch: Epoch,
        sessions: Vec<SessionSummary>,
    },
    /// User picked a stored session of the current scope.
    SessionSelected { conversation_id: String },
    ConversationLoaded {
        epoch: Epoch,
        conversation_id: String,
        turns: Vec<Turn>,
    },
    QuestionSubmitted(String),
    AnswerReceived { ticket: TurnTicket, answer: Answer },
    AnswerFailed { ticket: TurnTicket, reason: String },
    /// Listing or loading sessions failed.
    SessionRequestFailed { epoch: Epoch, reason: String },
    NewSessionClicked,
    DeleteSessionClicked { conversation_id: String },
    SessionDeleted { conversation_id: String },
    SessionErrorDismissed,
    /// User rated an answer.
    FeedbackSubmitted {
        record_id: String,
        rating: Option<u8>,
        text: String,
    },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
