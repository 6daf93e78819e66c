use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use folio_core::{Answer, Scope, SessionSummary, SubmitTurn};
use futures_util::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::types::{
    ActionablesResult, ActionablesStatus, AnswerResponse, ApiError, ConversationRecord,
    CorpusQueryRequest, DocumentQueryRequest, FeedbackRequest,
};

/// Raw chunks of a streaming response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ApiError>> + Send>>;

/// Reason used when a failed extraction start carries no readable detail.
pub const START_FAILED_DEFAULT: &str = "Could not start extraction";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Applies to plain requests; the extraction stream has no overall deadline.
    pub request_timeout: Duration,
    pub verify_answers: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            verify_answers: true,
        }
    }
}

/// Operations of the document-analysis backend this client consumes.
#[async_trait::async_trait]
pub trait BackendApi: Send + Sync {
    /// Opens the extraction progress stream. A non-success status is returned
    /// as [`ApiError::HttpStatus`] carrying the server's reason.
    async fn start_extraction(&self, document_id: &str, force: bool)
        -> Result<ByteStream, ApiError>;

    async fn fetch_actionables(&self, document_id: &str) -> Result<ActionablesStatus, ApiError>;

    /// Sessions of a scope, most recent first.
    async fn list_sessions(&self, scope: &Scope) -> Result<Vec<SessionSummary>, ApiError>;

    async fn fetch_conversation(&self, conversation_id: &str)
        -> Result<ConversationRecord, ApiError>;

    async fn delete_session(&self, conversation_id: &str) -> Result<(), ApiError>;

    async fn submit_question(&self, submit: &SubmitTurn) -> Result<Answer, ApiError>;

    async fn submit_feedback(
        &self,
        record_id: &str,
        rating: Option<u8>,
        text: &str,
    ) -> Result<(), ApiError>;

    /// Document bytes, fetched as binary so interstitial pages are caught here
    /// instead of inside the viewer.
    async fn fetch_document(&self, document_id: &str) -> Result<Bytes, ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
    settings: ClientSettings,
}

impl HttpBackend {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let mut base = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::InvalidUrl(format!("{}: {err}", settings.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(settings.base_url.clone()));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;

        Ok(Self {
            client,
            base,
            settings,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .timeout(self.settings.request_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        ensure_success(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self.send(self.client.get(url)).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[async_trait::async_trait]
impl BackendApi for HttpBackend {
    async fn start_extraction(
        &self,
        document_id: &str,
        force: bool,
    ) -> Result<ByteStream, ApiError> {
        let mut url = self.endpoint(&["documents", document_id, "extract-actionables"])?;
        if force {
            url.query_pairs_mut().append_pair("force", "true");
        }

        let response = self
            .client
            .post(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = ensure_success(response).await?;

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error));
        Ok(Box::pin(body))
    }

    async fn fetch_actionables(&self, document_id: &str) -> Result<ActionablesStatus, ApiError> {
        let url = self.endpoint(&["documents", document_id, "actionables"])?;
        let value: serde_json::Value = self.get_json(url).await?;
        if value.get("status").and_then(|s| s.as_str()) == Some("not_extracted") {
            return Ok(ActionablesStatus::NotExtracted);
        }
        let result: ActionablesResult =
            serde_json::from_value(value).map_err(|err| ApiError::Decode(err.to_string()))?;
        Ok(ActionablesStatus::Extracted(result))
    }

    async fn list_sessions(&self, scope: &Scope) -> Result<Vec<SessionSummary>, ApiError> {
        let url = self.endpoint(&["conversations", "by-doc", scope.key()])?;
        let mut sessions: Vec<SessionSummary> = self.get_json(url).await?;
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn fetch_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<ConversationRecord, ApiError> {
        let url = self.endpoint(&["conversations", conversation_id])?;
        self.get_json(url).await
    }

    async fn delete_session(&self, conversation_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["conversations", conversation_id])?;
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn submit_question(&self, submit: &SubmitTurn) -> Result<Answer, ApiError> {
        let conv_id = submit.conversation_id.as_deref();
        let request = match &submit.scope {
            Scope::Document(doc_id) => self.client.post(self.endpoint(&["query"])?).json(
                &DocumentQueryRequest {
                    query: &submit.question,
                    doc_id,
                    verify: self.settings.verify_answers,
                    reflect: false,
                    conv_id,
                },
            ),
            Scope::Research => self.client.post(self.endpoint(&["corpus", "query"])?).json(
                &CorpusQueryRequest {
                    query: &submit.question,
                    verify: self.settings.verify_answers,
                    conv_id,
                },
            ),
        };
        let response = self.send(request).await?;
        let answer: AnswerResponse = response
            .json()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        Ok(answer.into())
    }

    async fn submit_feedback(
        &self,
        record_id: &str,
        rating: Option<u8>,
        text: &str,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["query", record_id, "feedback"])?;
        self.send(self.client.post(url).json(&FeedbackRequest { text, rating }))
            .await?;
        Ok(())
    }

    async fn fetch_document(&self, document_id: &str) -> Result<Bytes, ApiError> {
        let url = self.endpoint(&["documents", document_id, "raw"])?;
        let response = self.send(self.client.get(url)).await?;
        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
        {
            if is_interstitial(content_type) {
                return Err(ApiError::UnexpectedContent {
                    content_type: content_type.to_string(),
                });
            }
        }
        response.bytes().await.map_err(map_reqwest_error)
    }
}

/// Tunnels and proxies answer with an HTML warning page instead of the file.
fn is_interstitial(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or(content_type).trim();
    mime.eq_ignore_ascii_case("text/html") || mime.eq_ignore_ascii_case("application/xhtml+xml")
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    Err(ApiError::HttpStatus {
        status: status.as_u16(),
        reason: error_reason(&body).unwrap_or_default(),
    })
}

/// Human-readable reason from a JSON error body (`detail`, `message` or `error`).
pub(crate) fn error_reason(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["detail", "message", "error"]
        .iter()
        .filter_map(|key| value.get(*key))
        .filter_map(|field| field.as_str())
        .map(str::trim)
        .find(|reason| !reason.is_empty())
        .map(str::to_string)
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::Timeout;
    }
    if err.is_decode() {
        return ApiError::Decode(err.to_string());
    }
    ApiError::Network(err.to_string())
}
