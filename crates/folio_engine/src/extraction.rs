use folio_core::{ProgressMessage, ENDED_WITHOUT_COMPLETE};
use folio_logging::{folio_debug, folio_info, folio_trace, folio_warn};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::client::{BackendApi, START_FAILED_DEFAULT};
use crate::sse::ProgressReader;
use crate::types::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// The server refused to open the stream.
    #[error("{reason}")]
    StartFailed { reason: String },
    /// The stream delivered an `error` record.
    #[error("{message}")]
    Job { message: String },
    #[error("{}", ENDED_WITHOUT_COMPLETE)]
    EndedWithoutComplete,
    #[error("progress stream interrupted: {message}")]
    Transport { message: String },
    #[error("extraction cancelled")]
    Cancelled,
}

impl ExtractionError {
    /// Reason shown next to the retry control.
    pub fn failure_reason(&self) -> String {
        self.to_string()
    }
}

/// Receives each decoded record in arrival order.
pub trait RecordSink: Send + Sync {
    fn record(&self, message: &ProgressMessage);
}

impl<F> RecordSink for F
where
    F: Fn(&ProgressMessage) + Send + Sync,
{
    fn record(&self, message: &ProgressMessage) {
        self(message)
    }
}

/// Runs one extraction to its terminal record.
///
/// Records are forwarded to `sink` as they arrive, including the terminal
/// one. The transport is released as soon as a `complete` or `error` record
/// is seen; anything after it is never read. A stream that closes without
/// either is a failure even if earlier records looked like progress.
pub async fn stream_extraction(
    api: &dyn BackendApi,
    document_id: &str,
    force: bool,
    sink: &dyn RecordSink,
    cancel: &CancellationToken,
) -> Result<Value, ExtractionError> {
    folio_info!("Starting extraction doc={} force={}", document_id, force);

    let body = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ExtractionError::Cancelled),
        opened = api.start_extraction(document_id, force) => opened.map_err(start_error)?,
    };

    let mut reader = ProgressReader::new(body);
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                folio_debug!("Extraction doc={} cancelled mid-stream", document_id);
                return Err(ExtractionError::Cancelled);
            }
            next = reader.next_message() => next,
        };

        let message = match next {
            Some(Ok(message)) => message,
            Some(Err(err)) => {
                folio_warn!("Extraction stream doc={} broke: {}", document_id, err);
                return Err(ExtractionError::Transport {
                    message: err.to_string(),
                });
            }
            None => {
                folio_warn!("Extraction stream doc={} ended early", document_id);
                return Err(ExtractionError::EndedWithoutComplete);
            }
        };

        folio_trace!("Extraction doc={} record {}", document_id, message.event_name());
        sink.record(&message);
        match message {
            ProgressMessage::Complete { result } => {
                folio_info!("Extraction doc={} complete", document_id);
                return Ok(result);
            }
            ProgressMessage::Error { message } => {
                folio_warn!("Extraction doc={} failed: {}", document_id, message);
                return Err(ExtractionError::Job { message });
            }
            _ => {}
        }
    }
}

fn start_error(err: ApiError) -> ExtractionError {
    match err {
        ApiError::HttpStatus { reason, .. } => {
            let reason = reason.trim();
            ExtractionError::StartFailed {
                reason: if reason.is_empty() {
                    START_FAILED_DEFAULT.to_string()
                } else {
                    reason.to_string()
                },
            }
        }
        other => ExtractionError::Transport {
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_status_reason_falls_back_to_default() {
        let err = start_error(ApiError::HttpStatus {
            status: 500,
            reason: "  ".into(),
        });
        assert_eq!(err.failure_reason(), START_FAILED_DEFAULT);
    }

    #[test]
    fn network_failure_at_start_is_transport() {
        let err = start_error(ApiError::Timeout);
        assert!(matches!(err, ExtractionError::Transport { .. }));
    }
}
