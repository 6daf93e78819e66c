use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use folio_core::{Epoch, Generation, ProgressMessage, RequestId, Scope, SubmitTurn};
use folio_logging::{folio_debug, folio_info, folio_warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::BackendApi;
use crate::document::LocalDocumentStore;
use crate::extraction::stream_extraction;
use crate::types::{DocumentError, EngineEvent, LocalDocument};

enum EngineCommand {
    StartExtraction {
        generation: Generation,
        document_id: String,
        force: bool,
        cancel: CancellationToken,
    },
    FetchActionables {
        document_id: String,
    },
    LoadSessions {
        epoch: Epoch,
        scope: Scope,
    },
    LoadConversation {
        epoch: Epoch,
        conversation_id: String,
    },
    SubmitQuestion(SubmitTurn),
    DeleteSession {
        conversation_id: String,
    },
    SubmitFeedback {
        record_id: String,
        rating: Option<u8>,
        text: String,
    },
    FetchDocument {
        document_id: String,
    },
    ArmFallback {
        request_id: RequestId,
        delay: Duration,
    },
}

/// Runs backend requests on the current tokio runtime and reports each
/// result as an [`EngineEvent`].
///
/// Extractions are keyed by generation so a superseded stream can be stopped
/// without touching the newer one.
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<Shared>,
}

struct Shared {
    api: Arc<dyn BackendApi>,
    documents: LocalDocumentStore,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
    extractions: Mutex<HashMap<Generation, CancellationToken>>,
}

impl EngineHandle {
    pub fn new(
        api: Arc<dyn BackendApi>,
        documents: LocalDocumentStore,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            api,
            documents,
            event_tx,
            extractions: Mutex::new(HashMap::new()),
        });
        (Self { shared }, event_rx)
    }

    pub fn start_extraction(&self, generation: Generation, document_id: String, force: bool) {
        let cancel = CancellationToken::new();
        if let Some(previous) = self
            .extractions()
            .insert(generation, cancel.clone())
        {
            previous.cancel();
        }
        self.dispatch(EngineCommand::StartExtraction {
            generation,
            document_id,
            force,
            cancel,
        });
    }

    /// Stops reading the stream for `generation`; a no-op once it finished.
    pub fn cancel_extraction(&self, generation: Generation) {
        if let Some(token) = self.extractions().remove(&generation) {
            folio_debug!("Cancelling extraction generation={}", generation);
            token.cancel();
        }
    }

    pub fn running_extractions(&self) -> usize {
        self.extractions().len()
    }

    pub fn fetch_actionables(&self, document_id: String) {
        self.dispatch(EngineCommand::FetchActionables { document_id });
    }

    pub fn load_sessions(&self, epoch: Epoch, scope: Scope) {
        self.dispatch(EngineCommand::LoadSessions { epoch, scope });
    }

    pub fn load_conversation(&self, epoch: Epoch, conversation_id: String) {
        self.dispatch(EngineCommand::LoadConversation {
            epoch,
            conversation_id,
        });
    }

    pub fn submit_question(&self, submit: SubmitTurn) {
        self.dispatch(EngineCommand::SubmitQuestion(submit));
    }

    pub fn delete_session(&self, conversation_id: String) {
        self.dispatch(EngineCommand::DeleteSession { conversation_id });
    }

    pub fn submit_feedback(&self, record_id: String, rating: Option<u8>, text: String) {
        self.dispatch(EngineCommand::SubmitFeedback {
            record_id,
            rating,
            text,
        });
    }

    pub fn fetch_document(&self, document_id: String) {
        self.dispatch(EngineCommand::FetchDocument { document_id });
    }

    /// Reports [`EngineEvent::FallbackElapsed`] once `delay` has passed.
    pub fn arm_fallback(&self, request_id: RequestId, delay: Duration) {
        self.dispatch(EngineCommand::ArmFallback { request_id, delay });
    }

    fn extractions(&self) -> std::sync::MutexGuard<'_, HashMap<Generation, CancellationToken>> {
        self.shared
            .extractions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, command: EngineCommand) {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            handle_command(&shared, command).await;
        });
    }
}

async fn handle_command(shared: &Shared, command: EngineCommand) {
    let api = shared.api.as_ref();
    let event = match command {
        EngineCommand::StartExtraction {
            generation,
            document_id,
            force,
            cancel,
        } => {
            let tx = shared.event_tx.clone();
            let sink = move |message: &ProgressMessage| {
                let _ = tx.send(EngineEvent::ExtractionRecord {
                    generation,
                    message: message.clone(),
                });
            };
            let result = stream_extraction(api, &document_id, force, &sink, &cancel).await;
            shared
                .extractions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&generation);
            EngineEvent::ExtractionFinished { generation, result }
        }
        EngineCommand::FetchActionables { document_id } => {
            let result = api.fetch_actionables(&document_id).await;
            EngineEvent::ActionablesLoaded {
                document_id,
                result,
            }
        }
        EngineCommand::LoadSessions { epoch, scope } => {
            let result = api.list_sessions(&scope).await;
            if let Err(err) = &result {
                folio_warn!("Listing sessions for {} failed: {}", scope.key(), err);
            }
            EngineEvent::SessionsLoaded { epoch, result }
        }
        EngineCommand::LoadConversation {
            epoch,
            conversation_id,
        } => {
            let result = api
                .fetch_conversation(&conversation_id)
                .await
                .map(|record| record.into_turns());
            EngineEvent::ConversationLoaded {
                epoch,
                conversation_id,
                result,
            }
        }
        EngineCommand::SubmitQuestion(submit) => {
            folio_info!(
                "Submitting question scope={} conv={:?}",
                submit.scope.key(),
                submit.conversation_id
            );
            let result = api.submit_question(&submit).await;
            EngineEvent::AnswerReady {
                ticket: submit.ticket,
                result,
            }
        }
        EngineCommand::DeleteSession { conversation_id } => {
            let result = api.delete_session(&conversation_id).await;
            EngineEvent::SessionDeleted {
                conversation_id,
                result,
            }
        }
        EngineCommand::SubmitFeedback {
            record_id,
            rating,
            text,
        } => {
            let result = api.submit_feedback(&record_id, rating, &text).await;
            EngineEvent::FeedbackSent { record_id, result }
        }
        EngineCommand::FetchDocument { document_id } => {
            let result = match shared.documents.cached(&document_id) {
                Some(local) => {
                    folio_debug!("Opening cached copy of {}", document_id);
                    Ok(local)
                }
                None => fetch_and_store(shared, &document_id).await,
            };
            EngineEvent::DocumentReady {
                document_id,
                result,
            }
        }
        EngineCommand::ArmFallback { request_id, delay } => {
            tokio::time::sleep(delay).await;
            EngineEvent::FallbackElapsed { request_id }
        }
    };
    let _ = shared.event_tx.send(event);
}

async fn fetch_and_store(
    shared: &Shared,
    document_id: &str,
) -> Result<LocalDocument, DocumentError> {
    let bytes = shared.api.fetch_document(document_id).await?;
    Ok(shared.documents.store(document_id, &bytes)?)
}
