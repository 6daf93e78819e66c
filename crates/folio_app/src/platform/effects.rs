use std::sync::Arc;

use folio_core::{Effect, Msg, NavigationTarget};
use folio_engine::{
    EngineEvent, EngineHandle, ExtractionError, LocalDocument, NavigationHandle,
    NavigationSettings, PollOutcome, PollTicket,
};
use folio_logging::{folio_debug, folio_info, folio_warn};

use super::viewer::TerminalSurface;

/// The viewer currently on screen and the handle bound to it.
struct MountedViewer {
    document_id: String,
    surface: Arc<TerminalSurface>,
    handle: NavigationHandle,
}

/// Executes core effects through the engine and turns engine results back
/// into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    navigation: NavigationSettings,
    viewer: Option<MountedViewer>,
    /// Document most recently sent to the viewer; older fetches are dropped.
    showing: Option<String>,
    polls: Vec<PollTicket>,
    outstanding: usize,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, navigation: NavigationSettings) -> Self {
        Self {
            engine,
            navigation,
            viewer: None,
            showing: None,
            polls: Vec::new(),
            outstanding: 0,
        }
    }

    /// Runs `effects`; returns messages the runner itself produced.
    pub fn enqueue(&mut self, effects: Vec<Effect>) -> Vec<Msg> {
        let mut follow_up = Vec::new();
        for effect in effects {
            match effect {
                Effect::StartExtraction {
                    generation,
                    document_id,
                    force,
                } => {
                    folio_info!(
                        "StartExtraction generation={} doc={} force={}",
                        generation,
                        document_id,
                        force
                    );
                    self.outstanding += 1;
                    self.engine.start_extraction(generation, document_id, force);
                }
                Effect::CancelExtraction { generation } => {
                    self.engine.cancel_extraction(generation);
                }
                Effect::ShowDocument { document_id } => {
                    follow_up.extend(self.unmount_if_other(&document_id));
                    self.showing = Some(document_id.clone());
                    self.outstanding += 1;
                    self.engine.fetch_document(document_id);
                }
                Effect::JumpToPage(target) => self.jump(target),
                Effect::ArmNavigationFallback { request_id } => {
                    if let Some(delay) = self.navigation.fallback_delay {
                        self.outstanding += 1;
                        self.engine.arm_fallback(request_id, delay);
                    }
                }
                Effect::LoadSessions { epoch, scope } => {
                    self.outstanding += 1;
                    self.engine.load_sessions(epoch, scope);
                }
                Effect::LoadConversation {
                    epoch,
                    conversation_id,
                } => {
                    self.outstanding += 1;
                    self.engine.load_conversation(epoch, conversation_id);
                }
                Effect::SubmitQuestion(submit) => {
                    self.outstanding += 1;
                    self.engine.submit_question(submit);
                }
                Effect::DeleteSession { conversation_id } => {
                    self.outstanding += 1;
                    self.engine.delete_session(conversation_id);
                }
                Effect::SubmitFeedback {
                    record_id,
                    rating,
                    text,
                } => {
                    self.outstanding += 1;
                    self.engine.submit_feedback(record_id, rating, text);
                }
            }
        }
        follow_up
    }

    pub fn fetch_actionables(&mut self, document_id: String) {
        self.outstanding += 1;
        self.engine.fetch_actionables(document_id);
    }

    /// Engine requests whose result has not come back yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Maps one engine event to the message the core understands. Events the
    /// core has no message for come back as `Err` for the caller to report.
    pub fn translate(&mut self, event: EngineEvent) -> Result<Msg, EngineEvent> {
        if !matches!(event, EngineEvent::ExtractionRecord { .. }) {
            self.outstanding = self.outstanding.saturating_sub(1);
        }
        let msg = match event {
            EngineEvent::ExtractionRecord {
                generation,
                message,
            } => Msg::ExtractionRecord {
                generation,
                message,
            },
            EngineEvent::ExtractionFinished { generation, result } => match result {
                Ok(_) => Msg::ExtractionStreamClosed {
                    generation,
                    failure: None,
                },
                Err(ExtractionError::Cancelled) => Msg::NoOp,
                Err(err) => Msg::ExtractionStreamClosed {
                    generation,
                    failure: Some(err.failure_reason()),
                },
            },
            EngineEvent::SessionsLoaded { epoch, result } => match result {
                Ok(sessions) => Msg::SessionsLoaded { epoch, sessions },
                Err(err) => Msg::SessionRequestFailed {
                    epoch,
                    reason: err.to_string(),
                },
            },
            EngineEvent::ConversationLoaded {
                epoch,
                conversation_id,
                result,
            } => match result {
                Ok(turns) => Msg::ConversationLoaded {
                    epoch,
                    conversation_id,
                    turns,
                },
                Err(err) => Msg::SessionRequestFailed {
                    epoch,
                    reason: err.to_string(),
                },
            },
            EngineEvent::AnswerReady { ticket, result } => match result {
                Ok(answer) => Msg::AnswerReceived { ticket, answer },
                Err(err) => Msg::AnswerFailed {
                    ticket,
                    reason: err.to_string(),
                },
            },
            EngineEvent::SessionDeleted {
                conversation_id,
                result: Ok(()),
            } => Msg::SessionDeleted { conversation_id },
            EngineEvent::DocumentReady {
                document_id,
                result,
            } => match result {
                Ok(local) if self.showing.as_deref() == Some(local.document_id.as_str()) => {
                    self.mount(local)
                }
                Ok(local) => {
                    folio_debug!("Dropping superseded document {}", local.document_id);
                    Msg::NoOp
                }
                Err(err) => {
                    // The jump is lost with the viewer; nothing to report beyond the log.
                    folio_warn!("Could not open document {}: {}", document_id, err);
                    Msg::NoOp
                }
            },
            EngineEvent::FallbackElapsed { request_id } => {
                Msg::NavigationFallbackElapsed { request_id }
            }
            other => return Err(other),
        };
        Ok(msg)
    }

    /// Waits for every scroll poll started so far.
    pub async fn settle_navigation(&mut self) -> Vec<PollOutcome> {
        let mut outcomes = Vec::with_capacity(self.polls.len());
        for ticket in self.polls.drain(..) {
            outcomes.push(ticket.outcome().await);
        }
        outcomes
    }

    /// Scroll polls kept for [`Self::settle_navigation`].
    pub fn pending_polls(&self) -> usize {
        self.polls.len()
    }

    pub fn shown_pages(&self) -> Vec<(u32, f64)> {
        self.viewer
            .as_ref()
            .map(|viewer| viewer.surface.shown())
            .unwrap_or_default()
    }

    pub fn mounted_path(&self) -> Option<&std::path::Path> {
        self.viewer.as_ref().map(|viewer| viewer.surface.path())
    }

    fn mount(&mut self, local: LocalDocument) -> Msg {
        // A second fetch of the shown document keeps the viewer and its poll.
        if let Some(viewer) = &self.viewer {
            if viewer.document_id == local.document_id {
                return Msg::ViewerMounted {
                    document_id: local.document_id,
                };
            }
        }
        let surface = Arc::new(TerminalSurface::new(local.path));
        let handle = NavigationHandle::new(surface.clone(), self.navigation.clone());
        folio_info!("Viewer mounted for {}", local.document_id);
        // Replacing the old viewer drops its handle, which stops its poll.
        self.viewer = Some(MountedViewer {
            document_id: local.document_id.clone(),
            surface,
            handle,
        });
        Msg::ViewerMounted {
            document_id: local.document_id,
        }
    }

    fn unmount_if_other(&mut self, document_id: &str) -> Option<Msg> {
        let viewer = self.viewer.take_if(|viewer| viewer.document_id != document_id)?;
        Some(Msg::ViewerUnmounted {
            document_id: viewer.document_id,
        })
    }

    fn jump(&mut self, target: NavigationTarget) {
        match &self.viewer {
            Some(viewer) if viewer.document_id == target.document_id => {
                folio_info!(
                    "JumpToPage doc={} page_index={}",
                    target.document_id,
                    target.page_index
                );
                let ticket = viewer.handle.jump_to_page(target.page_index);
                self.polls.retain(|poll| !poll.is_finished());
                self.polls.push(ticket);
            }
            _ => folio_debug!(
                "No viewer bound to {}; page {} not shown",
                target.document_id,
                target.page_index
            ),
        }
    }
}
