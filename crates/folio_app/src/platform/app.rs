use std::collections::VecDeque;

use folio_core::{update, AppState, AppViewModel, Msg};
use folio_engine::{ActionablesStatus, ApiError, EngineEvent};
use folio_logging::{folio_debug, folio_warn};
use tokio::sync::mpsc::UnboundedReceiver;

use super::effects::EffectRunner;
use super::ui;

/// Drives the update loop: messages in, effects out, printed view changes.
pub struct App {
    state: AppState,
    shown: AppViewModel,
    runner: EffectRunner,
    events: UnboundedReceiver<EngineEvent>,
    output: Vec<String>,
    /// Print lines as they are produced instead of buffering them.
    echo: bool,
    actionables: Option<Result<ActionablesStatus, ApiError>>,
    feedback: Option<Result<(), ApiError>>,
}

impl App {
    pub fn new(runner: EffectRunner, events: UnboundedReceiver<EngineEvent>, echo: bool) -> Self {
        Self {
            state: AppState::new(),
            shown: AppViewModel::default(),
            runner,
            events,
            output: Vec::new(),
            echo,
            actionables: None,
            feedback: None,
        }
    }

    /// Applies `msg` and everything it sets off synchronously.
    pub fn dispatch(&mut self, msg: Msg) {
        let mut inbox = VecDeque::from([msg]);
        while let Some(msg) = inbox.pop_front() {
            let state = std::mem::take(&mut self.state);
            let (mut state, effects) = update(state, msg);
            if state.consume_dirty() {
                let view = state.view();
                self.emit(ui::render::render(&self.shown, &view));
                self.shown = view;
            }
            self.state = state;
            inbox.extend(self.runner.enqueue(effects));
        }
    }

    /// Processes engine results until no request is left outstanding.
    pub async fn run_until_idle(&mut self) {
        while self.runner.outstanding() > 0 {
            let Some(event) = self.events.recv().await else {
                folio_warn!("Engine channel closed with requests outstanding");
                return;
            };
            self.handle_event(event);
        }
    }

    pub fn fetch_actionables(&mut self, document_id: String) {
        self.runner.fetch_actionables(document_id);
    }

    pub fn handle_event(&mut self, event: EngineEvent) {
        match self.runner.translate(event) {
            Ok(msg) => self.dispatch(msg),
            Err(EngineEvent::ActionablesLoaded { result, .. }) => {
                if let Ok(status) = &result {
                    self.emit(ui::render::render_actionables(status));
                }
                self.actionables = Some(result);
            }
            Err(EngineEvent::FeedbackSent { record_id, result }) => {
                folio_debug!("Feedback for {} sent: {}", record_id, result.is_ok());
                self.feedback = Some(result);
            }
            Err(EngineEvent::SessionDeleted {
                conversation_id,
                result: Err(err),
            }) => {
                let epoch = self.state.session().epoch();
                self.dispatch(Msg::SessionRequestFailed {
                    epoch,
                    reason: format!("could not delete {conversation_id}: {err}"),
                });
            }
            Err(other) => folio_debug!("Unhandled engine event {:?}", other),
        }
    }

    pub fn emit(&mut self, lines: Vec<String>) {
        if self.echo {
            for line in lines {
                println!("{line}");
            }
        } else {
            self.output.extend(lines);
        }
    }

    pub fn runner(&mut self) -> &mut EffectRunner {
        &mut self.runner
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Printed lines accumulated since the last call.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    pub fn take_actionables(&mut self) -> Option<Result<ActionablesStatus, ApiError>> {
        self.actionables.take()
    }

    pub fn take_feedback(&mut self) -> Option<Result<(), ApiError>> {
        self.feedback.take()
    }
}
