use crate::{AppState, Effect, Msg, NavCommand, RecordOutcome};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::ExtractRequested { document_id, force } => {
            let mut effects = Vec::with_capacity(2);
            let previous = state.extraction().generation();
            if state.extraction().is_current(previous) {
                effects.push(Effect::CancelExtraction {
                    generation: previous,
                });
            }
            let generation = state.extraction_mut().start(document_id.clone());
            state.mark_dirty();
            effects.push(Effect::StartExtraction {
                generation,
                document_id,
                force,
            });
            effects
        }
        Msg::ExtractionRecord {
            generation,
            message,
        } => match state.extraction_mut().record(generation, message) {
            RecordOutcome::Ignored => Vec::new(),
            RecordOutcome::Applied | RecordOutcome::Completed => {
                state.mark_dirty();
                Vec::new()
            }
            RecordOutcome::Failed => {
                // Nothing after an error record is meaningful; stop reading.
                state.mark_dirty();
                vec![Effect::CancelExtraction { generation }]
            }
        },
        Msg::ExtractionStreamClosed {
            generation,
            failure,
        } => {
            if state.extraction_mut().stream_closed(generation, failure) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::NavigateRequested {
            document_id,
            page_number,
        } => {
            let commands = state.navigation_mut().request(&document_id, page_number);
            state.mark_dirty();
            nav_effects(commands)
        }
        Msg::CitationSelected(citation) => {
            let scope_document = state
                .session()
                .scope()
                .and_then(|scope| scope.document_id())
                .map(str::to_string);
            match citation.navigation_target(scope_document.as_deref()) {
                Some(target) => {
                    let commands = state
                        .navigation_mut()
                        .request(&target.document_id, target.page_index + 1);
                    state.mark_dirty();
                    nav_effects(commands)
                }
                None => Vec::new(),
            }
        }
        Msg::ViewerMounted { document_id } => {
            let commands = state.navigation_mut().viewer_mounted(&document_id);
            state.mark_dirty();
            nav_effects(commands)
        }
        Msg::ViewerUnmounted { document_id } => {
            state.navigation_mut().viewer_unmounted(&document_id);
            Vec::new()
        }
        Msg::NavigationFallbackElapsed { request_id } => {
            let commands = state.navigation_mut().fallback_elapsed(request_id);
            if !commands.is_empty() {
                state.mark_dirty();
            }
            nav_effects(commands)
        }
        Msg::ScopeSelected(scope) => {
            let epoch = state.session_mut().select_scope(scope.clone());
            state.navigation_mut().cancel_pending();
            state.mark_dirty();
            vec![Effect::LoadSessions { epoch, scope }]
        }
        Msg::SessionsLoaded { epoch, sessions } => {
            match state.session_mut().sessions_loaded(epoch, sessions) {
                Some(conversation_id) => {
                    state.mark_dirty();
                    vec![Effect::LoadConversation {
                        epoch,
                        conversation_id,
                    }]
                }
                None => {
                    if epoch == state.session().epoch() {
                        state.mark_dirty();
                    }
                    Vec::new()
                }
            }
        }
        Msg::SessionSelected { conversation_id } => {
            if state.session().scope().is_none() {
                return (state, Vec::new());
            }
            let epoch = state.session_mut().open_session(&conversation_id);
            state.mark_dirty();
            vec![Effect::LoadConversation {
                epoch,
                conversation_id,
            }]
        }
        Msg::ConversationLoaded {
            epoch,
            conversation_id,
            turns,
        } => {
            if state
                .session_mut()
                .conversation_loaded(epoch, &conversation_id, turns)
            {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::QuestionSubmitted(question) => match state.session_mut().begin_turn(&question) {
            Ok(submit) => {
                state.mark_dirty();
                vec![Effect::SubmitQuestion(submit)]
            }
            Err(err) => {
                state.session_mut().reject_question(&err);
                state.mark_dirty();
                Vec::new()
            }
        },
        Msg::AnswerReceived { ticket, answer } => {
            if state.session_mut().answer_received(ticket, answer) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::AnswerFailed { ticket, reason } => {
            if state.session_mut().answer_failed(ticket, reason) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::SessionRequestFailed { epoch, reason } => {
            if state.session_mut().request_failed(epoch, reason) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::NewSessionClicked => {
            state.session_mut().start_new_session();
            state.mark_dirty();
            Vec::new()
        }
        Msg::DeleteSessionClicked { conversation_id } => {
            vec![Effect::DeleteSession { conversation_id }]
        }
        Msg::SessionDeleted { conversation_id } => {
            if state.session_mut().session_deleted(&conversation_id) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::SessionErrorDismissed => {
            if state.session_mut().dismiss_error() {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::FeedbackSubmitted {
            record_id,
            rating,
            text,
        } => vec![Effect::SubmitFeedback {
            record_id,
            rating,
            text,
        }],
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn nav_effects(commands: Vec<NavCommand>) -> Vec<Effect> {
    commands
        .into_iter()
        .map(|command| match command {
            NavCommand::Jump(target) => Effect::JumpToPage(target),
            NavCommand::ShowDocument { document_id } => Effect::ShowDocument { document_id },
            NavCommand::ArmFallback { request_id } => Effect::ArmNavigationFallback { request_id },
        })
        .collect()
}
