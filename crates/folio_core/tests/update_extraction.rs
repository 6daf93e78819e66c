use std::sync::Once;

use folio_core::{
    update, AppState, Effect, JobStatus, Msg, ProgressMessage, Stage, ENDED_WITHOUT_COMPLETE,
};
use serde_json::json;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(folio_logging::initialize_for_tests);
}

fn start(state: AppState, document_id: &str, force: bool) -> (AppState, u64) {
    let (state, effects) = update(
        state,
        Msg::ExtractRequested {
            document_id: document_id.to_string(),
            force,
        },
    );
    let generation = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::StartExtraction { generation, .. } => Some(*generation),
            _ => None,
        })
        .expect("start effect");
    (state, generation)
}

fn record(state: AppState, generation: u64, message: ProgressMessage) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::ExtractionRecord {
            generation,
            message,
        },
    )
}

#[test]
fn extract_requested_emits_start_effect() {
    init_logging();
    let (state, effects) = update(
        AppState::new(),
        Msg::ExtractRequested {
            document_id: "doc-1".into(),
            force: true,
        },
    );

    assert_eq!(
        effects,
        vec![Effect::StartExtraction {
            generation: 1,
            document_id: "doc-1".into(),
            force: true,
        }]
    );
    let view = state.view();
    assert_eq!(view.extraction.status, JobStatus::Running);
    assert_eq!(view.extraction.document_id.as_deref(), Some("doc-1"));
    assert!(view.dirty);
}

#[test]
fn complete_record_succeeds_and_keeps_result() {
    init_logging();
    let (state, generation) = start(AppState::new(), "doc-1", false);
    let (state, _) = record(state, generation, ProgressMessage::Start { total_nodes: 8 });
    let (state, effects) = record(
        state,
        generation,
        ProgressMessage::Complete {
            result: json!({"total_extracted": 0}),
        },
    );

    assert!(effects.is_empty());
    assert_eq!(*state.extraction().status(), JobStatus::Succeeded);
    assert_eq!(
        state.extraction().result(),
        Some(&json!({"total_extracted": 0}))
    );
    assert_eq!(state.view().extraction.percent, 100);
}

#[test]
fn error_record_fails_job_and_stops_reading() {
    init_logging();
    let (state, generation) = start(AppState::new(), "doc-1", false);
    let (state, effects) = record(
        state,
        generation,
        ProgressMessage::Error {
            message: "quota exceeded".into(),
        },
    );

    assert_eq!(effects, vec![Effect::CancelExtraction { generation }]);
    assert_eq!(
        state.view().extraction.error.as_deref(),
        Some("quota exceeded")
    );

    // Records after the error are not applied.
    let (state, _) = record(state, generation, ProgressMessage::Start { total_nodes: 3 });
    assert_eq!(state.extraction().progress().total_nodes, 0);
}

#[test]
fn stream_ending_after_validation_start_is_a_failure() {
    init_logging();
    let (state, generation) = start(AppState::new(), "doc-1", false);
    let (state, _) = record(
        state,
        generation,
        ProgressMessage::ValidationStart {
            total_actionable_count: Some(4),
        },
    );
    let (state, _) = update(
        state,
        Msg::ExtractionStreamClosed {
            generation,
            failure: None,
        },
    );

    assert_eq!(
        *state.extraction().status(),
        JobStatus::Failed {
            reason: ENDED_WITHOUT_COMPLETE.to_string()
        }
    );
    assert!(state.extraction().result().is_none());
}

#[test]
fn stream_closing_after_complete_keeps_success() {
    init_logging();
    let (state, generation) = start(AppState::new(), "doc-1", false);
    let (state, _) = record(
        state,
        generation,
        ProgressMessage::Complete { result: json!({}) },
    );
    let (mut state, _) = update(
        state,
        Msg::ExtractionStreamClosed {
            generation,
            failure: None,
        },
    );
    assert_eq!(*state.extraction().status(), JobStatus::Succeeded);
    state.consume_dirty();
}

#[test]
fn retry_cancels_running_attempt_and_ignores_its_late_records() {
    init_logging();
    let (state, first) = start(AppState::new(), "doc-1", false);
    let (state, _) = record(
        state,
        first,
        ProgressMessage::BatchesPlanned {
            total_batches: 4,
            candidate_count: 9,
        },
    );

    let (state, effects) = update(
        state,
        Msg::ExtractRequested {
            document_id: "doc-1".into(),
            force: true,
        },
    );
    assert_eq!(
        effects,
        vec![
            Effect::CancelExtraction { generation: first },
            Effect::StartExtraction {
                generation: first + 1,
                document_id: "doc-1".into(),
                force: true,
            },
        ]
    );
    let second = first + 1;
    assert_eq!(state.extraction().progress().total_batches, 0);

    // A record of the abandoned stream arrives late.
    let (mut state, _) = record(
        state,
        first,
        ProgressMessage::BatchStart {
            batch_index: 3,
            section_titles: vec!["stale".into()],
        },
    );
    assert!(state.consume_dirty());
    let (mut state, _) = update(
        state,
        Msg::ExtractionRecord {
            generation: first,
            message: ProgressMessage::Error {
                message: "stale".into(),
            },
        },
    );
    assert!(!state.consume_dirty());
    assert_eq!(state.extraction().progress().current_batch, 0);
    assert_eq!(*state.extraction().status(), JobStatus::Running);

    let (state, _) = record(state, second, ProgressMessage::Start { total_nodes: 2 });
    assert_eq!(state.extraction().progress().total_nodes, 2);
    assert_eq!(state.view().extraction.stage, Stage::Prefilter);
}

#[test]
fn start_failure_reason_is_surfaced() {
    init_logging();
    let (state, generation) = start(AppState::new(), "doc-1", false);
    let (state, _) = update(
        state,
        Msg::ExtractionStreamClosed {
            generation,
            failure: Some("Document not found".into()),
        },
    );
    assert_eq!(
        state.view().extraction.error.as_deref(),
        Some("Document not found")
    );
}

#[test]
fn finished_job_does_not_emit_cancel_on_next_request() {
    init_logging();
    let (state, generation) = start(AppState::new(), "doc-1", false);
    let (state, _) = record(
        state,
        generation,
        ProgressMessage::Complete { result: json!({}) },
    );
    let (_, effects) = update(
        state,
        Msg::ExtractRequested {
            document_id: "doc-2".into(),
            force: false,
        },
    );
    assert_eq!(effects.len(), 1);
    assert!(matches!(effects[0], Effect::StartExtraction { .. }));
}
