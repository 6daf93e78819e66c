use folio_core::{apply, replay, ExtractionProgress, ProgressMessage, Stage, Terminal};
use pretty_assertions::assert_eq;
use serde_json::json;

fn sample_job() -> Vec<ProgressMessage> {
    vec![
        ProgressMessage::Start { total_nodes: 50 },
        ProgressMessage::PrefilterDone {
            candidate_count: 12,
            total_nodes: 50,
        },
        ProgressMessage::BatchesPlanned {
            total_batches: 3,
            candidate_count: 12,
        },
        ProgressMessage::BatchStart {
            batch_index: 1,
            section_titles: vec!["A".into()],
        },
        ProgressMessage::BatchDone {
            batch_index: 1,
            batch_actionable_count: 4,
            cumulative_actionable_count: 4,
        },
    ]
}

#[test]
fn first_batch_leaves_job_extracting() {
    let (progress, terminal) = replay(sample_job());

    assert!(terminal.is_none());
    assert_eq!(progress.stage, Stage::Extracting);
    assert_eq!(progress.current_batch, 1);
    assert_eq!(progress.cumulative_actionable_count, 4);
    assert_eq!(progress.last_batch_actionable_count, 4);
    assert_eq!(progress.candidate_count, 12);
    assert_eq!(progress.total_nodes, 50);
    assert_eq!(progress.total_batches, 3);
    assert_eq!(progress.current_sections, vec!["A".to_string()]);
}

#[test]
fn stepwise_application_matches_single_fold() {
    let mut messages = sample_job();
    messages.extend([
        ProgressMessage::BatchStart {
            batch_index: 2,
            section_titles: vec!["B".into(), "C".into()],
        },
        ProgressMessage::BatchDone {
            batch_index: 2,
            batch_actionable_count: 1,
            cumulative_actionable_count: 5,
        },
        ProgressMessage::ValidationStart {
            total_actionable_count: Some(5),
        },
        ProgressMessage::ValidationDone {
            validated_count: 4,
            flagged_count: 1,
        },
    ]);

    let mut stepwise = ExtractionProgress::default();
    for message in messages.clone() {
        let (next, terminal) = apply(stepwise, message);
        assert!(terminal.is_none());
        stepwise = next;
    }

    let (folded, _) = replay(messages.clone());
    assert_eq!(stepwise, folded);

    // Replaying the same sequence again is deterministic.
    let (again, _) = replay(messages);
    assert_eq!(folded, again);
    assert_eq!(folded.stage, Stage::Done);
    assert_eq!(folded.validated_count, 4);
    assert_eq!(folded.flagged_count, 1);
}

#[test]
fn batch_start_replaces_previous_sections() {
    let mut messages = sample_job();
    messages.push(ProgressMessage::BatchStart {
        batch_index: 2,
        section_titles: vec!["Z".into()],
    });
    let (progress, _) = replay(messages);
    assert_eq!(progress.current_batch, 2);
    assert_eq!(progress.current_sections, vec!["Z".to_string()]);
    // Counts from the previous batch survive until the next batch_done.
    assert_eq!(progress.cumulative_actionable_count, 4);
}

#[test]
fn start_resets_counters() {
    let (progress, _) = replay(sample_job());
    let (reset, _) = apply(progress, ProgressMessage::Start { total_nodes: 9 });
    assert_eq!(
        reset,
        ExtractionProgress {
            total_nodes: 9,
            ..ExtractionProgress::default()
        }
    );
    assert_eq!(reset.stage, Stage::Prefilter);
}

#[test]
fn validation_start_seeds_cumulative_count_only_when_present() {
    let (progress, _) = replay(sample_job());

    let (seeded, _) = apply(
        progress.clone(),
        ProgressMessage::ValidationStart {
            total_actionable_count: Some(11),
        },
    );
    assert_eq!(seeded.stage, Stage::Validating);
    assert_eq!(seeded.cumulative_actionable_count, 11);

    let (kept, _) = apply(
        progress,
        ProgressMessage::ValidationStart {
            total_actionable_count: None,
        },
    );
    assert_eq!(kept.stage, Stage::Validating);
    assert_eq!(kept.cumulative_actionable_count, 4);
}

#[test]
fn complete_carries_result_out_without_merging() {
    let (progress, _) = replay(sample_job());
    let result = json!({"doc_id": "d1", "actionables": []});

    let (after, terminal) = apply(
        progress.clone(),
        ProgressMessage::Complete {
            result: result.clone(),
        },
    );
    assert_eq!(after, progress);
    assert_eq!(terminal, Some(Terminal::Completed(result)));
}

#[test]
fn error_stops_replay() {
    let mut messages = sample_job();
    messages.push(ProgressMessage::Error {
        message: "model unavailable".into(),
    });
    messages.push(ProgressMessage::ValidationStart {
        total_actionable_count: Some(99),
    });

    let (progress, terminal) = replay(messages);
    assert_eq!(terminal, Some(Terminal::Failed("model unavailable".into())));
    assert_eq!(progress.stage, Stage::Extracting);
    assert_eq!(progress.cumulative_actionable_count, 4);
}

#[test]
fn wire_records_decode_with_original_field_names() {
    let lines = [
        r#"{"event":"start","total_nodes":50}"#,
        r#"{"event":"prefilter_done","candidate_count":12,"total_nodes":50}"#,
        r#"{"event":"batches_planned","total_batches":3,"candidate_count":12}"#,
        r#"{"event":"batch_start","batch":1,"total_batches":3,"sections":["A"]}"#,
        r#"{"event":"batch_done","batch":1,"total_batches":3,"batch_actionables":4,"cumulative_actionables":4}"#,
    ];
    let decoded: Vec<ProgressMessage> = lines
        .iter()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(decoded, sample_job());
}
