use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One decoded record of the extraction progress stream, keyed by its `event` tag.
///
/// Numeric fields missing on the wire decode as zero so a sparse record still
/// advances the projection instead of being dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressMessage {
    Start {
        #[serde(default)]
        total_nodes: u32,
    },
    PrefilterDone {
        #[serde(default)]
        candidate_count: u32,
        #[serde(default)]
        total_nodes: u32,
    },
    BatchesPlanned {
        #[serde(default)]
        total_batches: u32,
        #[serde(default)]
        candidate_count: u32,
    },
    BatchStart {
        #[serde(rename = "batch", default)]
        batch_index: u32,
        #[serde(rename = "sections", default)]
        section_titles: Vec<String>,
    },
    BatchDone {
        #[serde(rename = "batch", default)]
        batch_index: u32,
        #[serde(rename = "batch_actionables", default)]
        batch_actionable_count: u32,
        #[serde(rename = "cumulative_actionables", default)]
        cumulative_actionable_count: u32,
    },
    ValidationStart {
        #[serde(rename = "total_actionables", default)]
        total_actionable_count: Option<u32>,
    },
    ValidationDone {
        #[serde(rename = "validated", default)]
        validated_count: u32,
        #[serde(rename = "flagged", default)]
        flagged_count: u32,
    },
    Complete {
        #[serde(default)]
        result: Value,
    },
    Error {
        #[serde(default)]
        message: String,
    },
    /// Server heartbeat sent while a batch is slow; carries nothing.
    Keepalive,
}

impl ProgressMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            ProgressMessage::Start { .. } => "start",
            ProgressMessage::PrefilterDone { .. } => "prefilter_done",
            ProgressMessage::BatchesPlanned { .. } => "batches_planned",
            ProgressMessage::BatchStart { .. } => "batch_start",
            ProgressMessage::BatchDone { .. } => "batch_done",
            ProgressMessage::ValidationStart { .. } => "validation_start",
            ProgressMessage::ValidationDone { .. } => "validation_done",
            ProgressMessage::Complete { .. } => "complete",
            ProgressMessage::Error { .. } => "error",
            ProgressMessage::Keepalive => "keepalive",
        }
    }
}

/// Coarse phase of an extraction job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Prefilter,
    Extracting,
    Validating,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Prefilter => write!(f, "prefilter"),
            Stage::Extracting => write!(f, "extracting"),
            Stage::Validating => write!(f, "validating"),
            Stage::Done => write!(f, "done"),
        }
    }
}

/// Running projection of the progress records of one job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionProgress {
    pub stage: Stage,
    pub candidate_count: u32,
    pub total_nodes: u32,
    pub total_batches: u32,
    pub current_batch: u32,
    pub current_sections: Vec<String>,
    pub cumulative_actionable_count: u32,
    pub last_batch_actionable_count: u32,
    pub validated_count: u32,
    pub flagged_count: u32,
}

/// How a job ended, as signalled by its terminal record.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    /// Final extracted-items payload, handed to the caller untouched.
    Completed(Value),
    /// Failure reason taken verbatim from the `error` record.
    Failed(String),
}

/// Pure transition: applies one record to a snapshot.
///
/// Terminal records leave the snapshot untouched and return the outcome
/// separately; the result payload is never merged into the projection.
pub fn apply(
    mut current: ExtractionProgress,
    message: ProgressMessage,
) -> (ExtractionProgress, Option<Terminal>) {
    match message {
        ProgressMessage::Start { total_nodes } => {
            current = ExtractionProgress {
                total_nodes,
                ..ExtractionProgress::default()
            };
        }
        ProgressMessage::PrefilterDone {
            candidate_count,
            total_nodes,
        } => {
            current.candidate_count = candidate_count;
            current.total_nodes = total_nodes;
        }
        ProgressMessage::BatchesPlanned {
            total_batches,
            candidate_count,
        } => {
            current.total_batches = total_batches;
            current.candidate_count = candidate_count;
            current.stage = Stage::Extracting;
        }
        ProgressMessage::BatchStart {
            batch_index,
            section_titles,
        } => {
            current.current_batch = batch_index;
            current.current_sections = section_titles;
            current.stage = Stage::Extracting;
        }
        ProgressMessage::BatchDone {
            batch_index,
            batch_actionable_count,
            cumulative_actionable_count,
        } => {
            current.current_batch = batch_index;
            current.last_batch_actionable_count = batch_actionable_count;
            current.cumulative_actionable_count = cumulative_actionable_count;
        }
        ProgressMessage::ValidationStart {
            total_actionable_count,
        } => {
            if let Some(total) = total_actionable_count {
                current.cumulative_actionable_count = total;
            }
            current.stage = Stage::Validating;
        }
        ProgressMessage::ValidationDone {
            validated_count,
            flagged_count,
        } => {
            current.validated_count = validated_count;
            current.flagged_count = flagged_count;
            current.stage = Stage::Done;
        }
        ProgressMessage::Complete { result } => {
            return (current, Some(Terminal::Completed(result)));
        }
        ProgressMessage::Error { message } => {
            return (current, Some(Terminal::Failed(message)));
        }
        ProgressMessage::Keepalive => {}
    }
    (current, None)
}

/// Folds a record sequence from the initial snapshot, stopping at the first
/// terminal record; anything after it is ignored.
pub fn replay(
    messages: impl IntoIterator<Item = ProgressMessage>,
) -> (ExtractionProgress, Option<Terminal>) {
    let mut progress = ExtractionProgress::default();
    for message in messages {
        let (next, terminal) = apply(progress, message);
        progress = next;
        if terminal.is_some() {
            return (progress, terminal);
        }
    }
    (progress, None)
}
