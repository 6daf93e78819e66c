use serde_json::Value;

use crate::progress::{apply, ExtractionProgress, ProgressMessage, Terminal};

/// Identifies one extraction attempt; bumped on every start, including retries.
pub type Generation = u64;

/// Failure reason used when the transport closes before a terminal record.
pub const ENDED_WITHOUT_COMPLETE: &str = "extraction stream ended without a complete record";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed {
        reason: String,
    },
}

/// What happened to a record handed to [`ExtractionJob::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Belonged to a superseded attempt, or arrived after the job finished.
    Ignored,
    Applied,
    Completed,
    Failed,
}

/// Extraction state owned by the extraction panel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractionJob {
    generation: Generation,
    document_id: Option<String>,
    progress: ExtractionProgress,
    status: JobStatus,
    result: Option<Value>,
}

impl ExtractionJob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the projection and opens a new attempt. Records tagged with any
    /// earlier generation are ignored from here on.
    pub fn start(&mut self, document_id: impl Into<String>) -> Generation {
        self.generation += 1;
        self.document_id = Some(document_id.into());
        self.progress = ExtractionProgress::default();
        self.status = JobStatus::Running;
        self.result = None;
        self.generation
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.generation && self.status == JobStatus::Running
    }

    pub fn record(&mut self, generation: Generation, message: ProgressMessage) -> RecordOutcome {
        if !self.is_current(generation) {
            return RecordOutcome::Ignored;
        }
        let (progress, terminal) = apply(std::mem::take(&mut self.progress), message);
        self.progress = progress;
        match terminal {
            None => RecordOutcome::Applied,
            Some(Terminal::Completed(result)) => {
                self.status = JobStatus::Succeeded;
                self.result = Some(result);
                RecordOutcome::Completed
            }
            Some(Terminal::Failed(reason)) => {
                self.status = JobStatus::Failed { reason };
                RecordOutcome::Failed
            }
        }
    }

    /// Marks the attempt failed unless it already finished. Returns whether the
    /// status changed.
    pub fn fail(&mut self, generation: Generation, reason: impl Into<String>) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.status = JobStatus::Failed {
            reason: reason.into(),
        };
        true
    }

    /// Transport closed. A job still running at this point never saw a terminal
    /// record, which is a failure rather than a partial success.
    pub fn stream_closed(&mut self, generation: Generation, failure: Option<String>) -> bool {
        let reason = failure.unwrap_or_else(|| ENDED_WITHOUT_COMPLETE.to_string());
        self.fail(generation, reason)
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn progress(&self) -> &ExtractionProgress {
        &self.progress
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }
}
