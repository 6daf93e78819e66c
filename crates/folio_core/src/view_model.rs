use crate::{
    ExtractionJob, ExtractionProgress, JobStatus, SessionCorrelator, SessionSummary, Stage, Turn,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub extraction: ExtractionView,
    pub active_document: Option<String>,
    pub navigation_pending: bool,
    pub session: SessionView,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionView {
    pub document_id: Option<String>,
    pub status: JobStatus,
    pub stage: Stage,
    pub percent: u8,
    pub label: String,
    pub current_sections: Vec<String>,
    pub actionable_count: u32,
    /// Inline failure reason; the panel offers a forced retry next to it.
    pub error: Option<String>,
}

impl ExtractionView {
    pub(crate) fn from_job(job: &ExtractionJob) -> Self {
        let progress = job.progress();
        let (percent, label) = match job.status() {
            JobStatus::Idle => (0, String::new()),
            JobStatus::Succeeded => (100, progress_label(progress)),
            JobStatus::Running | JobStatus::Failed { .. } => {
                (progress_percent(progress), progress_label(progress))
            }
        };
        let error = match job.status() {
            JobStatus::Failed { reason } => Some(reason.clone()),
            _ => None,
        };
        Self {
            document_id: job.document_id().map(str::to_string),
            status: job.status().clone(),
            stage: progress.stage,
            percent,
            label,
            current_sections: progress.current_sections.clone(),
            actionable_count: progress.cumulative_actionable_count,
            error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionView {
    pub scope_key: Option<String>,
    pub conversation_id: Option<String>,
    pub turns: Vec<Turn>,
    pub sessions: Vec<SessionSummary>,
    pub awaiting_answer: bool,
    pub error: Option<String>,
}

impl SessionView {
    pub(crate) fn from_correlator(session: &SessionCorrelator) -> Self {
        Self {
            scope_key: session.scope().map(|scope| scope.key().to_string()),
            conversation_id: session.conversation_id().map(str::to_string),
            turns: session.turns().to_vec(),
            sessions: session.sessions().to_vec(),
            awaiting_answer: session.awaiting_answer(),
            error: session.error().map(str::to_string),
        }
    }
}

/// Progress bar position: a fixed slot per stage, with batches filling 10–90%.
pub fn progress_percent(progress: &ExtractionProgress) -> u8 {
    match progress.stage {
        Stage::Prefilter => 5,
        Stage::Extracting => {
            if progress.total_batches == 0 {
                return 10;
            }
            let done = progress.current_batch.min(progress.total_batches) as u64;
            (10 + 80 * done / progress.total_batches as u64) as u8
        }
        Stage::Validating => 92,
        Stage::Done => 100,
    }
}

pub fn progress_label(progress: &ExtractionProgress) -> String {
    match progress.stage {
        Stage::Prefilter if progress.candidate_count > 0 => format!(
            "{} of {} sections selected",
            progress.candidate_count, progress.total_nodes
        ),
        Stage::Prefilter => format!("Scanning {} sections", progress.total_nodes),
        Stage::Extracting => format!(
            "Batch {}/{} · {} actionables",
            progress.current_batch, progress.total_batches, progress.cumulative_actionable_count
        ),
        Stage::Validating => format!(
            "Validating {} actionables",
            progress.cumulative_actionable_count
        ),
        Stage::Done => format!(
            "{} validated, {} flagged",
            progress.validated_count, progress.flagged_count
        ),
    }
}
