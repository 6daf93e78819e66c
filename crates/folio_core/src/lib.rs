//! Folio core: pure state machines and view-model helpers.
mod citation;
mod effect;
mod extraction;
mod msg;
mod navigation;
mod progress;
mod session;
mod state;
mod update;
mod view_model;

pub use citation::{leading_page_number, Citation};
pub use effect::Effect;
pub use extraction::{ExtractionJob, Generation, JobStatus, RecordOutcome, ENDED_WITHOUT_COMPLETE};
pub use msg::Msg;
pub use navigation::{NavCommand, NavigationRouter, NavigationTarget, PendingNavigation, RequestId};
pub use progress::{apply, replay, ExtractionProgress, ProgressMessage, Stage, Terminal};
pub use session::{
    Answer, Epoch, Role, Scope, SessionCorrelator, SessionError, SessionSummary, SubmitTurn, Turn,
    TurnTicket, RESEARCH_SCOPE_KEY,
};
pub use state::AppState;
pub use update::update;
pub use view_model::{progress_label, progress_percent, AppViewModel, ExtractionView, SessionView};
