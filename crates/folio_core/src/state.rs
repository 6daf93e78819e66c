use crate::view_model::{AppViewModel, ExtractionView, SessionView};
use crate::{ExtractionJob, NavigationRouter, SessionCorrelator};

/// Application state. Each part is owned by the panel that shows it and is
/// only changed through [`crate::update`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    extraction: ExtractionJob,
    navigation: NavigationRouter,
    session: SessionCorrelator,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            extraction: ExtractionView::from_job(&self.extraction),
            active_document: self.navigation.active_document().map(str::to_string),
            navigation_pending: self.navigation.pending().is_some(),
            session: SessionView::from_correlator(&self.session),
            dirty: self.dirty,
        }
    }

    pub fn extraction(&self) -> &ExtractionJob {
        &self.extraction
    }

    pub fn navigation(&self) -> &NavigationRouter {
        &self.navigation
    }

    pub fn session(&self) -> &SessionCorrelator {
        &self.session
    }

    /// Returns whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn extraction_mut(&mut self) -> &mut ExtractionJob {
        &mut self.extraction
    }

    pub(crate) fn navigation_mut(&mut self) -> &mut NavigationRouter {
        &mut self.navigation
    }

    pub(crate) fn session_mut(&mut self) -> &mut SessionCorrelator {
        &mut self.session
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
