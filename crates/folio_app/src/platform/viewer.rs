use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use folio_engine::{PageRect, RenderSurface, Viewport};
use folio_logging::folio_debug;

const PAGE_HEIGHT: f64 = 1100.0;
const PAGE_GAP: f64 = 12.0;
const VIEWPORT_TOP: f64 = 64.0;
const VIEWPORT_HEIGHT: f64 = 900.0;

/// Renderer that lays pages out in one continuous column and draws only the
/// page it was last sent to, one geometry check after the request.
pub struct TerminalSurface {
    path: PathBuf,
    state: Mutex<SurfaceState>,
}

#[derive(Debug, Default)]
struct SurfaceState {
    requested: Option<u32>,
    rendered: Option<u32>,
    scroll_top: f64,
    shown: Vec<(u32, f64)>,
}

impl TerminalSurface {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: Mutex::new(SurfaceState::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pages scrolled into view so far, with the offset used.
    pub fn shown(&self) -> Vec<(u32, f64)> {
        self.lock().shown.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn page_offset(page_index: u32) -> f64 {
    page_index as f64 * (PAGE_HEIGHT + PAGE_GAP)
}

impl RenderSurface for TerminalSurface {
    fn navigate_to(&self, page_index: u32) {
        let mut state = self.lock();
        state.requested = Some(page_index);
        state.rendered = None;
    }

    fn page_rect(&self, page_index: u32) -> Option<PageRect> {
        let mut state = self.lock();
        if state.rendered == Some(page_index) {
            return Some(PageRect {
                top: VIEWPORT_TOP + page_offset(page_index) - state.scroll_top,
                height: PAGE_HEIGHT,
            });
        }
        if state.requested == Some(page_index) {
            state.rendered = Some(page_index);
        }
        None
    }

    fn viewport(&self) -> Option<Viewport> {
        Some(Viewport {
            top: VIEWPORT_TOP,
            scroll_top: self.lock().scroll_top,
            height: VIEWPORT_HEIGHT,
        })
    }

    fn smooth_scroll_to(&self, offset: f64) {
        let mut state = self.lock();
        state.scroll_top = offset;
        if let Some(page) = state.rendered {
            folio_debug!("Scrolled {:?} to page index {} at {}", self.path, page, offset);
            state.shown.push((page, offset));
        }
    }
}
