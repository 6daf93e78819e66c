use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use folio_logging::{folio_debug, folio_trace};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Vertical extent of a rendered page, in the same coordinates as [`Viewport::top`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub top: f64,
    pub height: f64,
}

/// The scroll container enclosing the rendered pages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub top: f64,
    pub scroll_top: f64,
    pub height: f64,
}

/// Direct access to a mounted document renderer.
///
/// Calls are imperative and must not route through application state; the
/// renderer does its own drawing asynchronously.
pub trait RenderSurface: Send + Sync {
    /// Asks the renderer to bring `page_index` into its render window.
    fn navigate_to(&self, page_index: u32);
    /// Geometry of the page once it has been rendered.
    fn page_rect(&self, page_index: u32) -> Option<PageRect>;
    fn viewport(&self) -> Option<Viewport>;
    fn smooth_scroll_to(&self, offset: f64);
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavigationSettings {
    pub poll_interval: Duration,
    pub max_attempts: u32,
    /// Fraction of the viewport height left above the target page.
    pub anchor_ratio: f64,
    /// Delay before a parked cross-document jump fires without a mount
    /// acknowledgment. `None` waits for the acknowledgment only.
    pub fallback_delay: Option<Duration>,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            max_attempts: 30,
            anchor_ratio: 0.15,
            fallback_delay: Some(Duration::from_millis(400)),
        }
    }
}

/// Scroll offset that puts the top of `page` at `anchor_ratio` of the
/// viewport height, never negative.
pub fn centering_offset(page: PageRect, viewport: Viewport, anchor_ratio: f64) -> f64 {
    let offset =
        viewport.scroll_top + (page.top - viewport.top) - viewport.height * anchor_ratio;
    offset.max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    Scrolled { offset: f64, attempts: u32 },
    /// The page never appeared within the attempt cap.
    Missed,
    /// A newer jump or the handle's owner stopped this poll.
    Cancelled,
}

/// Imperative page-jump target bound to one mounted viewer.
///
/// At most one poll runs per handle; a new jump cancels the previous poll
/// before starting its own. Dropping the handle cancels any poll in flight.
pub struct NavigationHandle {
    surface: Arc<dyn RenderSurface>,
    settings: NavigationSettings,
    active: Mutex<Option<CancellationToken>>,
    polls: Arc<AtomicUsize>,
}

impl NavigationHandle {
    pub fn new(surface: Arc<dyn RenderSurface>, settings: NavigationSettings) -> Self {
        Self {
            surface,
            settings,
            active: Mutex::new(None),
            polls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Moves the renderer to `page_index` and scrolls the page into place once
    /// it exists. Must be called from within a tokio runtime.
    pub fn jump_to_page(&self, page_index: u32) -> PollTicket {
        let token = CancellationToken::new();
        if let Some(previous) = self.replace_token(Some(token.clone())) {
            previous.cancel();
        }

        self.surface.navigate_to(page_index);

        let surface = Arc::clone(&self.surface);
        let settings = self.settings.clone();
        let polls = Arc::clone(&self.polls);
        polls.fetch_add(1, Ordering::SeqCst);
        let task = tokio::spawn(async move {
            let _active = ActivePoll(polls);
            poll_and_scroll(surface.as_ref(), page_index, &settings, &token).await
        });
        PollTicket { task }
    }

    /// Stops the running poll, if any.
    pub fn cancel(&self) {
        if let Some(token) = self.replace_token(None) {
            token.cancel();
        }
    }

    /// Number of poll loops that have not yet finished.
    pub fn active_polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn replace_token(&self, next: Option<CancellationToken>) -> Option<CancellationToken> {
        let mut guard = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }
}

impl Drop for NavigationHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Completion of one `jump_to_page` call.
pub struct PollTicket {
    task: JoinHandle<PollOutcome>,
}

impl PollTicket {
    /// True once the poll has scrolled, missed, or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn outcome(self) -> PollOutcome {
        self.task.await.unwrap_or(PollOutcome::Cancelled)
    }
}

struct ActivePoll(Arc<AtomicUsize>);

impl Drop for ActivePoll {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn poll_and_scroll(
    surface: &dyn RenderSurface,
    page_index: u32,
    settings: &NavigationSettings,
    cancel: &CancellationToken,
) -> PollOutcome {
    let period = settings.poll_interval;
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for attempt in 1..=settings.max_attempts {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            _ = ticks.tick() => {}
        }

        let Some(page) = surface.page_rect(page_index) else {
            folio_trace!("Page {} not rendered yet (attempt {})", page_index, attempt);
            continue;
        };
        let Some(viewport) = surface.viewport() else {
            folio_debug!("Page {} rendered without a scroll viewport", page_index);
            return PollOutcome::Missed;
        };
        let offset = centering_offset(page, viewport, settings.anchor_ratio);
        surface.smooth_scroll_to(offset);
        return PollOutcome::Scrolled {
            offset,
            attempts: attempt,
        };
    }

    folio_debug!(
        "Page {} did not render within {} attempts",
        page_index,
        settings.max_attempts
    );
    PollOutcome::Missed
}
