use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use folio_engine::{
    NavigationHandle, NavigationSettings, PageRect, PollOutcome, RenderSurface, Viewport,
};
use pretty_assertions::assert_eq;
use tokio::time::Instant;

struct FakeSurface {
    /// Number of geometry checks that miss before the page shows up.
    misses_before_render: u32,
    checks: AtomicU32,
    page_top: f64,
    navigations: Mutex<Vec<u32>>,
    scrolls: Mutex<Vec<f64>>,
}

impl FakeSurface {
    fn new(misses_before_render: u32, page_top: f64) -> Arc<Self> {
        Arc::new(Self {
            misses_before_render,
            checks: AtomicU32::new(0),
            page_top,
            navigations: Mutex::new(Vec::new()),
            scrolls: Mutex::new(Vec::new()),
        })
    }

    fn scrolls(&self) -> Vec<f64> {
        self.scrolls.lock().unwrap().clone()
    }
}

impl RenderSurface for FakeSurface {
    fn navigate_to(&self, page_index: u32) {
        self.navigations.lock().unwrap().push(page_index);
    }

    fn page_rect(&self, _page_index: u32) -> Option<PageRect> {
        let seen = self.checks.fetch_add(1, Ordering::SeqCst);
        (seen >= self.misses_before_render).then_some(PageRect {
            top: self.page_top,
            height: 1000.0,
        })
    }

    fn viewport(&self) -> Option<Viewport> {
        Some(Viewport {
            top: 100.0,
            scroll_top: 2000.0,
            height: 600.0,
        })
    }

    fn smooth_scroll_to(&self, offset: f64) {
        self.scrolls.lock().unwrap().push(offset);
    }
}

fn handle(surface: &Arc<FakeSurface>) -> NavigationHandle {
    NavigationHandle::new(surface.clone(), NavigationSettings::default())
}

#[tokio::test(start_paused = true)]
async fn scrolls_page_top_to_anchor_once_rendered() {
    let surface = FakeSurface::new(2, 400.0);
    let handle = handle(&surface);

    let started = Instant::now();
    let outcome = handle.jump_to_page(7).outcome().await;

    // 2000 + (400 - 100) - 600 * 0.15
    assert_eq!(
        outcome,
        PollOutcome::Scrolled {
            offset: 2210.0,
            attempts: 3
        }
    );
    assert_eq!(started.elapsed(), Duration::from_millis(300));
    assert_eq!(*surface.navigations.lock().unwrap(), vec![7]);
    assert_eq!(surface.scrolls(), vec![2210.0]);
    assert_eq!(handle.active_polls(), 0);
}

#[tokio::test(start_paused = true)]
async fn gives_up_silently_after_attempt_cap() {
    let surface = FakeSurface::new(u32::MAX, 400.0);
    let handle = handle(&surface);

    let started = Instant::now();
    let outcome = handle.jump_to_page(3).outcome().await;

    assert_eq!(outcome, PollOutcome::Missed);
    assert_eq!(surface.checks.load(Ordering::SeqCst), 30);
    assert_eq!(started.elapsed(), Duration::from_secs(3));
    assert!(surface.scrolls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn second_jump_cancels_first_poll() {
    let surface = FakeSurface::new(4, 400.0);
    let handle = handle(&surface);

    let first = handle.jump_to_page(2);
    let second = handle.jump_to_page(5);

    assert_eq!(first.outcome().await, PollOutcome::Cancelled);
    assert!(matches!(
        second.outcome().await,
        PollOutcome::Scrolled { .. }
    ));
    assert_eq!(*surface.navigations.lock().unwrap(), vec![2, 5]);
    assert_eq!(surface.scrolls().len(), 1);
    assert_eq!(handle.active_polls(), 0);
}

#[tokio::test(start_paused = true)]
async fn at_most_one_poll_is_active_after_rapid_jumps() {
    let surface = FakeSurface::new(u32::MAX, 400.0);
    let handle = handle(&surface);

    let tickets: Vec<_> = (0..3).map(|page| handle.jump_to_page(page)).collect();
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(handle.active_polls(), 1);
    let mut outcomes = Vec::new();
    for ticket in tickets {
        outcomes.push(ticket.outcome().await);
    }
    assert_eq!(
        outcomes,
        vec![
            PollOutcome::Cancelled,
            PollOutcome::Cancelled,
            PollOutcome::Missed
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn offset_is_clamped_to_top_of_document() {
    let surface = FakeSurface::new(0, -5000.0);
    let handle = handle(&surface);

    let outcome = handle.jump_to_page(0).outcome().await;

    assert_eq!(
        outcome,
        PollOutcome::Scrolled {
            offset: 0.0,
            attempts: 1
        }
    );
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_cancels_poll() {
    let surface = FakeSurface::new(u32::MAX, 400.0);
    let ticket = {
        let handle = handle(&surface);
        handle.jump_to_page(1)
    };

    assert_eq!(ticket.outcome().await, PollOutcome::Cancelled);
    assert!(surface.scrolls().is_empty());
}
