//! Shared setup for findmy-ui-pages integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use findmy_ui_core::config::SuiteConfig;
use findmy_ui_core::context::TestContext;
use findmy_ui_core::memory::{MemoryBackend, RecordedAction};
use findmy_ui_pages::fixture;

/// The simulated app and a context over it. Nothing is launched yet.
pub fn simulated() -> (Arc<MemoryBackend>, TestContext) {
    let backend = Arc::new(fixture::backend());
    let ctx = TestContext::create(backend.clone(), SuiteConfig::simulated()).expect("memory backend is connected");
    (backend, ctx)
}

/// Like [`simulated`], with the app already on its home screen.
pub async fn launched() -> (Arc<MemoryBackend>, TestContext) {
    let (backend, mut ctx) = simulated();
    ctx.launch_app().await.expect("launch on memory backend");
    backend.clear_actions();
    (backend, ctx)
}

/// Points of every tap, in order.
pub fn taps(backend: &MemoryBackend) -> Vec<(i32, i32)> {
    backend
        .gestures()
        .into_iter()
        .filter_map(|g| match g {
            RecordedAction::Tap { x, y } => Some((x, y)),
            _ => None,
        })
        .collect()
}
