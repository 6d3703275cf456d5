//! Logging that steps aside while the terminal panel owns the screen
//!
//! Anything written to stderr while ratatui is drawing lands in the middle of
//! the frame, so events are dropped until the panel is torn down again.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

static PANEL_ACTIVE: AtomicBool = AtomicBool::new(false);

pub fn set_panel_active(active: bool) {
    PANEL_ACTIVE.store(active, Ordering::SeqCst);
}

pub fn is_panel_active() -> bool {
    PANEL_ACTIVE.load(Ordering::SeqCst)
}

/// Wraps a layer and mutes it while the terminal panel is active
pub struct PanelAwareLayer<L> {
    inner: L,
}

impl<L> PanelAwareLayer<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }
}

impl<S, L> Layer<S> for PanelAwareLayer<L>
where
    S: tracing::Subscriber,
    L: Layer<S>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        if !is_panel_active() {
            self.inner.on_event(event, ctx);
        }
    }

    fn on_new_span(&self, attrs: &tracing::span::Attributes<'_>, id: &tracing::span::Id, ctx: Context<'_, S>) {
        self.inner.on_new_span(attrs, id, ctx);
    }

    fn on_record(&self, id: &tracing::span::Id, values: &tracing::span::Record<'_>, ctx: Context<'_, S>) {
        self.inner.on_record(id, values, ctx);
    }

    fn on_enter(&self, id: &tracing::span::Id, ctx: Context<'_, S>) {
        if !is_panel_active() {
            self.inner.on_enter(id, ctx);
        }
    }

    fn on_exit(&self, id: &tracing::span::Id, ctx: Context<'_, S>) {
        if !is_panel_active() {
            self.inner.on_exit(id, ctx);
        }
    }

    fn on_close(&self, id: tracing::span::Id, ctx: Context<'_, S>) {
        self.inner.on_close(id, ctx);
    }
}

/// Resets the flag when the panel scope ends, including on error paths
pub struct PanelActiveGuard;

impl PanelActiveGuard {
    pub fn activate() -> Self {
        set_panel_active(true);
        Self
    }
}

impl Drop for PanelActiveGuard {
    fn drop(&mut self) {
        set_panel_active(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_resets_flag() {
        {
            let _guard = PanelActiveGuard::activate();
            assert!(is_panel_active());
        }
        assert!(!is_panel_active());
    }
}
