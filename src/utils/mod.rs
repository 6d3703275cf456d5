//! Utility functions

pub mod panel_log;

pub use panel_log::{PanelActiveGuard, PanelAwareLayer};
