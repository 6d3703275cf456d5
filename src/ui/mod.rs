//! Panel front ends: a ratatui terminal view and a JSON-lines bridge

pub mod bridge;
pub mod terminal;

pub use bridge::run_stdio;
pub use terminal::run_panel;
