//! Panel state model, normalization and the playback sync loop

pub mod model;
pub mod normalize;
pub mod session;

pub use model::{PanelCommand, PanelMessage, QueueSnapshot, TrackInfo};
pub use session::{PanelSession, Timings};
