//! Interactive canvas: tool state machine and screen projection.

mod controller;
mod projection;

pub use controller::{Draft, InteractionConfig, InteractionController};
pub use projection::{Scene, ScreenGeometry, ScreenHandle, ScreenShape, hit_test};
