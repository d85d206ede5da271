//! annolab - image annotation canvas core
//!
//! Viewport transforms, an undoable annotation store, the tool state machine
//! and batched persistence sync for a box/polygon labelling editor. Hosts
//! feed input events into an [`EditorSession`] and render its [`Scene`].

pub mod canvas;
pub mod config;
pub mod format;
pub mod geometry;
pub mod jobs;
pub mod keybindings;
pub mod message;
pub mod model;
pub mod session;
pub mod state;
pub mod sync;
pub mod transform;
pub mod undo;

pub use canvas::Scene;
pub use config::AppConfig;
pub use session::EditorSession;
