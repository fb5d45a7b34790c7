//! Chat conversation feature for parley.
//!
//! Holds the in-memory chat log, the view abstraction the controller renders
//! through, and the HTML transcript export.

pub mod controller;
pub mod html;
pub mod log;
pub mod view;

pub use controller::ChatSession;
pub use log::{ChatEntry, ChatLog, Role};
pub use view::ViewSink;
