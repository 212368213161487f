//! Unibot Live - live data clients
//!
//! Fetches and normalizes the university announcements feed, renders it for chat, and
//! polls arbitrary registered JSON sources.

pub mod announcements;
pub mod formatter;
pub mod http;
pub mod sources;

pub use announcements::*;
pub use formatter::*;
pub use http::*;
pub use sources::*;
