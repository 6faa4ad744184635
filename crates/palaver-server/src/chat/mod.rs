//! Chat core: room membership and per-connection sessions.

pub mod groups;
pub mod session;
