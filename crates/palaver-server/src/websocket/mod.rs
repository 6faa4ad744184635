//! WebSocket transport.
//!
//! - [`connection`]: per-client outbound queue and liveness flags
//! - [`heartbeat`]: silent-client detection
//! - [`socket`]: drives one upgraded socket through a chat session

pub mod connection;
pub mod heartbeat;
pub mod socket;
