//! # palaver-server
//!
//! Axum HTTP + WebSocket server for Palaver.
//!
//! - [`chat`]: room membership ([`chat::groups::GroupLayer`]) and the
//!   per-connection session state machine
//! - [`websocket`]: socket driver, outbound queues and heartbeat
//! - [`api`]: authenticated JSON routes under `/api`
//! - [`server`]: router assembly, connection limit and graceful shutdown

#![deny(unsafe_code)]

pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::{Result, ServerError};
pub use server::{AppState, PalaverServer};
