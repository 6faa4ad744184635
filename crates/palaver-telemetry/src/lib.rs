//! # palaver-telemetry
//!
//! Observability plumbing shared by the server and the CLI:
//!
//! - [`init_subscriber`] installs the global `tracing` subscriber
//! - [`metrics`] holds the Prometheus recorder and every metric name

#![deny(unsafe_code)]

pub mod logging;
pub mod metrics;

pub use logging::{build_filter, init_subscriber};
pub use metrics::{prometheus_handle, render};
