//! Tracing initialization.
//!
//! castforge logs via `tracing`; this module wires up an `EnvFilter` +
//! fmt layer the same way across every binary (worker, scheduler). OpenTelemetry
//! export is an outer-surface observability concern and is not part of the core.

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry};
