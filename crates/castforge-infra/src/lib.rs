//! castforge infrastructure: process-wide tracing initialization.
//!
//! Kept as its own crate because both `castforge-worker`'s binaries (executor
//! loop, scheduler tick) need to initialize tracing identically; everything
//! else the teacher kept here (HTTP middleware, OpenTelemetry export, capacity
//! gating) is an outer-surface or non-spec concern and was trimmed.

pub mod telemetry;

pub use telemetry::{init_telemetry, shutdown_telemetry};
