//! The core's programmatic API surface (spec §6): plain `pub async fn`
//! operations, each taking `&TenantContext` plus typed arguments and
//! returning `Result<T, AppError>`. No routing, no JWT handling, no
//! serialization format opinions — those belong to the HTTP collaborator
//! this crate is designed to sit behind, mirroring the teacher's own split
//! between its business-logic facade and its axum handlers (only the
//! former is in scope here).

pub mod automation;
pub mod context;
pub mod credentials;
mod permissions;
pub mod presets;
pub mod recordings;
pub mod sources;
pub mod templates;

pub use context::{ApiContext, RunRegistry};
