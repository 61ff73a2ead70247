//! Background worker: the Automation Scheduler (spec §4.9) and the temp
//! file / credential-expiry sweeps (spec §4.11, §4.2) that run alongside
//! it. Shares its repository and service wiring with `castforge-api` so a
//! scheduled run and a manually triggered one behave identically.

pub mod context;
pub mod scheduler;
pub mod sweeper;

pub use context::WorkerContext;
pub use scheduler::{Scheduler, SchedulerConfig};
pub use sweeper::{CredentialExpirySweeper, TempFileSweeper};
