//! Database repositories for the data access layer.
//!
//! `domain/` holds one module per spec §3 entity; `transaction` holds the
//! shared `TransactionGuard`/`with_transaction` helpers every repository
//! that needs a row-level lock (quota counters, FSM transitions) builds on.

pub mod domain;
pub mod transaction;
