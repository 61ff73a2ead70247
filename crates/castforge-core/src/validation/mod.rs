//! Validation helpers shared across services: template placeholder syntax
//! (spec §6) and matching-rule pattern validation (spec §4.4, on `MatchingRule` itself).

pub mod placeholders;

pub use placeholders::{known_placeholders, validate_template_string, Placeholder};
