//! Data models for the application
//!
//! This module contains all data structures used throughout the pipeline,
//! one file per entity from the data model.

pub mod automation_job;
pub mod automation_run;
pub mod credential;
pub mod matching_rule;
pub mod output_preset;
pub mod output_target;
pub mod quota_usage;
pub mod recording;
pub mod source;
pub mod source_metadata;
pub mod template;
pub mod tenant;

pub use automation_job::*;
pub use automation_run::*;
pub use credential::*;
pub use matching_rule::*;
pub use output_preset::*;
pub use output_target::*;
pub use quota_usage::*;
pub use recording::*;
pub use source::*;
pub use source_metadata::*;
pub use template::*;
pub use tenant::*;
