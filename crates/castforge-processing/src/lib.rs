//! Pipeline stage logic: the business rules executed while a recording
//! moves through its processing stages (spec §4.7), plus the orchestration
//! glue (`fsm`, `output_fsm`) that pairs each transition with an audit row.

pub mod executor;
pub mod fsm;
pub mod media;
pub mod output_fsm;
pub mod stages;
pub mod template_vars;
pub mod topics;

pub use fsm::{RecordingFsm, StageHandle};
pub use media::{FfmpegRunner, SilenceDetectionSettings, SilenceSpan, TrimOutcome};
pub use output_fsm::OutputTargetFsm;
pub use template_vars::{Topic, TopicsDisplayFormat, TemplateContext};
pub use topics::TopicMode;
