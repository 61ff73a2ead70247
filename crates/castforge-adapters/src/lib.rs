//! Platform adapters: the boundary between castforge's pipeline and the
//! external conferencing/storage/hosting/speech/topic providers it talks to.
//!
//! Every external call a stage runner makes goes through a `SourceAdapter`
//! or `SinkAdapter` trait object looked up in an `AdapterRegistry` — the
//! pipeline itself never names a concrete provider (spec §4.10).

pub mod registry;
pub mod sink;
pub mod source;
pub mod transcription;

pub mod mock;

pub use registry::AdapterRegistry;
pub use sink::{SinkAdapter, UploadMetadata, UploadOutcome};
pub use source::{FetchProgress, SourceAdapter};
pub use transcription::{ExtractedTopic, Transcript, TranscriptSegment, TopicAdapter, TranscriptionAdapter};
