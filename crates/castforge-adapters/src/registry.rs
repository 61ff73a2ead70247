//! Adapter registry: looks up a `SourceAdapter`/`SinkAdapter` by platform id.
//!
//! Mirrors the teacher's plugin registry shape — an `Arc<RwLock<HashMap<...>>>`
//! keyed by a string id, populated once at startup — generalized to two
//! adapter kinds instead of one.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::sink::SinkAdapter;
use crate::source::SourceAdapter;
use crate::transcription::{TopicAdapter, TranscriptionAdapter};

#[derive(Clone)]
pub struct AdapterRegistry {
    sources: Arc<RwLock<HashMap<String, Arc<dyn SourceAdapter>>>>,
    sinks: Arc<RwLock<HashMap<String, Arc<dyn SinkAdapter>>>>,
    transcribers: Arc<RwLock<HashMap<String, Arc<dyn TranscriptionAdapter>>>>,
    topic_extractors: Arc<RwLock<HashMap<String, Arc<dyn TopicAdapter>>>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            sources: Arc::new(RwLock::new(HashMap::new())),
            sinks: Arc::new(RwLock::new(HashMap::new())),
            transcribers: Arc::new(RwLock::new(HashMap::new())),
            topic_extractors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register_source(&self, adapter: Arc<dyn SourceAdapter>) {
        let id = adapter.platform_id().to_string();
        self.sources.write().await.insert(id, adapter);
    }

    pub async fn register_sink(&self, adapter: Arc<dyn SinkAdapter>) {
        let id = adapter.platform_id().to_string();
        self.sinks.write().await.insert(id, adapter);
    }

    pub async fn register_transcriber(&self, adapter: Arc<dyn TranscriptionAdapter>) {
        let id = adapter.platform_id().to_string();
        self.transcribers.write().await.insert(id, adapter);
    }

    pub async fn register_topic_extractor(&self, adapter: Arc<dyn TopicAdapter>) {
        let id = adapter.platform_id().to_string();
        self.topic_extractors.write().await.insert(id, adapter);
    }

    pub async fn source(&self, platform_id: &str) -> Result<Arc<dyn SourceAdapter>> {
        self.sources
            .read()
            .await
            .get(platform_id)
            .cloned()
            .with_context(|| format!("no source adapter registered for platform '{platform_id}'"))
    }

    pub async fn sink(&self, platform_id: &str) -> Result<Arc<dyn SinkAdapter>> {
        self.sinks
            .read()
            .await
            .get(platform_id)
            .cloned()
            .with_context(|| format!("no sink adapter registered for platform '{platform_id}'"))
    }

    pub async fn transcriber(&self, platform_id: &str) -> Result<Arc<dyn TranscriptionAdapter>> {
        self.transcribers
            .read()
            .await
            .get(platform_id)
            .cloned()
            .with_context(|| format!("no transcription adapter registered for platform '{platform_id}'"))
    }

    pub async fn topic_extractor(&self, platform_id: &str) -> Result<Arc<dyn TopicAdapter>> {
        self.topic_extractors
            .read()
            .await
            .get(platform_id)
            .cloned()
            .with_context(|| format!("no topic adapter registered for platform '{platform_id}'"))
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockSinkAdapter, MockSourceAdapter};

    #[tokio::test]
    async fn registers_and_retrieves_source_adapter() {
        let registry = AdapterRegistry::new();
        registry
            .register_source(Arc::new(MockSourceAdapter::new("conferencing_cloud")))
            .await;

        let adapter = registry.source("conferencing_cloud").await.unwrap();
        assert_eq!(adapter.platform_id(), "conferencing_cloud");
    }

    #[tokio::test]
    async fn missing_adapter_is_an_error() {
        let registry = AdapterRegistry::new();
        assert!(registry.source("nope").await.is_err());
    }

    #[tokio::test]
    async fn registers_and_retrieves_sink_adapter() {
        let registry = AdapterRegistry::new();
        registry
            .register_sink(Arc::new(MockSinkAdapter::new("hosting_provider_a")))
            .await;

        let adapter = registry.sink("hosting_provider_a").await.unwrap();
        assert_eq!(adapter.platform_id(), "hosting_provider_a");
    }
}
