//! Storage Path Builder (spec §4.11): deterministic, recording-centric
//! layout, identical for local and object-storage backends.

use uuid::Uuid;

/// Builds paths under a storage root. Pure string construction — no I/O;
/// callers hand the resulting paths to a `Storage` backend.
#[derive(Debug, Clone)]
pub struct StoragePathBuilder;

impl StoragePathBuilder {
    fn recording_root(tenant_id: Uuid, recording_id: Uuid) -> String {
        format!("users/{tenant_id}/recordings/{recording_id}")
    }

    pub fn source_file(tenant_id: Uuid, recording_id: Uuid, ext: &str) -> String {
        format!("{}/source.{}", Self::recording_root(tenant_id, recording_id), ext)
    }

    pub fn trimmed_video(tenant_id: Uuid, recording_id: Uuid, ext: &str) -> String {
        format!("{}/video.{}", Self::recording_root(tenant_id, recording_id), ext)
    }

    pub fn extracted_audio(tenant_id: Uuid, recording_id: Uuid) -> String {
        format!("{}/audio.mp3", Self::recording_root(tenant_id, recording_id))
    }

    pub fn transcription_dir(tenant_id: Uuid, recording_id: Uuid) -> String {
        format!("{}/transcription", Self::recording_root(tenant_id, recording_id))
    }

    pub fn transcription_master(tenant_id: Uuid, recording_id: Uuid) -> String {
        format!("{}/master.json", Self::transcription_dir(tenant_id, recording_id))
    }

    pub fn topics_version(tenant_id: Uuid, recording_id: Uuid, version: i32) -> String {
        format!("{}/topics_v{}.json", Self::transcription_dir(tenant_id, recording_id), version)
    }

    pub fn subtitles(tenant_id: Uuid, recording_id: Uuid, format: &str) -> String {
        format!("{}/subtitles.{}", Self::transcription_dir(tenant_id, recording_id), format)
    }

    pub fn custom_thumbnail(tenant_id: Uuid, recording_id: Uuid) -> String {
        format!("{}/assets/custom_thumbnail.png", Self::recording_root(tenant_id, recording_id))
    }

    pub fn tenant_thumbnails_prefix(tenant_id: Uuid) -> String {
        format!("users/{tenant_id}/thumbnails")
    }

    pub fn shared_thumbnails_prefix() -> String {
        "shared/thumbnails".to_string()
    }

    pub fn temp_job_dir(tenant_id: Uuid, job_id: Uuid) -> String {
        format!("temp/{tenant_id}/{job_id}")
    }

    /// Deleting a recording is `rmtree` on this prefix; callers sum the
    /// removed bytes and call `TrackStorageRemoved` (spec §4.11 invariant).
    pub fn recording_prefix(tenant_id: Uuid, recording_id: Uuid) -> String {
        Self::recording_root(tenant_id, recording_id)
    }

    pub fn temp_prefix() -> &'static str {
        "temp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_recording_centric() {
        let tenant = Uuid::new_v4();
        let recording = Uuid::new_v4();
        assert_eq!(
            StoragePathBuilder::source_file(tenant, recording, "mp4"),
            format!("users/{tenant}/recordings/{recording}/source.mp4")
        );
        assert_eq!(
            StoragePathBuilder::topics_version(tenant, recording, 2),
            format!("users/{tenant}/recordings/{recording}/transcription/topics_v2.json")
        );
    }

    #[test]
    fn shared_thumbnails_are_tenant_independent() {
        assert_eq!(StoragePathBuilder::shared_thumbnails_prefix(), "shared/thumbnails");
    }
}
