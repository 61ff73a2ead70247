//! GenerateSubtitles stage (spec §4.7): optional SRT/VTT rendering from the
//! transcript, skipped entirely when no formats are configured for the
//! recording.

use castforge_adapters::transcription::Transcript;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubtitleFormat {
    Srt,
    Vtt,
}

impl SubtitleFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "srt" => Some(Self::Srt),
            "vtt" => Some(Self::Vtt),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
        }
    }
}

fn format_srt_timestamp(total_seconds: i64) -> String {
    let h = total_seconds / 3600;
    let m = (total_seconds % 3600) / 60;
    let s = total_seconds % 60;
    format!("{h:02}:{m:02}:{s:02},000")
}

fn format_vtt_timestamp(total_seconds: i64) -> String {
    let h = total_seconds / 3600;
    let m = (total_seconds % 3600) / 60;
    let s = total_seconds % 60;
    format!("{h:02}:{m:02}:{s:02}.000")
}

/// Renders `transcript` into the given format. One segment per cue — the
/// transcription adapter already produces word/phrase-level segments, which
/// is as fine a granularity as a subtitle cue needs.
pub fn render(transcript: &Transcript, format: SubtitleFormat) -> String {
    match format {
        SubtitleFormat::Srt => render_srt(transcript),
        SubtitleFormat::Vtt => render_vtt(transcript),
    }
}

fn render_srt(transcript: &Transcript) -> String {
    let mut out = String::new();
    for (i, segment) in transcript.segments.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_srt_timestamp(segment.start_s),
            format_srt_timestamp(segment.end_s),
            segment.text
        ));
    }
    out
}

fn render_vtt(transcript: &Transcript) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for segment in &transcript.segments {
        out.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_vtt_timestamp(segment.start_s),
            format_vtt_timestamp(segment.end_s),
            segment.text
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use castforge_adapters::transcription::TranscriptSegment;

    fn sample() -> Transcript {
        Transcript {
            language: Some("en".to_string()),
            segments: vec![TranscriptSegment {
                text: "Hello there".to_string(),
                start_s: 0,
                end_s: 2,
            }],
        }
    }

    #[test]
    fn srt_has_numbered_cues() {
        let rendered = render(&sample(), SubtitleFormat::Srt);
        assert!(rendered.starts_with("1\n00:00:00,000 --> 00:00:02,000\nHello there"));
    }

    #[test]
    fn vtt_has_header() {
        let rendered = render(&sample(), SubtitleFormat::Vtt);
        assert!(rendered.starts_with("WEBVTT\n\n00:00:00.000 --> 00:00:02.000\nHello there"));
    }

    #[test]
    fn parses_known_formats_only() {
        assert_eq!(SubtitleFormat::parse("srt"), Some(SubtitleFormat::Srt));
        assert_eq!(SubtitleFormat::parse("ass"), None);
    }
}
