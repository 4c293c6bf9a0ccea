pub mod config;
pub mod error;
pub mod llm;
pub mod metadata;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod quiz;
pub mod server;
pub mod youtube;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::PipelineError;

/// An 11-character YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Resolve a bare identifier or any supported YouTube URL
    pub fn resolve(input: &str) -> Result<Self, PipelineError> {
        extract_video_id(input).ok_or_else(|| PipelineError::parsing("Invalid YouTube URL or video ID"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single captioned segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
}

impl Segment {
    /// `mm:ss` offset of this segment; minutes are not wrapped into hours
    pub fn timestamp(&self) -> String {
        let secs = self.start.max(0.0) as u64;
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}

/// Complete transcript for a video
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub video_id: VideoId,
    pub language: String,
    pub segments: Vec<Segment>,
}

impl Transcript {
    /// Each segment as `[mm:ss] text`, newline-joined
    pub fn formatted_text(&self) -> String {
        output::render_timestamped(self)
    }
}

// Host-qualified shapes first; the generic capture goes last.
static URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"youtube\.com/watch\?v=([0-9A-Za-z_-]{11})(?:$|[^0-9A-Za-z_-])",
        r"youtube\.com/watch\?.*[?&]?v=([0-9A-Za-z_-]{11})(?:$|[^0-9A-Za-z_-])",
        r"youtu\.be/([0-9A-Za-z_-]{11})(?:$|[^0-9A-Za-z_-])",
        r"youtube\.com/embed/([0-9A-Za-z_-]{11})(?:$|[^0-9A-Za-z_-])",
        r"youtube\.com/v/([0-9A-Za-z_-]{11})(?:$|[^0-9A-Za-z_-])",
        r"youtube\.com/live/([0-9A-Za-z_-]{11})(?:$|[^0-9A-Za-z_-])",
        r"youtube\.com/shorts/([0-9A-Za-z_-]{11})(?:$|[^0-9A-Za-z_-])",
        r"(?:v=|/)([0-9A-Za-z_-]{11})(?:$|[^0-9A-Za-z_-])",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static video URL pattern"))
    .collect()
});

static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z_-]{11}$").expect("static video id pattern"));

/// Extract video ID from various YouTube URL formats
pub fn extract_video_id(input: &str) -> Option<VideoId> {
    let input = input.trim();

    for pattern in URL_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(input) {
            return Some(VideoId(caps[1].to_string()));
        }
    }

    // Bare 11-character video ID
    if BARE_ID.is_match(input) {
        return Some(VideoId(input.to_string()));
    }

    None
}
