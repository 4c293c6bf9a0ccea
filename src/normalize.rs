//! Turns transcripts into timestamp-free prose for prompting.

use std::sync::LazyLock;

use regex::Regex;

use crate::Segment;

static LEADING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[\d{2,}:\d{2}\]").expect("static timestamp pattern"));

/// Strip `[mm:ss]` tags from formatted transcript text and join the lines with single spaces
pub fn clean_formatted(formatted: &str) -> String {
    formatted
        .lines()
        .map(|line| LEADING_TAG.replace(line, ""))
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Join the non-empty segment texts with single spaces
pub fn join_segments(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
