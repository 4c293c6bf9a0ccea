use crate::Transcript;

/// Render transcript as plain text (one segment per line, no timestamps)
pub fn render_text(transcript: &Transcript) -> String {
    transcript
        .segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render transcript as `[mm:ss] text` lines
pub fn render_timestamped(transcript: &Transcript) -> String {
    transcript
        .segments
        .iter()
        .map(|s| format!("[{}] {}", s.timestamp(), s.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render transcript as pretty-printed JSON, including each segment's timestamp
pub fn render_json(transcript: &Transcript) -> String {
    let segments: Vec<_> = transcript
        .segments
        .iter()
        .map(|s| {
            serde_json::json!({
                "text": s.text,
                "start": s.start,
                "timestamp": s.timestamp(),
            })
        })
        .collect();

    let value = serde_json::json!({
        "video_id": transcript.video_id,
        "language": transcript.language,
        "segments": segments,
    });
    serde_json::to_string_pretty(&value).unwrap_or_default()
}
