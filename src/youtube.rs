use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Result, bail};
use log::{debug, info, warn};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::error::{ErrorKind, PipelineError};
use crate::{Segment, Transcript, VideoId};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const YOUTUBE_BASE: &str = "https://www.youtube.com";

/// English variants tried before falling back to any language
pub const DEFAULT_LANGUAGES: [&str; 3] = ["en", "en-US", "en-GB"];

/// One caption track advertised for a video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    pub generated: bool,
}

/// A caption entry as delivered by the backend, before cleanup
#[derive(Debug, Clone, PartialEq)]
pub struct RawCaption {
    pub text: String,
    pub start: f64,
}

#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("subtitles are disabled for this video")]
    Disabled,
    #[error("video unavailable: {0}")]
    VideoUnavailable(String),
    /// YouTube could not be reached or answered with something other than a usable page
    #[error("{0}")]
    Transport(String),
    /// The track list or caption body arrived but could not be understood
    #[error("{0}")]
    Backend(String),
}

impl From<eyre::Report> for CaptionError {
    fn from(report: eyre::Report) -> Self {
        CaptionError::Backend(format!("{report:#}"))
    }
}

impl From<reqwest::Error> for CaptionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CaptionError::Backend(err.to_string())
        } else {
            CaptionError::Transport(err.to_string())
        }
    }
}

/// Source of caption tracks and their contents
#[async_trait]
pub trait CaptionBackend: Send + Sync {
    /// List every caption track for the video, in the order they should be tried
    async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>, CaptionError>;

    /// Download one track
    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<RawCaption>, CaptionError>;
}

/// One way of picking a caption track; strategies run in order until one yields captions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStrategy {
    /// First track whose language matches, in preference order
    Languages(Vec<String>),
    /// Every listed track in turn; the first successful download wins
    AnyAvailable,
}

impl FetchStrategy {
    /// `Ok(None)` means this strategy had nothing to offer and the next one should run
    async fn attempt(
        &self,
        backend: &dyn CaptionBackend,
        tracks: &[CaptionTrack],
    ) -> Result<Option<(String, Vec<RawCaption>)>, PipelineError> {
        match self {
            FetchStrategy::Languages(langs) => {
                let Some(track) = langs
                    .iter()
                    .find_map(|lang| tracks.iter().find(|t| &t.language_code == lang))
                else {
                    debug!("No track for languages {langs:?}");
                    return Ok(None);
                };
                let captions = backend
                    .fetch_track(track)
                    .await
                    .map_err(|e| PipelineError::server(format!("Error: {e}")))?;
                info!("Transcript found in preferred language {}", track.language_code);
                Ok(Some((track.language_code.clone(), captions)))
            }
            FetchStrategy::AnyAvailable => {
                for track in tracks {
                    match backend.fetch_track(track).await {
                        Ok(captions) => {
                            info!("Found transcript in {}", track.language_code);
                            return Ok(Some((track.language_code.clone(), captions)));
                        }
                        Err(e) => debug!("Track {} failed: {e}", track.language_code),
                    }
                }
                Ok(None)
            }
        }
    }
}

/// Retrieves a transcript through an ordered list of fetch strategies
#[derive(Clone)]
pub struct TranscriptFetcher {
    backend: Arc<dyn CaptionBackend>,
    strategies: Vec<FetchStrategy>,
}

impl TranscriptFetcher {
    /// Preferred languages first, then whatever the video has
    pub fn new(backend: Arc<dyn CaptionBackend>, languages: &[String]) -> Self {
        let strategies = vec![
            FetchStrategy::Languages(languages.to_vec()),
            FetchStrategy::AnyAvailable,
        ];
        Self::with_strategies(backend, strategies)
    }

    pub fn with_strategies(backend: Arc<dyn CaptionBackend>, strategies: Vec<FetchStrategy>) -> Self {
        Self { backend, strategies }
    }

    pub fn strategies(&self) -> &[FetchStrategy] {
        &self.strategies
    }

    pub async fn fetch(&self, video_id: &VideoId) -> Result<Transcript, PipelineError> {
        info!("Extracting transcript for video ID: {video_id}");

        let tracks = self.backend.list_tracks(video_id).await.map_err(|e| match e {
            CaptionError::Disabled => PipelineError::transcript_unavailable("Subtitles are disabled for this video"),
            CaptionError::VideoUnavailable(reason) => PipelineError::new(ErrorKind::VideoNotFound, reason),
            CaptionError::Transport(msg) => PipelineError::server(format!("Error: {msg}")),
            CaptionError::Backend(msg) => {
                PipelineError::transcript_unavailable(format!("Error accessing transcripts: {msg}"))
            }
        })?;
        debug!("{} caption track(s) listed for {video_id}", tracks.len());

        for strategy in &self.strategies {
            if let Some((language, captions)) = strategy.attempt(self.backend.as_ref(), &tracks).await? {
                return build_transcript(video_id, language, captions);
            }
        }

        warn!("No usable transcript for {video_id}");
        Err(PipelineError::transcript_unavailable(
            "No transcripts available for this video",
        ))
    }
}

/// Clean raw captions into segments, dropping entries with no text
fn build_transcript(video_id: &VideoId, language: String, captions: Vec<RawCaption>) -> Result<Transcript, PipelineError> {
    let segments: Vec<Segment> = captions
        .into_iter()
        .filter_map(|c| {
            let text = c.text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!text.is_empty()).then(|| Segment {
                text,
                start: c.start.max(0.0),
            })
        })
        .collect();

    if segments.is_empty() {
        return Err(PipelineError::transcript_unavailable("No transcript content found"));
    }

    Ok(Transcript {
        video_id: video_id.clone(),
        language,
        segments,
    })
}

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<InnerTubeCaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct InnerTubeCaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    kind: Option<String>,
}

/// Caption backend that talks to YouTube's InnerTube player API
#[derive(Debug, Clone)]
pub struct InnerTubeBackend {
    client: reqwest::Client,
    base_url: String,
}

impl InnerTubeBackend {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, YOUTUBE_BASE)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn player_response(&self, video_id: &VideoId) -> Result<InnerTubePlayerResponse, CaptionError> {
        // Step 1: Fetch the watch page to get the InnerTube API key
        let watch_url = format!("{}/watch?v={video_id}", self.base_url);
        debug!("Fetching watch page: {watch_url}");

        let page_html = self
            .client
            .get(&watch_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let api_key = extract_api_key(&page_html).map_err(|e| CaptionError::Transport(format!("{e:#}")))?;

        // Step 2: Call InnerTube player endpoint
        let player_url = format!("{}/youtubei/v1/player?key={api_key}&prettyPrint=false", self.base_url);

        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": "en",
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": "2.20241126.01.00"
                }
            },
            "videoId": video_id.as_str()
        });

        let resp = self
            .client
            .post(&player_url)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp)
    }
}

#[async_trait]
impl CaptionBackend for InnerTubeBackend {
    async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>, CaptionError> {
        let resp = self.player_response(video_id).await?;
        tracks_from_player(resp)
    }

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<RawCaption>, CaptionError> {
        debug!("Fetching caption track: lang={}", track.language_code);
        let caption_xml = self
            .client
            .get(&track.base_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(parse_caption_xml(&caption_xml)?)
    }
}

/// Classify a player response; manually created tracks sort ahead of generated ones
fn tracks_from_player(resp: InnerTubePlayerResponse) -> Result<Vec<CaptionTrack>, CaptionError> {
    if let Some(status) = resp.playability_status {
        if status.status != "OK" {
            let reason = status.reason.unwrap_or(status.status);
            return Err(CaptionError::VideoUnavailable(reason));
        }
    }

    let renderer = resp
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .ok_or(CaptionError::Disabled)?;

    let mut tracks: Vec<CaptionTrack> = renderer
        .caption_tracks
        .unwrap_or_default()
        .into_iter()
        .map(|t| CaptionTrack {
            base_url: t.base_url,
            language_code: t.language_code,
            generated: t.kind.as_deref() == Some("asr"),
        })
        .collect();
    tracks.sort_by_key(|t| t.generated);
    Ok(tracks)
}

fn extract_api_key(html: &str) -> Result<String> {
    let re = Regex::new(r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#)?;
    if let Some(caps) = re.captures(html) {
        return Ok(caps[1].to_string());
    }

    // Fallback: try the newer pattern
    let re2 = Regex::new(r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#)?;
    if let Some(caps) = re2.captures(html) {
        return Ok(caps[1].to_string());
    }

    bail!("could not extract InnerTube API key from watch page");
}

fn parse_caption_xml(xml: &str) -> Result<Vec<RawCaption>> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut captions = Vec::new();
    let mut current_start: Option<f64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                current_start = e
                    .attributes()
                    .flatten()
                    .find(|attr| attr.key.as_ref() == b"start")
                    .and_then(|attr| String::from_utf8_lossy(&attr.value).parse::<f64>().ok());
            }
            Ok(Event::Empty(_)) => {
                // Self-closing <text .../> with no content
            }
            Ok(Event::Text(ref e)) => {
                if let Some(start) = current_start.take() {
                    let raw_text = e.unescape().unwrap_or_default().to_string();
                    let text = html_escape::decode_html_entities(&raw_text).to_string();
                    if !text.is_empty() {
                        captions.push(RawCaption { text, start });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("error parsing caption XML: {e}"),
            _ => {}
        }
    }

    Ok(captions)
}
