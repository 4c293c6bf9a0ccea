//! Video and playlist metadata from the YouTube Data API v3.

use std::collections::HashMap;

use eyre::Result;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PipelineError};
use crate::llm::is_placeholder;
use crate::VideoId;

const DATA_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Playlists are listed up to this many videos
pub const MAX_PLAYLIST_VIDEOS: usize = 50;

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    description: Option<String>,
    channel_title: Option<String>,
    published_at: Option<String>,
    thumbnails: HashMap<String, Thumbnail>,
    tags: Vec<String>,
    category_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ContentDetails {
    duration: Option<String>,
    video_id: Option<String>,
    item_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResource {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    content_details: ContentDetails,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistResource {
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemResource {
    #[serde(default)]
    content_details: ContentDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub author: String,
    /// ISO 8601 duration as returned by the API
    pub duration: String,
    pub thumbnail_url: String,
    pub published_at: Option<String>,
    pub description: String,
    pub view_count: Option<String>,
    pub like_count: Option<String>,
    pub comment_count: Option<String>,
    pub tags: Vec<String>,
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistVideo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub duration: String,
    pub author: String,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistMetadata {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub channel_title: String,
    pub item_count: u64,
    pub published_at: Option<String>,
    pub videos: Vec<PlaylistVideo>,
}

/// Highest available thumbnail resolution
fn best_thumbnail(snippet: &Snippet) -> Option<String> {
    ["high", "medium", "default"]
        .iter()
        .find_map(|size| snippet.thumbnails.get(*size).and_then(|t| t.url.clone()))
}

fn video_thumbnail(snippet: &Snippet, video_id: &str) -> String {
    best_thumbnail(snippet).unwrap_or_else(|| format!("https://img.youtube.com/vi/{video_id}/hqdefault.jpg"))
}

impl From<VideoResource> for VideoMetadata {
    fn from(video: VideoResource) -> Self {
        let thumbnail_url = video_thumbnail(&video.snippet, &video.id);
        let snippet = video.snippet;
        VideoMetadata {
            title: snippet.title.unwrap_or_else(|| "Unknown Title".to_string()),
            author: snippet.channel_title.unwrap_or_else(|| "Unknown Author".to_string()),
            duration: video.content_details.duration.unwrap_or_else(|| "PT0S".to_string()),
            thumbnail_url,
            published_at: snippet.published_at,
            description: snippet.description.unwrap_or_default(),
            view_count: video.statistics.view_count,
            like_count: video.statistics.like_count,
            comment_count: video.statistics.comment_count,
            tags: snippet.tags,
            category_id: snippet.category_id,
            id: video.id,
        }
    }
}

impl From<VideoResource> for PlaylistVideo {
    fn from(video: VideoResource) -> Self {
        let thumbnail_url = video_thumbnail(&video.snippet, &video.id);
        let snippet = video.snippet;
        PlaylistVideo {
            title: snippet.title.unwrap_or_else(|| "Unknown Title".to_string()),
            description: snippet.description.unwrap_or_default(),
            thumbnail_url,
            duration: video.content_details.duration.unwrap_or_else(|| "PT0S".to_string()),
            author: snippet.channel_title.unwrap_or_else(|| "Unknown".to_string()),
            published_at: snippet.published_at,
            id: video.id,
        }
    }
}

/// Client for the YouTube Data API
#[derive(Debug, Clone)]
pub struct MetadataClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl MetadataClient {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !is_placeholder(k)),
            base_url: DATA_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn api_key(&self) -> Result<&str, PipelineError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| PipelineError::api_key("YouTube API key not configured"))
    }

    async fn get<T: DeserializeOwned>(&self, resource: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{resource}", self.base_url);
        debug!("YouTube Data API: {resource} {params:?}");
        let resp = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key()?.to_string())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp)
    }

    async fn videos(&self, ids: &[String]) -> Result<Vec<VideoResource>> {
        let ids = ids.join(",");
        let list: ListResponse<VideoResource> = self
            .get("videos", &[("part", "snippet,contentDetails,statistics"), ("id", &ids)])
            .await?;
        Ok(list.items)
    }

    /// Metadata for a single video given its id or URL
    pub async fn video(&self, input: &str) -> Result<VideoMetadata, PipelineError> {
        let video_id = VideoId::resolve(input)?;
        self.api_key()?;

        let video = self
            .videos(&[video_id.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::new(ErrorKind::VideoNotFound, "Video not found or not accessible"))?;
        Ok(video.into())
    }

    /// Playlist details plus its first videos
    pub async fn playlist(&self, playlist_id: &str) -> Result<PlaylistMetadata, PipelineError> {
        self.api_key()?;

        let list: ListResponse<PlaylistResource> = self
            .get("playlists", &[("part", "snippet,contentDetails"), ("id", playlist_id)])
            .await?;
        let playlist = list.items.into_iter().next().ok_or_else(|| {
            PipelineError::new(ErrorKind::PlaylistNotFound, "Playlist not found or not accessible")
        })?;

        let mut videos: Vec<PlaylistVideo> = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let max_results = (MAX_PLAYLIST_VIDEOS - videos.len()).min(50).to_string();
            let mut params = vec![
                ("part", "snippet,contentDetails"),
                ("playlistId", playlist_id),
                ("maxResults", max_results.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }
            let page: ListResponse<PlaylistItemResource> = self.get("playlistItems", &params).await?;

            let ids: Vec<String> = page
                .items
                .into_iter()
                .filter_map(|item| item.content_details.video_id)
                .collect();
            if !ids.is_empty() {
                videos.extend(self.videos(&ids).await?.into_iter().map(PlaylistVideo::from));
            }

            page_token = page.next_page_token;
            if page_token.is_none() || videos.len() >= MAX_PLAYLIST_VIDEOS {
                break;
            }
        }
        videos.truncate(MAX_PLAYLIST_VIDEOS);

        let snippet = playlist.snippet;
        Ok(PlaylistMetadata {
            id: playlist_id.to_string(),
            thumbnail_url: best_thumbnail(&snippet),
            title: snippet.title.unwrap_or_else(|| "Unknown Playlist".to_string()),
            description: snippet.description.unwrap_or_default(),
            channel_title: snippet.channel_title.unwrap_or_else(|| "Unknown Channel".to_string()),
            item_count: playlist.content_details.item_count.unwrap_or(0),
            published_at: snippet.published_at,
            videos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_resource(json: serde_json::Value) -> VideoResource {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_video_metadata_defaults() {
        let meta: VideoMetadata = video_resource(serde_json::json!({"id": "abc12345678"})).into();
        assert_eq!(meta.title, "Unknown Title");
        assert_eq!(meta.author, "Unknown Author");
        assert_eq!(meta.duration, "PT0S");
        assert_eq!(meta.thumbnail_url, "https://img.youtube.com/vi/abc12345678/hqdefault.jpg");
        assert!(meta.tags.is_empty());
    }

    #[test]
    fn test_thumbnail_preference() {
        let meta: VideoMetadata = video_resource(serde_json::json!({
            "id": "abc12345678",
            "snippet": {"thumbnails": {
                "default": {"url": "https://t/default.jpg"},
                "medium": {"url": "https://t/medium.jpg"}
            }}
        }))
        .into();
        assert_eq!(meta.thumbnail_url, "https://t/medium.jpg");
    }

    #[test]
    fn test_video_metadata_wire_names() {
        let meta: VideoMetadata = video_resource(serde_json::json!({
            "id": "abc12345678",
            "snippet": {"title": "Intro", "channelTitle": "Chan", "publishedAt": "2024-01-01T00:00:00Z"},
            "contentDetails": {"duration": "PT4M13S"},
            "statistics": {"viewCount": "42"}
        }))
        .into();
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["author"], "Chan");
        assert_eq!(value["thumbnailUrl"], "https://img.youtube.com/vi/abc12345678/hqdefault.jpg");
        assert_eq!(value["viewCount"], "42");
        assert_eq!(value["duration"], "PT4M13S");
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = MetadataClient::new(reqwest::Client::new(), Some("your-youtube-api-key-here".to_string()));
        let err = client.video("dQw4w9WgXcQ").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ApiKeyError);
        let err = client.playlist("PL123").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ApiKeyError);
    }

    #[tokio::test]
    async fn test_unresolvable_video_is_parsing_error() {
        let client = MetadataClient::new(reqwest::Client::new(), Some("key".to_string()));
        assert_eq!(client.video("???").await.unwrap_err().kind, ErrorKind::ParsingError);
    }
}
