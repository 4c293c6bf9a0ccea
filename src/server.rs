use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, Request, State};
use axum::middleware::{Next, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use eyre::Result;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};

use crate::error::{Envelope, PipelineError};
use crate::metadata::{MetadataClient, PlaylistMetadata, VideoMetadata};
use crate::pipeline::{DEFAULT_QUESTIONS, Pipeline};
use crate::prompt::NoteStyle;

/// Shared, read-only state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub metadata: Arc<MetadataClient>,
}

#[derive(Debug, Deserialize)]
struct VideoQuery {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NotesQuery {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
    #[serde(rename = "type")]
    note_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuizQuery {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
    questions: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistQuery {
    #[serde(rename = "playlistId")]
    playlist_id: Option<String>,
}

fn respond<T: Serialize>(envelope: Envelope<T>) -> Response {
    (envelope.status(), Json(envelope)).into_response()
}

fn fail(err: PipelineError) -> Response {
    respond(Envelope::<()>::Failure(err))
}

fn required(value: Option<String>, name: &str) -> Result<String, PipelineError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PipelineError::missing_parameter(format!("{name} parameter is required")))
}

/// Malformed query strings (repeated keys, bad encoding) are rejected inside the envelope
fn query<T>(extracted: Result<Query<T>, QueryRejection>) -> Result<T, PipelineError> {
    extracted
        .map(|Query(q)| q)
        .map_err(|rejection| PipelineError::invalid_parameter(rejection.body_text()))
}

async fn video_metadata(State(state): State<AppState>, q: Result<Query<VideoQuery>, QueryRejection>) -> Response {
    let q = match query(q) {
        Ok(q) => q,
        Err(e) => return fail(e),
    };
    let video = match required(q.video_id, "videoId") {
        Ok(v) => v,
        Err(e) => return fail(e),
    };
    info!("GET video metadata {video}");
    let envelope: Envelope<VideoMetadata> = state.metadata.video(&video).await.into();
    respond(envelope)
}

async fn playlist_metadata(
    State(state): State<AppState>,
    q: Result<Query<PlaylistQuery>, QueryRejection>,
) -> Response {
    let q = match query(q) {
        Ok(q) => q,
        Err(e) => return fail(e),
    };
    let playlist_id = match required(q.playlist_id, "playlistId") {
        Ok(v) => v,
        Err(e) => return fail(e),
    };
    info!("GET playlist metadata {playlist_id}");
    let envelope: Envelope<PlaylistMetadata> = state.metadata.playlist(playlist_id.trim()).await.into();
    respond(envelope)
}

async fn generate_notes(State(state): State<AppState>, q: Result<Query<NotesQuery>, QueryRejection>) -> Response {
    let q = match query(q) {
        Ok(q) => q,
        Err(e) => return fail(e),
    };
    let video = match required(q.video_id, "videoId") {
        Ok(v) => v,
        Err(e) => return fail(e),
    };
    let style = match q.note_type.as_deref() {
        None => NoteStyle::default(),
        Some(name) => match name.parse::<NoteStyle>() {
            Ok(style) => style,
            Err(e) => return fail(e),
        },
    };
    info!("GET notes {video} type={style}");
    respond(state.pipeline.generate_notes(&video, style).await)
}

async fn generate_quiz(State(state): State<AppState>, q: Result<Query<QuizQuery>, QueryRejection>) -> Response {
    let q = match query(q) {
        Ok(q) => q,
        Err(e) => return fail(e),
    };
    let video = match required(q.video_id, "videoId") {
        Ok(v) => v,
        Err(e) => return fail(e),
    };
    let questions = match q.questions.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_QUESTIONS,
        Some(n) => match n.parse::<i64>() {
            Ok(n) => n,
            Err(_) => return fail(PipelineError::invalid_parameter("questions must be a positive integer")),
        },
    };
    info!("GET quiz {video} questions={questions}");
    respond(state.pipeline.generate_quiz(&video, questions).await)
}

/// Panics inside a handler become a SERVER_ERROR envelope
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "internal error".to_string()
    };
    error!("Handler panicked: {message}");
    fail(PipelineError::server(message))
}

/// Requests running past the limit are cancelled and answered with a SERVER_ERROR envelope
async fn enforce_timeout(State(limit): State<Duration>, request: Request, next: Next) -> Response {
    let uri = request.uri().clone();
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!("Request {uri} timed out after {limit:?}");
            fail(PipelineError::server(format!(
                "Request timed out after {} seconds",
                limit.as_secs_f64()
            )))
        }
    }
}

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/video/metadata", get(video_metadata))
        .route("/playlist/metadata", get(playlist_metadata))
        .route("/notes/generate", get(generate_notes))
        .route("/quiz/generate", get(generate_quiz))
}

pub fn create_router(state: AppState, timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        .nest("/api", api_router())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(timeout, enforce_timeout))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(state: AppState, addr: &str, timeout: Duration) -> Result<()> {
    let app = create_router(state, timeout);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("ytlearn listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::VideoId;
    use crate::llm::{GenerateError, TextGenerator};
    use crate::youtube::{CaptionBackend, CaptionError, CaptionTrack, RawCaption, TranscriptFetcher};

    struct OneTrack;

    #[async_trait]
    impl CaptionBackend for OneTrack {
        async fn list_tracks(&self, _video_id: &VideoId) -> Result<Vec<CaptionTrack>, CaptionError> {
            Ok(vec![CaptionTrack {
                base_url: "https://example.test/en".to_string(),
                language_code: "en".to_string(),
                generated: false,
            }])
        }

        async fn fetch_track(&self, _track: &CaptionTrack) -> Result<Vec<RawCaption>, CaptionError> {
            Ok(vec![RawCaption {
                text: "Ownership moves values".to_string(),
                start: 3.0,
            }])
        }
    }

    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
            Ok("## Ownership\n- values move".to_string())
        }
    }

    struct Stalled;

    #[async_trait]
    impl TextGenerator for Stalled {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(String::new())
        }
    }

    fn app_with(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Router {
        let fetcher = TranscriptFetcher::new(Arc::new(OneTrack), &["en".to_string()]);
        let state = AppState {
            pipeline: Arc::new(Pipeline::new(fetcher, generator)),
            metadata: Arc::new(MetadataClient::new(reqwest::Client::new(), None)),
        };
        create_router(state, timeout)
    }

    fn app() -> Router {
        app_with(Arc::new(Echo), Duration::from_secs(5))
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        send(app(), uri).await
    }

    async fn send(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_notes_success() {
        let (status, body) = get_json("/api/notes/generate?videoId=abc12345678&type=summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["notes"], "## Ownership\n- values move");
        assert_eq!(body["data"]["note_type"], "summary");
        assert_eq!(body["data"]["transcript_summary"]["length"], 22);
    }

    #[tokio::test]
    async fn test_notes_default_type_is_comprehensive() {
        let (status, body) = get_json("/api/notes/generate?videoId=abc12345678").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["note_type"], "comprehensive");
    }

    #[tokio::test]
    async fn test_notes_missing_video_id() {
        let (status, body) = get_json("/api/notes/generate?type=summary").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["type"], "MISSING_PARAMETER");
        assert_eq!(body["error"]["message"], "videoId parameter is required");
    }

    #[tokio::test]
    async fn test_notes_invalid_type_rejected() {
        let (status, body) = get_json("/api/notes/generate?videoId=abc12345678&type=outline").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "INVALID_PARAMETER");
    }

    #[tokio::test]
    async fn test_notes_bad_video_is_parsing_error() {
        let (status, body) = get_json("/api/notes/generate?videoId=nope").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "PARSING_ERROR");
    }

    #[tokio::test]
    async fn test_quiz_missing_video_id() {
        let (status, body) = get_json("/api/quiz/generate?questions=3").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "MISSING_PARAMETER");
    }

    #[tokio::test]
    async fn test_quiz_zero_questions_rejected() {
        let (status, body) = get_json("/api/quiz/generate?videoId=abc12345678&questions=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "INVALID_PARAMETER");
    }

    #[tokio::test]
    async fn test_quiz_non_numeric_questions_rejected() {
        let (status, body) = get_json("/api/quiz/generate?videoId=abc12345678&questions=many").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "INVALID_PARAMETER");
    }

    #[tokio::test]
    async fn test_quiz_unparseable_reply() {
        let (status, body) = get_json("/api/quiz/generate?videoId=abc12345678").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "PARSING_ERROR");
    }

    #[tokio::test]
    async fn test_video_metadata_without_key() {
        let (status, body) = get_json("/api/video/metadata?videoId=abc12345678").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["type"], "API_KEY_ERROR");
    }

    #[tokio::test]
    async fn test_playlist_missing_id() {
        let (status, body) = get_json("/api/playlist/metadata").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "playlistId parameter is required");
    }

    #[tokio::test]
    async fn test_repeated_query_key_is_enveloped() {
        let (status, body) = get_json("/api/notes/generate?videoId=abc12345678&videoId=abc12345678").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["type"], "INVALID_PARAMETER");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_repeated_query_key_on_metadata_route() {
        let (status, body) = get_json("/api/playlist/metadata?playlistId=a&playlistId=b").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "INVALID_PARAMETER");
    }

    #[tokio::test]
    async fn test_timed_out_request_is_server_error_envelope() {
        let app = app_with(Arc::new(Stalled), Duration::from_millis(50));
        let (status, body) = send(app, "/api/notes/generate?videoId=abc12345678").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["type"], "SERVER_ERROR");
        assert!(body["error"]["message"].as_str().unwrap().contains("timed out"));
    }
}
