use reqwest::StatusCode;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Closed set of failure tags exposed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    MissingParameter,
    ParsingError,
    ApiKeyError,
    VideoNotFound,
    PlaylistNotFound,
    TranscriptUnavailable,
    InvalidParameter,
    ServerError,
}

impl ErrorKind {
    /// HTTP status the web layer answers with for this kind of failure
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::MissingParameter | ErrorKind::ParsingError | ErrorKind::InvalidParameter => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::TranscriptUnavailable => StatusCode::BAD_REQUEST,
            ErrorKind::VideoNotFound | ErrorKind::PlaylistNotFound => StatusCode::NOT_FOUND,
            ErrorKind::ApiKeyError | ErrorKind::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            ErrorKind::MissingParameter => "MISSING_PARAMETER",
            ErrorKind::ParsingError => "PARSING_ERROR",
            ErrorKind::ApiKeyError => "API_KEY_ERROR",
            ErrorKind::VideoNotFound => "VIDEO_NOT_FOUND",
            ErrorKind::PlaylistNotFound => "PLAYLIST_NOT_FOUND",
            ErrorKind::TranscriptUnavailable => "TRANSCRIPT_UNAVAILABLE",
            ErrorKind::InvalidParameter => "INVALID_PARAMETER",
            ErrorKind::ServerError => "SERVER_ERROR",
        };
        f.write_str(tag)
    }
}

/// A classified failure from any pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct PipelineError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn missing_parameter(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingParameter, message)
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParameter, message)
    }

    pub fn parsing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParsingError, message)
    }

    pub fn transcript_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TranscriptUnavailable, message)
    }

    pub fn api_key(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ApiKeyError, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerError, message)
    }
}

/// Unclassified plumbing failures are server errors carrying the full cause chain
impl From<eyre::Report> for PipelineError {
    fn from(report: eyre::Report) -> Self {
        PipelineError::server(format!("{report:#}"))
    }
}

/// Uniform success/failure wrapper returned by every public operation
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Success(T),
    Failure(PipelineError),
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    /// HTTP status matching this envelope
    pub fn status(&self) -> StatusCode {
        match self {
            Envelope::Success(_) => StatusCode::OK,
            Envelope::Failure(err) => err.kind.status(),
        }
    }

    pub fn into_result(self) -> Result<T, PipelineError> {
        match self {
            Envelope::Success(data) => Ok(data),
            Envelope::Failure(err) => Err(err),
        }
    }
}

impl<T> From<Result<T, PipelineError>> for Envelope<T> {
    fn from(result: Result<T, PipelineError>) -> Self {
        match result {
            Ok(data) => Envelope::Success(data),
            Err(err) => Envelope::Failure(err),
        }
    }
}

#[derive(Serialize)]
struct Wire<'a, T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a PipelineError>,
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            Envelope::Success(data) => Wire {
                success: true,
                data: Some(data),
                error: None,
            },
            Envelope::Failure(err) => Wire {
                success: false,
                data: None,
                error: Some(err),
            },
        };
        wire.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_has_only_data() {
        let env: Envelope<u32> = Envelope::Success(7);
        assert!(env.is_success());
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": 7}));
    }

    #[test]
    fn test_failure_envelope_has_only_error() {
        let env: Envelope<u32> = Envelope::Failure(PipelineError::missing_parameter("videoId parameter is required"));
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "error": {"type": "MISSING_PARAMETER", "message": "videoId parameter is required"}
            })
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorKind::MissingParameter.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::ParsingError.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::InvalidParameter.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::TranscriptUnavailable.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::VideoNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::PlaylistNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::ApiKeyError.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorKind::ServerError.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_display_matches_wire_tag() {
        for kind in [ErrorKind::TranscriptUnavailable, ErrorKind::ApiKeyError, ErrorKind::PlaylistNotFound] {
            let wire = serde_json::to_value(kind).unwrap();
            assert_eq!(wire.as_str().unwrap(), kind.to_string());
        }
    }

    #[test]
    fn test_eyre_report_becomes_server_error() {
        let err: PipelineError = eyre::eyre!("connection reset").into();
        assert_eq!(err.kind, ErrorKind::ServerError);
        assert!(err.message.contains("connection reset"));
    }
}
