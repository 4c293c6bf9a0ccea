use std::sync::Arc;

use log::info;
use serde::Serialize;

use crate::error::{Envelope, PipelineError};
use crate::llm::TextGenerator;
use crate::normalize;
use crate::prompt::{self, Artifact, NoteStyle};
use crate::quiz::{self, Quiz};
use crate::youtube::TranscriptFetcher;
use crate::VideoId;

pub const DEFAULT_QUESTIONS: i64 = 4;
const PREVIEW_CHARS: usize = 200;

/// Size and preview of the transcript an artifact was generated from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptSummary {
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<usize>,
    pub sample: String,
}

impl TranscriptSummary {
    fn of(text: &str, segments: Option<usize>) -> Self {
        let length = text.chars().count();
        let sample = if length > PREVIEW_CHARS {
            format!("{}...", text.chars().take(PREVIEW_CHARS).collect::<String>())
        } else {
            text.to_string()
        };
        Self {
            length,
            segments,
            sample,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotesData {
    pub notes: String,
    pub note_type: NoteStyle,
    pub transcript_summary: TranscriptSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizData {
    pub quiz: Quiz,
    pub transcript_summary: TranscriptSummary,
}

/// Runs resolve → fetch → normalize → prompt → generate → parse for one request
#[derive(Clone)]
pub struct Pipeline {
    fetcher: TranscriptFetcher,
    generator: Arc<dyn TextGenerator>,
}

impl Pipeline {
    pub fn new(fetcher: TranscriptFetcher, generator: Arc<dyn TextGenerator>) -> Self {
        Self { fetcher, generator }
    }

    pub async fn generate_notes(&self, video: &str, style: NoteStyle) -> Envelope<NotesData> {
        self.notes(video, style).await.into()
    }

    pub async fn generate_quiz(&self, video: &str, questions: i64) -> Envelope<QuizData> {
        self.quiz(video, questions).await.into()
    }

    async fn notes(&self, video: &str, style: NoteStyle) -> Result<NotesData, PipelineError> {
        let video_id = VideoId::resolve(video)?;
        let transcript = self.fetcher.fetch(&video_id).await?;
        let clean_text = normalize::clean_formatted(&transcript.formatted_text());

        info!("Generating {style} notes for {video_id}");
        let prompt = prompt::build(Artifact::Notes(style), &clean_text);
        let notes = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| e.into_pipeline("notes"))?;

        Ok(NotesData {
            notes,
            note_type: style,
            transcript_summary: TranscriptSummary::of(&clean_text, None),
        })
    }

    async fn quiz(&self, video: &str, questions: i64) -> Result<QuizData, PipelineError> {
        let questions = u32::try_from(questions)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| PipelineError::invalid_parameter("questions must be a positive integer"))?;

        let video_id = VideoId::resolve(video)?;
        let transcript = self.fetcher.fetch(&video_id).await?;
        let formatted = transcript.formatted_text();
        let clean_text = normalize::clean_formatted(&formatted);

        info!("Generating {questions}-question quiz for {video_id}");
        let prompt = prompt::build(Artifact::Quiz { questions }, &clean_text);
        let raw = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| e.into_pipeline("quiz"))?;
        let quiz = quiz::parse_quiz(&raw)?;

        if quiz.quiz.len() != questions as usize {
            info!("Requested {questions} questions, model returned {}", quiz.quiz.len());
        }

        Ok(QuizData {
            quiz,
            transcript_summary: TranscriptSummary::of(&formatted, Some(transcript.segments.len())),
        })
    }
}
