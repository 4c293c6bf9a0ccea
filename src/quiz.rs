//! Quiz data model and recovery of quiz JSON from model output.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Answer letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
    C,
    D,
}

/// The four option texts, keyed by letter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
    #[serde(rename = "C")]
    pub c: String,
    #[serde(rename = "D")]
    pub d: String,
}

impl Options {
    pub fn get(&self, choice: Choice) -> &str {
        match choice {
            Choice::A => &self.a,
            Choice::B => &self.b,
            Choice::C => &self.c,
            Choice::D => &self.d,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Options,
    pub correct_answer: Choice,
    pub explanation: String,
}

/// Questions in generation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub quiz: Vec<QuizQuestion>,
}

/// Remove a surrounding markdown code fence, if any
fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    }
    if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// From the first `{` to the last `}`
fn brace_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Recover a quiz from model output that may be fenced or wrapped in conversation
pub fn parse_quiz(raw: &str) -> Result<Quiz, PipelineError> {
    let cleaned = strip_fences(raw);
    let quiz = match serde_json::from_str::<Quiz>(cleaned) {
        Ok(quiz) => quiz,
        Err(direct_err) => {
            debug!("Direct quiz parse failed: {direct_err}");
            let span = brace_span(raw).ok_or_else(|| PipelineError::parsing("Could not find valid JSON in response"))?;
            serde_json::from_str::<Quiz>(span).map_err(|e| {
                warn!("Quiz JSON recovery failed: {e}");
                PipelineError::parsing("Could not parse quiz data from response")
            })?
        }
    };

    if quiz.quiz.is_empty() {
        return Err(PipelineError::parsing("Quiz data contained no questions"));
    }
    Ok(quiz)
}
