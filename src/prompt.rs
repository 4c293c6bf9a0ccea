use std::str::FromStr;

use serde::Serialize;

use crate::error::PipelineError;

/// Presentation mode for generated notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum NoteStyle {
    #[default]
    Comprehensive,
    Summary,
    KeyPoints,
    StudyGuide,
}

impl NoteStyle {
    pub const ALL: [NoteStyle; 4] = [
        NoteStyle::Comprehensive,
        NoteStyle::Summary,
        NoteStyle::KeyPoints,
        NoteStyle::StudyGuide,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NoteStyle::Comprehensive => "comprehensive",
            NoteStyle::Summary => "summary",
            NoteStyle::KeyPoints => "key_points",
            NoteStyle::StudyGuide => "study_guide",
        }
    }

    /// Lenient lookup used when picking a template: unknown names get the comprehensive template.
    /// Request validation goes through `FromStr` instead, which rejects them.
    pub fn from_name_or_default(name: &str) -> NoteStyle {
        name.parse().unwrap_or_default()
    }

    fn template(self) -> &'static str {
        match self {
            NoteStyle::Comprehensive => COMPREHENSIVE,
            NoteStyle::Summary => SUMMARY,
            NoteStyle::KeyPoints => KEY_POINTS,
            NoteStyle::StudyGuide => STUDY_GUIDE,
        }
    }
}

impl FromStr for NoteStyle {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NoteStyle::ALL
            .into_iter()
            .find(|style| style.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<_> = NoteStyle::ALL.iter().map(|s| s.as_str()).collect();
                PipelineError::invalid_parameter(format!("Invalid note type. Must be one of: {}", names.join(", ")))
            })
    }
}

impl std::fmt::Display for NoteStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the model is asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Notes(NoteStyle),
    Quiz { questions: u32 },
}

const COMPREHENSIVE: &str = "\
Create comprehensive notes from this video transcript.
Format the notes with clear sections, bullet points, and hierarchical organization.
Include all important concepts, definitions, examples, and relationships.

Structure your response in markdown format with:
- Main topic headings (##)
- Subtopics (###)
- Bullet points for details
- Numbered lists for sequential information
- Bold for important terms
- Include a brief summary at the beginning";

const SUMMARY: &str = "\
Create a concise summary of this video transcript.
Focus on the main ideas and conclusions only.
Keep it brief but comprehensive, capturing the essence of the content.

Format your response in markdown with:
- A title (# Summary)
- 3-5 bullet points of key takeaways
- A 1-2 paragraph summary of the content";

const KEY_POINTS: &str = "\
Extract just the key points from this video transcript.
Focus on facts, statistics, definitions, and essential concepts.

Format your response in markdown as a list of key points with:
- ## Key Points
- Bullet points for each important piece of information
- Bold for terms, numbers, or dates
- Group related points under ### subheadings if appropriate";

const STUDY_GUIDE: &str = "\
Create a study guide from this video transcript.
Format it as a learning resource with sections for:

## Summary (brief overview)
## Key Concepts (definitions and explanations)
## Important Facts (bullet points)
## Relationships (how concepts connect)
## Sample Questions (3-5 questions to test understanding)

Use markdown formatting with appropriate headings, bullet points,
and emphasis for important terms.";

const QUIZ: &str = r#"Based on the following video transcript, create exactly {count} multiple choice questions (MCQs) in English. Each question should have 4 options (A, B, C, D) with only one correct answer.

The questions should:
1. Test understanding of key concepts from the video
2. Be clear and well-structured
3. Have plausible wrong answers (distractors)
4. Cover different parts of the content

IMPORTANT: Respond ONLY with a valid JSON object in this exact format:
{
  "quiz": [
    {
      "question": "Question text here?",
      "options": {
        "A": "Option A text",
        "B": "Option B text",
        "C": "Option C text",
        "D": "Option D text"
      },
      "correct_answer": "A",
      "explanation": "Brief explanation of why this is correct"
    }
  ]
}

Video Transcript:
"#;

/// Compose the full prompt for an artifact around the cleaned transcript text
pub fn build(artifact: Artifact, transcript_text: &str) -> String {
    match artifact {
        Artifact::Notes(style) => format!("{}\n\nVIDEO TRANSCRIPT:\n{transcript_text}", style.template()),
        Artifact::Quiz { questions } => {
            format!("{}{transcript_text}", QUIZ.replace("{count}", &questions.to_string()))
        }
    }
}

/// Notes prompt for a style given by name, falling back to comprehensive for unknown names
pub fn notes_prompt(style_name: &str, transcript_text: &str) -> String {
    build(Artifact::Notes(NoteStyle::from_name_or_default(style_name)), transcript_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_known_styles() {
        assert_eq!("comprehensive".parse::<NoteStyle>().unwrap(), NoteStyle::Comprehensive);
        assert_eq!("summary".parse::<NoteStyle>().unwrap(), NoteStyle::Summary);
        assert_eq!("key_points".parse::<NoteStyle>().unwrap(), NoteStyle::KeyPoints);
        assert_eq!("study_guide".parse::<NoteStyle>().unwrap(), NoteStyle::StudyGuide);
    }

    #[test]
    fn test_parse_unknown_style_rejected() {
        let err = "outline".parse::<NoteStyle>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidParameter);
        assert_eq!(
            err.message,
            "Invalid note type. Must be one of: comprehensive, summary, key_points, study_guide"
        );
    }

    #[test]
    fn test_unknown_style_name_uses_comprehensive_template() {
        assert_eq!(
            notes_prompt("outline", "text"),
            build(Artifact::Notes(NoteStyle::Comprehensive), "text")
        );
        assert_eq!(notes_prompt("summary", "text"), build(Artifact::Notes(NoteStyle::Summary), "text"));
    }

    #[test]
    fn test_notes_prompt_embeds_transcript() {
        let prompt = build(Artifact::Notes(NoteStyle::StudyGuide), "Hello world Goodbye");
        assert!(prompt.starts_with("Create a study guide"));
        assert!(prompt.ends_with("VIDEO TRANSCRIPT:\nHello world Goodbye"));
    }

    #[test]
    fn test_each_style_has_distinct_template() {
        let prompts: Vec<_> = NoteStyle::ALL
            .iter()
            .map(|s| build(Artifact::Notes(*s), "x"))
            .collect();
        for (i, a) in prompts.iter().enumerate() {
            for b in &prompts[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_quiz_prompt_has_count_and_schema() {
        let prompt = build(Artifact::Quiz { questions: 7 }, "Some transcript");
        assert!(prompt.contains("create exactly 7 multiple choice questions"));
        assert!(prompt.contains(r#""correct_answer": "A""#));
        assert!(prompt.ends_with("Video Transcript:\nSome transcript"));
    }
}
