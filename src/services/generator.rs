//! Content generator.
//! Builds the mode-specific prompt, invokes the oracle once, and pipes the
//! output through the parser for the structured modes. The mode is validated
//! before any external call is made.

use std::str::FromStr;

use log::info;

use crate::error::ApiError;
use crate::models::{Flashcard, QuizQuestion};
use crate::services::oracle::OracleClient;
use crate::services::parser;

/// Output-length budget for a single generation call.
const MAX_OUTPUT_TOKENS: u32 = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    Summary,
    Flashcard,
    Quiz,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Summary => "summary",
            GenerationMode::Flashcard => "flashcard",
            GenerationMode::Quiz => "quiz",
        }
    }
}

impl FromStr for GenerationMode {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(GenerationMode::Summary),
            "flashcard" => Ok(GenerationMode::Flashcard),
            "quiz" => Ok(GenerationMode::Quiz),
            other => Err(ApiError::InvalidMode(other.to_string())),
        }
    }
}

/// One generated artifact, matching the requested mode.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedContent {
    Summary(String),
    Flashcards(Vec<Flashcard>),
    Quiz(Vec<QuizQuestion>),
}

/// Builds the instruction prompt for a mode, embedding the source text
/// verbatim. Every prompt forbids fences and extra prose.
pub fn build_prompt(mode: GenerationMode, text: &str) -> String {
    match mode {
        GenerationMode::Summary => format!(
            r#"You are an AI assistant. Summarize the following text in a simple and clear way,
include detailed explanation and examples if needed. Respond ONLY with the summary text,
do NOT include any code fences or extra text.

Text:
{text}"#
        ),
        GenerationMode::Flashcard => format!(
            r#"You are an AI that generates educational flashcards.
Read the text below and create an array of flashcards in JSON format only.
Each flashcard must have exactly two fields:
- "question" (string)
- "answer" (string)

Respond ONLY with a valid JSON array. Do NOT include any Markdown, backticks, explanations, or extra text.

Text:
{text}"#
        ),
        GenerationMode::Quiz => format!(
            r#"You are an AI that generates quiz questions.
Read the text below and create an array of quiz objects in JSON format only.
Each quiz object must have the following fields:
- "question" (string)
- "options" (array of 4 strings)
- "correctAnswer" (string)
- "score" (number, default 1)
- "explanation" (string that explains why the correct answer is correct)

Respond ONLY with a valid JSON array. Do NOT include any Markdown, backticks, explanations, or extra text.

Text:
{text}"#
        ),
    }
}

pub struct ContentGenerator {
    oracle: OracleClient,
}

impl ContentGenerator {
    pub fn new(oracle: OracleClient) -> Self {
        Self { oracle }
    }

    /// Produces one artifact from source text. Oracle failures propagate to
    /// the caller untouched; malformed oracle output degrades to an empty
    /// artifact list via the parser.
    pub async fn generate(
        &self,
        text: &str,
        mode: GenerationMode,
    ) -> Result<GeneratedContent, ApiError> {
        let prompt = build_prompt(mode, text);
        let output = self.oracle.complete(&prompt, MAX_OUTPUT_TOKENS).await?;

        let content = match mode {
            GenerationMode::Summary => GeneratedContent::Summary(output),
            GenerationMode::Flashcard => {
                let cards = parser::parse_flashcards(&output);
                info!("generated {} flashcards", cards.len());
                GeneratedContent::Flashcards(cards)
            }
            GenerationMode::Quiz => {
                let quiz = parser::parse_quiz_questions(&output);
                info!("generated {} quiz questions", quiz.len());
                GeneratedContent::Quiz(quiz)
            }
        };

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trip() {
        for mode in [
            GenerationMode::Summary,
            GenerationMode::Flashcard,
            GenerationMode::Quiz,
        ] {
            assert_eq!(mode.as_str().parse::<GenerationMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let err = "essay".parse::<GenerationMode>().unwrap_err();
        assert!(matches!(err, ApiError::InvalidMode(m) if m == "essay"));
    }

    #[test]
    fn test_prompts_embed_source_text() {
        let text = "Photosynthesis converts light into chemical energy.";
        for mode in [
            GenerationMode::Summary,
            GenerationMode::Flashcard,
            GenerationMode::Quiz,
        ] {
            let prompt = build_prompt(mode, text);
            assert!(prompt.contains(text));
            assert!(prompt.contains("do NOT include") || prompt.contains("Do NOT include"));
        }
    }

    #[test]
    fn test_quiz_prompt_states_the_schema() {
        let prompt = build_prompt(GenerationMode::Quiz, "x");
        assert!(prompt.contains("array of 4 strings"));
        assert!(prompt.contains("correctAnswer"));
        assert!(prompt.contains(r#""score" (number, default 1)"#));
        assert!(prompt.contains("explanation"));
    }
}
