//! AI response parser.
//! Turns the oracle's free-form text into typed artifact records. Two stages:
//! lenient extraction (strip fences, find the bracketed span) then strict
//! decode and per-element validation. Malformed output degrades to an empty
//! result; it never fails the request.

use std::sync::OnceLock;

use log::warn;
use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

use crate::models::{Flashcard, QuizQuestion};

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```(?:json)?").unwrap())
}

/// Stage 1a: drop markdown code-fence markers the oracle emits despite the
/// prompt forbidding them.
fn strip_code_fences(raw: &str) -> String {
    fence_regex().replace_all(raw, "").trim().to_string()
}

/// Stage 1b: maximal span from the first `[` to the last `]`.
fn extract_array_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Stage 2: strict decode. Failures are logged and yield an empty batch.
fn decode_array(span: &str) -> Vec<Value> {
    match serde_json::from_str::<Vec<Value>>(span) {
        Ok(values) => values,
        Err(err) => {
            warn!("failed to decode AI JSON array: {}", err);
            Vec::new()
        }
    }
}

/// Unfiltered extraction, for callers that validate elements themselves.
pub fn parse_raw(raw: &str) -> Vec<Value> {
    let cleaned = strip_code_fences(raw);
    match extract_array_span(&cleaned) {
        Some(span) => decode_array(span),
        None => Vec::new(),
    }
}

/// Flashcards: every element with a non-empty question and answer survives;
/// the rest are dropped silently.
pub fn parse_flashcards(raw: &str) -> Vec<Flashcard> {
    parse_raw(raw)
        .iter()
        .filter_map(flashcard_from_value)
        .collect()
}

/// Quiz questions: elements need `question`, `options` and `correctAnswer`.
/// Each kept question gets a fresh id and a positive score (falsy values
/// default to 1).
pub fn parse_quiz_questions(raw: &str) -> Vec<QuizQuestion> {
    parse_raw(raw)
        .iter()
        .filter_map(quiz_question_from_value)
        .collect()
}

fn flashcard_from_value(value: &Value) -> Option<Flashcard> {
    let question = non_empty_string(value.get("question"))?;
    let answer = non_empty_string(value.get("answer"))?;
    Some(Flashcard { question, answer })
}

fn quiz_question_from_value(value: &Value) -> Option<QuizQuestion> {
    let question = non_empty_string(value.get("question"))?;
    let options = value
        .get("options")?
        .as_array()?
        .iter()
        .filter_map(|o| o.as_str())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if options.is_empty() {
        return None;
    }
    // correctAnswer is not checked against the options list.
    let correct_answer = non_empty_string(value.get("correctAnswer"))?;
    let explanation = value
        .get("explanation")
        .and_then(|e| e.as_str())
        .map(str::to_string);

    Some(QuizQuestion {
        id: Uuid::new_v4().to_string(),
        question,
        options,
        correct_answer,
        score: normalize_score(value.get("score")),
        explanation,
    })
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    let text = value?.as_str()?;
    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}

/// `score || 1` semantics: absent, non-numeric, zero and negative all
/// default to 1.
fn normalize_score(value: Option<&Value>) -> f64 {
    match value.and_then(Value::as_f64) {
        Some(score) if score > 0.0 => score,
        _ => 1.0,
    }
}
