//! Domain types shared across services and routes.
//! Wire types keep the camelCase field names the frontend already speaks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A question/answer study card generated from an upload's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

/// A single multiple-choice quiz question with its answer key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    /// Stable join key assigned at generation time. Submissions that carry it
    /// are matched by id instead of by question text.
    #[serde(default)]
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default = "default_score")]
    pub score: f64,
    #[serde(default)]
    pub explanation: Option<String>,
}

fn default_score() -> f64 {
    1.0
}

impl QuizQuestion {
    /// Score weight used for totals. Non-positive stored values count as 1.
    pub fn weight(&self) -> f64 {
        if self.score > 0.0 {
            self.score
        } else {
            1.0
        }
    }
}

/// An ingested document plus every artifact derived from it.
/// Regenerating an artifact replaces the stored value wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub id: String,
    #[serde(skip_serializing)]
    pub user_id: String,
    pub content: String,
    pub summary: Option<String>,
    pub flashcards: Vec<Flashcard>,
    pub quizzes: Vec<QuizQuestion>,
    pub created_at: DateTime<Utc>,
}

/// One answer submitted by the client for evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

/// Per-question outcome in an evaluation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question: String,
    pub selected_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
    pub score_awarded: f64,
    pub explanation: String,
}

/// Derived quiz score report. Never persisted; safe to recompute for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub total_score: f64,
    pub total_possible_score: f64,
    pub results: Vec<QuestionResult>,
}

/// A registered account. The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A server-side session: opaque access/refresh token pair with expiries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(skip_serializing)]
    pub user_id: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}
