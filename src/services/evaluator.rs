//! Quiz evaluator.
//! Pure scoring of submitted answers against a stored quiz's answer key.
//! Deterministic over its two inputs; safe to re-run for audit.

use crate::error::ApiError;
use crate::models::{AnswerSubmission, EvaluationResult, QuestionResult, QuizQuestion};

const NO_EXPLANATION: &str = "No explanation provided";

/// Scores `answers` against `quiz`, preserving the quiz's question order.
///
/// Submissions are matched by question id when they carry one, otherwise by
/// exact question text. A question with no matching submission counts as
/// unanswered and is never correct. Submissions for unknown questions are
/// ignored.
pub fn evaluate(
    quiz: &[QuizQuestion],
    answers: &[AnswerSubmission],
) -> Result<EvaluationResult, ApiError> {
    if quiz.is_empty() {
        return Err(ApiError::NoQuiz);
    }

    let mut total_score = 0.0;
    let mut total_possible_score = 0.0;
    let mut results = Vec::with_capacity(quiz.len());

    for question in quiz {
        let weight = question.weight();
        total_possible_score += weight;

        let selected_answer = find_submission(question, answers)
            .and_then(|submission| submission.answer.clone());

        // Exact, case-sensitive equality; unanswered is never correct.
        let is_correct = selected_answer.as_deref() == Some(question.correct_answer.as_str());
        let score_awarded = if is_correct { weight } else { 0.0 };
        total_score += score_awarded;

        results.push(QuestionResult {
            question: question.question.clone(),
            selected_answer,
            correct_answer: question.correct_answer.clone(),
            is_correct,
            score_awarded,
            explanation: question
                .explanation
                .clone()
                .unwrap_or_else(|| NO_EXPLANATION.to_string()),
        });
    }

    Ok(EvaluationResult {
        total_score,
        total_possible_score,
        results,
    })
}

/// Id match first; text match only for submissions without an id, so a
/// mis-keyed id can never silently fall through to a text match.
fn find_submission<'a>(
    question: &QuizQuestion,
    answers: &'a [AnswerSubmission],
) -> Option<&'a AnswerSubmission> {
    answers
        .iter()
        .find(|a| a.question_id.as_deref() == Some(question.id.as_str()) && !question.id.is_empty())
        .or_else(|| {
            answers.iter().find(|a| {
                a.question_id.is_none()
                    && a.question.as_deref() == Some(question.question.as_str())
            })
        })
}
