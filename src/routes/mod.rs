//! HTTP surface.
//! Thin axum handlers: authenticate, load, call the service, persist,
//! respond. The JSON shapes mirror what the frontend already consumes.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::info;
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::models::{AnswerSubmission, Session, Upload, User};
use crate::services::generator::{ContentGenerator, GeneratedContent, GenerationMode};
use crate::auth;
use crate::services::{evaluator, extract, DatabaseService};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseService>,
    pub generator: Arc<ContentGenerator>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/upload", post(upload))
        .route("/uploads", get(list_uploads))
        .route("/summary", post(summary))
        .route("/flashcard", post(flashcard))
        .route("/quiz", post(quiz))
        .route("/evaluate", post(evaluate))
        .with_state(state)
}

pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

/// Resolves the Bearer access token to its user.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let session = state.db.find_session(token)?.ok_or(ApiError::Unauthorized)?;
    state.db.find_user(&session.user_id)?.ok_or(ApiError::Unauthorized)
}

fn session_json(session: &Session) -> serde_json::Value {
    json!({
        "accessToken": session.access_token,
        "refreshToken": session.refresh_token,
        "accessExpiresAt": session.access_expires_at,
        "refreshExpiresAt": session.refresh_expires_at,
    })
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ==================== auth ====================

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.name.is_empty() || body.email.is_empty() || body.password.is_empty() {
        return Err(ApiError::InvalidInput("all fields are required".into()));
    }
    if state.db.find_user_by_email(&body.email)?.is_some() {
        return Err(ApiError::DuplicateEmail);
    }

    let hash = auth::hash_password(&body.password);
    let user = state.db.create_user(&body.name, &body.email, &hash)?;
    let session = state.db.create_session(&user.id)?;
    info!("registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": user,
            "session": session_json(&session),
        })),
    ))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.email.is_empty() || body.password.is_empty() {
        return Err(ApiError::InvalidInput(
            "email and password are required".into(),
        ));
    }

    let user = state
        .db
        .find_user_by_email(&body.email)?
        .ok_or(ApiError::NotFound("user"))?;
    if !auth::verify_password(&body.password, &user.password_hash) {
        return Err(ApiError::WrongPassword);
    }

    let session = state.db.create_session(&user.id)?;
    Ok(Json(json!({
        "message": "Login successful",
        "user": user,
        "session": session_json(&session),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: String,
}

async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.refresh_token.is_empty() {
        return Err(ApiError::InvalidInput("refreshToken is required".into()));
    }

    let session = state
        .db
        .refresh_session(&body.refresh_token)?
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(json!({
        "message": "Access token refreshed successfully",
        "session": session_json(&session),
    })))
}

// ==================== uploads ====================

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = authenticate(&state, &headers)?;

    let mut extracted: Option<String> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let mime = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| extract::guess_mime_type(&filename).to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidInput(format!("failed to read file: {e}")))?;

        extracted = Some(extract::extract_text(&data, &mime, &filename)?);
        break;
    }

    let text = extracted.ok_or_else(|| ApiError::InvalidInput("no file uploaded".into()))?;
    let upload = state.db.insert_upload(&user.id, &text)?;
    info!("user {} uploaded document {}", user.id, upload.id);

    Ok(Json(json!({
        "message": "File uploaded and text extracted successfully",
        "uploadId": upload.id,
        "extractedText": upload.content,
    })))
}

fn upload_listing(upload: &Upload) -> serde_json::Value {
    const PREVIEW_LEN: usize = 200;
    let mut cut = upload.content.len().min(PREVIEW_LEN);
    while !upload.content.is_char_boundary(cut) {
        cut -= 1;
    }
    json!({
        "uploadId": upload.id,
        "createdAt": upload.created_at,
        "preview": &upload.content[..cut],
        "hasSummary": upload.summary.is_some(),
        "flashcardCount": upload.flashcards.len(),
        "quizCount": upload.quizzes.len(),
    })
}

async fn list_uploads(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    let uploads = state.db.list_uploads(&user.id)?;
    let listings: Vec<_> = uploads.iter().map(upload_listing).collect();
    Ok(Json(json!({ "uploads": listings })))
}

// ==================== generation ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(default)]
    upload_id: String,
}

/// Shared body for the three generation endpoints: load the upload, run the
/// generator with the mode's kind, persist the replacement artifact.
async fn generate_for_upload(
    state: &AppState,
    headers: &HeaderMap,
    upload_id: &str,
    mode: GenerationMode,
) -> Result<(Upload, GeneratedContent), ApiError> {
    let user = authenticate(state, headers)?;
    if upload_id.is_empty() {
        return Err(ApiError::InvalidInput("uploadId is required".into()));
    }
    let upload = state
        .db
        .find_upload(&user.id, upload_id)?
        .ok_or(ApiError::NotFound("upload"))?;

    let content = state.generator.generate(&upload.content, mode).await?;

    match &content {
        GeneratedContent::Summary(text) => {
            state.db.set_summary(&user.id, &upload.id, text)?;
        }
        GeneratedContent::Flashcards(cards) => {
            state.db.set_flashcards(&user.id, &upload.id, cards)?;
        }
        GeneratedContent::Quiz(questions) => {
            state.db.set_quizzes(&user.id, &upload.id, questions)?;
        }
    }
    info!("generated {} for upload {}", mode.as_str(), upload.id);

    Ok((upload, content))
}

async fn summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (upload, content) =
        generate_for_upload(&state, &headers, &body.upload_id, GenerationMode::Summary).await?;
    let GeneratedContent::Summary(text) = content else {
        return Err(ApiError::Internal("generator returned wrong kind".into()));
    };
    Ok(Json(json!({
        "message": "Summary generated successfully",
        "summary": text,
        "uploadId": upload.id,
    })))
}

async fn flashcard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (upload, content) =
        generate_for_upload(&state, &headers, &body.upload_id, GenerationMode::Flashcard).await?;
    let GeneratedContent::Flashcards(cards) = content else {
        return Err(ApiError::Internal("generator returned wrong kind".into()));
    };
    Ok(Json(json!({
        "message": "Flashcards generated successfully",
        "flashcards": cards,
        "uploadId": upload.id,
    })))
}

async fn quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (upload, content) =
        generate_for_upload(&state, &headers, &body.upload_id, GenerationMode::Quiz).await?;
    let GeneratedContent::Quiz(questions) = content else {
        return Err(ApiError::Internal("generator returned wrong kind".into()));
    };
    Ok(Json(json!({
        "message": "Quiz generated successfully",
        "quizzes": questions,
        "uploadId": upload.id,
    })))
}

// ==================== evaluation ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateRequest {
    #[serde(default)]
    upload_id: String,
    answers: Option<Vec<AnswerSubmission>>,
}

async fn evaluate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<EvaluateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = authenticate(&state, &headers)?;
    if body.upload_id.is_empty() {
        return Err(ApiError::InvalidInput("uploadId is required".into()));
    }
    let answers = body
        .answers
        .ok_or_else(|| ApiError::InvalidInput("answers must be an array".into()))?;

    let upload = state
        .db
        .find_upload(&user.id, &body.upload_id)?
        .ok_or(ApiError::NotFound("upload"))?;

    let report = evaluator::evaluate(&upload.quizzes, &answers)?;
    Ok(Json(json!({
        "message": "Quiz evaluated successfully",
        "totalScore": report.total_score,
        "totalPossibleScore": report.total_possible_score,
        "results": report.results,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::AppConfig;
    use crate::services::OracleClient;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(DatabaseService::new(&dir.path().join("test.db")).unwrap());
        let config = AppConfig::for_tests();
        let generator = Arc::new(ContentGenerator::new(OracleClient::new(&config)));
        (AppState { db, generator }, dir)
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        headers
    }

    #[test]
    fn test_authenticate_accepts_valid_session() {
        let (state, _dir) = test_state();
        let user = state.db.create_user("Ada", "ada@example.com", "x").unwrap();
        let session = state.db.create_session(&user.id).unwrap();

        let resolved = authenticate(&state, &bearer(&session.access_token)).unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[test]
    fn test_authenticate_rejects_missing_and_bogus_tokens() {
        let (state, _dir) = test_state();
        assert!(matches!(
            authenticate(&state, &HeaderMap::new()).unwrap_err(),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            authenticate(&state, &bearer("bogus")).unwrap_err(),
            ApiError::Unauthorized
        ));
    }

    #[tokio::test]
    async fn test_evaluate_end_to_end_without_oracle() {
        use crate::models::QuizQuestion;

        let (state, _dir) = test_state();
        let user = state.db.create_user("Ada", "ada@example.com", "x").unwrap();
        let session = state.db.create_session(&user.id).unwrap();
        let stored = state.db.insert_upload(&user.id, "notes").unwrap();
        state
            .db
            .set_quizzes(
                &user.id,
                &stored.id,
                &[QuizQuestion {
                    id: "id-1".into(),
                    question: "Q1".into(),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_answer: "b".into(),
                    score: 2.0,
                    explanation: None,
                }],
            )
            .unwrap();

        let body = EvaluateRequest {
            upload_id: stored.id.clone(),
            answers: Some(vec![AnswerSubmission {
                question_id: Some("id-1".into()),
                question: None,
                answer: Some("b".into()),
            }]),
        };
        let Json(response) = evaluate(
            State(state),
            bearer(&session.access_token),
            Json(body),
        )
        .await
        .unwrap();

        assert_eq!(response["totalScore"], 2.0);
        assert_eq!(response["totalPossibleScore"], 2.0);
        assert_eq!(response["results"][0]["isCorrect"], true);
    }

    #[tokio::test]
    async fn test_evaluate_requires_answers_array() {
        let (state, _dir) = test_state();
        let user = state.db.create_user("Ada", "ada@example.com", "x").unwrap();
        let session = state.db.create_session(&user.id).unwrap();
        let stored = state.db.insert_upload(&user.id, "notes").unwrap();

        let body = EvaluateRequest {
            upload_id: stored.id,
            answers: None,
        };
        let err = evaluate(State(state), bearer(&session.access_token), Json(body))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_evaluate_with_no_stored_quiz_is_rejected() {
        let (state, _dir) = test_state();
        let user = state.db.create_user("Ada", "ada@example.com", "x").unwrap();
        let session = state.db.create_session(&user.id).unwrap();
        let stored = state.db.insert_upload(&user.id, "notes").unwrap();

        let body = EvaluateRequest {
            upload_id: stored.id,
            answers: Some(vec![]),
        };
        let err = evaluate(State(state), bearer(&session.access_token), Json(body))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NoQuiz));
    }

    #[test]
    fn test_upload_listing_preview_is_bounded() {
        let upload = Upload {
            id: "u1".into(),
            user_id: "x".into(),
            content: "é".repeat(500),
            summary: None,
            flashcards: vec![],
            quizzes: vec![],
            created_at: chrono::Utc::now(),
        };
        let listing = upload_listing(&upload);
        let preview = listing["preview"].as_str().unwrap();
        assert!(preview.len() <= 200);
        assert!(preview.chars().all(|c| c == 'é'));
    }
}
