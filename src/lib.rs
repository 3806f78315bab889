//! StudyDeck: an AI study-aid web service.
//! Users upload documents; the service extracts text, generates summaries,
//! flashcards and quizzes through an AI oracle, and scores quiz answers.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

pub use config::AppConfig;
pub use error::ApiError;
pub use routes::AppState;
