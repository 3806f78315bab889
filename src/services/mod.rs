// Service modules
// Core business logic: AI generation, parsing, scoring, extraction, storage.

pub mod database;
pub mod evaluator;
pub mod extract;
pub mod generator;
pub mod oracle;
pub mod parser;

pub use database::DatabaseService;
pub use evaluator::evaluate;
pub use extract::{extract_text, guess_mime_type};
pub use generator::{build_prompt, ContentGenerator, GeneratedContent, GenerationMode};
pub use oracle::{OracleClient, OracleError};
pub use parser::{parse_flashcards, parse_quiz_questions, parse_raw};
