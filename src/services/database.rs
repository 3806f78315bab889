//! SQLite persistence for users, sessions and uploads.
//! Artifact sequences (flashcards, quizzes) live as JSON text columns; each
//! regeneration replaces the stored value wholesale. Concurrent regeneration
//! of the same upload is last-write-wins.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, Row};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::auth;
use crate::error::ApiError;
use crate::models::{Flashcard, QuizQuestion, Session, Upload, User};

pub struct DatabaseService {
    pool: Arc<Mutex<Connection>>,
}

impl DatabaseService {
    pub fn new(db_path: &Path) -> Result<Self, ApiError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| ApiError::Internal(format!("failed to create data dir: {e}")))?;
            }
        }

        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;

        let service = Self {
            pool: Arc::new(Mutex::new(conn)),
        };
        service.initialize()?;
        Ok(service)
    }

    fn initialize(&self) -> Result<(), ApiError> {
        let conn = self.pool.lock().unwrap();

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                access_token TEXT PRIMARY KEY,
                refresh_token TEXT NOT NULL UNIQUE,
                user_id TEXT NOT NULL,
                access_expires_at TEXT NOT NULL,
                refresh_expires_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);

            CREATE TABLE IF NOT EXISTS uploads (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                content TEXT NOT NULL,
                summary TEXT,
                flashcards TEXT NOT NULL DEFAULT '[]',
                quizzes TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_uploads_user ON uploads(user_id);
        ",
        )?;

        Ok(())
    }

    // ==================== users ====================

    pub fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, ApiError> {
        let conn = self.pool.lock().unwrap();
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                user.id,
                user.name,
                user.email,
                user.password_hash,
                user.created_at.to_rfc3339(),
            ],
        )?;

        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let conn = self.pool.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?1",
        )?;
        let mut rows = stmt.query(rusqlite::params![email])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_user(row)?)),
            None => Ok(None),
        }
    }

    pub fn find_user(&self, id: &str) -> Result<Option<User>, ApiError> {
        let conn = self.pool.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE id = ?1",
        )?;
        let mut rows = stmt.query(rusqlite::params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_user(row)?)),
            None => Ok(None),
        }
    }

    // ==================== sessions ====================

    pub fn create_session(&self, user_id: &str) -> Result<Session, ApiError> {
        let now = Utc::now();
        let session = Session {
            access_token: auth::generate_token(),
            refresh_token: auth::generate_token(),
            user_id: user_id.to_string(),
            access_expires_at: now + auth::access_token_ttl(),
            refresh_expires_at: now + auth::refresh_token_ttl(),
        };

        let conn = self.pool.lock().unwrap();
        conn.execute(
            "INSERT INTO sessions
             (access_token, refresh_token, user_id, access_expires_at, refresh_expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                session.access_token,
                session.refresh_token,
                session.user_id,
                session.access_expires_at.to_rfc3339(),
                session.refresh_expires_at.to_rfc3339(),
            ],
        )?;

        Ok(session)
    }

    /// Resolves an access token to its session, treating an expired access
    /// token as absent.
    pub fn find_session(&self, access_token: &str) -> Result<Option<Session>, ApiError> {
        let conn = self.pool.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT access_token, refresh_token, user_id, access_expires_at, refresh_expires_at
             FROM sessions WHERE access_token = ?1",
        )?;
        let mut rows = stmt.query(rusqlite::params![access_token])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let session = row_to_session(row)?;
        if session.access_expires_at <= Utc::now() {
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Rotates the full token pair; the old session row is removed. Returns
    /// None for unknown or expired refresh tokens.
    pub fn refresh_session(&self, refresh_token: &str) -> Result<Option<Session>, ApiError> {
        let old = {
            let conn = self.pool.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT access_token, refresh_token, user_id, access_expires_at, refresh_expires_at
                 FROM sessions WHERE refresh_token = ?1",
            )?;
            let mut rows = stmt.query(rusqlite::params![refresh_token])?;
            match rows.next()? {
                Some(row) => row_to_session(row)?,
                None => return Ok(None),
            }
        };

        if old.refresh_expires_at <= Utc::now() {
            return Ok(None);
        }

        {
            let conn = self.pool.lock().unwrap();
            conn.execute(
                "DELETE FROM sessions WHERE refresh_token = ?1",
                rusqlite::params![refresh_token],
            )?;
        }

        Ok(Some(self.create_session(&old.user_id)?))
    }

    /// Startup housekeeping: drop sessions whose refresh window closed.
    pub fn delete_expired_sessions(&self) -> Result<usize, ApiError> {
        let conn = self.pool.lock().unwrap();
        let removed = conn.execute(
            "DELETE FROM sessions WHERE refresh_expires_at <= ?1",
            rusqlite::params![Utc::now().to_rfc3339()],
        )?;
        Ok(removed)
    }

    // ==================== uploads ====================

    pub fn insert_upload(&self, user_id: &str, content: &str) -> Result<Upload, ApiError> {
        let upload = Upload {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            summary: None,
            flashcards: Vec::new(),
            quizzes: Vec::new(),
            created_at: Utc::now(),
        };

        let conn = self.pool.lock().unwrap();
        conn.execute(
            "INSERT INTO uploads (id, user_id, content, summary, flashcards, quizzes, created_at)
             VALUES (?1, ?2, ?3, NULL, '[]', '[]', ?4)",
            rusqlite::params![
                upload.id,
                upload.user_id,
                upload.content,
                upload.created_at.to_rfc3339(),
            ],
        )?;

        Ok(upload)
    }

    /// Ownership is part of the key: another user's upload id is NotFound,
    /// not forbidden, so ids are not probeable.
    pub fn find_upload(&self, user_id: &str, upload_id: &str) -> Result<Option<Upload>, ApiError> {
        let conn = self.pool.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, content, summary, flashcards, quizzes, created_at
             FROM uploads WHERE id = ?1 AND user_id = ?2",
        )?;
        let mut rows = stmt.query(rusqlite::params![upload_id, user_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_upload(row)?)),
            None => Ok(None),
        }
    }

    pub fn list_uploads(&self, user_id: &str) -> Result<Vec<Upload>, ApiError> {
        let conn = self.pool.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, content, summary, flashcards, quizzes, created_at
             FROM uploads WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(rusqlite::params![user_id], |row| row_to_upload(row))?;

        let mut uploads = Vec::new();
        for row in rows {
            uploads.push(row?);
        }
        Ok(uploads)
    }

    pub fn set_summary(
        &self,
        user_id: &str,
        upload_id: &str,
        summary: &str,
    ) -> Result<(), ApiError> {
        let conn = self.pool.lock().unwrap();
        let changed = conn.execute(
            "UPDATE uploads SET summary = ?1 WHERE id = ?2 AND user_id = ?3",
            rusqlite::params![summary, upload_id, user_id],
        )?;
        if changed == 0 {
            return Err(ApiError::NotFound("upload"));
        }
        Ok(())
    }

    pub fn set_flashcards(
        &self,
        user_id: &str,
        upload_id: &str,
        flashcards: &[Flashcard],
    ) -> Result<(), ApiError> {
        let json = serde_json::to_string(flashcards)?;
        let conn = self.pool.lock().unwrap();
        let changed = conn.execute(
            "UPDATE uploads SET flashcards = ?1 WHERE id = ?2 AND user_id = ?3",
            rusqlite::params![json, upload_id, user_id],
        )?;
        if changed == 0 {
            return Err(ApiError::NotFound("upload"));
        }
        Ok(())
    }

    pub fn set_quizzes(
        &self,
        user_id: &str,
        upload_id: &str,
        quizzes: &[QuizQuestion],
    ) -> Result<(), ApiError> {
        let json = serde_json::to_string(quizzes)?;
        let conn = self.pool.lock().unwrap();
        let changed = conn.execute(
            "UPDATE uploads SET quizzes = ?1 WHERE id = ?2 AND user_id = ?3",
            rusqlite::params![json, upload_id, user_id],
        )?;
        if changed == 0 {
            return Err(ApiError::NotFound("upload"));
        }
        Ok(())
    }
}

// ==================== row mapping ====================

fn row_to_user(row: &Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: timestamp_col(row, 4)?,
    })
}

fn row_to_session(row: &Row) -> Result<Session, rusqlite::Error> {
    Ok(Session {
        access_token: row.get(0)?,
        refresh_token: row.get(1)?,
        user_id: row.get(2)?,
        access_expires_at: timestamp_col(row, 3)?,
        refresh_expires_at: timestamp_col(row, 4)?,
    })
}

fn row_to_upload(row: &Row) -> Result<Upload, rusqlite::Error> {
    Ok(Upload {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        summary: row.get(3)?,
        flashcards: json_col(row, 4)?,
        quizzes: json_col(row, 5)?,
        created_at: timestamp_col(row, 6)?,
    })
}

fn timestamp_col(row: &Row, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    raw.parse::<DateTime<Utc>>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn json_col<T: DeserializeOwned>(row: &Row, idx: usize) -> Result<T, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    fn test_db() -> (DatabaseService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = DatabaseService::new(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    /// Inserts a session row with chosen expiries, bypassing the TTLs that
    /// `create_session` applies.
    fn plant_session(
        db: &DatabaseService,
        user_id: &str,
        access_expires_at: DateTime<Utc>,
        refresh_expires_at: DateTime<Utc>,
    ) -> Session {
        let session = Session {
            access_token: auth::generate_token(),
            refresh_token: auth::generate_token(),
            user_id: user_id.to_string(),
            access_expires_at,
            refresh_expires_at,
        };
        let conn = db.pool.lock().unwrap();
        conn.execute(
            "INSERT INTO sessions
             (access_token, refresh_token, user_id, access_expires_at, refresh_expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                session.access_token,
                session.refresh_token,
                session.user_id,
                session.access_expires_at.to_rfc3339(),
                session.refresh_expires_at.to_rfc3339(),
            ],
        )
        .unwrap();
        session
    }

    fn sample_quiz() -> Vec<QuizQuestion> {
        vec![QuizQuestion {
            id: "id-1".into(),
            question: "Q1".into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: "b".into(),
            score: 2.0,
            explanation: Some("because".into()),
        }]
    }

    #[test]
    fn test_user_round_trip() {
        let (db, _dir) = test_db();
        let created = db.create_user("Ada", "ada@example.com", "salt$hash").unwrap();

        let by_email = db.find_user_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        let by_id = db.find_user(&created.id).unwrap().unwrap();
        assert_eq!(by_id.email, "ada@example.com");

        assert!(db.find_user_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_is_a_constraint_error() {
        let (db, _dir) = test_db();
        db.create_user("Ada", "ada@example.com", "x").unwrap();
        assert!(db.create_user("Eve", "ada@example.com", "y").is_err());
    }

    #[test]
    fn test_session_lifecycle() {
        let (db, _dir) = test_db();
        let user = db.create_user("Ada", "ada@example.com", "x").unwrap();
        let session = db.create_session(&user.id).unwrap();

        let found = db.find_session(&session.access_token).unwrap().unwrap();
        assert_eq!(found.user_id, user.id);
        assert!(db.find_session("bogus-token").unwrap().is_none());

        let rotated = db.refresh_session(&session.refresh_token).unwrap().unwrap();
        assert_eq!(rotated.user_id, user.id);
        assert_ne!(rotated.access_token, session.access_token);
        // Old pair is gone after rotation.
        assert!(db.find_session(&session.access_token).unwrap().is_none());
        assert!(db.refresh_session(&session.refresh_token).unwrap().is_none());
    }

    #[test]
    fn test_fully_expired_session_is_absent_and_reaped() {
        let (db, _dir) = test_db();
        let user = db.create_user("Ada", "ada@example.com", "x").unwrap();
        let past = Utc::now() - Duration::hours(2);
        let expired = plant_session(&db, &user.id, past, past);

        assert!(db.find_session(&expired.access_token).unwrap().is_none());
        assert!(db.refresh_session(&expired.refresh_token).unwrap().is_none());

        assert_eq!(db.delete_expired_sessions().unwrap(), 1);
        assert_eq!(db.delete_expired_sessions().unwrap(), 0);
    }

    #[test]
    fn test_expired_access_token_can_still_refresh() {
        let (db, _dir) = test_db();
        let user = db.create_user("Ada", "ada@example.com", "x").unwrap();
        let session = plant_session(
            &db,
            &user.id,
            Utc::now() - Duration::hours(2),
            Utc::now() + Duration::days(1),
        );

        // Access window closed, refresh window open.
        assert!(db.find_session(&session.access_token).unwrap().is_none());
        assert_eq!(db.delete_expired_sessions().unwrap(), 0);

        let rotated = db.refresh_session(&session.refresh_token).unwrap().unwrap();
        assert_eq!(rotated.user_id, user.id);
        assert!(db.find_session(&rotated.access_token).unwrap().is_some());
    }

    #[test]
    fn test_upload_round_trip_and_ownership() {
        let (db, _dir) = test_db();
        let ada = db.create_user("Ada", "ada@example.com", "x").unwrap();
        let eve = db.create_user("Eve", "eve@example.com", "y").unwrap();
        let upload = db.insert_upload(&ada.id, "cell biology notes").unwrap();

        let found = db.find_upload(&ada.id, &upload.id).unwrap().unwrap();
        assert_eq!(found.content, "cell biology notes");
        assert_eq!(found.summary, None);
        assert!(found.flashcards.is_empty());
        assert!(found.quizzes.is_empty());

        // Another user cannot see it.
        assert!(db.find_upload(&eve.id, &upload.id).unwrap().is_none());
    }

    #[test]
    fn test_regeneration_replaces_artifacts() {
        let (db, _dir) = test_db();
        let user = db.create_user("Ada", "ada@example.com", "x").unwrap();
        let upload = db.insert_upload(&user.id, "notes").unwrap();

        let first = vec![Flashcard {
            question: "Q1".into(),
            answer: "A1".into(),
        }];
        let second = vec![Flashcard {
            question: "Q2".into(),
            answer: "A2".into(),
        }];
        db.set_flashcards(&user.id, &upload.id, &first).unwrap();
        db.set_flashcards(&user.id, &upload.id, &second).unwrap();

        let stored = db.find_upload(&user.id, &upload.id).unwrap().unwrap();
        assert_eq!(stored.flashcards, second);

        db.set_quizzes(&user.id, &upload.id, &sample_quiz()).unwrap();
        db.set_summary(&user.id, &upload.id, "a summary").unwrap();
        let stored = db.find_upload(&user.id, &upload.id).unwrap().unwrap();
        assert_eq!(stored.quizzes, sample_quiz());
        assert_eq!(stored.summary.as_deref(), Some("a summary"));
    }

    #[test]
    fn test_set_on_missing_upload_is_not_found() {
        let (db, _dir) = test_db();
        let user = db.create_user("Ada", "ada@example.com", "x").unwrap();
        let err = db.set_summary(&user.id, "no-such-id", "s").unwrap_err();
        assert!(matches!(err, ApiError::NotFound("upload")));
    }

    #[test]
    fn test_list_uploads_is_scoped_to_user() {
        let (db, _dir) = test_db();
        let ada = db.create_user("Ada", "ada@example.com", "x").unwrap();
        let eve = db.create_user("Eve", "eve@example.com", "y").unwrap();
        db.insert_upload(&ada.id, "one").unwrap();
        db.insert_upload(&ada.id, "two").unwrap();
        db.insert_upload(&eve.id, "three").unwrap();

        assert_eq!(db.list_uploads(&ada.id).unwrap().len(), 2);
        assert_eq!(db.list_uploads(&eve.id).unwrap().len(), 1);
    }
}
