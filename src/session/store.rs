use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use thiserror::Error;

use super::data::PhotoSession;

/// Errors surfaced by the session catalog
#[derive(Debug, Error)]
pub enum StoreError {
    /// Update-by-name against a record that does not exist
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    /// Underlying SQLite failure
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Photo list could not be converted to or from JSON
    #[error("Photo list serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The SessionStore manages the SQLite session catalog.
/// It stores one record per named session, each holding the full photo
/// list captured so far.
pub struct SessionStore {
    conn: Connection,
    db_path: PathBuf,
}

impl SessionStore {
    /// Create a store backed by the default catalog location.
    ///
    /// The database file is created in the user's data directory:
    /// - Linux: ~/.local/share/nightflow/nightflow.db
    /// - macOS: ~/Library/Application Support/nightflow/nightflow.db
    /// - Windows: %APPDATA%\nightflow\nightflow.db
    pub fn new() -> Result<Self, StoreError> {
        let store = Self::open(Self::default_db_path())?;

        println!("📁 Session catalog at: {}", store.db_path.display());

        Ok(store)
    }

    /// Open (or create) a catalog at an explicit path.
    ///
    /// Callers own the store they construct; there is no shared global
    /// handle. A capture task takes its store by value.
    pub fn open(db_path: PathBuf) -> Result<Self, StoreError> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .expect("Failed to create application data directory");
        }

        // Open or create the database
        let conn = Connection::open(&db_path)?;

        let mut store = SessionStore { conn, db_path };
        store.init_schema()?;

        Ok(store)
    }

    /// Get the path where the database should be stored
    fn default_db_path() -> PathBuf {
        let mut path = dirs::data_dir()
            .or_else(|| dirs::home_dir())
            .expect("Could not determine user data directory");

        path.push("nightflow");
        path.push("nightflow.db");
        path
    }

    /// Initialize the database schema.
    /// Creates the sessions table if it doesn't exist.
    fn init_schema(&mut self) -> Result<(), StoreError> {
        // One record per session, keyed by name; the photo list lives
        // in a JSON column
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                name            TEXT PRIMARY KEY,
                photos_json     TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Get the path to the database file
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Get a count of sessions in the catalog
    pub fn session_count(&self) -> Result<i64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get all sessions from the catalog, in key (name) order
    pub fn get_sessions(&self) -> Result<Vec<PhotoSession>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, photos_json FROM sessions ORDER BY name")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (name, photos_json) = row?;
            sessions.push(PhotoSession::photos_from_json(&name, &photos_json)?);
        }

        Ok(sessions)
    }

    /// Get one session by name, or Ok(None) when no record exists
    pub fn get_session(&self, name: &str) -> Result<Option<PhotoSession>, StoreError> {
        let photos_json: Option<String> = self
            .conn
            .query_row(
                "SELECT photos_json FROM sessions WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        match photos_json {
            Some(json) => Ok(Some(PhotoSession::photos_from_json(name, &json)?)),
            None => Ok(None),
        }
    }

    /// Save a session under its name.
    /// This is a keyed upsert: the last write to a name wins.
    pub fn save_session(&self, session: &PhotoSession) -> Result<(), StoreError> {
        let photos_json = session.photos_to_json()?;

        self.conn.execute(
            "INSERT INTO sessions (name, photos_json) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET photos_json = excluded.photos_json",
            params![session.name, photos_json],
        )?;

        Ok(())
    }

    /// Update a session by name: fetch the existing record, replace its
    /// photo list with the caller's, and save it back. Fails when no
    /// record exists under that name.
    pub fn update_session(&self, updated: &PhotoSession) -> Result<(), StoreError> {
        let mut existing = match self.get_session(&updated.name)? {
            Some(existing) => existing,
            None => return Err(StoreError::SessionNotFound(updated.name.clone())),
        };

        existing.photos = updated.photos.clone();
        self.save_session(&existing)
    }

    /// Delete a session by name.
    /// Deleting a name with no record is a no-op that leaves the rest
    /// of the catalog untouched.
    pub fn delete_session(&self, name: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM sessions WHERE name = ?1", params![name])?;
        Ok(())
    }
}

// Implement Debug without exposing the connection
impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}
