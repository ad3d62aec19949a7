use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::phrase::Phrase;
use crate::score::ScoreSummary;

/// Persisted resume state for one phrase of a set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseProgress {
    pub phrase_id: usize,
    pub text: String,
    pub is_continue: bool,
    pub user_points: u32,
    pub user_words: u32,
}

/// One completed pass through a practice set
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub set_name: String,
    pub total_points: u32,
    pub total_words: u32,
    pub max_points: u32,
    pub phrase_count: usize,
    pub completed_at: DateTime<Local>,
}

impl RunRecord {
    pub fn from_summary(set_name: &str, summary: &ScoreSummary) -> Self {
        Self {
            set_name: set_name.to_string(),
            total_points: summary.total_points,
            total_words: summary.total_words,
            max_points: summary.max_points,
            phrase_count: summary.total,
            completed_at: Local::now(),
        }
    }
}

/// SQLite store for resumable progress and run history
#[derive(Debug)]
pub struct ProgressDb {
    conn: Connection,
}

impl ProgressDb {
    /// Open the database at the default state location, creating it if needed
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("bigkas_progress.db"));
        Self::open(db_path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {e}")),
                )
            })?;
        }

        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS phrase_progress (
                set_name TEXT NOT NULL,
                phrase_id INTEGER NOT NULL,
                text TEXT NOT NULL,
                is_continue BOOLEAN NOT NULL,
                user_points INTEGER NOT NULL,
                user_words INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (set_name, phrase_id)
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS practice_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                set_name TEXT NOT NULL,
                total_points INTEGER NOT NULL,
                total_words INTEGER NOT NULL,
                max_points INTEGER NOT NULL,
                phrase_count INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_practice_runs_set ON practice_runs(set_name)",
            [],
        )?;

        Ok(ProgressDb { conn })
    }

    /// Overwrite the stored progress of `set_name` with `phrases`
    pub fn save_progress(&mut self, set_name: &str, phrases: &[Phrase]) -> Result<()> {
        let now = Local::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        tx.execute(
            "DELETE FROM phrase_progress WHERE set_name = ?1",
            [set_name],
        )?;
        for phrase in phrases {
            tx.execute(
                r#"
                INSERT INTO phrase_progress
                (set_name, phrase_id, text, is_continue, user_points, user_words, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    set_name,
                    phrase.id as i64,
                    phrase.text,
                    phrase.is_continue,
                    phrase.user_points,
                    phrase.user_words,
                    now,
                ],
            )?;
        }

        tx.commit()
    }

    pub fn load_progress(&self, set_name: &str) -> Result<Vec<PhraseProgress>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT phrase_id, text, is_continue, user_points, user_words
            FROM phrase_progress
            WHERE set_name = ?1
            ORDER BY phrase_id
            "#,
        )?;

        let rows = stmt.query_map([set_name], |row| {
            Ok(PhraseProgress {
                phrase_id: row.get::<_, i64>(0)? as usize,
                text: row.get(1)?,
                is_continue: row.get(2)?,
                user_points: row.get(3)?,
                user_words: row.get(4)?,
            })
        })?;

        rows.collect()
    }

    /// Copy stored progress onto freshly loaded phrases. A stored row only
    /// applies when both id and text still match, so an edited set never
    /// inherits scores for phrases that changed. Returns how many applied.
    pub fn apply_progress(&self, set_name: &str, phrases: &mut [Phrase]) -> Result<usize> {
        let stored = self.load_progress(set_name)?;
        let mut applied = 0;

        for progress in stored {
            if let Some(phrase) = phrases
                .iter_mut()
                .find(|p| p.id == progress.phrase_id && p.text == progress.text)
            {
                phrase.is_continue = progress.is_continue;
                phrase.user_points = progress.user_points;
                phrase.user_words = progress.user_words;
                applied += 1;
            }
        }

        Ok(applied)
    }

    pub fn clear_progress(&self, set_name: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM phrase_progress WHERE set_name = ?1",
            [set_name],
        )?;
        Ok(())
    }

    pub fn record_run(&self, run: &RunRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO practice_runs
            (set_name, total_points, total_words, max_points, phrase_count, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                run.set_name,
                run.total_points,
                run.total_words,
                run.max_points,
                run.phrase_count as i64,
                run.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Most recent runs of a set, newest first
    pub fn recent_runs(&self, set_name: &str, limit: usize) -> Result<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT set_name, total_points, total_words, max_points, phrase_count, completed_at
            FROM practice_runs
            WHERE set_name = ?1
            ORDER BY completed_at DESC, id DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![set_name, limit as i64], |row| {
            let completed_at: String = row.get(5)?;
            let completed_at = DateTime::parse_from_rfc3339(&completed_at)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        5,
                        "completed_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(RunRecord {
                set_name: row.get(0)?,
                total_points: row.get(1)?,
                total_words: row.get(2)?,
                max_points: row.get(3)?,
                phrase_count: row.get::<_, i64>(4)? as usize,
                completed_at,
            })
        })?;

        rows.collect()
    }

    pub fn best_points(&self, set_name: &str) -> Result<Option<u32>> {
        self.conn
            .query_row(
                "SELECT MAX(total_points) FROM practice_runs WHERE set_name = ?1",
                [set_name],
                |row| row.get::<_, Option<u32>>(0),
            )
            .optional()
            .map(Option::flatten)
    }
}
