//! SQLite-backed store for users and judged submissions.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::judge::{clamp_score, JudgmentOutcome, Provenance, Verdict};

pub const DEFAULT_FEED_LIMIT: u32 = 50;

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
}

/// A persisted, judged situation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    pub user_id: Option<i64>,
    /// Owner's username, or `None` when hidden by anonymity.
    pub username: Option<String>,
    pub situation: String,
    pub follow_up_context: Option<String>,
    pub verdict: Verdict,
    pub score: u8,
    pub reasoning: String,
    pub provenance: Option<Provenance>,
    pub is_anonymous: bool,
    pub is_public: bool,
    pub created_at: i64,
    /// Provider that produced the judgment; set only on freshly judged rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    /// Why the AI path was abandoned; set only on freshly judged rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_error: Option<String>,
}

impl Submission {
    /// Attach the provider annotations of the judgment that produced this row.
    pub fn annotated(mut self, judgment: &JudgmentOutcome) -> Self {
        self.provider_name = judgment.provider_name.clone();
        self.provider_error = judgment.provider_error.clone();
        self
    }
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub user_id: i64,
    pub situation: String,
    pub is_anonymous: bool,
    pub is_public: bool,
    pub judgment: JudgmentOutcome,
}

/// Feed filter.
///
/// - `mine` with a viewer: only the viewer's submissions, names always shown
/// - viewer: public submissions plus the viewer's private ones
/// - no viewer: public submissions only
#[derive(Debug, Clone)]
pub struct FeedQuery {
    pub viewer: Option<i64>,
    pub mine: bool,
    pub limit: u32,
    pub offset: u32,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            viewer: None,
            mine: false,
            limit: DEFAULT_FEED_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub submissions: Vec<Submission>,
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("task join error: {0}")]
    Join(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn create_user(&self, user: &NewUser) -> Result<User, StoreError>;
    /// Look a user up by username or email.
    async fn find_user(&self, login: &str) -> Result<Option<User>, StoreError>;
    async fn insert_submission(&self, submission: &NewSubmission)
        -> Result<Submission, StoreError>;
    /// Fetch one submission; the username is hidden when anonymous.
    async fn get_submission(&self, id: i64) -> Result<Option<Submission>, StoreError>;
    /// Record a follow-up and the judgment it produced.
    async fn update_judgment(
        &self,
        id: i64,
        follow_up: &str,
        judgment: &JudgmentOutcome,
    ) -> Result<(), StoreError>;
    async fn list_feed(&self, query: &FeedQuery) -> Result<FeedPage, StoreError>;
}

// =============================================================================
// SQLite implementation
// =============================================================================

#[derive(Clone)]
pub struct SqliteSubmissionStore {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSubmissionStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        Self::init(conn, path)
    }

    /// Private in-memory database, handy for tests and dry runs.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, path: PathBuf) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;\
             PRAGMA synchronous=NORMAL;\
             PRAGMA foreign_keys=ON;\
             CREATE TABLE IF NOT EXISTS users (\
               id INTEGER PRIMARY KEY AUTOINCREMENT,\
               username TEXT UNIQUE NOT NULL,\
               email TEXT UNIQUE NOT NULL,\
               created_at INTEGER NOT NULL\
             );\
             CREATE TABLE IF NOT EXISTS submissions (\
               id INTEGER PRIMARY KEY AUTOINCREMENT,\
               user_id INTEGER REFERENCES users(id),\
               situation TEXT NOT NULL,\
               judgment TEXT,\
               reasoning TEXT,\
               created_at INTEGER NOT NULL\
             );",
        )?;
        ensure_column(&conn, "submissions", "follow_up_context", "TEXT")?;
        ensure_column(&conn, "submissions", "score", "INTEGER DEFAULT 5")?;
        ensure_column(&conn, "submissions", "provenance", "TEXT")?;
        ensure_column(&conn, "submissions", "is_anonymous", "INTEGER DEFAULT 0")?;
        ensure_column(&conn, "submissions", "is_public", "INTEGER DEFAULT 1")?;

        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_conn<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&Connection) -> Result<R, StoreError>,
    {
        let guard = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&guard)
    }

    async fn blocking<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&Connection) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.with_conn(f))
            .await
            .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

fn ensure_column(conn: &Connection, table: &str, name: &str, decl: &str) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let col_name: String = row.get(1)?;
        if col_name == name {
            return Ok(());
        }
    }
    let sql = format!("ALTER TABLE {table} ADD COLUMN {name} {decl}");
    conn.execute(&sql, [])?;
    Ok(())
}

const SUBMISSION_COLUMNS: &str = "s.id, s.user_id, s.situation, s.follow_up_context, s.judgment, \
     s.score, s.reasoning, s.provenance, s.is_anonymous, s.is_public, s.created_at";

/// Reads `SUBMISSION_COLUMNS` followed by the display username.
fn read_submission(row: &Row<'_>) -> rusqlite::Result<Submission> {
    let judgment: Option<String> = row.get(4)?;
    let score: Option<i64> = row.get(5)?;
    let provenance: Option<String> = row.get(7)?;
    Ok(Submission {
        id: row.get(0)?,
        user_id: row.get(1)?,
        situation: row.get(2)?,
        follow_up_context: row.get(3)?,
        verdict: Verdict::from_str_lossy(judgment.as_deref().unwrap_or("NTA")),
        score: clamp_score(score.unwrap_or(5)),
        reasoning: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        provenance: provenance.as_deref().and_then(|p| match p {
            "ai" => Some(Provenance::Ai),
            "rules" => Some(Provenance::Rules),
            _ => None,
        }),
        is_anonymous: row.get::<_, Option<i64>>(8)?.unwrap_or(0) != 0,
        is_public: row.get::<_, Option<i64>>(9)?.unwrap_or(1) != 0,
        created_at: row.get(10)?,
        username: row.get(11)?,
        provider_name: None,
        provider_error: None,
    })
}

fn read_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn load_submission(
    conn: &Connection,
    id: i64,
    reveal_anonymous: bool,
) -> Result<Option<Submission>, StoreError> {
    let hide = if reveal_anonymous {
        "0"
    } else {
        "s.is_anonymous = 1"
    };
    let sql = format!(
        "SELECT {SUBMISSION_COLUMNS}, CASE WHEN {hide} THEN NULL ELSE u.username END \
         FROM submissions s LEFT JOIN users u ON s.user_id = u.id WHERE s.id = ?1"
    );
    Ok(conn
        .query_row(&sql, params![id], read_submission)
        .optional()?)
}

#[async_trait]
impl SubmissionStore for SqliteSubmissionStore {
    async fn create_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let user = user.clone();
        self.blocking(move |conn| {
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT id FROM users WHERE username = ?1 OR email = ?2",
                    params![user.username, user.email],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(StoreError::Conflict(
                    "username or email already exists".to_string(),
                ));
            }
            let now = now_epoch();
            conn.execute(
                "INSERT INTO users (username, email, created_at) VALUES (?1, ?2, ?3)",
                params![user.username, user.email, now],
            )?;
            Ok(User {
                id: conn.last_insert_rowid(),
                username: user.username,
                email: user.email,
                created_at: now,
            })
        })
        .await
    }

    async fn find_user(&self, login: &str) -> Result<Option<User>, StoreError> {
        let login = login.to_string();
        self.blocking(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT id, username, email, created_at FROM users \
                     WHERE username = ?1 OR email = ?1 ORDER BY id LIMIT 1",
                    params![login],
                    read_user,
                )
                .optional()?)
        })
        .await
    }

    async fn insert_submission(
        &self,
        submission: &NewSubmission,
    ) -> Result<Submission, StoreError> {
        let sub = submission.clone();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO submissions (\
                    user_id, situation, judgment, score, reasoning, provenance,\
                    is_anonymous, is_public, created_at\
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    sub.user_id,
                    sub.situation,
                    sub.judgment.verdict().as_str(),
                    sub.judgment.score() as i64,
                    sub.judgment.reasoning(),
                    sub.judgment.provenance.as_str(),
                    sub.is_anonymous as i64,
                    sub.is_public as i64,
                    now_epoch(),
                ],
            )?;
            let id = conn.last_insert_rowid();
            load_submission(conn, id, true)?
                .map(|row| row.annotated(&sub.judgment))
                .ok_or(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
        })
        .await
    }

    async fn get_submission(&self, id: i64) -> Result<Option<Submission>, StoreError> {
        self.blocking(move |conn| load_submission(conn, id, false))
            .await
    }

    async fn update_judgment(
        &self,
        id: i64,
        follow_up: &str,
        judgment: &JudgmentOutcome,
    ) -> Result<(), StoreError> {
        let follow_up = follow_up.to_string();
        let judgment = judgment.clone();
        self.blocking(move |conn| {
            conn.execute(
                "UPDATE submissions \
                 SET follow_up_context = ?1, judgment = ?2, score = ?3, reasoning = ?4, provenance = ?5 \
                 WHERE id = ?6",
                params![
                    follow_up,
                    judgment.verdict().as_str(),
                    judgment.score() as i64,
                    judgment.reasoning(),
                    judgment.provenance.as_str(),
                    id,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_feed(&self, query: &FeedQuery) -> Result<FeedPage, StoreError> {
        let query = query.clone();
        self.blocking(move |conn| {
            let (hide, filter) = match (query.mine, query.viewer) {
                (true, Some(_)) => ("0", "s.user_id = :viewer"),
                (false, Some(_)) => ("s.is_anonymous = 1", "(s.is_public = 1 OR s.user_id = :viewer)"),
                (_, None) => ("s.is_anonymous = 1", "s.is_public = 1"),
            };

            let limit = query.limit as i64;
            let offset = query.offset as i64;
            let mut page_params: Vec<(&str, &dyn ToSql)> =
                vec![(":limit", &limit), (":offset", &offset)];
            let mut count_params: Vec<(&str, &dyn ToSql)> = Vec::new();
            if let Some(viewer) = query.viewer.as_ref() {
                page_params.push((":viewer", viewer));
                count_params.push((":viewer", viewer));
            }

            let sql = format!(
                "SELECT {SUBMISSION_COLUMNS}, CASE WHEN {hide} THEN NULL ELSE u.username END \
                 FROM submissions s LEFT JOIN users u ON s.user_id = u.id \
                 WHERE {filter} \
                 ORDER BY s.created_at DESC, s.id DESC LIMIT :limit OFFSET :offset"
            );
            let mut stmt = conn.prepare(&sql)?;
            let submissions = stmt
                .query_map(page_params.as_slice(), read_submission)?
                .collect::<Result<Vec<_>, _>>()?;

            let count_sql = format!("SELECT COUNT(*) FROM submissions s WHERE {filter}");
            let total: i64 =
                conn.query_row(&count_sql, count_params.as_slice(), |row| row.get(0))?;

            Ok(FeedPage {
                submissions,
                total,
                limit: query.limit,
                offset: query.offset,
            })
        })
        .await
    }
}

fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
