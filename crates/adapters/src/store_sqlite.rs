//! SQLite store implementation

use async_trait::async_trait;
use devshare_domain::{
    Account, Note, PkceStore, Post, PostStore, PublishContext, PublishReceipt, StoreError, User,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};
use uuid::Uuid;

/// SQLite-backed store for users, accounts, notes, posts, and OAuth state
pub struct SqliteStore {
    pool: SqlitePool,
}

fn db_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(e.to_string())
}

fn ser_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Serialization(e.to_string())
}

// The due query compares timestamps lexicographically in SQL
// (`scheduled_for <= ?`), which is only sound if every stored value uses the
// same offset. Normalize to UTC before formatting.
fn fmt_ts(ts: OffsetDateTime) -> Result<String, StoreError> {
    ts.to_offset(UtcOffset::UTC).format(&Rfc3339).map_err(ser_err)
}

fn parse_ts(s: &str) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::parse(s, &Rfc3339).map_err(ser_err)
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s).map_err(ser_err)
}

type PostRow = (
    String,         // id
    String,         // note_id
    String,         // user_id
    String,         // content
    String,         // platform
    String,         // status
    Option<String>, // scheduled_for
    Option<String>, // published_at
    Option<String>, // external_id
    Option<String>, // external_url
    i64,            // is_deleted
    String,         // created_at
    String,         // updated_at
);

const POST_COLUMNS: &str = "id, note_id, user_id, content, platform, status, scheduled_for, \
                            published_at, external_id, external_url, is_deleted, created_at, \
                            updated_at";

fn post_from_row(row: PostRow) -> Result<Post, StoreError> {
    let (
        id,
        note_id,
        user_id,
        content,
        platform,
        status,
        scheduled_for,
        published_at,
        external_id,
        external_url,
        is_deleted,
        created_at,
        updated_at,
    ) = row;

    Ok(Post {
        id: parse_uuid(&id)?,
        note_id: parse_uuid(&note_id)?,
        user_id: parse_uuid(&user_id)?,
        content,
        platform: FromStr::from_str(&platform).map_err(StoreError::Serialization)?,
        status: FromStr::from_str(&status).map_err(StoreError::Serialization)?,
        scheduled_for: scheduled_for.as_deref().map(parse_ts).transpose()?,
        published_at: published_at.as_deref().map(parse_ts).transpose()?,
        external_id,
        external_url,
        is_deleted: is_deleted != 0,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

impl SqliteStore {
    /// Open (creating if needed) a database at the given path
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Database(format!("Failed to create directory: {}", e)))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                display_name TEXT,
                password_hash TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                provider TEXT NOT NULL,
                provider_account_id TEXT NOT NULL,
                access_token TEXT,
                refresh_token TEXT,
                updated_at TEXT NOT NULL,
                UNIQUE(provider, provider_account_id),
                UNIQUE(user_id, provider)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                note_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                content TEXT NOT NULL,
                platform TEXT NOT NULL,
                status TEXT NOT NULL,
                scheduled_for TEXT,
                published_at TEXT,
                external_id TEXT,
                external_url TEXT,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_posts_due
            ON posts(status, scheduled_for)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS oauth_states (
                state TEXT PRIMARY KEY,
                verifier TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }

        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row: Option<(String, String, Option<String>, Option<String>, String)> = sqlx::query_as(
            "SELECT id, email, display_name, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some((id, email, display_name, password_hash, created_at)) => Ok(Some(User {
                id: parse_uuid(&id)?,
                email,
                display_name,
                password_hash,
                created_at: parse_ts(&created_at)?,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn upsert_user(
        &self,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<User, StoreError> {
        let now = fmt_ts(OffsetDateTime::now_utc())?;
        sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, password_hash, created_at)
            VALUES (?, ?, ?, NULL, ?)
            ON CONFLICT(email) DO UPDATE SET
                display_name = COALESCE(excluded.display_name, users.display_name)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(email)
        .bind(display_name)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let row: (String, String, Option<String>, Option<String>, String) = sqlx::query_as(
            "SELECT id, email, display_name, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(User {
            id: parse_uuid(&row.0)?,
            email: row.1,
            display_name: row.2,
            password_hash: row.3,
            created_at: parse_ts(&row.4)?,
        })
    }

    async fn upsert_account(&self, account: &Account) -> Result<(), StoreError> {
        let updated_at = fmt_ts(account.updated_at)?;
        sqlx::query(
            r#"
            INSERT INTO accounts
            (id, user_id, provider, provider_account_id, access_token, refresh_token, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, provider) DO UPDATE SET
                provider_account_id = excluded.provider_account_id,
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(account.id.to_string())
        .bind(account.user_id.to_string())
        .bind(account.provider.to_string())
        .bind(&account.provider_account_id)
        .bind(&account.access_token)
        .bind(&account.refresh_token)
        .bind(&updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn accounts_for_user(&self, user_id: Uuid) -> Result<Vec<Account>, StoreError> {
        let rows: Vec<(
            String,
            String,
            String,
            String,
            Option<String>,
            Option<String>,
            String,
        )> = sqlx::query_as(
            r#"
            SELECT id, user_id, provider, provider_account_id, access_token, refresh_token,
                   updated_at
            FROM accounts WHERE user_id = ?
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(
                |(id, user_id, provider, provider_account_id, access_token, refresh_token, updated_at)| {
                    Ok(Account {
                        id: parse_uuid(&id)?,
                        user_id: parse_uuid(&user_id)?,
                        provider: FromStr::from_str(&provider)
                            .map_err(StoreError::Serialization)?,
                        provider_account_id,
                        access_token,
                        refresh_token,
                        updated_at: parse_ts(&updated_at)?,
                    })
                },
            )
            .collect()
    }

    async fn create_note(&self, note: &Note) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO notes (id, user_id, title, content, is_deleted, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(note.id.to_string())
        .bind(note.user_id.to_string())
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.is_deleted as i64)
        .bind(fmt_ts(note.created_at)?)
        .bind(fmt_ts(note.updated_at)?)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_note(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        let row: Option<(String, String, String, String, i64, String, String)> = sqlx::query_as(
            r#"
            SELECT id, user_id, title, content, is_deleted, created_at, updated_at
            FROM notes WHERE id = ? AND is_deleted = 0
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some((id, user_id, title, content, is_deleted, created_at, updated_at)) => {
                Ok(Some(Note {
                    id: parse_uuid(&id)?,
                    user_id: parse_uuid(&user_id)?,
                    title,
                    content,
                    is_deleted: is_deleted != 0,
                    created_at: parse_ts(&created_at)?,
                    updated_at: parse_ts(&updated_at)?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn list_notes(&self, user_id: Uuid) -> Result<Vec<Note>, StoreError> {
        let rows: Vec<(String, String, String, String, i64, String, String)> = sqlx::query_as(
            r#"
            SELECT id, user_id, title, content, is_deleted, created_at, updated_at
            FROM notes WHERE user_id = ? AND is_deleted = 0
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(
                |(id, user_id, title, content, is_deleted, created_at, updated_at)| {
                    Ok(Note {
                        id: parse_uuid(&id)?,
                        user_id: parse_uuid(&user_id)?,
                        title,
                        content,
                        is_deleted: is_deleted != 0,
                        created_at: parse_ts(&created_at)?,
                        updated_at: parse_ts(&updated_at)?,
                    })
                },
            )
            .collect()
    }

    async fn delete_note(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE notes SET is_deleted = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("note {}", id)));
        }
        Ok(())
    }

    async fn count_posts_for_note(&self, note_id: Uuid) -> Result<u64, StoreError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM posts WHERE note_id = ? AND is_deleted = 0")
                .bind(note_id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(count.0 as u64)
    }

    async fn create_post(&self, post: &Post) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO posts
            (id, note_id, user_id, content, platform, status, scheduled_for, published_at,
             external_id, external_url, is_deleted, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(post.id.to_string())
        .bind(post.note_id.to_string())
        .bind(post.user_id.to_string())
        .bind(&post.content)
        .bind(post.platform.to_string())
        .bind(post.status.to_string())
        .bind(post.scheduled_for.map(fmt_ts).transpose()?)
        .bind(post.published_at.map(fmt_ts).transpose()?)
        .bind(&post.external_id)
        .bind(&post.external_url)
        .bind(post.is_deleted as i64)
        .bind(fmt_ts(post.created_at)?)
        .bind(fmt_ts(post.updated_at)?)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let row: Option<PostRow> = sqlx::query_as(&format!(
            "SELECT {} FROM posts WHERE id = ? AND is_deleted = 0",
            POST_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(post_from_row).transpose()
    }

    async fn list_posts(&self, user_id: Uuid) -> Result<Vec<Post>, StoreError> {
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            "SELECT {} FROM posts WHERE user_id = ? AND is_deleted = 0 ORDER BY created_at DESC",
            POST_COLUMNS
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(post_from_row).collect()
    }

    async fn publish_context(&self, post_id: Uuid) -> Result<Option<PublishContext>, StoreError> {
        let Some(post) = self.get_post(post_id).await? else {
            return Ok(None);
        };

        let user = self
            .get_user(post.user_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", post.user_id)))?;

        let accounts = self.accounts_for_user(post.user_id).await?;

        Ok(Some(PublishContext {
            post,
            user,
            accounts,
        }))
    }

    async fn due_posts(&self, now: OffsetDateTime) -> Result<Vec<Post>, StoreError> {
        let now = fmt_ts(now)?;
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM posts
            WHERE status = 'scheduled' AND scheduled_for <= ? AND is_deleted = 0
            ORDER BY scheduled_for ASC
            "#,
            POST_COLUMNS
        ))
        .bind(&now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(post_from_row).collect()
    }

    async fn claim_for_publish(&self, id: Uuid) -> Result<bool, StoreError> {
        let now = fmt_ts(OffsetDateTime::now_utc())?;
        let result = sqlx::query(
            r#"
            UPDATE posts SET status = 'publishing', updated_at = ?
            WHERE id = ? AND status IN ('draft', 'scheduled') AND is_deleted = 0
            "#,
        )
        .bind(&now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_published(
        &self,
        id: Uuid,
        at: OffsetDateTime,
        receipt: &PublishReceipt,
    ) -> Result<(), StoreError> {
        let at = fmt_ts(at)?;
        let result = sqlx::query(
            r#"
            UPDATE posts SET status = 'published', published_at = ?, external_id = ?,
                             external_url = ?, updated_at = ?
            WHERE id = ? AND is_deleted = 0
            "#,
        )
        .bind(&at)
        .bind(&receipt.external_id)
        .bind(&receipt.url)
        .bind(&at)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("post {}", id)));
        }
        Ok(())
    }

    async fn rollback_to_draft(&self, id: Uuid) -> Result<(), StoreError> {
        let now = fmt_ts(OffsetDateTime::now_utc())?;
        let result = sqlx::query("UPDATE posts SET status = 'draft', updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("post {}", id)));
        }
        Ok(())
    }

    async fn schedule_post(&self, id: Uuid, at: OffsetDateTime) -> Result<(), StoreError> {
        let at = fmt_ts(at)?;
        let now = fmt_ts(OffsetDateTime::now_utc())?;
        let result = sqlx::query(
            r#"
            UPDATE posts SET status = 'scheduled', scheduled_for = ?, updated_at = ?
            WHERE id = ? AND is_deleted = 0
            "#,
        )
        .bind(&at)
        .bind(&now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("post {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl PkceStore for SqliteStore {
    async fn put_state(
        &self,
        state: &str,
        verifier: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO oauth_states (state, verifier, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(state) DO UPDATE SET
                verifier = excluded.verifier,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(state)
        .bind(verifier)
        .bind(fmt_ts(expires_at)?)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn take_state(
        &self,
        state: &str,
        now: OffsetDateTime,
    ) -> Result<Option<String>, StoreError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT verifier, expires_at FROM oauth_states WHERE state = ?")
                .bind(state)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        // single use: drop the entry whether or not it is still valid
        sqlx::query("DELETE FROM oauth_states WHERE state = ?")
            .bind(state)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some((verifier, expires_at)) if parse_ts(&expires_at)? > now => Ok(Some(verifier)),
            _ => Ok(None),
        }
    }
}
