//! SQLite database layer (embedded, no external dependencies)
//!
//! Same contract as the in-memory stores: ids from per-table sequences,
//! soft delete through `deleted_at`, listings ordered by creation time then
//! id. Live usernames are kept unique by a partial index.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use postboard_core::ports::{CommentFilter, CommentStore, PostStore, UserStore};
use postboard_core::{
    Comment, IdSequence, Lookup, NewComment, NewPost, NewUser, PageRequest, Post, StoreError,
    User,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

type StoreResult<T> = postboard_core::Result<T>;

type UserRow = (String, String, String, String, Option<String>);
type PostRow = (String, Option<String>, String, String, bool, String, Option<String>);
type CommentRow = (
    String,
    Option<String>,
    String,
    Option<String>,
    String,
    String,
    Option<String>,
);

const USER_COLUMNS: &str = "id, username, email, created_at, deleted_at";
const POST_COLUMNS: &str = "id, author_id, title, body, allow_comments, created_at, deleted_at";
const COMMENT_COLUMNS: &str =
    "id, author_id, parent_post_id, parent_comment_id, body, created_at, deleted_at";

/// Listing order shared by every table
const ORDER: &str = "ORDER BY created_at, length(id), id";

pub struct Database {
    pool: Arc<SqlitePool>,
    user_ids: IdSequence,
    post_ids: IdSequence,
    comment_ids: IdSequence,
}

impl Database {
    pub async fn new(database_path: &str) -> Result<Self> {
        tracing::info!("Opening SQLite database at: {}", database_path);

        let parent = match Path::new(database_path).parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;

        let test_file = parent.join(".write_test");
        match tokio::fs::write(&test_file, b"test").await {
            Ok(_) => {
                let _ = tokio::fs::remove_file(&test_file).await;
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Database directory is not writable: {}: {}",
                    parent.display(),
                    e
                ));
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| {
                format!("Failed to connect to SQLite database at: {}", database_path)
            })?;

        Self::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        let user_ids = Self::sequence_after(&pool, "users").await?;
        let post_ids = Self::sequence_after(&pool, "posts").await?;
        let comment_ids = Self::sequence_after(&pool, "comments").await?;

        tracing::info!("Database initialization complete");

        Ok(Self {
            pool: Arc::new(pool),
            user_ids,
            post_ids,
            comment_ids,
        })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                email TEXT NOT NULL,
                created_at TEXT NOT NULL,
                deleted_at TEXT
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS users_live_username
            ON users (username) WHERE deleted_at IS NULL
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                author_id TEXT,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                allow_comments INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                deleted_at TEXT
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id TEXT PRIMARY KEY,
                author_id TEXT,
                parent_post_id TEXT NOT NULL,
                parent_comment_id TEXT,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL,
                deleted_at TEXT
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS comments_by_parent
            ON comments (parent_post_id, parent_comment_id)
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Sequence continuing after the largest id already in `table`
    async fn sequence_after(pool: &SqlitePool, table: &str) -> Result<IdSequence> {
        let sql = format!(
            "SELECT COALESCE(MAX(CAST(id AS INTEGER)), 0) FROM {}",
            table
        );
        let max: i64 = sqlx::query_scalar(&sql)
            .fetch_one(pool)
            .await
            .with_context(|| format!("Failed to read id sequence of {}", table))?;
        Ok(IdSequence::starting_at(max.max(0) as u64 + 1))
    }

    async fn fetch_user(&self, id: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(backend)?;
        row.map(user_from_row).transpose()
    }

    async fn fetch_post(&self, id: &str) -> StoreResult<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS);
        let row: Option<PostRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(backend)?;
        row.map(post_from_row).transpose()
    }

    async fn fetch_comment(&self, id: &str) -> StoreResult<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments WHERE id = ?1", COMMENT_COLUMNS);
        let row: Option<CommentRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(backend)?;
        row.map(comment_from_row).transpose()
    }

    /// Stamp `deleted_at` on a live row of `table`
    async fn soft_delete(&self, table: &str, kind: &str, id: &str) -> StoreResult<DateTime<Utc>> {
        let now = Utc::now();
        let sql = format!(
            "UPDATE {} SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
            table
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(encode_time(now))
            .execute(&*self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 1 {
            return Ok(now);
        }
        Err(self.missing(table, kind, id).await)
    }

    /// Why a guarded update touched no row: absent or already deleted
    async fn missing(&self, table: &str, kind: &str, id: &str) -> StoreError {
        let sql = format!("SELECT deleted_at IS NOT NULL FROM {} WHERE id = ?1", table);
        match sqlx::query_scalar::<_, bool>(&sql)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
        {
            Ok(Some(true)) => StoreError::already_deleted(kind, id),
            Ok(_) => StoreError::not_found(kind, id),
            Err(e) => backend(e),
        }
    }

    async fn exists_live(&self, table: &str, id: &str) -> StoreResult<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE id = ?1 AND deleted_at IS NULL",
            table
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(&*self.pool)
            .await
            .map_err(backend)?;
        Ok(count > 0)
    }
}

#[async_trait]
impl UserStore for Database {
    async fn get_user(&self, id: &str) -> StoreResult<Lookup<User>> {
        Ok(Lookup::from_stored(self.fetch_user(id).await?))
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Lookup<User>> {
        // Live holder first, otherwise the most recent former one
        let sql = format!(
            "SELECT {} FROM users WHERE username = ?1 \
             ORDER BY deleted_at IS NULL DESC, created_at DESC LIMIT 1",
            USER_COLUMNS
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(username)
            .fetch_optional(&*self.pool)
            .await
            .map_err(backend)?;
        Ok(Lookup::from_stored(row.map(user_from_row).transpose()?))
    }

    async fn user_exists(&self, id: &str) -> StoreResult<bool> {
        self.exists_live("users", id).await
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut user = user.into_user();
        user.id = self.user_ids.next_id();
        user.created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(encode_time(user.created_at))
        .execute(&*self.pool)
        .await
        .map_err(|e| match backend(e) {
            StoreError::AlreadyExists(_) => {
                StoreError::AlreadyExists(format!("{} is taken", user.username))
            }
            other => other,
        })?;

        Ok(user)
    }

    async fn update_user(&self, mut user: User) -> StoreResult<User> {
        let current = live(self.fetch_user(&user.id).await?, "user", &user.id)?;
        if current.username != user.username {
            return Err(StoreError::Conflict(format!(
                "username of user {} cannot change",
                user.id
            )));
        }

        let result = sqlx::query("UPDATE users SET email = ?2 WHERE id = ?1 AND deleted_at IS NULL")
            .bind(&user.id)
            .bind(&user.email)
            .execute(&*self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(self.missing("users", "user", &user.id).await);
        }

        user.created_at = current.created_at;
        user.deleted_at = None;
        Ok(user)
    }

    async fn delete_user(&self, id: &str) -> StoreResult<User> {
        let mut user = live(self.fetch_user(id).await?, "user", id)?;
        user.deleted_at = Some(self.soft_delete("users", "user", id).await?);
        Ok(user)
    }
}

#[async_trait]
impl PostStore for Database {
    async fn get_post(&self, id: &str) -> StoreResult<Lookup<Post>> {
        Ok(Lookup::from_stored(self.fetch_post(id).await?))
    }

    async fn post_exists(&self, id: &str) -> StoreResult<bool> {
        self.exists_live("posts", id).await
    }

    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let mut post = post.into_post();
        post.id = self.post_ids.next_id();
        post.created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO posts (id, author_id, title, body, allow_comments, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&post.id)
        .bind(&post.author_id)
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.allow_comments)
        .bind(encode_time(post.created_at))
        .execute(&*self.pool)
        .await
        .map_err(backend)?;

        Ok(post)
    }

    async fn update_post(&self, mut post: Post) -> StoreResult<Post> {
        let current = live(self.fetch_post(&post.id).await?, "post", &post.id)?;

        let result = sqlx::query(
            r#"
            UPDATE posts SET title = ?2, body = ?3, allow_comments = ?4
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(&post.id)
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.allow_comments)
        .execute(&*self.pool)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(self.missing("posts", "post", &post.id).await);
        }

        post.author_id = current.author_id;
        post.created_at = current.created_at;
        post.deleted_at = None;
        Ok(post)
    }

    async fn delete_post(&self, id: &str) -> StoreResult<Post> {
        let mut post = live(self.fetch_post(id).await?, "post", id)?;
        post.deleted_at = Some(self.soft_delete("posts", "post", id).await?);
        Ok(post)
    }

    async fn list_posts(&self, page: PageRequest) -> StoreResult<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM posts WHERE deleted_at IS NULL {} LIMIT ?1 OFFSET ?2",
            POST_COLUMNS, ORDER
        );
        let rows: Vec<PostRow> = sqlx::query_as(&sql)
            .bind(to_i64(page.limit))
            .bind(to_i64(page.offset))
            .fetch_all(&*self.pool)
            .await
            .map_err(backend)?;
        rows.into_iter().map(post_from_row).collect()
    }
}

#[async_trait]
impl CommentStore for Database {
    async fn get_comment(&self, id: &str) -> StoreResult<Lookup<Comment>> {
        Ok(Lookup::from_stored(self.fetch_comment(id).await?))
    }

    async fn comment_exists(&self, id: &str) -> StoreResult<bool> {
        self.exists_live("comments", id).await
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let mut comment = comment.into_comment();
        comment.id = self.comment_ids.next_id();
        comment.created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO comments (id, author_id, parent_post_id, parent_comment_id, body, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&comment.id)
        .bind(&comment.author_id)
        .bind(&comment.parent_post_id)
        .bind(&comment.parent_comment_id)
        .bind(&comment.body)
        .bind(encode_time(comment.created_at))
        .execute(&*self.pool)
        .await
        .map_err(backend)?;

        Ok(comment)
    }

    async fn update_comment(&self, mut comment: Comment) -> StoreResult<Comment> {
        let current = live(self.fetch_comment(&comment.id).await?, "comment", &comment.id)?;

        let result =
            sqlx::query("UPDATE comments SET body = ?2 WHERE id = ?1 AND deleted_at IS NULL")
                .bind(&comment.id)
                .bind(&comment.body)
                .execute(&*self.pool)
                .await
                .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(self.missing("comments", "comment", &comment.id).await);
        }

        // Thread placement is fixed at creation
        comment.author_id = current.author_id;
        comment.parent_post_id = current.parent_post_id;
        comment.parent_comment_id = current.parent_comment_id;
        comment.created_at = current.created_at;
        comment.deleted_at = None;
        Ok(comment)
    }

    async fn delete_comment(&self, id: &str) -> StoreResult<Comment> {
        let mut comment = live(self.fetch_comment(id).await?, "comment", id)?;
        comment.deleted_at = Some(self.soft_delete("comments", "comment", id).await?);
        Ok(comment)
    }

    async fn list_comments(
        &self,
        filter: CommentFilter,
        page: PageRequest,
    ) -> StoreResult<Vec<Comment>> {
        let (condition, key) = match &filter {
            CommentFilter::TopLevel { post_id } => (
                "parent_post_id = ?1 AND parent_comment_id IS NULL",
                post_id.as_str(),
            ),
            CommentFilter::Replies { comment_id } => {
                ("parent_comment_id = ?1", comment_id.as_str())
            }
        };
        let sql = format!(
            "SELECT {} FROM comments WHERE {} AND deleted_at IS NULL {} LIMIT ?2 OFFSET ?3",
            COMMENT_COLUMNS, condition, ORDER
        );
        let rows: Vec<CommentRow> = sqlx::query_as(&sql)
            .bind(key)
            .bind(to_i64(page.limit))
            .bind(to_i64(page.offset))
            .fetch_all(&*self.pool)
            .await
            .map_err(backend)?;
        rows.into_iter().map(comment_from_row).collect()
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::AlreadyExists(db.message().to_string());
        }
    }
    StoreError::Backend(e.to_string())
}

fn live<T>(stored: Option<T>, kind: &str, id: &str) -> StoreResult<T>
where
    T: postboard_core::Record,
{
    match Lookup::from_stored(stored) {
        Lookup::Found(record) => Ok(record),
        Lookup::Deleted(_) => Err(StoreError::already_deleted(kind, id)),
        Lookup::NotFound => Err(StoreError::not_found(kind, id)),
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Fixed-width RFC 3339, so text order matches time order
fn encode_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_time(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend(format!("bad timestamp {:?}: {}", raw, e)))
}

fn decode_optional_time(raw: Option<String>) -> StoreResult<Option<DateTime<Utc>>> {
    raw.as_deref().map(decode_time).transpose()
}

fn user_from_row(row: UserRow) -> StoreResult<User> {
    let (id, username, email, created_at, deleted_at) = row;
    Ok(User {
        id,
        username,
        email,
        created_at: decode_time(&created_at)?,
        deleted_at: decode_optional_time(deleted_at)?,
    })
}

fn post_from_row(row: PostRow) -> StoreResult<Post> {
    let (id, author_id, title, body, allow_comments, created_at, deleted_at) = row;
    Ok(Post {
        id,
        author_id,
        title,
        body,
        allow_comments,
        created_at: decode_time(&created_at)?,
        deleted_at: decode_optional_time(deleted_at)?,
    })
}

fn comment_from_row(row: CommentRow) -> StoreResult<Comment> {
    let (id, author_id, parent_post_id, parent_comment_id, body, created_at, deleted_at) = row;
    Ok(Comment {
        id,
        author_id,
        parent_post_id,
        parent_comment_id,
        body,
        created_at: decode_time(&created_at)?,
        deleted_at: decode_optional_time(deleted_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    async fn open() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postboard.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        (dir, db)
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
        }
    }

    fn new_post(author: &str) -> NewPost {
        NewPost {
            author_id: author.to_string(),
            title: "title".to_string(),
            body: "body".to_string(),
            allow_comments: true,
        }
    }

    fn new_comment(post: &str, parent: Option<&str>, body: &str) -> NewComment {
        NewComment {
            author_id: "1".to_string(),
            parent_post_id: post.to_string(),
            parent_comment_id: parent.map(str::to_string),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_user_roundtrip_and_uniqueness() {
        let (_dir, db) = open().await;
        let alice = assert_ok!(db.insert_user(new_user("alice")).await);
        assert_eq!(alice.id, "1");
        assert_eq!(
            db.get_user("1").await.unwrap(),
            Lookup::Found(alice.clone())
        );
        assert_eq!(
            db.get_user_by_username("alice").await.unwrap(),
            Lookup::Found(alice.clone())
        );

        let err = assert_err!(db.insert_user(new_user("alice")).await);
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        assert_ok!(db.delete_user(&alice.id).await);
        assert!(matches!(
            db.get_user(&alice.id).await.unwrap(),
            Lookup::Deleted(_)
        ));
        assert!(!db.user_exists(&alice.id).await.unwrap());
        let err = assert_err!(db.delete_user(&alice.id).await);
        assert!(matches!(err, StoreError::AlreadyDeleted(_)));

        // Username is free again
        let again = assert_ok!(db.insert_user(new_user("alice")).await);
        assert_eq!(
            db.get_user_by_username("alice").await.unwrap(),
            Lookup::Found(again)
        );
    }

    #[tokio::test]
    async fn test_update_rules() {
        let (_dir, db) = open().await;
        let mut user = db.insert_user(new_user("bob")).await.unwrap();
        user.email = "b@example.org".to_string();
        let updated = assert_ok!(db.update_user(user.clone()).await);
        assert_eq!(updated.email, "b@example.org");

        let mut renamed = updated.clone();
        renamed.username = "robert".to_string();
        assert!(matches!(
            db.update_user(renamed).await,
            Err(StoreError::Conflict(_))
        ));

        let mut ghost = updated.clone();
        ghost.id = "77".to_string();
        assert!(matches!(
            db.update_user(ghost).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_post_listing_and_delete() {
        let (_dir, db) = open().await;
        for _ in 0..7 {
            db.insert_post(new_post("1")).await.unwrap();
        }
        db.delete_post("2").await.unwrap();

        let first = db.list_posts(PageRequest::new(0, 3)).await.unwrap();
        let ids: Vec<&str> = first.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "4"]);
        assert_eq!(db.list_posts(PageRequest::new(3, 10)).await.unwrap().len(), 3);
        assert!(db.list_posts(PageRequest::new(6, 10)).await.unwrap().is_empty());

        assert!(matches!(
            db.update_post(first[0].clone()).await,
            Ok(Post { ref id, .. }) if id == "1"
        ));
        let deleted = db.get_post("2").await.unwrap();
        assert!(matches!(deleted, Lookup::Deleted(_)));
        assert!(matches!(
            db.update_post(match deleted {
                Lookup::Deleted(p) => p,
                _ => unreachable!(),
            })
            .await,
            Err(StoreError::AlreadyDeleted(_))
        ));
    }

    #[tokio::test]
    async fn test_comment_filters() {
        let (_dir, db) = open().await;
        let root = db.insert_comment(new_comment("1", None, "root")).await.unwrap();
        db.insert_comment(new_comment("1", Some(&root.id), "reply"))
            .await
            .unwrap();
        db.insert_comment(new_comment("1", None, "second")).await.unwrap();
        db.insert_comment(new_comment("2", None, "other")).await.unwrap();

        let all = PageRequest::new(0, 50);
        let top = db
            .list_comments(CommentFilter::top_level("1"), all)
            .await
            .unwrap();
        let bodies: Vec<&str> = top.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["root", "second"]);

        let replies = db
            .list_comments(CommentFilter::replies(root.id.clone()), all)
            .await
            .unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].parent_comment_id.as_deref(), Some(root.id.as_str()));

        db.delete_comment(&replies[0].id).await.unwrap();
        assert!(db
            .list_comments(CommentFilter::replies(root.id), all)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_sequences_resume_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postboard.db");
        let path = path.to_str().unwrap();
        {
            let db = Database::new(path).await.unwrap();
            db.insert_post(new_post("1")).await.unwrap();
            db.insert_post(new_post("1")).await.unwrap();
            db.pool.close().await;
        }

        let db = Database::new(path).await.unwrap();
        let post = db.insert_post(new_post("1")).await.unwrap();
        assert_eq!(post.id, "3");
    }
}
