//! Persistence layer for reddit-top
//!
//! Posts are stored behind the [`PostRepository`] trait so the view-model does
//! not care which storage engine sits underneath. Two implementations ship:
//!
//! - [`Database`]: SQLite via sqlx, with schema migrations
//! - [`MemoryRepository`]: in-process map, for tests and ephemeral sessions
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`]: Database lifecycle, schema migrations
//! - [`posts`]: Post upserts and ordered reads
//! - [`cursors`]: Pagination cursor per listing

use crate::error::{DatabaseError, Error, Result};
use crate::types::{ListingKind, Post, PostOrder};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

mod cursors;
mod memory;
mod migrations;
mod posts;

pub use memory::MemoryRepository;

/// Storage boundary for listing posts
///
/// Saving a post whose id already exists replaces the stored properties with
/// the incoming ones.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert or update `posts`
    async fn save(&self, posts: &[Post]) -> Result<()>;

    /// All stored posts under `order`
    async fn fetch_ordered(&self, order: PostOrder) -> Result<Vec<Post>>;

    /// Remember where the next page of `kind` starts (`None` = exhausted)
    async fn save_cursor(&self, kind: ListingKind, after: Option<&str>) -> Result<()>;

    /// Cursor stored for `kind`, if any
    async fn load_cursor(&self, kind: ListingKind) -> Result<Option<String>>;
}

/// Post record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    /// Reddit post id
    pub id: String,
    /// Author fullname
    pub author_fullname: Option<String>,
    /// Subreddit name
    pub subreddit: Option<String>,
    /// Post title
    pub title: String,
    /// Thumbnail URL
    pub thumbnail: Option<String>,
    /// Unix timestamp (milliseconds) when the post was created
    pub created_ms: i64,
    /// Number of comments
    pub comments: i64,
}

impl TryFrom<PostRow> for Post {
    type Error = Error;

    fn try_from(row: PostRow) -> Result<Self> {
        let created = DateTime::<Utc>::from_timestamp_millis(row.created_ms).ok_or_else(|| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "post {} has an out-of-range creation time: {}",
                row.id, row.created_ms
            )))
        })?;

        Ok(Post {
            id: row.id,
            author_fullname: row.author_fullname,
            subreddit: row.subreddit,
            title: row.title,
            thumbnail: row.thumbnail,
            created,
            comments: row.comments,
        })
    }
}

/// SQLite database handle
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

#[async_trait]
impl PostRepository for Database {
    async fn save(&self, posts: &[Post]) -> Result<()> {
        self.upsert_posts(posts).await
    }

    async fn fetch_ordered(&self, order: PostOrder) -> Result<Vec<Post>> {
        self.list_posts(order).await
    }

    async fn save_cursor(&self, kind: ListingKind, after: Option<&str>) -> Result<()> {
        self.set_cursor(kind, after).await
    }

    async fn load_cursor(&self, kind: ListingKind) -> Result<Option<String>> {
        self.get_cursor(kind).await
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
