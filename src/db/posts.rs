//! Post upserts and ordered reads.

use crate::error::DatabaseError;
use crate::types::{Post, PostOrder, SortField, SortOrder};
use crate::{Error, Result};

use super::{Database, PostRow};

const SELECT_POSTS: &str = r#"
    SELECT id, author_fullname, subreddit, title, thumbnail, created_ms, comments
    FROM posts
"#;

/// ORDER BY clause for `order`; ties are broken by id so reads are stable
fn order_clause(order: PostOrder) -> &'static str {
    match (order.field, order.order) {
        (SortField::Created, SortOrder::Ascending) => "ORDER BY created_ms ASC, id ASC",
        (SortField::Created, SortOrder::Descending) => "ORDER BY created_ms DESC, id DESC",
        (SortField::Comments, SortOrder::Ascending) => "ORDER BY comments ASC, id ASC",
        (SortField::Comments, SortOrder::Descending) => "ORDER BY comments DESC, id DESC",
        (SortField::Title, SortOrder::Ascending) => "ORDER BY title ASC, id ASC",
        (SortField::Title, SortOrder::Descending) => "ORDER BY title DESC, id DESC",
    }
}

impl Database {
    /// Insert or update posts in a single transaction
    ///
    /// Existing rows take the incoming properties.
    pub async fn upsert_posts(&self, posts: &[Post]) -> Result<()> {
        if posts.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        for post in posts {
            sqlx::query(
                r#"
                INSERT INTO posts (
                    id, author_fullname, subreddit, title, thumbnail,
                    created_ms, comments, saved_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    author_fullname = excluded.author_fullname,
                    subreddit = excluded.subreddit,
                    title = excluded.title,
                    thumbnail = excluded.thumbnail,
                    created_ms = excluded.created_ms,
                    comments = excluded.comments,
                    saved_at = excluded.saved_at
                "#,
            )
            .bind(&post.id)
            .bind(&post.author_fullname)
            .bind(&post.subreddit)
            .bind(&post.title)
            .bind(&post.thumbnail)
            .bind(post.created.timestamp_millis())
            .bind(post.comments)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to save post {}: {}",
                    post.id, e
                )))
            })?;
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit posts: {}",
                e
            )))
        })?;

        tracing::debug!(count = posts.len(), "saved posts");
        Ok(())
    }

    /// List all posts in `order`
    pub async fn list_posts(&self, order: PostOrder) -> Result<Vec<Post>> {
        let sql = format!("{} {}", SELECT_POSTS, order_clause(order));
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to list posts: {}",
                    e
                )))
            })?;

        rows.into_iter().map(Post::try_from).collect()
    }

    /// Get a post by id
    pub async fn get_post(&self, id: &str) -> Result<Option<Post>> {
        let sql = format!("{} WHERE id = ?", SELECT_POSTS);
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get post: {}",
                    e
                )))
            })?;

        row.map(Post::try_from).transpose()
    }

    /// Number of stored posts
    pub async fn count_posts(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count posts: {}",
                    e
                )))
            })
    }

    /// Delete every stored post
    pub async fn delete_all_posts(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM posts")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete posts: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }
}
