//! Pagination cursor per listing.

use crate::error::DatabaseError;
use crate::types::ListingKind;
use crate::{Error, Result};

use super::Database;

impl Database {
    /// Store the `after` cursor for `kind` (`None` marks the listing exhausted)
    pub async fn set_cursor(&self, kind: ListingKind, after: Option<&str>) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO listing_cursors (kind, after, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(kind) DO UPDATE SET after = excluded.after, updated_at = excluded.updated_at
            "#,
        )
        .bind(kind.to_string())
        .bind(after)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to store cursor for {}: {}",
                kind, e
            )))
        })?;

        Ok(())
    }

    /// Cursor stored for `kind`
    pub async fn get_cursor(&self, kind: ListingKind) -> Result<Option<String>> {
        let after: Option<Option<String>> =
            sqlx::query_scalar("SELECT after FROM listing_cursors WHERE kind = ?")
                .bind(kind.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to load cursor for {}: {}",
                        kind, e
                    )))
                })?;

        Ok(after.flatten())
    }
}
