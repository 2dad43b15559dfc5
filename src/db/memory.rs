//! In-process post repository.

use super::PostRepository;
use crate::error::Result;
use crate::types::{ListingKind, Post, PostOrder};
use async_trait::async_trait;
use chrono::SubsecRound;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// [`PostRepository`] kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryRepository {
    posts: RwLock<HashMap<String, Post>>,
    cursors: RwLock<HashMap<ListingKind, Option<String>>>,
}

impl MemoryRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored posts
    pub async fn len(&self) -> usize {
        self.posts.read().await.len()
    }

    /// Whether no posts are stored
    pub async fn is_empty(&self) -> bool {
        self.posts.read().await.is_empty()
    }
}

#[async_trait]
impl PostRepository for MemoryRepository {
    async fn save(&self, posts: &[Post]) -> Result<()> {
        let mut stored = self.posts.write().await;
        for post in posts {
            let mut post = post.clone();
            // Keep what the SQLite store keeps: milliseconds
            post.created = post.created.trunc_subsecs(3);
            stored.insert(post.id.clone(), post);
        }
        Ok(())
    }

    async fn fetch_ordered(&self, order: PostOrder) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self.posts.read().await.values().cloned().collect();
        posts.sort_by(|a, b| order.compare(a, b));
        Ok(posts)
    }

    async fn save_cursor(&self, kind: ListingKind, after: Option<&str>) -> Result<()> {
        self.cursors
            .write()
            .await
            .insert(kind, after.map(str::to_string));
        Ok(())
    }

    async fn load_cursor(&self, kind: ListingKind) -> Result<Option<String>> {
        Ok(self.cursors.read().await.get(&kind).cloned().flatten())
    }
}
