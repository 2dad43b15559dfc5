//! Listing view-model
//!
//! Glue between the listing client, the post repository and the image service,
//! shaped for a scrolling list: rows ask for their thumbnail when they become
//! visible and give up the request when they scroll away.

use crate::config::Config;
use crate::db::{Database, PostRepository};
use crate::error::Result;
use crate::images::{Cancellable, ImageResult, ImageService};
use crate::listing::{ListingClient, RedditClient};
use crate::types::{ListingKind, Post, PostOrder};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

struct ThumbnailTask {
    id: u64,
    handle: Cancellable,
}

type Thumbnails = Arc<Mutex<HashMap<usize, ThumbnailTask>>>;

fn lock(thumbnails: &Thumbnails) -> MutexGuard<'_, HashMap<usize, ThumbnailTask>> {
    thumbnails.lock().unwrap_or_else(PoisonError::into_inner)
}

/// View-model behind a list of posts
pub struct ListingViewModel {
    client: Arc<dyn ListingClient>,
    repository: Arc<dyn PostRepository>,
    images: ImageService,
    kind: ListingKind,
    page_limit: u32,
    order: PostOrder,
    thumbnails: Thumbnails,
    next_task: AtomicU64,
}

impl ListingViewModel {
    /// Assemble a view-model from its collaborators
    pub fn new(
        client: Arc<dyn ListingClient>,
        repository: Arc<dyn PostRepository>,
        images: ImageService,
        kind: ListingKind,
        page_limit: u32,
    ) -> Self {
        Self {
            client,
            repository,
            images,
            kind,
            page_limit,
            order: PostOrder::default(),
            thumbnails: Arc::default(),
            next_task: AtomicU64::new(0),
        }
    }

    /// Build the default stack: Reddit client, SQLite database, HTTP image service
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let client = RedditClient::new(config)?;
        let database = Database::new(&config.persistence.database_path).await?;
        let images = ImageService::from_config(config)?;

        Ok(Self::new(
            Arc::new(client),
            Arc::new(database),
            images,
            config.reddit.listing,
            config.reddit.page_limit,
        ))
    }

    /// Use `order` for [`posts`](Self::posts) instead of oldest-first
    pub fn with_order(mut self, order: PostOrder) -> Self {
        self.order = order;
        self
    }

    /// The listing this view-model browses
    pub fn kind(&self) -> ListingKind {
        self.kind
    }

    /// The image service rows load thumbnails from
    pub fn images(&self) -> &ImageService {
        &self.images
    }

    /// Fetch the first page, store it and reset pagination
    ///
    /// Returns the number of posts saved.
    pub async fn fetch_fresh(&self) -> Result<usize> {
        self.fetch_and_store(None).await
    }

    /// Fetch the page after the stored cursor
    ///
    /// Returns `0` without a request when there is no further page.
    pub async fn fetch_next_page(&self) -> Result<usize> {
        match self.repository.load_cursor(self.kind).await? {
            Some(after) => self.fetch_and_store(Some(&after)).await,
            None => {
                debug!(listing = %self.kind, "no further page to fetch");
                Ok(0)
            }
        }
    }

    async fn fetch_and_store(&self, after: Option<&str>) -> Result<usize> {
        let page = self
            .client
            .fetch_page(self.kind, self.page_limit, after)
            .await?;

        self.repository.save(&page.posts).await?;
        self.repository
            .save_cursor(self.kind, page.after.as_deref())
            .await?;

        info!(
            listing = %self.kind,
            saved = page.posts.len(),
            more = page.after.is_some(),
            "stored listing page"
        );
        Ok(page.posts.len())
    }

    /// Stored posts in display order
    pub async fn posts(&self) -> Result<Vec<Post>> {
        self.repository.fetch_ordered(self.order).await
    }

    /// Load the thumbnail shown in `row`
    ///
    /// Any earlier request for the same row is cancelled first, so a reused row
    /// never shows a stale picture. `on_complete` receives `None` when the post
    /// has no thumbnail. A cached thumbnail is delivered before this returns.
    pub fn load_thumbnail<F>(&self, row: usize, post: &Post, on_complete: F)
    where
        F: FnOnce(Option<ImageResult>) + Send + 'static,
    {
        self.cancel_thumbnail(row);

        let Some(url) = post.thumbnail.as_deref() else {
            on_complete(None);
            return;
        };

        let task_id = self.next_task.fetch_add(1, Ordering::Relaxed);
        // Set under the thumbnails lock once the callback has run.
        let finished = Arc::new(AtomicBool::new(false));
        let callback = {
            let thumbnails = Arc::clone(&self.thumbnails);
            let finished = Arc::clone(&finished);
            move |result: ImageResult| {
                {
                    let mut active = lock(&thumbnails);
                    finished.store(true, Ordering::Relaxed);
                    if active.get(&row).is_some_and(|task| task.id == task_id) {
                        active.remove(&row);
                    }
                }
                on_complete(Some(result));
            }
        };

        // `None` means a cache hit: the callback already ran.
        if let Some(handle) = self.images.request(url, callback) {
            let task = ThumbnailTask {
                id: task_id,
                handle,
            };
            self.track(row, task, &finished);
        }
    }

    /// Record `task` as the request for `row` unless it already finished
    ///
    /// A concurrent load for the same row may have registered in between; the
    /// task displaced here is cancelled once the lock is released.
    fn track(&self, row: usize, task: ThumbnailTask, finished: &AtomicBool) {
        let replaced = {
            let mut active = lock(&self.thumbnails);
            if finished.load(Ordering::Relaxed) {
                return;
            }
            active.insert(row, task)
        };
        if let Some(replaced) = replaced {
            debug!(row, "cancelling displaced thumbnail request");
            replaced.handle.cancel();
        }
    }

    /// Give up the thumbnail request for `row` (it scrolled off-screen)
    pub fn cancel_thumbnail(&self, row: usize) {
        let task = lock(&self.thumbnails).remove(&row);
        if let Some(task) = task {
            debug!(row, "cancelling thumbnail request");
            task.handle.cancel();
        }
    }

    /// Give up every pending thumbnail request
    pub fn cancel_all_thumbnails(&self) {
        let tasks: Vec<ThumbnailTask> = lock(&self.thumbnails)
            .drain()
            .map(|(_, task)| task)
            .collect();
        for task in tasks {
            task.handle.cancel();
        }
    }

    /// Number of rows with a thumbnail request in flight
    pub fn pending_thumbnails(&self) -> usize {
        lock(&self.thumbnails).len()
    }
}

impl Drop for ListingViewModel {
    fn drop(&mut self) {
        self.cancel_all_thumbnails();
    }
}
