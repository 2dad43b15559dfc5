//! # reddit-top
//!
//! Backend library for a Reddit "top posts" reader.
//!
//! ## Design Philosophy
//!
//! reddit-top is designed to be:
//! - **Single-flight** - Every thumbnail URL is downloaded at most once at a time,
//!   no matter how many rows ask for it
//! - **Cancellable** - Rows scrolling away give up their requests; the download
//!   stops once nobody is waiting for it
//! - **Library-first** - No UI, purely a Rust crate for embedding
//!
//! ## Quick Start
//!
//! ```no_run
//! use reddit_top::{Config, ListingViewModel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let view_model = ListingViewModel::from_config(&Config::default()).await?;
//!
//!     view_model.fetch_fresh().await?;
//!     for (row, post) in view_model.posts().await?.iter().enumerate() {
//!         view_model.load_thumbnail(row, post, move |thumbnail| {
//!             if let Some(Ok(image)) = thumbnail {
//!                 println!("row {row}: {}x{}", image.width(), image.height());
//!             }
//!         });
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Post persistence
pub mod db;
/// Error types
pub mod error;
/// Single-flight image loading
pub mod images;
/// Reddit listing client
pub mod listing;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types
pub mod types;
/// Utility helpers
pub mod utils;
/// Listing view-model
pub mod view_model;

// Re-export commonly used types
pub use config::{Config, ImageConfig, PersistenceConfig, RedditConfig, RetryConfig};
pub use db::{Database, MemoryRepository, PostRepository};
pub use error::{DatabaseError, Error, FetchError, ImageError, Result};
pub use images::{
    Cancellable, FetchCompletion, FetchResult, Fetcher, HttpFetcher, ImageCallback, ImageResult,
    ImageService,
};
pub use listing::{ListingClient, RedditClient};
pub use types::{ListingKind, Page, Post, PostOrder, SortField, SortOrder};
pub use utils::Debouncer;
pub use view_model::ListingViewModel;
