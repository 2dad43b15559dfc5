//! Core types for reddit-top

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Which Reddit listing to browse
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    /// Highest scoring posts
    #[default]
    Top,
    /// Most recent posts
    New,
}

impl ListingKind {
    /// Path of the JSON endpoint for this listing
    pub fn path(&self) -> &'static str {
        match self {
            ListingKind::Top => "/top.json",
            ListingKind::New => "/new.json",
        }
    }
}

impl std::fmt::Display for ListingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingKind::Top => write!(f, "top"),
            ListingKind::New => write!(f, "new"),
        }
    }
}

/// A single post as shown in the listing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Reddit base-36 post id (e.g. "jvz1k2")
    pub id: String,
    /// Fullname of the author ("t2_..."); absent for deleted accounts
    pub author_fullname: Option<String>,
    /// Subreddit the post belongs to
    pub subreddit: Option<String>,
    /// Post title
    pub title: String,
    /// Absolute thumbnail URL, if the post has a real thumbnail
    pub thumbnail: Option<String>,
    /// Creation time
    pub created: DateTime<Utc>,
    /// Number of comments
    pub comments: i64,
}

/// One decoded page of a listing
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// Posts on this page, in the order Reddit returned them
    pub posts: Vec<Post>,
    /// Cursor for the next page; `None` once the listing is exhausted
    pub after: Option<String>,
}

impl Page {
    /// Decode a Reddit listing JSON document
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        let listing: RawListing = serde_json::from_slice(bytes)?;
        Ok(Page {
            posts: listing
                .data
                .children
                .into_iter()
                .map(|child| child.data.into())
                .collect(),
            after: listing.data.after.filter(|cursor| !cursor.is_empty()),
        })
    }
}

/// Column a post list can be ordered by
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Creation time
    Created,
    /// Comment count
    Comments,
    /// Title, lexicographic
    Title,
}

/// Sort direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// Ordering applied when reading posts back from a repository
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostOrder {
    /// Column to sort by
    pub field: SortField,
    /// Direction
    pub order: SortOrder,
}

impl PostOrder {
    /// Order by `field`, smallest first
    pub fn ascending(field: SortField) -> Self {
        Self {
            field,
            order: SortOrder::Ascending,
        }
    }

    /// Order by `field`, largest first
    pub fn descending(field: SortField) -> Self {
        Self {
            field,
            order: SortOrder::Descending,
        }
    }

    /// Compare two posts under this ordering; ties fall back to the post id
    pub fn compare(&self, a: &Post, b: &Post) -> std::cmp::Ordering {
        let ordering = match self.field {
            SortField::Created => a.created.cmp(&b.created),
            SortField::Comments => a.comments.cmp(&b.comments),
            SortField::Title => a.title.cmp(&b.title),
        }
        .then_with(|| a.id.cmp(&b.id));

        match self.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

impl Default for PostOrder {
    fn default() -> Self {
        Self::ascending(SortField::Created)
    }
}

// Wire format of https://www.reddit.com/{top,new}.json

#[derive(Deserialize)]
struct RawListing {
    data: RawListingData,
}

#[derive(Deserialize)]
struct RawListingData {
    #[serde(default)]
    children: Vec<RawChild>,
    #[serde(default)]
    after: Option<String>,
}

#[derive(Deserialize)]
struct RawChild {
    data: RawPost,
}

#[derive(Deserialize)]
struct RawPost {
    id: String,
    #[serde(default)]
    author_fullname: Option<String>,
    #[serde(default)]
    subreddit: Option<String>,
    title: String,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(deserialize_with = "unix_seconds")]
    created: DateTime<Utc>,
    #[serde(default, rename = "num_comments")]
    comments: i64,
}

impl From<RawPost> for Post {
    fn from(raw: RawPost) -> Self {
        Post {
            id: raw.id,
            author_fullname: raw.author_fullname,
            subreddit: raw.subreddit,
            title: raw.title,
            thumbnail: raw.thumbnail.and_then(|t| thumbnail_url(&t)),
            created: raw.created,
            comments: raw.comments,
        }
    }
}

/// Keep only absolute http(s) thumbnails
///
/// Reddit uses placeholder words ("self", "default", "nsfw", "spoiler") in the
/// thumbnail field for posts without a picture.
pub fn thumbnail_url(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw.trim()).ok()?;
    match parsed.scheme() {
        "http" | "https" => Some(parsed.into()),
        _ => None,
    }
}

fn unix_seconds<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    // Millisecond precision, the same as the SQLite column
    let millis = (secs * 1000.0).round();
    Some(millis)
        .filter(|millis| millis.is_finite())
        .and_then(|millis| DateTime::from_timestamp_millis(millis as i64))
        .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {secs}")))
}
