
use crate::types::Post;
use chrono::{TimeZone, Utc};

/// Post fixture created `minutes` after a fixed epoch
pub(super) fn post(id: &str, title: &str, minutes: i64, comments: i64) -> Post {
    Post {
        id: id.to_string(),
        author_fullname: Some(format!("t2_{id}")),
        subreddit: Some("rust".to_string()),
        title: title.to_string(),
        thumbnail: Some(format!("https://b.thumbs.redditmedia.com/{id}.jpg")),
        created: Utc.timestamp_opt(1_605_500_000 + minutes * 60, 0).unwrap(),
        comments,
    }
}
