//! Common test utilities for reddit-top integration tests

#![allow(dead_code)]

use reddit_top::{Config, RetryConfig};
use std::time::Duration;
use wiremock::MockServer;

/// A small valid PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::DynamicImage::new_rgb8(width, height);
    let mut buffer = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

/// Config pointing every HTTP client at `server`
pub fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.reddit.base_url = server.uri();
    config.reddit.page_limit = 2;
    config.images.request_timeout = Duration::from_secs(5);
    config.retry = RetryConfig {
        max_attempts: 1,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(10),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config
}

/// One post as it appears inside a Reddit listing
pub fn post_json(id: &str, created: i64, thumbnail: &str) -> serde_json::Value {
    serde_json::json!({
        "kind": "t3",
        "data": {
            "id": id,
            "author_fullname": format!("t2_{id}"),
            "subreddit": "rust",
            "title": format!("post {id}"),
            "thumbnail": thumbnail,
            "created": created as f64,
            "num_comments": 1
        }
    })
}

/// A Reddit listing document
pub fn listing_json(children: Vec<serde_json::Value>, after: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "kind": "Listing",
        "data": { "after": after, "children": children }
    })
}
