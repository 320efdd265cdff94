// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use bytes::Bytes;
use url::Url;

use crate::error::FeedError;
use crate::http::HttpClient;
use crate::retry::{RetryPolicy, Sleeper, run_with_retry};

use super::parse::{Feed, parse_feed};

/// Fetch raw feed bytes from a URL, retrying transient failures
pub async fn fetch_feed_bytes<C: HttpClient>(
    client: &C,
    url: &str,
    retry: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<Bytes, FeedError> {
    Url::parse(url)?;
    run_with_retry(retry, sleeper, "feed fetch", || client.get_bytes(url))
        .await
        .map_err(|e| FeedError::FetchFailed {
            url: url.to_string(),
            source: e,
        })
}

/// Read raw feed bytes from a local file (without parsing)
pub fn read_feed_file(path: &Path) -> Result<Vec<u8>, FeedError> {
    std::fs::read(path).map_err(|e| FeedError::FileReadFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load and parse a feed from either a URL or a local file path
pub async fn load_feed<C: HttpClient>(
    client: &C,
    source: &str,
    retry: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<Feed, FeedError> {
    if is_url(source) {
        let bytes = fetch_feed_bytes(client, source, retry, sleeper).await?;
        parse_feed(&bytes)
    } else {
        let bytes = read_feed_file(Path::new(source))?;
        parse_feed(&bytes)
    }
}

/// Determine if a string is a URL or a file path
pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}
