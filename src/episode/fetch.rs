// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::{EpisodeError, FeedError};
use crate::feed::load_feed;
use crate::http::HttpClient;
use crate::resolve::AudioResolver;
use crate::retry::{RetryPolicy, Sleeper};

use super::descriptor::{EpisodeDescriptor, UNKNOWN, display_date};

/// Fetch the feed and describe its latest episode.
///
/// The first entry is taken as the latest; feeds are expected to be
/// reverse-chronological.
pub async fn fetch_latest_episode<C: HttpClient>(
    client: &C,
    feed_source: &str,
    resolver: &AudioResolver<'_, C>,
    retry: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<EpisodeDescriptor, EpisodeError> {
    let feed = load_feed(client, feed_source, retry, sleeper).await?;
    tracing::info!(feed = %feed.title, entries = feed.entries.len(), "feed loaded");

    let latest = feed.entries.first().ok_or(FeedError::EmptyFeed)?;

    let title = latest
        .title
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());
    let publish_date = display_date(latest.published.as_deref());
    let audio_url = resolver.resolve(latest).await?;

    tracing::info!(%title, %audio_url, "latest episode resolved");
    Ok(EpisodeDescriptor::new(title, publish_date, audio_url))
}
