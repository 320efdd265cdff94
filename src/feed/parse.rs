// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rss::extension::Extension;

use crate::error::FeedError;

/// Namespace prefix conventionally bound to Media RSS
const MEDIA_PREFIX: &str = "media";

/// A parsed feed, entries in document order
#[derive(Debug, Clone)]
pub struct Feed {
    pub title: String,
    pub entries: Vec<FeedEntry>,
}

/// A single feed item, reduced to what episode resolution needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    /// Raw publish date text, as written in the feed
    pub published: Option<String>,
    /// Canonical web page for the entry
    pub link: Option<String>,
    /// `<enclosure url>` hrefs in feed order
    pub enclosures: Vec<String>,
    /// `media:content url` hrefs in feed order, including those inside `media:group`
    pub media_contents: Vec<String>,
}

/// Parse RSS feed XML bytes into a Feed
pub fn parse_feed(xml_bytes: &[u8]) -> Result<Feed, FeedError> {
    let channel = rss::Channel::read_from(xml_bytes)?;

    let entries = channel.items().iter().map(parse_entry).collect();

    Ok(Feed {
        title: channel.title().to_string(),
        entries,
    })
}

fn parse_entry(item: &rss::Item) -> FeedEntry {
    let published = item.pub_date().map(String::from).or_else(|| {
        item.dublin_core_ext()
            .and_then(|dc| dc.dates().first().cloned())
    });

    FeedEntry {
        title: item.title().map(|t| t.trim().to_string()),
        published,
        link: item.link().map(|l| l.trim().to_string()),
        enclosures: item
            .enclosure()
            .map(|enc| enc.url().to_string())
            .into_iter()
            .collect(),
        media_contents: media_content_urls(item),
    }
}

fn media_content_urls(item: &rss::Item) -> Vec<String> {
    let Some(media) = item.extensions().get(MEDIA_PREFIX) else {
        return Vec::new();
    };

    let mut urls = Vec::new();
    for content in media.get("content").into_iter().flatten() {
        urls.extend(content_url(content));
    }
    for group in media.get("group").into_iter().flatten() {
        for content in group.children().get("content").into_iter().flatten() {
            urls.extend(content_url(content));
        }
    }
    urls
}

fn content_url(content: &Extension) -> Option<String> {
    content.attrs().get("url").map(|u| u.trim().to_string())
}
