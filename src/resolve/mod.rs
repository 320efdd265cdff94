// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Audio URL resolution for a feed entry.
//!
//! Strategies run in a fixed order and the first hit wins:
//! enclosures, then `media:content`, then scraping the entry's web page.

mod scrape;

pub use scrape::find_audio_link;

use url::Url;

use crate::error::ResolveError;
use crate::feed::FeedEntry;
use crate::http::HttpClient;
use crate::retry::{RetryPolicy, Sleeper, run_with_retry};

/// Settings for audio resolution
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Origin that site-relative links on scraped pages are joined to
    pub site_origin: Url,
    /// Audio file suffix, including the dot
    pub extension: String,
    /// Retry policy for the page fetch
    pub retry: RetryPolicy,
}

/// Determines the single audio URL for a feed entry
pub struct AudioResolver<'a, C: HttpClient> {
    client: &'a C,
    sleeper: &'a dyn Sleeper,
    options: ResolverOptions,
}

impl<'a, C: HttpClient> AudioResolver<'a, C> {
    pub fn new(client: &'a C, sleeper: &'a dyn Sleeper, options: ResolverOptions) -> Self {
        Self {
            client,
            sleeper,
            options,
        }
    }

    /// Resolve the audio URL for `entry`, or fail with `NotFound`
    pub async fn resolve(&self, entry: &FeedEntry) -> Result<String, ResolveError> {
        if let Some(url) = first_with_suffix(&entry.enclosures, &self.options.extension) {
            tracing::debug!(%url, "audio resolved from enclosure");
            return Ok(url);
        }

        if let Some(url) = first_with_suffix(&entry.media_contents, &self.options.extension) {
            tracing::debug!(%url, "audio resolved from media content");
            return Ok(url);
        }

        if let Some(link) = entry.link.as_deref()
            && let Some(url) = self.scrape_page(link).await
        {
            tracing::debug!(%url, page = link, "audio resolved from web page");
            return Ok(url);
        }

        Err(ResolveError::NotFound {
            title: entry.title.clone().unwrap_or_default(),
        })
    }

    async fn scrape_page(&self, page: &str) -> Option<String> {
        let bytes = match run_with_retry(&self.options.retry, self.sleeper, "page fetch", || {
            self.client.get_bytes(page)
        })
        .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(page, "could not fetch episode page: {e}");
                return None;
            }
        };

        let html = String::from_utf8_lossy(&bytes);
        let page_url = Url::parse(page).ok();
        find_audio_link(
            &html,
            page_url.as_ref(),
            &self.options.site_origin,
            &self.options.extension,
        )
    }
}

/// First href with the exact (case-sensitive) suffix that is an absolute HTTP(S) URL
fn first_with_suffix(hrefs: &[String], extension: &str) -> Option<String> {
    hrefs
        .iter()
        .filter(|href| href.ends_with(extension))
        .find(|href| is_absolute_http(href))
        .cloned()
}

fn is_absolute_http(href: &str) -> bool {
    Url::parse(href).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use crate::http::HttpResponse;
    use crate::retry::TokioSleeper;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    /// Serves a fixed page body and records every requested URL
    struct PageClient {
        page: Result<&'static str, u16>,
        requests: Mutex<Vec<String>>,
    }

    impl PageClient {
        fn serving(html: &'static str) -> Self {
            Self {
                page: Ok(html),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                page: Err(status),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpClient for PageClient {
        async fn get_bytes(&self, url: &str) -> Result<Bytes, HttpError> {
            self.requests.lock().unwrap().push(url.to_string());
            match self.page {
                Ok(html) => Ok(Bytes::from_static(html.as_bytes())),
                Err(status) => Err(HttpError::Status { status }),
            }
        }

        async fn get_stream(&self, _url: &str) -> Result<HttpResponse, HttpError> {
            unreachable!("resolver never streams")
        }
    }

    fn options() -> ResolverOptions {
        ResolverOptions {
            site_origin: Url::parse("https://www.bbc.co.uk").unwrap(),
            extension: ".mp3".to_string(),
            retry: RetryPolicy::none(),
        }
    }

    fn entry() -> FeedEntry {
        FeedEntry {
            title: Some("Test Episode".to_string()),
            link: Some("https://www.bbc.co.uk/learningenglish/ep".to_string()),
            ..Default::default()
        }
    }

    const PAGE_WITH_AUDIO: &str = r#"<a href="/media/ep2.mp3">Download</a>"#;

    #[tokio::test]
    async fn enclosure_skips_page_scrape() {
        let client = PageClient::serving(PAGE_WITH_AUDIO);
        let resolver = AudioResolver::new(&client, &TokioSleeper, options());
        let entry = FeedEntry {
            enclosures: vec!["https://example.com/audio/ep1.mp3".to_string()],
            ..entry()
        };

        let url = resolver.resolve(&entry).await.unwrap();

        assert_eq!(url, "https://example.com/audio/ep1.mp3");
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn enclosure_wins_over_scraped_link() {
        let client = PageClient::serving(PAGE_WITH_AUDIO);
        let resolver = AudioResolver::new(&client, &TokioSleeper, options());
        let entry = FeedEntry {
            enclosures: vec![
                "https://example.com/cover.jpg".to_string(),
                "https://example.com/audio/enc.mp3".to_string(),
            ],
            ..entry()
        };

        for _ in 0..3 {
            assert_eq!(
                resolver.resolve(&entry).await.unwrap(),
                "https://example.com/audio/enc.mp3"
            );
        }
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn enclosure_suffix_match_is_case_sensitive() {
        let client = PageClient::serving(PAGE_WITH_AUDIO);
        let resolver = AudioResolver::new(&client, &TokioSleeper, options());
        let entry = FeedEntry {
            enclosures: vec!["https://example.com/audio/EP1.MP3".to_string()],
            ..entry()
        };

        let url = resolver.resolve(&entry).await.unwrap();

        assert_eq!(url, "https://www.bbc.co.uk/media/ep2.mp3");
        assert_eq!(client.request_count(), 1);
    }

    #[tokio::test]
    async fn media_content_is_second_choice() {
        let client = PageClient::serving(PAGE_WITH_AUDIO);
        let resolver = AudioResolver::new(&client, &TokioSleeper, options());
        let entry = FeedEntry {
            enclosures: vec!["https://example.com/video.mp4".to_string()],
            media_contents: vec![
                "https://example.com/thumb.jpg".to_string(),
                "https://example.com/audio/media.mp3".to_string(),
            ],
            ..entry()
        };

        assert_eq!(
            resolver.resolve(&entry).await.unwrap(),
            "https://example.com/audio/media.mp3"
        );
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn relative_enclosure_is_skipped() {
        let client = PageClient::serving(PAGE_WITH_AUDIO);
        let resolver = AudioResolver::new(&client, &TokioSleeper, options());
        let entry = FeedEntry {
            enclosures: vec!["audio/ep1.mp3".to_string()],
            ..entry()
        };

        assert_eq!(
            resolver.resolve(&entry).await.unwrap(),
            "https://www.bbc.co.uk/media/ep2.mp3"
        );
    }

    #[tokio::test]
    async fn scrape_rewrites_site_relative_link() {
        let client = PageClient::serving(PAGE_WITH_AUDIO);
        let resolver = AudioResolver::new(&client, &TokioSleeper, options());

        let url = resolver.resolve(&entry()).await.unwrap();

        assert_eq!(url, "https://www.bbc.co.uk/media/ep2.mp3");
        assert_eq!(
            *client.requests.lock().unwrap(),
            vec!["https://www.bbc.co.uk/learningenglish/ep".to_string()]
        );
    }

    #[tokio::test]
    async fn nothing_resolvable_is_not_found() {
        let client = PageClient::serving(r#"<a href="/about">About</a>"#);
        let resolver = AudioResolver::new(&client, &TokioSleeper, options());

        let err = resolver.resolve(&entry()).await.unwrap_err();

        assert_eq!(
            err,
            ResolveError::NotFound {
                title: "Test Episode".to_string()
            }
        );
    }

    #[tokio::test]
    async fn page_fetch_failure_is_not_found() {
        let client = PageClient::failing(404);
        let resolver = AudioResolver::new(&client, &TokioSleeper, options());

        let err = resolver.resolve(&entry()).await.unwrap_err();

        assert!(matches!(err, ResolveError::NotFound { .. }));
        assert_eq!(client.request_count(), 1);
    }

    #[tokio::test]
    async fn entry_without_link_is_not_found() {
        let client = PageClient::serving(PAGE_WITH_AUDIO);
        let resolver = AudioResolver::new(&client, &TokioSleeper, options());
        let entry = FeedEntry {
            link: None,
            ..entry()
        };

        assert!(resolver.resolve(&entry).await.is_err());
        assert_eq!(client.request_count(), 0);
    }
}
