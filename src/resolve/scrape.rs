// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid anchor selector"));

/// Find the first anchor whose href ends with `extension` (case-insensitive)
///
/// Hrefs are trimmed before matching. Site-relative hrefs (`/...`) are resolved
/// against `site_origin` with URL-join rules, so `//host/...` keeps the origin's
/// scheme only and any path on the origin is replaced. Other relative hrefs are
/// joined to `page_url`.
pub fn find_audio_link(
    html: &str,
    page_url: Option<&Url>,
    site_origin: &Url,
    extension: &str,
) -> Option<String> {
    let document = Html::parse_document(html);
    let extension = extension.to_lowercase();

    document
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| href.to_lowercase().ends_with(&extension))
        .find_map(|href| absolutize(href, page_url, site_origin))
        .map(String::from)
}

fn absolutize(href: &str, page_url: Option<&Url>, site_origin: &Url) -> Option<Url> {
    let url = if href.starts_with('/') {
        site_origin.join(href).ok()?
    } else {
        match Url::parse(href) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => page_url?.join(href).ok()?,
            Err(_) => return None,
        }
    };

    matches!(url.scheme(), "http" | "https").then_some(url)
}
