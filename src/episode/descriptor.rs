// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Placeholder used when the feed omits a title or a publish date
pub const UNKNOWN: &str = "Unknown";

/// The episode chosen for a run. Fields are fixed once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeDescriptor {
    title: String,
    publish_date: String,
    audio_url: String,
}

impl EpisodeDescriptor {
    /// `audio_url` must come from the resolver, which guarantees an absolute
    /// HTTP(S) URL ending in the audio extension.
    pub(crate) fn new(title: String, publish_date: String, audio_url: String) -> Self {
        Self {
            title,
            publish_date,
            audio_url,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Display-only publish date
    pub fn publish_date(&self) -> &str {
        &self.publish_date
    }

    pub fn audio_url(&self) -> &str {
        &self.audio_url
    }
}

/// Render a raw feed date for display. The text is only trimmed, never reinterpreted.
pub fn display_date(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(|| UNKNOWN.to_string(), String::from)
}
