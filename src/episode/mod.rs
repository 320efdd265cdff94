// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod descriptor;
mod download;
mod fetch;

pub use descriptor::{EpisodeDescriptor, UNKNOWN, display_date};
pub use download::{DownloadResult, download_audio};
pub use fetch::fetch_latest_episode;
