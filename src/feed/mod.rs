// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod fetch;
mod parse;

pub use fetch::{is_url, load_feed};
pub use parse::{Feed, FeedEntry, parse_feed};
