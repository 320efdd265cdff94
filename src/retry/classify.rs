// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::policy::ErrorKind;

/// Classify an HTTP status code for retry decisions
pub fn classify_http_status(status: u16) -> ErrorKind {
    match status {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(status),
        _ => ErrorKind::Other,
    }
}

/// Classify a reqwest transport error for retry decisions
pub fn classify_reqwest_error(e: &reqwest::Error) -> ErrorKind {
    if e.is_timeout() {
        return ErrorKind::Timeout;
    }
    if let Some(status) = e.status() {
        return classify_http_status(status.as_u16());
    }
    if e.is_connect() || e.is_request() || e.is_body() {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}
