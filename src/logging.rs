// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
///
/// Quiet runs keep stage events off stderr, where the spinner draws.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "info,lessonpull=debug"
    } else {
        "warn"
    }
}

/// Initialize structured logging to stderr. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
