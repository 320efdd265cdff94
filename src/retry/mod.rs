// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded retry with exponential backoff for every network boundary.
//!
//! Errors are mapped to an [`ErrorKind`]; only transient kinds are retried.
//! Sleeping goes through the [`Sleeper`] trait so tests never wait on a
//! real clock.

mod classify;
mod policy;
mod run;

pub use classify::{classify_http_status, classify_reqwest_error};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::{Retryable, Sleeper, TokioSleeper, run_with_retry};
