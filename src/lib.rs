// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod analyze;
pub mod config;
pub mod document;
pub mod episode;
pub mod error;
pub mod feed;
pub mod http;
pub mod logging;
pub mod notify;
pub mod pipeline;
pub mod progress;
pub mod resolve;
pub mod retry;

// Re-export main types for convenience
pub use analyze::{AiService, Analyzer, GeminiService, JobState, PollPolicy, RemoteFile};
pub use config::Config;
pub use document::{DocumentBuilder, document_filename};
pub use episode::{DownloadResult, EpisodeDescriptor, download_audio, fetch_latest_episode};
pub use error::{
    AnalyzeError, ConfigError, DocumentError, DownloadError, EpisodeError, FeedError, HttpError,
    MailError, PipelineError, ResolveError,
};
pub use feed::{Feed, FeedEntry, is_url, load_feed, parse_feed};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use notify::{Notifier, SmtpNotifier, SmtpSecurity, SmtpSettings};
pub use pipeline::{Pipeline, PipelineOptions, RunSummary};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use resolve::{AudioResolver, ResolverOptions};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
