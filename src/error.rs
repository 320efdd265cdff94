// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

use crate::retry::{ErrorKind, Retryable, classify_http_status, classify_reqwest_error};

/// Errors raised while loading configuration from the environment
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Errors produced by the HTTP seam
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },
}

impl Retryable for HttpError {
    fn kind(&self) -> ErrorKind {
        match self {
            HttpError::Request(e) => classify_reqwest_error(e),
            HttpError::Status { status } => classify_http_status(*status),
        }
    }
}

/// Errors that can occur when fetching or parsing RSS feeds
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("Failed to read feed file {path}: {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse RSS feed: {0}")]
    ParseFailed(#[from] rss::Error),

    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Feed contains no entries")]
    EmptyFeed,
}

/// Errors raised by the audio resolver
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("No audio URL found for episode '{title}'")]
    NotFound { title: String },
}

/// Errors raised while turning a feed into an episode descriptor
#[derive(Error, Debug)]
pub enum EpisodeError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Errors that can occur during the audio download
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl Retryable for DownloadError {
    fn kind(&self) -> ErrorKind {
        match self {
            DownloadError::HttpFailed { source, .. } => source.kind(),
            DownloadError::HttpStatus { status, .. } => classify_http_status(*status),
            DownloadError::StreamFailed { source, .. } => classify_reqwest_error(source),
            DownloadError::FileCreateFailed { .. } | DownloadError::FileWriteFailed { .. } => {
                ErrorKind::Other
            }
        }
    }
}

/// Errors raised by the generative-AI analysis stage
#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Request to AI service failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("AI service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Remote processing of {name} failed")]
    ProcessingFailed { name: String },

    #[error("Remote file {name} was not ready after {polls} polls")]
    Timeout { name: String, polls: u32 },

    #[error("AI service returned no text")]
    EmptyResponse,

    #[error("Failed to read audio file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Retryable for AnalyzeError {
    fn kind(&self) -> ErrorKind {
        match self {
            AnalyzeError::Request(e) => classify_reqwest_error(e),
            AnalyzeError::Api { status, .. } => classify_http_status(*status),
            _ => ErrorKind::Other,
        }
    }
}

/// Errors raised while writing the lesson document
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create document {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write document {path}: {reason}")]
    Pack { path: PathBuf, reason: String },
}

/// Errors raised while composing or delivering the email
#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid email address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("Failed to read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

impl Retryable for MailError {
    fn kind(&self) -> ErrorKind {
        match self {
            MailError::Transport(e) if e.is_transient() => ErrorKind::Connection,
            MailError::Transport(e) if e.is_timeout() => ErrorKind::Timeout,
            _ => ErrorKind::Other,
        }
    }
}

/// Top-level errors for a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Episode error: {0}")]
    Episode(#[from] EpisodeError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("AI processing error: {0}")]
    Analyze(#[from] AnalyzeError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),
}
