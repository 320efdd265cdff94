// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

/// Events emitted while a lesson is being produced
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Feed is being fetched from URL or read from disk
    FetchingFeed { source: String },

    /// The latest episode and its audio URL are known
    EpisodeResolved { title: String, audio_url: String },

    /// The audio download is starting
    DownloadStarting {
        /// Expected content length in bytes, if known
        content_length: Option<u64>,
    },

    /// Download progress update
    DownloadProgress {
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// The audio download completed successfully
    DownloadCompleted { bytes_downloaded: u64 },

    /// Audio is being uploaded to the AI service
    Uploading,

    /// The AI service is still processing the upload
    WaitingForProcessing { poll: u32 },

    /// Transcript and vocabulary are being generated
    Generating,

    /// The lesson document has been written
    DocumentWritten { path: String },

    /// The email is being sent
    Sending { recipient: String },

    /// The run finished successfully
    Completed { title: String },

    /// The run stopped with an error
    Failed { error: String },
}

/// Trait for reporting progress events during a run.
///
/// Implementations can use this to display spinners, log messages,
/// or collect events in tests.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {
        // Intentionally empty
    }
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_reporter_handles_all_events() {
        let reporter = NoopReporter::shared();

        reporter.report(ProgressEvent::FetchingFeed {
            source: "https://example.com/feed.xml".to_string(),
        });
        reporter.report(ProgressEvent::EpisodeResolved {
            title: "Episode 1".to_string(),
            audio_url: "https://example.com/ep1.mp3".to_string(),
        });
        reporter.report(ProgressEvent::DownloadStarting {
            content_length: Some(1024),
        });
        reporter.report(ProgressEvent::DownloadProgress {
            bytes_downloaded: 512,
            total_bytes: Some(1024),
        });
        reporter.report(ProgressEvent::DownloadCompleted {
            bytes_downloaded: 1024,
        });
        reporter.report(ProgressEvent::Uploading);
        reporter.report(ProgressEvent::WaitingForProcessing { poll: 1 });
        reporter.report(ProgressEvent::Generating);
        reporter.report(ProgressEvent::DocumentWritten {
            path: "English_Lesson_Episode_1.docx".to_string(),
        });
        reporter.report(ProgressEvent::Sending {
            recipient: "learner@example.com".to_string(),
        });
        reporter.report(ProgressEvent::Completed {
            title: "Episode 1".to_string(),
        });
        reporter.report(ProgressEvent::Failed {
            error: "Mail error: SMTP delivery failed".to_string(),
        });
    }
}
