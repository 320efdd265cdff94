// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transcription and vocabulary analysis through a generative-AI service.
//!
//! The remote side is reached through [`AiService`]. [`Analyzer`] drives one
//! job through its states: upload, poll until terminal, generate, delete.

mod gemini;

pub use gemini::{DEFAULT_MODEL, GeminiService};

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AnalyzeError;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::retry::{RetryPolicy, Sleeper, run_with_retry};

/// MIME type sent with uploaded podcast audio
pub const AUDIO_MIME_TYPE: &str = "audio/mpeg";

/// Instructions sent alongside the audio
pub const LESSON_PROMPT: &str = "\
Analyze this English podcast audio.
OUTPUT FORMAT (Plain text only):
1. VOCABULARY (5 Advanced words): Word - Definition (Vietnamese) - Example.
2. TRANSCRIPT: Full verbatim transcript.";

/// Processing state of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Uploaded, not yet observed
    Submitted,
    Processing,
    Ready,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Ready | JobState::Failed)
    }
}

/// Handle to a file stored by the AI service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Resource name, e.g. `files/abc123`
    pub name: String,
    /// URI used to reference the file in generation requests
    pub uri: String,
    pub mime_type: String,
    pub state: JobState,
}

/// Remote generative-AI service boundary
#[async_trait]
pub trait AiService: Send + Sync {
    /// Upload a local file and return its handle
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<RemoteFile, AnalyzeError>;

    /// Refresh a handle with the current remote state
    async fn status(&self, file: &RemoteFile) -> Result<RemoteFile, AnalyzeError>;

    /// Generate text from the file and a prompt
    async fn generate(&self, file: &RemoteFile, prompt: &str) -> Result<String, AnalyzeError>;

    /// Delete the remote file
    async fn delete(&self, file: &RemoteFile) -> Result<(), AnalyzeError>;
}

/// Fixed-interval polling with an upper bound on status queries
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_polls: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_polls: 150,
        }
    }
}

/// Runs one audio file through the AI service
pub struct Analyzer<'a, A: AiService> {
    service: &'a A,
    sleeper: &'a dyn Sleeper,
    poll: PollPolicy,
    retry: RetryPolicy,
    reporter: SharedProgressReporter,
}

impl<'a, A: AiService> Analyzer<'a, A> {
    pub fn new(
        service: &'a A,
        sleeper: &'a dyn Sleeper,
        poll: PollPolicy,
        retry: RetryPolicy,
        reporter: SharedProgressReporter,
    ) -> Self {
        Self {
            service,
            sleeper,
            poll,
            retry,
            reporter,
        }
    }

    /// Upload `audio`, wait for processing, and return the generated lesson text.
    ///
    /// The remote file is deleted once uploaded, whatever happens afterwards.
    pub async fn analyze(&self, audio: &Path) -> Result<String, AnalyzeError> {
        self.reporter.report(ProgressEvent::Uploading);
        let uploaded = run_with_retry(&self.retry, self.sleeper, "upload", || {
            self.service.upload(audio, AUDIO_MIME_TYPE)
        })
        .await?;
        tracing::info!(name = %uploaded.name, "audio uploaded");

        let result = self.process(&uploaded).await;

        if let Err(e) = run_with_retry(&self.retry, self.sleeper, "remote delete", || {
            self.service.delete(&uploaded)
        })
        .await
        {
            tracing::warn!(name = %uploaded.name, "failed to delete remote file: {e}");
        }

        result
    }

    async fn process(&self, uploaded: &RemoteFile) -> Result<String, AnalyzeError> {
        let ready = self.wait_until_ready(uploaded).await?;

        self.reporter.report(ProgressEvent::Generating);
        let text = run_with_retry(&self.retry, self.sleeper, "generate", || {
            self.service.generate(&ready, LESSON_PROMPT)
        })
        .await?;

        if text.trim().is_empty() {
            return Err(AnalyzeError::EmptyResponse);
        }
        Ok(text)
    }

    /// Drive the job from `Submitted` to a terminal state.
    ///
    /// The first status query happens right away; later ones wait `interval`.
    async fn wait_until_ready(&self, uploaded: &RemoteFile) -> Result<RemoteFile, AnalyzeError> {
        let mut current = RemoteFile {
            state: JobState::Submitted,
            ..uploaded.clone()
        };
        let mut polls = 0u32;

        loop {
            match current.state {
                JobState::Ready => return Ok(current),
                JobState::Failed => {
                    return Err(AnalyzeError::ProcessingFailed { name: current.name });
                }
                JobState::Submitted | JobState::Processing => {
                    if polls >= self.poll.max_polls {
                        return Err(AnalyzeError::Timeout {
                            name: current.name,
                            polls,
                        });
                    }
                    if current.state == JobState::Processing {
                        self.reporter
                            .report(ProgressEvent::WaitingForProcessing { poll: polls });
                        self.sleeper.sleep(self.poll.interval).await;
                    }
                    polls += 1;
                    let next = run_with_retry(&self.retry, self.sleeper, "status poll", || {
                        self.service.status(&current)
                    })
                    .await?;
                    current = next;
                    tracing::debug!(name = %current.name, state = ?current.state, polls, "polled");
                }
            }
        }
    }
}
