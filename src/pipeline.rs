// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use crate::analyze::{AiService, Analyzer, PollPolicy};
use crate::config::{AUDIO_EXTENSION, Config};
use crate::document::DocumentBuilder;
use crate::episode::{DownloadResult, EpisodeDescriptor, download_audio, fetch_latest_episode};
use crate::error::PipelineError;
use crate::http::HttpClient;
use crate::notify::{MAIL_BODY, Notifier, subject_for};
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::resolve::{AudioResolver, ResolverOptions};
use crate::retry::{RetryPolicy, Sleeper};

/// Settings for a single run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Feed URL or local file path
    pub feed_source: String,
    /// Where the audio is kept while it is being analyzed
    pub temp_audio_file: PathBuf,
    pub resolver: ResolverOptions,
    pub retry: RetryPolicy,
    pub poll: PollPolicy,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            feed_source: config.feed_url.clone(),
            temp_audio_file: config.temp_audio_file.clone(),
            resolver: ResolverOptions {
                site_origin: config.site_origin.clone(),
                extension: AUDIO_EXTENSION.to_string(),
                retry: config.retry,
            },
            retry: config.retry,
            poll: config.poll,
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub episode: EpisodeDescriptor,
    pub document: PathBuf,
    pub download: DownloadResult,
}

/// Owns the temporary audio file and removes it when dropped
struct TempAudio {
    path: PathBuf,
}

impl TempAudio {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempAudio {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "temporary audio removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "could not remove temporary audio: {e}")
            }
        }
    }
}

/// Sequences fetch, download, analysis, document, and email
pub struct Pipeline<'a, C: HttpClient, A: AiService, N: Notifier> {
    client: &'a C,
    ai: &'a A,
    notifier: &'a N,
    documents: DocumentBuilder,
    sleeper: &'a dyn Sleeper,
    reporter: SharedProgressReporter,
    options: PipelineOptions,
}

impl<'a, C: HttpClient, A: AiService, N: Notifier> Pipeline<'a, C, A, N> {
    pub fn new(
        client: &'a C,
        ai: &'a A,
        notifier: &'a N,
        documents: DocumentBuilder,
        sleeper: &'a dyn Sleeper,
        reporter: SharedProgressReporter,
        options: PipelineOptions,
    ) -> Self {
        Self {
            client,
            ai,
            notifier,
            documents,
            sleeper,
            reporter,
            options,
        }
    }

    /// Run every stage once. The temporary audio file is gone when this returns.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let temp = TempAudio::new(self.options.temp_audio_file.clone());
        let result = self.run_stages(&temp).await;
        drop(temp);

        if let Err(e) = &result {
            self.reporter.report(ProgressEvent::Failed {
                error: e.to_string(),
            });
        }
        result
    }

    async fn run_stages(&self, temp: &TempAudio) -> Result<RunSummary, PipelineError> {
        self.reporter.report(ProgressEvent::FetchingFeed {
            source: self.options.feed_source.clone(),
        });
        let resolver = AudioResolver::new(self.client, self.sleeper, self.options.resolver.clone());
        let episode = fetch_latest_episode(
            self.client,
            &self.options.feed_source,
            &resolver,
            &self.options.retry,
            self.sleeper,
        )
        .await?;
        self.reporter.report(ProgressEvent::EpisodeResolved {
            title: episode.title().to_string(),
            audio_url: episode.audio_url().to_string(),
        });

        let download = download_audio(
            self.client,
            episode.audio_url(),
            temp.path(),
            &self.options.retry,
            self.sleeper,
            &self.reporter,
        )
        .await?;

        let analyzer = Analyzer::new(
            self.ai,
            self.sleeper,
            self.options.poll,
            self.options.retry,
            self.reporter.clone(),
        );
        let lesson = analyzer.analyze(temp.path()).await?;

        let document = self.documents.build(&episode, &lesson)?;
        self.reporter.report(ProgressEvent::DocumentWritten {
            path: document.display().to_string(),
        });

        self.reporter.report(ProgressEvent::Sending {
            recipient: self.notifier.recipient().to_string(),
        });
        self.notifier
            .send(&subject_for(episode.title()), MAIL_BODY, &document)
            .await?;

        self.reporter.report(ProgressEvent::Completed {
            title: episode.title().to_string(),
        });

        Ok(RunSummary {
            episode,
            document,
            download,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::{JobState, RemoteFile};
    use crate::error::{
        AnalyzeError, EpisodeError, HttpError, MailError, ResolveError,
    };
    use crate::http::{ByteStream, HttpResponse};
    use crate::progress::{NoopReporter, ProgressReporter};
    use std::sync::Arc;
    use crate::retry::TokioSleeper;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::{TempDir, tempdir};
    use url::Url;

    const FEED_URL: &str = "https://feeds.example.com/rss";

    const ENCLOSURE_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>6 Minute English</title><description>x</description>
<item>
  <title>Test Episode</title>
  <link>https://www.bbc.co.uk/learningenglish/test-episode</link>
  <pubDate>Thu, 02 Jan 2025 10:00:00 +0000</pubDate>
  <enclosure url="https://example.com/audio/ep1.mp3" type="audio/mpeg"/>
</item>
</channel></rss>"#;

    const LINK_ONLY_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>6 Minute English</title><description>x</description>
<item>
  <title>Second Episode</title>
  <link>https://www.bbc.co.uk/learningenglish/ep2</link>
</item>
</channel></rss>"#;

    /// Serves the feed, the episode page, and audio; records every URL
    struct SiteClient {
        feed: &'static str,
        page: &'static str,
        requests: Mutex<Vec<String>>,
        streams: Mutex<Vec<String>>,
    }

    impl SiteClient {
        fn new(feed: &'static str, page: &'static str) -> Self {
            Self {
                feed,
                page,
                requests: Mutex::new(Vec::new()),
                streams: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for SiteClient {
        async fn get_bytes(&self, url: &str) -> Result<Bytes, HttpError> {
            self.requests.lock().unwrap().push(url.to_string());
            if url == FEED_URL {
                Ok(Bytes::from_static(self.feed.as_bytes()))
            } else {
                Ok(Bytes::from_static(self.page.as_bytes()))
            }
        }

        async fn get_stream(&self, url: &str) -> Result<HttpResponse, HttpError> {
            self.streams.lock().unwrap().push(url.to_string());
            let body: ByteStream = Box::pin(futures::stream::once(async {
                Ok(Bytes::from_static(b"ID3 fake mp3"))
            }));
            Ok(HttpResponse {
                status: 200,
                content_length: Some(12),
                body,
            })
        }
    }

    /// AI service that checks the audio is on disk while it is being analyzed
    struct FakeAi {
        final_state: JobState,
        deleted: Mutex<bool>,
    }

    impl FakeAi {
        fn with_final_state(final_state: JobState) -> Self {
            Self {
                final_state,
                deleted: Mutex::new(false),
            }
        }
    }

    #[async_trait]
    impl AiService for FakeAi {
        async fn upload(&self, path: &Path, mime_type: &str) -> Result<RemoteFile, AnalyzeError> {
            assert_eq!(std::fs::read(path).unwrap(), b"ID3 fake mp3");
            Ok(RemoteFile {
                name: "files/ep".to_string(),
                uri: "https://example.com/files/ep".to_string(),
                mime_type: mime_type.to_string(),
                state: JobState::Processing,
            })
        }

        async fn status(&self, file: &RemoteFile) -> Result<RemoteFile, AnalyzeError> {
            Ok(RemoteFile {
                state: self.final_state,
                ..file.clone()
            })
        }

        async fn generate(&self, _file: &RemoteFile, _prompt: &str) -> Result<String, AnalyzeError> {
            Ok("1. VOCABULARY\nsustain - duy trì - We must sustain effort.\n2. TRANSCRIPT\nHello.".to_string())
        }

        async fn delete(&self, _file: &RemoteFile) -> Result<(), AnalyzeError> {
            *self.deleted.lock().unwrap() = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, PathBuf)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn recipient(&self) -> &str {
            "learner@example.com"
        }

        async fn send(&self, subject: &str, body: &str, attachment: &Path) -> Result<(), MailError> {
            assert_eq!(body, MAIL_BODY);
            assert!(attachment.exists());
            self.sent
                .lock()
                .unwrap()
                .push((subject.to_string(), attachment.to_path_buf()));
            Ok(())
        }
    }

    fn options(dir: &TempDir) -> PipelineOptions {
        PipelineOptions {
            feed_source: FEED_URL.to_string(),
            temp_audio_file: dir.path().join("temp_podcast.mp3"),
            resolver: ResolverOptions {
                site_origin: Url::parse("https://www.bbc.co.uk").unwrap(),
                extension: ".mp3".to_string(),
                retry: RetryPolicy::none(),
            },
            retry: RetryPolicy::none(),
            poll: PollPolicy {
                interval: Duration::from_millis(1),
                max_polls: 5,
            },
        }
    }

    async fn run(
        dir: &TempDir,
        client: &SiteClient,
        ai: &FakeAi,
        notifier: &RecordingNotifier,
    ) -> Result<RunSummary, PipelineError> {
        Pipeline::new(
            client,
            ai,
            notifier,
            DocumentBuilder::new(dir.path()),
            &TokioSleeper,
            NoopReporter::shared(),
            options(dir),
        )
        .run()
        .await
    }

    #[tokio::test]
    async fn enclosure_episode_end_to_end() {
        let dir = tempdir().unwrap();
        let client = SiteClient::new(ENCLOSURE_FEED, "");
        let ai = FakeAi::with_final_state(JobState::Ready);
        let notifier = RecordingNotifier::default();

        let summary = run(&dir, &client, &ai, &notifier).await.unwrap();

        assert_eq!(summary.episode.audio_url(), "https://example.com/audio/ep1.mp3");
        assert_eq!(summary.episode.publish_date(), "Thu, 02 Jan 2025 10:00:00 +0000");
        assert_eq!(
            summary.document,
            dir.path().join("English_Lesson_Test_Episode.docx")
        );
        assert_eq!(summary.download.bytes, 12);

        // Only the feed was fetched; the page scrape was skipped
        assert_eq!(*client.requests.lock().unwrap(), vec![FEED_URL.to_string()]);
        assert_eq!(
            *client.streams.lock().unwrap(),
            vec!["https://example.com/audio/ep1.mp3".to_string()]
        );

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "[English Daily] Test Episode");
        assert_eq!(sent[0].1, summary.document);

        assert!(*ai.deleted.lock().unwrap());
        assert!(!dir.path().join("temp_podcast.mp3").exists());
    }

    #[tokio::test]
    async fn scraped_episode_end_to_end() {
        let dir = tempdir().unwrap();
        let client = SiteClient::new(
            LINK_ONLY_FEED,
            r#"<html><body><a href="/media/ep2.mp3">Download</a></body></html>"#,
        );
        let ai = FakeAi::with_final_state(JobState::Ready);
        let notifier = RecordingNotifier::default();

        let summary = run(&dir, &client, &ai, &notifier).await.unwrap();

        assert_eq!(
            summary.episode.audio_url(),
            "https://www.bbc.co.uk/media/ep2.mp3"
        );
        assert_eq!(summary.episode.publish_date(), "Unknown");
        assert_eq!(
            *client.streams.lock().unwrap(),
            vec!["https://www.bbc.co.uk/media/ep2.mp3".to_string()]
        );
    }

    #[tokio::test]
    async fn unresolvable_audio_skips_download() {
        let dir = tempdir().unwrap();
        let client = SiteClient::new(LINK_ONLY_FEED, "<p>No audio today</p>");
        let ai = FakeAi::with_final_state(JobState::Ready);
        let notifier = RecordingNotifier::default();

        let err = run(&dir, &client, &ai, &notifier).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Episode(EpisodeError::Resolve(ResolveError::NotFound { .. }))
        ));
        assert!(client.streams.lock().unwrap().is_empty());
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_processing_cleans_up_audio() {
        let dir = tempdir().unwrap();
        let client = SiteClient::new(ENCLOSURE_FEED, "");
        let ai = FakeAi::with_final_state(JobState::Failed);
        let notifier = RecordingNotifier::default();

        let err = run(&dir, &client, &ai, &notifier).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Analyze(AnalyzeError::ProcessingFailed { .. })
        ));
        // The download happened, and the file is gone again
        assert_eq!(client.streams.lock().unwrap().len(), 1);
        assert!(!dir.path().join("temp_podcast.mp3").exists());
        assert!(*ai.deleted.lock().unwrap());
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    /// Keeps the text of every `Failed` event
    #[derive(Default)]
    struct FailureRecorder {
        failures: Mutex<Vec<String>>,
    }

    impl ProgressReporter for FailureRecorder {
        fn report(&self, event: ProgressEvent) {
            if let ProgressEvent::Failed { error } = event {
                self.failures.lock().unwrap().push(error);
            }
        }
    }

    #[tokio::test]
    async fn failure_is_reported_once() {
        let dir = tempdir().unwrap();
        let client = SiteClient::new(ENCLOSURE_FEED, "");
        let ai = FakeAi::with_final_state(JobState::Failed);
        let notifier = RecordingNotifier::default();
        let recorder = Arc::new(FailureRecorder::default());

        let err = Pipeline::new(
            &client,
            &ai,
            &notifier,
            DocumentBuilder::new(dir.path()),
            &TokioSleeper,
            recorder.clone(),
            options(&dir),
        )
        .run()
        .await
        .unwrap_err();

        let failures = recorder.failures.lock().unwrap();
        assert_eq!(*failures, vec![err.to_string()]);
    }

    #[tokio::test]
    async fn repeated_runs_resolve_the_same_url() {
        let dir = tempdir().unwrap();
        let client = SiteClient::new(ENCLOSURE_FEED, "");
        let ai = FakeAi::with_final_state(JobState::Ready);
        let notifier = RecordingNotifier::default();

        let first = run(&dir, &client, &ai, &notifier).await.unwrap();
        let second = run(&dir, &client, &ai, &notifier).await.unwrap();

        assert_eq!(first.episode, second.episode);
        assert_eq!(first.document, second.document);
        assert_eq!(first.download, second.download);
    }

    #[test]
    fn temp_audio_guard_removes_file_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("temp_podcast.mp3");
        std::fs::write(&path, b"audio").unwrap();

        drop(TempAudio::new(path.clone()));

        assert!(!path.exists());
    }

    #[test]
    fn options_follow_config() {
        let config = Config::from_lookup(|name| match name {
            "EMAIL_SENDER" => Some("sender@example.com".to_string()),
            "EMAIL_PASSWORD" => Some("secret".to_string()),
            "EMAIL_RECEIVER" => Some("learner@example.com".to_string()),
            "GOOGLE_API_KEY" => Some("key".to_string()),
            "FEED_URL" => Some("/tmp/feed.xml".to_string()),
            _ => None,
        })
        .unwrap();

        let options = PipelineOptions::from_config(&config);

        assert_eq!(options.feed_source, "/tmp/feed.xml");
        assert_eq!(options.resolver.extension, ".mp3");
        assert_eq!(options.resolver.site_origin.as_str(), "https://www.bbc.co.uk/");
    }
}
