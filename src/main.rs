// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use console::Emoji;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};

use lessonpull::{
    Config, DocumentBuilder, GeminiService, NoopReporter, Pipeline, PipelineOptions,
    ProgressEvent, ProgressReporter, ReqwestClient, SharedProgressReporter, SmtpNotifier,
    TokioSleeper, logging,
};

// Emoji with fallback for terminals without Unicode support
static BOOKS: Emoji<'_, '_> = Emoji("📚 ", "");
static SEARCH: Emoji<'_, '_> = Emoji("📡 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[v] ");
static CLOUD: Emoji<'_, '_> = Emoji("☁️  ", "[^] ");
static DOCUMENT: Emoji<'_, '_> = Emoji("📄 ", "[d] ");
static MAIL: Emoji<'_, '_> = Emoji("📧 ", "[@] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");

/// Turn the latest podcast episode into an emailed English lesson
#[derive(Parser, Debug)]
#[command(name = "lessonpull")]
#[command(about = "Turn the latest podcast episode into an emailed English lesson")]
#[command(version)]
struct Args {
    /// RSS feed URL or path to local RSS file (overrides FEED_URL)
    #[arg(short, long)]
    feed: Option<String>,

    /// Directory for the lesson document (overrides OUTPUT_DIR)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Gemini model name (overrides GEMINI_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Quiet mode - suppress progress output
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Progress reporter using an indicatif spinner
struct SpinnerReporter {
    bar: ProgressBar,
}

impl SpinnerReporter {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {wide_msg}")
                .unwrap(),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }
}

impl ProgressReporter for SpinnerReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FetchingFeed { source } => {
                self.bar
                    .set_message(format!("{SEARCH}Fetching feed: {}", source.cyan()));
            }

            ProgressEvent::EpisodeResolved { title, audio_url } => {
                self.bar.println(format!(
                    "{HEADPHONES}{} {}",
                    title.bold().green(),
                    audio_url.dimmed()
                ));
            }

            ProgressEvent::DownloadStarting { content_length } => {
                let size = content_length
                    .map(|len| HumanBytes(len).to_string())
                    .unwrap_or_else(|| "unknown size".to_string());
                self.bar
                    .set_message(format!("{DOWNLOAD}Downloading audio ({size})"));
            }

            ProgressEvent::DownloadProgress {
                bytes_downloaded,
                total_bytes,
            } => {
                let total = total_bytes
                    .map(|t| format!(" / {}", HumanBytes(t)))
                    .unwrap_or_default();
                self.bar.set_message(format!(
                    "{DOWNLOAD}Downloading audio {}{total}",
                    HumanBytes(bytes_downloaded)
                ));
            }

            ProgressEvent::DownloadCompleted { bytes_downloaded } => {
                self.bar.println(format!(
                    "{DOWNLOAD}Downloaded {}",
                    HumanBytes(bytes_downloaded).to_string().cyan()
                ));
            }

            ProgressEvent::Uploading => {
                self.bar.set_message(format!("{CLOUD}Uploading audio"));
            }

            ProgressEvent::WaitingForProcessing { poll } => {
                self.bar.set_message(format!(
                    "{CLOUD}Waiting for processing (check {})",
                    (poll + 1).to_string().yellow()
                ));
            }

            ProgressEvent::Generating => {
                self.bar
                    .set_message(format!("{CLOUD}Generating transcript and vocabulary"));
            }

            ProgressEvent::DocumentWritten { path } => {
                self.bar
                    .println(format!("{DOCUMENT}Document: {}", path.cyan()));
            }

            ProgressEvent::Sending { recipient } => {
                self.bar
                    .set_message(format!("{MAIL}Sending to {}", recipient.cyan()));
            }

            ProgressEvent::Completed { .. } => {
                self.bar.finish_and_clear();
            }

            // The error chain itself is printed once by `main`
            ProgressEvent::Failed { .. } => {
                self.bar
                    .abandon_with_message(format!("{FAILURE}{}", "Run failed".red()));
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose);

    if !args.quiet {
        println!(
            "\n{}{} {}\n",
            BOOKS,
            "lessonpull".bold().magenta(),
            "- Podcast English Lessons".dimmed()
        );
    }

    let mut config = Config::from_env().context("Configuration error")?;
    if let Some(feed) = args.feed {
        config.feed_url = feed;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(model) = args.model {
        config.model = model;
    }

    let client = ReqwestClient::new().context("Failed to create HTTP client")?;
    let gemini = GeminiService::new(
        client.inner().clone(),
        config.api_key.clone(),
        config.model.clone(),
    );
    let sleeper = TokioSleeper;
    let notifier = SmtpNotifier::new(config.smtp_settings(), config.retry, &sleeper)
        .context("Failed to configure SMTP transport")?;

    let reporter: SharedProgressReporter = if args.quiet {
        NoopReporter::shared()
    } else {
        Arc::new(SpinnerReporter::new())
    };

    let pipeline = Pipeline::new(
        &client,
        &gemini,
        &notifier,
        DocumentBuilder::new(&config.output_dir),
        &sleeper,
        reporter,
        PipelineOptions::from_config(&config),
    );

    let summary = pipeline.run().await.context("Failed to produce lesson")?;

    println!(
        "\n{SUCCESS}{} {}\n",
        "Done:".bold().green(),
        summary.document.display().to_string().cyan()
    );

    Ok(())
}
