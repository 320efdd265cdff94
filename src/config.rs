// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run configuration, read once from the environment (and `.env`).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::analyze::{DEFAULT_MODEL, PollPolicy};
use crate::error::ConfigError;
use crate::notify::{SmtpSecurity, SmtpSettings};
use crate::retry::RetryPolicy;

/// BBC Learning English "6 Minute English"
pub const DEFAULT_FEED_URL: &str =
    "http://feeds.bbci.co.uk/learningenglish/english/features/6-minute-english/rss";
pub const DEFAULT_SITE_ORIGIN: &str = "https://www.bbc.co.uk";
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_TEMP_AUDIO_FILE: &str = "temp_podcast.mp3";
pub const AUDIO_EXTENSION: &str = ".mp3";

const EMAIL_SENDER: &str = "EMAIL_SENDER";
const EMAIL_PASSWORD: &str = "EMAIL_PASSWORD";
const EMAIL_RECEIVER: &str = "EMAIL_RECEIVER";
const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";

/// Everything a run needs, validated up front
#[derive(Debug, Clone)]
pub struct Config {
    pub email_sender: String,
    pub email_password: String,
    pub email_receiver: String,
    pub api_key: String,
    pub feed_url: String,
    pub model: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_security: SmtpSecurity,
    pub site_origin: Url,
    pub output_dir: PathBuf,
    pub temp_audio_file: PathBuf,
    pub poll: PollPolicy,
    pub retry: RetryPolicy,
}

impl Config {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("ignoring unreadable .env: {e}"),
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    ///
    /// Empty values count as missing. All missing required names are reported together.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let mut require = |name: &'static str| {
            get(name).unwrap_or_else(|| {
                missing.push(name);
                String::new()
            })
        };
        let email_sender = require(EMAIL_SENDER);
        let email_password = require(EMAIL_PASSWORD);
        let email_receiver = require(EMAIL_RECEIVER);
        let api_key = require(GOOGLE_API_KEY);
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let smtp_security = match get("SMTP_TLS").as_deref().map(str::to_ascii_lowercase) {
            None => SmtpSecurity::StartTls,
            Some(v) if v == "starttls" => SmtpSecurity::StartTls,
            Some(v) if v == "implicit" => SmtpSecurity::Implicit,
            Some(v) => {
                return Err(ConfigError::Invalid {
                    name: "SMTP_TLS",
                    reason: format!("expected 'starttls' or 'implicit', got '{v}'"),
                });
            }
        };

        let site_origin = get("SITE_ORIGIN").unwrap_or_else(|| DEFAULT_SITE_ORIGIN.to_string());
        let site_origin = Url::parse(&site_origin).map_err(|e| ConfigError::Invalid {
            name: "SITE_ORIGIN",
            reason: e.to_string(),
        })?;

        let poll_defaults = PollPolicy::default();
        let poll = PollPolicy {
            interval: Duration::from_secs(positive(
                "POLL_INTERVAL_SECS",
                parse_or(&get, "POLL_INTERVAL_SECS", poll_defaults.interval.as_secs())?,
            )?),
            max_polls: positive(
                "MAX_POLLS",
                parse_or(&get, "MAX_POLLS", poll_defaults.max_polls)?,
            )?,
        };

        let retry_defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: parse_or(&get, "RETRY_MAX_ATTEMPTS", retry_defaults.max_attempts)?.max(1),
            ..retry_defaults
        };

        Ok(Self {
            email_sender,
            email_password,
            email_receiver,
            api_key,
            feed_url: get("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            smtp_host: get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            smtp_port: parse_or(&get, "SMTP_PORT", smtp_security.default_port())?,
            smtp_security,
            site_origin,
            output_dir: get("OUTPUT_DIR").map_or_else(|| PathBuf::from("."), PathBuf::from),
            temp_audio_file: get("TEMP_AUDIO_FILE")
                .map_or_else(|| PathBuf::from(DEFAULT_TEMP_AUDIO_FILE), PathBuf::from),
            poll,
            retry,
        })
    }

    pub fn smtp_settings(&self) -> SmtpSettings {
        SmtpSettings {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            security: self.smtp_security,
            sender: self.email_sender.clone(),
            password: self.email_password.clone(),
            recipient: self.email_receiver.clone(),
        }
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}

fn positive<T>(name: &'static str, value: T) -> Result<T, ConfigError>
where
    T: PartialOrd + Default,
{
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".to_string(),
        })
    }
}
