// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::DownloadError;
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::retry::{RetryPolicy, Sleeper, run_with_retry};

/// Outcome of a successful download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// Number of bytes written
    pub bytes: u64,
    /// Hash of the downloaded content, "sha256:<hex>"
    pub content_hash: String,
}

/// Download `url` to `output_path`, retrying transient failures.
///
/// Each attempt starts the file over from scratch.
pub async fn download_audio<C: HttpClient>(
    client: &C,
    url: &str,
    output_path: &Path,
    retry: &RetryPolicy,
    sleeper: &dyn Sleeper,
    reporter: &SharedProgressReporter,
) -> Result<DownloadResult, DownloadError> {
    let result = run_with_retry(retry, sleeper, "audio download", || {
        download_once(client, url, output_path, reporter)
    })
    .await?;

    tracing::info!(
        bytes = result.bytes,
        hash = %result.content_hash,
        path = %output_path.display(),
        "audio downloaded"
    );
    Ok(result)
}

async fn download_once<C: HttpClient>(
    client: &C,
    url: &str,
    output_path: &Path,
    reporter: &SharedProgressReporter,
) -> Result<DownloadResult, DownloadError> {
    let response = client
        .get_stream(url)
        .await
        .map_err(|e| DownloadError::HttpFailed {
            url: url.to_string(),
            source: e,
        })?;

    if !(200..300).contains(&response.status) {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    reporter.report(ProgressEvent::DownloadStarting {
        content_length: response.content_length,
    });

    let mut file =
        File::create(output_path)
            .await
            .map_err(|e| DownloadError::FileCreateFailed {
                path: output_path.to_path_buf(),
                source: e,
            })?;

    let mut hasher = Sha256::new();
    let mut bytes_downloaded: u64 = 0;
    let mut stream = response.body;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::StreamFailed {
            url: url.to_string(),
            source: e,
        })?;

        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::FileWriteFailed {
                path: output_path.to_path_buf(),
                source: e,
            })?;

        hasher.update(&chunk);
        bytes_downloaded += chunk.len() as u64;

        reporter.report(ProgressEvent::DownloadProgress {
            bytes_downloaded,
            total_bytes: response.content_length,
        });
    }

    file.flush()
        .await
        .map_err(|e| DownloadError::FileWriteFailed {
            path: output_path.to_path_buf(),
            source: e,
        })?;

    reporter.report(ProgressEvent::DownloadCompleted { bytes_downloaded });

    Ok(DownloadResult {
        bytes: bytes_downloaded,
        content_hash: format!("sha256:{:x}", hasher.finalize()),
    })
}
