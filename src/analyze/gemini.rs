// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AnalyzeError;

use super::{AiService, JobState, RemoteFile};

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gemini-flash-latest";

const BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Generative Language API client (Files API + generateContent)
#[derive(Clone)]
pub struct GeminiService {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiService {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn resource_url(&self, name: &str) -> String {
        format!("{}/v1beta/{}", self.base_url, name)
    }
}

#[async_trait]
impl AiService for GeminiService {
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<RemoteFile, AnalyzeError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AnalyzeError::FileRead {
                path: path.to_path_buf(),
                source: e,
            })?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        // Resumable upload: announce the file, then send the bytes to the returned session URL
        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&UploadRequest {
                file: UploadMetadata { display_name },
            })
            .send()
            .await?;
        let start = ensure_success(start).await?;

        let session_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| AnalyzeError::Api {
                status: start.status().as_u16(),
                message: "upload session URL missing from response".to_string(),
            })?;

        let response = self
            .client
            .post(session_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;
        let envelope: FileEnvelope = ensure_success(response).await?.json().await?;

        Ok(envelope.file.into_remote(mime_type))
    }

    async fn status(&self, file: &RemoteFile) -> Result<RemoteFile, AnalyzeError> {
        let response = self
            .client
            .get(self.resource_url(&file.name))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let api_file: ApiFile = ensure_success(response).await?.json().await?;

        Ok(api_file.into_remote(&file.mime_type))
    }

    async fn generate(&self, file: &RemoteFile, prompt: &str) -> Result<String, AnalyzeError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::FileData {
                        file_data: FileData {
                            mime_type: file.mime_type.clone(),
                            file_uri: file.uri.clone(),
                        },
                    },
                    Part::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;
        let body: GenerateResponse = ensure_success(response).await?.json().await?;

        Ok(body.text())
    }

    async fn delete(&self, file: &RemoteFile) -> Result<(), AnalyzeError> {
        let response = self
            .client
            .delete(self.resource_url(&file.name))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// Turn a non-2xx response into an `Api` error carrying the server's message
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, AnalyzeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    Err(AnalyzeError::Api {
        status: status.as_u16(),
        message,
    })
}

#[derive(Serialize)]
struct UploadRequest {
    file: UploadMetadata,
}

#[derive(Serialize)]
struct UploadMetadata {
    display_name: String,
}

#[derive(Deserialize)]
struct FileEnvelope {
    file: ApiFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFile {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

impl ApiFile {
    fn into_remote(self, fallback_mime: &str) -> RemoteFile {
        RemoteFile {
            state: parse_state(self.state.as_deref()),
            name: self.name,
            uri: self.uri,
            mime_type: self.mime_type.unwrap_or_else(|| fallback_mime.to_string()),
        }
    }
}

fn parse_state(state: Option<&str>) -> JobState {
    match state {
        Some("ACTIVE") => JobState::Ready,
        Some("FAILED") => JobState::Failed,
        // PROCESSING, STATE_UNSPECIFIED, or absent
        _ => JobState::Processing,
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    FileData { file_data: FileData },
    Text { text: String },
}

#[derive(Serialize)]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}
