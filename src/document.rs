// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use docx_rs::{Docx, Paragraph, Run, Style, StyleType};

use crate::episode::EpisodeDescriptor;
use crate::error::DocumentError;

const FILENAME_PREFIX: &str = "English_Lesson_";
const FILENAME_FALLBACK: &str = "Untitled";

/// Paragraph style of the episode title
const TITLE_STYLE: &str = "Title";

/// Title size in half-points
const TITLE_SIZE: usize = 36;

/// Derive the document filename from an episode title.
///
/// Only ASCII letters and digits survive; whitespace runs become a single `_`.
pub fn document_filename(title: &str) -> String {
    let words: Vec<String> = title
        .split_whitespace()
        .map(|word| word.chars().filter(char::is_ascii_alphanumeric).collect())
        .filter(|word: &String| !word.is_empty())
        .collect();

    let stem = if words.is_empty() {
        FILENAME_FALLBACK.to_string()
    } else {
        words.join("_")
    };

    format!("{FILENAME_PREFIX}{stem}.docx")
}

/// Writes lesson documents into a fixed directory
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    output_dir: PathBuf,
}

impl DocumentBuilder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the title heading, date line, and AI text; return the document path
    pub fn build(
        &self,
        episode: &EpisodeDescriptor,
        content: &str,
    ) -> Result<PathBuf, DocumentError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| DocumentError::CreateDir {
            path: self.output_dir.clone(),
            source: e,
        })?;

        let path = self.output_dir.join(document_filename(episode.title()));

        let docx = lesson_docx(episode, content);
        let file = std::fs::File::create(&path).map_err(|e| DocumentError::CreateFile {
            path: path.clone(),
            source: e,
        })?;
        docx.build()
            .pack(file)
            .map_err(|e| DocumentError::Pack {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(path = %path.display(), "lesson document written");
        Ok(path)
    }
}

/// Title paragraph, date line, then one paragraph per line of AI text
fn lesson_docx(episode: &EpisodeDescriptor, content: &str) -> Docx {
    let title_style = Style::new(TITLE_STYLE, StyleType::Paragraph)
        .name(TITLE_STYLE)
        .bold()
        .size(TITLE_SIZE);

    let mut docx = Docx::new()
        .add_style(title_style)
        .add_paragraph(
            Paragraph::new()
                .style(TITLE_STYLE)
                .add_run(Run::new().add_text(episode.title())),
        )
        .add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(format!("Date: {}", episode.publish_date()))),
        );
    for line in content.lines() {
        docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(line)));
    }
    docx
}
