//! Generated file naming and the on-disk output store.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extract::{extract_code_blocks, CodeBlock, Section, DEFAULT_LANGUAGE};

/// Name of the file holding the combined pipeline output.
pub const FULL_RESULT_FILE: &str = "full_result.txt";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A file written from pipeline output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub filename: String,
    pub language: String,
    pub section: Option<Section>,
    pub content: String,
    pub path: PathBuf,
}

/// Pick an extension from the code's imports, then its fence language.
pub fn file_extension(block: &CodeBlock) -> String {
    if block.code.contains("import pytest") {
        return "_test.py".to_string();
    }
    if block.code.contains("import streamlit") {
        return "_app.py".to_string();
    }
    let language = sanitize_language(&block.language);
    if language.is_empty() || language == DEFAULT_LANGUAGE {
        ".py".to_string()
    } else {
        format!(".{}", language)
    }
}

/// File name for the block at zero-based `index` in extraction order.
pub fn file_name(index: usize, block: &CodeBlock) -> String {
    let stem = match block.section {
        Some(Section::Implementation) => "implementation",
        Some(Section::Tests) => "tests",
        Some(Section::SuggestedImprovements) => "improvements",
        None => "generated_code",
    };
    format!("{}_{}{}", stem, index + 1, file_extension(block))
}

/// Keep only characters that are safe inside a file extension. Case is kept,
/// so a `Python` fence gives `.Python`.
fn sanitize_language(language: &str) -> String {
    language
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '_' | '-'))
        .collect()
}

/// Directory that receives generated files.
#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
}

impl OutputStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve `filename` inside the output directory.
    ///
    /// Only a single normal path component is accepted.
    pub fn path_for(&self, filename: &str) -> Result<PathBuf, OutputError> {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.dir.join(filename)),
            _ => Err(OutputError::InvalidName(filename.to_string())),
        }
    }

    /// Write `content` to `filename`, creating the directory if needed.
    pub async fn save(&self, filename: &str, content: &str) -> Result<PathBuf, OutputError> {
        let path = self.path_for(filename)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| OutputError::Write {
                path: self.dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| OutputError::Write {
                path: path.clone(),
                source,
            })?;
        tracing::debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(path)
    }

    /// Write every non-blank block; numbering follows extraction order.
    pub async fn save_blocks(&self, blocks: &[CodeBlock]) -> Result<Vec<GeneratedFile>, OutputError> {
        let mut files = Vec::new();
        for (index, block) in blocks.iter().enumerate() {
            if block.code.trim().is_empty() {
                continue;
            }
            let filename = file_name(index, block);
            let path = self.save(&filename, &block.code).await?;
            files.push(GeneratedFile {
                filename,
                language: block.language.clone(),
                section: block.section,
                content: block.code.clone(),
                path,
            });
        }
        Ok(files)
    }

    /// Write the combined pipeline output to `full_result.txt`.
    pub async fn save_full_result(&self, result: &str) -> Result<GeneratedFile, OutputError> {
        let path = self.save(FULL_RESULT_FILE, result).await?;
        Ok(GeneratedFile {
            filename: FULL_RESULT_FILE.to_string(),
            language: "text".to_string(),
            section: None,
            content: result.to_string(),
            path,
        })
    }

    /// Extract and write every code block of `result`, then the result itself.
    pub async fn save_result(&self, result: &str) -> Result<Vec<GeneratedFile>, OutputError> {
        let blocks = extract_code_blocks(result);
        let mut files = self.save_blocks(&blocks).await?;
        files.push(self.save_full_result(result).await?);
        tracing::info!("Saved {} files to {}", files.len(), self.dir.display());
        Ok(files)
    }

    /// Read a previously written file.
    pub async fn read(&self, filename: &str) -> Result<String, OutputError> {
        let path = self.path_for(filename)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| OutputError::Read { path, source })
    }
}
