//! # File Sink Module
//!
//! Consegna i byte ottimizzati a un progetto Hugo, con la stessa struttura
//! usata dall'endpoint di upload dell'editor.
//!
//! ## Struttura output:
//! ```text
//! <project>/static/images/<category>/<slug>/<nome>-<id8>.<ext>   (con slug)
//! <project>/static/images/<category>/<nome>-<id8>.<ext>          (senza slug)
//! ```
//!
//! `id8` sono i primi 8 caratteri esadecimali dello SHA-256 dei byte: lo
//! stesso contenuto produce sempre lo stesso nome file.
//! Il web path è il path relativo senza il prefisso `static`.

use crate::types::OutputFormat;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

pub const DEFAULT_CATEGORY: &str = "posts";

/// Record of an image persisted into the project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub filename: String,
    pub web_path: String,
    pub original_name: String,
    pub size: u64,
    pub category: String,
    pub markdown_ref: String,
    #[serde(skip)]
    pub path: PathBuf,
}

/// Writes images under `<project>/static/images`
#[derive(Debug, Clone)]
pub struct FileSink {
    project_root: PathBuf,
    category: String,
    article_slug: Option<String>,
}

impl FileSink {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            category: DEFAULT_CATEGORY.to_string(),
            article_slug: None,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = sanitize_segment(category);
        self
    }

    pub fn with_article_slug(mut self, slug: Option<&str>) -> Self {
        self.article_slug = slug.map(sanitize_segment);
        self
    }

    /// Directory relative to the project root
    pub fn relative_dir(&self) -> PathBuf {
        let mut dir = Path::new("static").join("images").join(&self.category);
        if let Some(slug) = &self.article_slug {
            dir.push(slug);
        }
        dir
    }

    /// Persist `bytes` encoded as `format`, named after `original_name`
    pub async fn store(
        &self,
        original_name: &str,
        bytes: &[u8],
        format: OutputFormat,
    ) -> Result<StoredImage> {
        let base = Path::new(original_name)
            .file_stem()
            .map(|stem| sanitize_segment(&stem.to_string_lossy()))
            .unwrap_or_else(|| sanitize_segment(""));
        let filename = format!("{}-{}.{}", base, content_id(bytes), format.extension());

        let relative_dir = self.relative_dir();
        let directory = self.project_root.join(&relative_dir);
        fs::create_dir_all(&directory).await?;

        let path = directory.join(&filename);
        fs::write(&path, bytes).await?;
        debug!("Stored {} ({} bytes)", path.display(), bytes.len());

        let web_dir = relative_dir
            .strip_prefix("static")
            .unwrap_or(&relative_dir)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/");
        let web_path = format!("/{}/{}", web_dir, filename);

        Ok(StoredImage {
            markdown_ref: format!("![{}]({})", base, web_path),
            filename,
            web_path,
            original_name: original_name.to_string(),
            size: bytes.len() as u64,
            category: self.category.clone(),
            path,
        })
    }
}

/// First 8 hex chars of the SHA-256 of `bytes`
pub fn content_id(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)[..8].to_string()
}

/// Lowercase, keep `[a-z0-9_-]`, collapse everything else into single dashes
pub fn sanitize_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            out.push(ch);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "image".to_string()
    } else {
        trimmed.to_string()
    }
}
