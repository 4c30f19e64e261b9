//! # File Management Module
//!
//! Questo modulo gestisce la discovery delle immagini e il caricamento in memoria.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva di immagini in directory (o singoli file)
//! - Determinazione del MIME type dall'estensione
//! - Caricamento dei byte come `ImageBytes`
//! - Filtro upstream: allowlist MIME e dimensione massima, applicato prima
//!   della pipeline (che non valida l'input)
//! - Formattazione human-readable delle dimensioni
//!
//! ## Formati riconosciuti:
//! JPG, JPEG, PNG, WebP, GIF, AVIF
//!
//! ## Esempio:
//! ```rust,ignore
//! let files = FileManager::find_image_files(&[PathBuf::from("static/images")])?;
//! let images = FileManager::load_images(&files).await?;
//! let (accepted, rejected) = FileManager::filter_uploadable(images, &UploadLimits::default());
//! ```

use crate::types::ImageBytes;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;
use walkdir::WalkDir;

/// Upstream limits applied before images enter the pipeline
#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub max_size: u64,
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_size: 10 * 1024 * 1024,
            allowed_mime_types: ["image/jpeg", "image/png", "image/gif", "image/webp"]
                .iter()
                .map(|mime| mime.to_string())
                .collect(),
        }
    }
}

/// Manages image discovery and loading
pub struct FileManager;

impl FileManager {
    /// Find all images under the given paths (files are taken as-is, directories walked)
    pub fn find_image_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for path in paths {
            if !path.exists() {
                return Err(anyhow::anyhow!("Path does not exist: {}", path.display()));
            }

            if path.is_file() {
                if Self::is_image(path) {
                    files.push(path.clone());
                } else {
                    warn!("Skipping non-image file: {}", path.display());
                }
                continue;
            }

            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| Self::is_image(p))
                .collect();
            found.sort();
            files.extend(found);
        }

        Ok(files)
    }

    /// Check if a file is an image
    pub fn is_image(path: &Path) -> bool {
        Self::mime_for_path(path).is_some()
    }

    /// MIME type declared by the file extension
    pub fn mime_for_path(path: &Path) -> Option<&'static str> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some("image/jpeg"),
            "png" => Some("image/png"),
            "webp" => Some("image/webp"),
            "gif" => Some("image/gif"),
            "avif" => Some("image/avif"),
            _ => None,
        }
    }

    /// Read an image file into memory
    pub async fn load_image(path: &Path) -> Result<ImageBytes> {
        let mime = Self::mime_for_path(path)
            .ok_or_else(|| anyhow::anyhow!("Not an image file: {}", path.display()))?;
        let data = fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(ImageBytes::new(data, mime).with_name(name))
    }

    pub async fn load_images(paths: &[PathBuf]) -> Result<Vec<ImageBytes>> {
        let mut images = Vec::with_capacity(paths.len());
        for path in paths {
            images.push(Self::load_image(path).await?);
        }
        Ok(images)
    }

    /// Split images into accepted ones and rejected ones with a reason
    pub fn filter_uploadable(
        images: Vec<ImageBytes>,
        limits: &UploadLimits,
    ) -> (Vec<ImageBytes>, Vec<(ImageBytes, String)>) {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for image in images {
            let allowed = limits
                .allowed_mime_types
                .iter()
                .any(|mime| mime.eq_ignore_ascii_case(image.mime_type()));

            if !allowed {
                let reason = format!("unsupported image type: {}", image.mime_type());
                rejected.push((image, reason));
            } else if image.len() > limits.max_size {
                let reason = format!(
                    "file too large: {} (max {})",
                    Self::format_size(image.len()),
                    Self::format_size(limits.max_size)
                );
                rejected.push((image, reason));
            } else {
                accepted.push(image);
            }
        }

        (accepted, rejected)
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}
