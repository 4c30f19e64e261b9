//! # Policy Configuration Module
//!
//! Questo modulo gestisce le opzioni di policy che guidano la scelta della strategia.
//!
//! ## Responsabilità:
//! - Definisce la struct `PolicyOptions` con tutti i parametri di ottimizzazione
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio da/verso file JSON
//! - Ogni campo ha un default: un file JSON può sovrascrivere qualsiasi sottoinsieme
//!
//! ## Parametri principali:
//! - `default_quality` / `min_quality` / `max_quality`: Qualità in (0, 1] (default: 0.85 / 0.6 / 0.95)
//! - `max_width` / `max_height`: Dimensioni massime (default: 1920x1080)
//! - `thumbnail_size`: Lato dei thumbnails (default: 300)
//! - `preferred_format` / `fallback_format`: Formati di output (default: webp / jpeg)
//! - `supported_formats`: Formati dichiarati dal chiamante (non sondati)
//! - `max_concurrent_batch_items`: Dimensione dei chunk nel batch (default: 3)
//!
//! ## Esempio:
//! ```rust,ignore
//! let policy = PolicyOptions {
//!     max_width: 1280,
//!     enable_smart_crop: true,
//!     ..Default::default()
//! };
//! policy.validate()?;
//! ```

use crate::error::OptimizeError;
use crate::types::OutputFormat;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Quality used for thumbnails before clamping into the policy bounds
pub const THUMBNAIL_QUALITY: f32 = 0.8;

/// Size cap used when converting formats without resizing
pub const UNBOUNDED_DIMENSION: u32 = 9999;

/// Policy options for strategy selection and batch processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOptions {
    /// Starting quality before content-based adjustments
    pub default_quality: f32,
    pub min_quality: f32,
    pub max_quality: f32,
    pub max_width: u32,
    pub max_height: u32,
    pub thumbnail_size: u32,
    /// Format used for images that match no content rule
    pub preferred_format: OutputFormat,
    /// Used when the preferred format is unavailable
    pub fallback_format: OutputFormat,
    /// Formats the caller accepts as output
    pub supported_formats: Vec<OutputFormat>,
    pub enable_progressive_encoding: bool,
    pub preserve_metadata: bool,
    pub enable_smart_crop: bool,
    /// Batch chunk size (items optimized concurrently)
    pub max_concurrent_batch_items: usize,
}

impl Default for PolicyOptions {
    fn default() -> Self {
        Self {
            default_quality: 0.85,
            min_quality: 0.6,
            max_quality: 0.95,
            max_width: 1920,
            max_height: 1080,
            thumbnail_size: 300,
            preferred_format: OutputFormat::Webp,
            fallback_format: OutputFormat::Jpeg,
            supported_formats: OutputFormat::ALL.to_vec(),
            enable_progressive_encoding: true,
            preserve_metadata: false,
            enable_smart_crop: false,
            max_concurrent_batch_items: 3,
        }
    }
}

impl PolicyOptions {
    /// Validate policy parameters
    pub fn validate(&self) -> Result<(), OptimizeError> {
        for (name, value) in [
            ("default_quality", self.default_quality),
            ("min_quality", self.min_quality),
            ("max_quality", self.max_quality),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(OptimizeError::Validation(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.min_quality > self.max_quality {
            return Err(OptimizeError::Validation(format!(
                "min_quality ({}) is greater than max_quality ({})",
                self.min_quality, self.max_quality
            )));
        }

        if self.default_quality < self.min_quality || self.default_quality > self.max_quality {
            return Err(OptimizeError::Validation(format!(
                "default_quality ({}) must lie between min_quality and max_quality",
                self.default_quality
            )));
        }

        if self.max_width == 0 || self.max_height == 0 {
            return Err(OptimizeError::Validation(
                "max_width and max_height must be greater than 0".to_string(),
            ));
        }

        if self.thumbnail_size == 0 {
            return Err(OptimizeError::Validation(
                "thumbnail_size must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent_batch_items == 0 {
            return Err(OptimizeError::Validation(
                "max_concurrent_batch_items must be greater than 0".to_string(),
            ));
        }

        if self.supported_formats.is_empty() {
            return Err(OptimizeError::Validation(
                "supported_formats must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether the caller accepts `format` as output
    pub fn accepts(&self, format: OutputFormat) -> bool {
        self.supported_formats.contains(&format)
    }

    /// Clamp a quality into `[min_quality, max_quality]`
    pub fn clamp_quality(&self, quality: f32) -> f32 {
        quality.clamp(self.min_quality, self.max_quality)
    }

    /// Derived policy for square thumbnails of side `size`
    pub fn for_thumbnail(&self, size: u32) -> Self {
        Self {
            max_width: size,
            max_height: size,
            default_quality: self.clamp_quality(THUMBNAIL_QUALITY),
            preferred_format: OutputFormat::Webp,
            ..self.clone()
        }
    }

    /// Derived policy that never resizes
    pub fn without_size_limits(&self) -> Self {
        Self {
            max_width: UNBOUNDED_DIMENSION,
            max_height: UNBOUNDED_DIMENSION,
            ..self.clone()
        }
    }

    /// Default location of the policy file (`~/.image-optimizer/policy.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".image-optimizer").join("policy.json"))
    }

    /// Load policy from file, falling back to defaults when it does not exist
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let policy: PolicyOptions = serde_json::from_str(&content)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Save policy to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_policy_validation() {
        let mut policy = PolicyOptions::default();
        assert!(policy.validate().is_ok());

        policy.min_quality = 0.99;
        assert!(policy.validate().is_err());

        policy.min_quality = 0.6;
        policy.default_quality = 1.5;
        assert!(policy.validate().is_err());

        policy.default_quality = 0.85;
        policy.max_concurrent_batch_items = 0;
        assert!(policy.validate().is_err());

        policy.max_concurrent_batch_items = 3;
        policy.supported_formats.clear();
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_policy_default() {
        let policy = PolicyOptions::default();
        assert_eq!(policy.default_quality, 0.85);
        assert_eq!(policy.max_width, 1920);
        assert_eq!(policy.max_height, 1080);
        assert_eq!(policy.thumbnail_size, 300);
        assert_eq!(policy.preferred_format, OutputFormat::Webp);
        assert_eq!(policy.fallback_format, OutputFormat::Jpeg);
        assert!(policy.enable_progressive_encoding);
        assert!(!policy.enable_smart_crop);
        assert_eq!(policy.max_concurrent_batch_items, 3);
    }

    #[test]
    fn test_partial_json_overrides_subset() {
        let policy: PolicyOptions =
            serde_json::from_str(r#"{ "max_width": 800, "preferred_format": "jpeg" }"#).unwrap();
        assert_eq!(policy.max_width, 800);
        assert_eq!(policy.preferred_format, OutputFormat::Jpeg);
        assert_eq!(policy.max_height, 1080);
        assert_eq!(policy.min_quality, 0.6);
    }

    #[test]
    fn test_thumbnail_policy() {
        let thumb = PolicyOptions::default().for_thumbnail(150);
        assert_eq!(thumb.max_width, 150);
        assert_eq!(thumb.max_height, 150);
        assert_eq!(thumb.default_quality, 0.8);
        assert!(thumb.validate().is_ok());
    }

    #[tokio::test]
    async fn test_policy_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let policy_path = temp_dir.path().join("nested").join("policy.json");

        let original = PolicyOptions {
            default_quality: 0.8,
            max_width: 1280,
            max_height: 720,
            enable_smart_crop: true,
            max_concurrent_batch_items: 5,
            ..Default::default()
        };

        original.save_to_file(&policy_path).await.unwrap();
        let loaded = PolicyOptions::from_file(&policy_path).await.unwrap();
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = PolicyOptions::from_file(&temp_dir.path().join("absent.json"))
            .await
            .unwrap();
        assert_eq!(loaded, PolicyOptions::default());
    }
}
