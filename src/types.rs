//! # Core Types Module
//!
//! Tipi valore condivisi da tutti i componenti della pipeline.
//!
//! ## Flusso dei dati:
//! ```text
//! ImageBytes -> ImageAnalysis -> OptimizationStrategy -> OptimizedResult
//! ```
//!
//! Tutti i tipi sono immutabili dopo la creazione: la pipeline non modifica
//! mai i byte del chiamante e non conserva riferimenti tra una chiamata e
//! l'altra.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Output encodings the pipeline can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Webp,
    Avif,
    Jpeg,
    Png,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Webp,
        OutputFormat::Avif,
        OutputFormat::Jpeg,
        OutputFormat::Png,
    ];

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Webp => "image/webp",
            OutputFormat::Avif => "image/avif",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Avif => "avif",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    /// Map a declared MIME type to an output format, if it is one
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/webp" => Some(OutputFormat::Webp),
            "image/avif" => Some(OutputFormat::Avif),
            "image/jpeg" | "image/jpg" => Some(OutputFormat::Jpeg),
            "image/png" => Some(OutputFormat::Png),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Avif => "avif",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webp" => Ok(OutputFormat::Webp),
            "avif" => Ok(OutputFormat::Avif),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            other => Err(format!("unknown image format: {}", other)),
        }
    }
}

/// Raw image payload handed to the pipeline.
///
/// The bytes are shared behind an `Arc` so the same input can be moved onto a
/// blocking worker without copying; the pipeline never mutates them.
#[derive(Debug, Clone)]
pub struct ImageBytes {
    data: Arc<[u8]>,
    mime_type: String,
    name: Option<String>,
}

impl ImageBytes {
    pub fn new(data: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            name: None,
        }
    }

    /// Attach the original file name (used for reporting and persistence)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn shared(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn declared_format(&self) -> Option<OutputFormat> {
        OutputFormat::from_mime(&self.mime_type)
    }
}

/// Rectangular pixel region, in source pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Region covering a whole `width`×`height` surface
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Top-left `size`×`size` window
    pub fn top_left(size: u32) -> Self {
        Self::new(0, 0, size, size)
    }

    pub fn is_full(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == width && self.height == height
    }
}

/// A quantized color and how many samples fell into its bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DominantColor {
    pub color: [u8; 3],
    pub count: u32,
}

impl DominantColor {
    /// `"r,g,b"` representation
    pub fn label(&self) -> String {
        format!("{},{},{}", self.color[0], self.color[1], self.color[2])
    }
}

/// Structural features extracted from one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f64,
    pub pixel_count: u64,
    /// Normalized luminance variance in [0, 1]
    pub complexity: f64,
    pub has_transparency: bool,
    /// At most five entries, most frequent first
    pub dominant_colors: Vec<DominantColor>,
    pub is_photographic: bool,
    /// Set when the image could not be analyzed and defaults were used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_error: Option<String>,
}

impl ImageAnalysis {
    /// Best-effort record for an image that could not be analyzed
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            width: 0,
            height: 0,
            aspect_ratio: 1.0,
            pixel_count: 0,
            complexity: 0.5,
            has_transparency: false,
            dominant_colors: Vec::new(),
            is_photographic: true,
            analysis_error: Some(reason.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.analysis_error.is_some()
    }
}

/// Target dimensions for the encode step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizePlan {
    pub target_width: u32,
    pub target_height: u32,
    pub needs_resize: bool,
    pub scale_ratio: f64,
}

impl ResizePlan {
    pub fn unchanged(width: u32, height: u32) -> Self {
        Self {
            target_width: width,
            target_height: height,
            needs_resize: false,
            scale_ratio: 1.0,
        }
    }
}

/// Concrete encode plan for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationStrategy {
    pub target_format: OutputFormat,
    /// In [min_quality, max_quality] of the policy that produced it
    pub quality: f32,
    pub resize: ResizePlan,
    /// Progressive scans; only JPEG output honors it
    pub use_progressive_encoding: bool,
    /// Carried through, but re-encoding always strips EXIF/ICC metadata
    pub preserve_metadata: bool,
    pub use_smart_crop: bool,
}

impl OptimizationStrategy {
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.target_format = format;
        self
    }

    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_progressive(mut self, progressive: bool) -> Self {
        self.use_progressive_encoding = progressive;
        self
    }
}

/// Encoded output of the pipeline
#[derive(Debug, Clone)]
pub struct OptimizedResult {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub applied_quality: f32,
    /// The strategy asked for progressive scans (written as SOF2 for JPEG)
    pub progressive_requested: bool,
}

impl OptimizedResult {
    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// original size / output size
    pub fn compression_ratio(&self, original: &ImageBytes) -> f64 {
        if self.bytes.is_empty() {
            return 0.0;
        }
        original.len() as f64 / self.bytes.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse_and_display() {
        assert_eq!("JPG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("webp".parse::<OutputFormat>().unwrap(), OutputFormat::Webp);
        assert!("tiff".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Jpeg.to_string(), "jpeg");
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
    }

    #[test]
    fn test_format_from_mime() {
        assert_eq!(OutputFormat::from_mime("image/png"), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::from_mime("IMAGE/JPG"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_mime("image/gif"), None);
    }

    #[test]
    fn test_degraded_analysis_defaults() {
        let analysis = ImageAnalysis::degraded("bad header");
        assert_eq!(analysis.width, 0);
        assert_eq!(analysis.complexity, 0.5);
        assert!(analysis.is_photographic);
        assert!(analysis.is_degraded());
    }

    #[test]
    fn test_compression_ratio_is_computed() {
        let original = ImageBytes::new(vec![0u8; 1000], "image/png");
        let result = OptimizedResult {
            bytes: vec![0u8; 250],
            format: OutputFormat::Webp,
            width: 10,
            height: 10,
            applied_quality: 0.8,
            progressive_requested: false,
        };
        assert_eq!(result.compression_ratio(&original), 4.0);
        assert_eq!(result.byte_size(), 250);
    }
}
