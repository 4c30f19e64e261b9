//! # Image Analyzer Module
//!
//! Decodifica un'immagine ed estrae le caratteristiche strutturali usate
//! dallo strategy selector.
//!
//! ## Caratteristiche estratte:
//! - **Dimensioni**: width, height, aspect ratio, pixel count
//! - **Complessità**: varianza della luminanza media per pixel sulla finestra
//!   in alto a sinistra di al massimo 100×100 pixel, divisa per 10000 e
//!   limitata a [0, 1]
//! - **Trasparenza**: almeno un pixel con alpha < 255 nella finestra 50×50
//! - **Colori dominanti**: un pixel ogni quattro della finestra 50×50,
//!   canali arrotondati per difetto al multiplo di 32, top 5 per frequenza
//! - **Fotografica**: complessità > 0.3 e più di 3 colori dominanti
//!
//! Le finestre di campionamento sono fisse: i punteggi di complessità sono
//! confrontabili solo a parità di finestra.
//!
//! ## Gestione errori:
//! L'analyzer non fallisce mai. Un'immagine non decodificabile produce un
//! `ImageAnalysis::degraded` con la diagnostica in `analysis_error`.

use crate::surface::{ImageBackend, RasterBackend, RasterSurface};
use crate::types::{DominantColor, ImageAnalysis, ImageBytes, Region};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Side of the window sampled for complexity
pub const COMPLEXITY_WINDOW: u32 = 100;
/// Side of the window sampled for transparency and colors
pub const COLOR_WINDOW: u32 = 50;
/// Variance normalization constant
pub const VARIANCE_NORMALIZER: f64 = 10_000.0;
/// Color channels are floored to multiples of this
pub const COLOR_BUCKET: u8 = 32;
/// Only every n-th pixel of the color window is counted
pub const COLOR_PIXEL_STRIDE: usize = 4;
pub const MAX_DOMINANT_COLORS: usize = 5;
pub const PHOTO_COMPLEXITY_THRESHOLD: f64 = 0.3;
pub const PHOTO_MIN_COLORS: usize = 3;

/// Analyzes images on a blocking worker
pub struct ImageAnalyzer<B: RasterBackend = ImageBackend> {
    backend: Arc<B>,
}

impl<B: RasterBackend> Clone for ImageAnalyzer<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: RasterBackend> ImageAnalyzer<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Analyze an image. Never fails: undecodable input yields a degraded record.
    pub async fn analyze(&self, image: &ImageBytes) -> ImageAnalysis {
        let backend = Arc::clone(&self.backend);
        let data = image.shared();

        let joined = tokio::task::spawn_blocking(move || match backend.decode(&data) {
            Ok(surface) => analyze_surface(&surface),
            Err(e) => ImageAnalysis::degraded(e.to_string()),
        })
        .await;

        let analysis = match joined {
            Ok(analysis) => analysis,
            Err(e) => ImageAnalysis::degraded(format!("analysis task failed: {}", e)),
        };

        match &analysis.analysis_error {
            Some(reason) => warn!(
                "Analysis degraded for {}: {}",
                image.name().unwrap_or("<memory>"),
                reason
            ),
            None => debug!(
                "Analyzed {}: {}x{} complexity={:.3} transparent={} photo={}",
                image.name().unwrap_or("<memory>"),
                analysis.width,
                analysis.height,
                analysis.complexity,
                analysis.has_transparency,
                analysis.is_photographic
            ),
        }

        analysis
    }
}

/// Extract features from an already decoded surface
pub fn analyze_surface<S: RasterSurface>(surface: &S) -> ImageAnalysis {
    let width = surface.width();
    let height = surface.height();

    if width == 0 || height == 0 {
        return ImageAnalysis::degraded(format!("invalid image dimensions {}x{}", width, height));
    }

    let complexity = calculate_complexity(surface);
    let has_transparency = detect_transparency(surface);
    let dominant_colors = extract_dominant_colors(surface);
    let is_photographic = is_photographic(complexity, &dominant_colors);

    ImageAnalysis {
        width,
        height,
        aspect_ratio: width as f64 / height as f64,
        pixel_count: width as u64 * height as u64,
        complexity,
        has_transparency,
        dominant_colors,
        is_photographic,
        analysis_error: None,
    }
}

fn sample_window<S: RasterSurface>(surface: &S, max_side: u32) -> Vec<u8> {
    let side = max_side.min(surface.width()).min(surface.height());
    surface.pixels(Region::top_left(side))
}

/// Normalized variance of per-pixel average luminance
pub fn calculate_complexity<S: RasterSurface>(surface: &S) -> f64 {
    let data = sample_window(surface, COMPLEXITY_WINDOW);
    let count = data.len() / 4;
    if count == 0 {
        return 0.5;
    }

    let brightness = |px: &[u8]| (px[0] as f64 + px[1] as f64 + px[2] as f64) / 3.0;

    let mean = data.chunks_exact(4).map(brightness).sum::<f64>() / count as f64;
    let variance = data
        .chunks_exact(4)
        .map(|px| (brightness(px) - mean).powi(2))
        .sum::<f64>()
        / count as f64;

    (variance / VARIANCE_NORMALIZER).clamp(0.0, 1.0)
}

pub fn detect_transparency<S: RasterSurface>(surface: &S) -> bool {
    sample_window(surface, COLOR_WINDOW)
        .chunks_exact(4)
        .any(|px| px[3] < 255)
}

/// Top quantized colors, most frequent first; ties keep first-seen order
pub fn extract_dominant_colors<S: RasterSurface>(surface: &S) -> Vec<DominantColor> {
    let data = sample_window(surface, COLOR_WINDOW);
    let mut order: Vec<DominantColor> = Vec::new();
    let mut index: HashMap<[u8; 3], usize> = HashMap::new();

    for px in data.chunks_exact(4).step_by(COLOR_PIXEL_STRIDE) {
        let color = [quantize(px[0]), quantize(px[1]), quantize(px[2])];
        match index.get(&color) {
            Some(&slot) => order[slot].count += 1,
            None => {
                index.insert(color, order.len());
                order.push(DominantColor { color, count: 1 });
            }
        }
    }

    // stable sort
    order.sort_by(|a, b| b.count.cmp(&a.count));
    order.truncate(MAX_DOMINANT_COLORS);
    order
}

fn quantize(channel: u8) -> u8 {
    channel / COLOR_BUCKET * COLOR_BUCKET
}

pub fn is_photographic(complexity: f64, dominant_colors: &[DominantColor]) -> bool {
    complexity > PHOTO_COMPLEXITY_THRESHOLD && dominant_colors.len() > PHOTO_MIN_COLORS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::ImageSurface;
    use image::{Rgba, RgbaImage};

    fn surface(width: u32, height: u32, f: impl Fn(u32, u32) -> Rgba<u8>) -> ImageSurface {
        ImageSurface::from_rgba(RgbaImage::from_fn(width, height, f))
    }

    #[test]
    fn test_flat_image_has_zero_complexity() {
        let flat = surface(120, 80, |_, _| Rgba([40, 90, 200, 255]));
        let analysis = analyze_surface(&flat);
        assert_eq!(analysis.complexity, 0.0);
        assert!(!analysis.has_transparency);
        assert_eq!(analysis.dominant_colors.len(), 1);
        assert_eq!(analysis.dominant_colors[0].color, [32, 64, 192]);
        assert!(!analysis.is_photographic);
        assert_eq!(analysis.pixel_count, 9600);
        assert!((analysis.aspect_ratio - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_black_white_stripes_saturate_complexity() {
        // luminance alternates 0 / 255: variance 16256.25, clamped to 1
        let stripes = surface(100, 100, |x, _| {
            if x % 2 == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        assert_eq!(calculate_complexity(&stripes), 1.0);
    }

    #[test]
    fn test_complexity_only_reads_top_left_window() {
        // noise outside the 100x100 window must not count
        let image = surface(300, 300, |x, y| {
            if x < 100 && y < 100 {
                Rgba([10, 10, 10, 255])
            } else if (x * 7 + y * 13) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        assert_eq!(calculate_complexity(&image), 0.0);
    }

    #[test]
    fn test_transparency_sampled_in_color_window() {
        let inside = surface(80, 80, |x, y| {
            Rgba([0, 0, 0, if x == 10 && y == 10 { 0 } else { 255 }])
        });
        assert!(detect_transparency(&inside));

        let outside = surface(80, 80, |x, y| {
            Rgba([0, 0, 0, if x == 70 && y == 70 { 0 } else { 255 }])
        });
        assert!(!detect_transparency(&outside));
    }

    #[test]
    fn test_dominant_colors_sorted_and_capped() {
        // eight vertical bands, wider bands appear more often
        let widths = [12u32, 10, 8, 6, 5, 4, 3, 2];
        let image = surface(50, 50, |x, _| {
            let mut edge = 0;
            for (band, w) in widths.iter().enumerate() {
                edge += w;
                if x < edge {
                    let v = (band as u8) * 32;
                    return Rgba([v, 255 - v, v / 2, 255]);
                }
            }
            Rgba([0, 0, 0, 255])
        });
        let colors = extract_dominant_colors(&image);
        assert_eq!(colors.len(), MAX_DOMINANT_COLORS);
        assert!(colors.windows(2).all(|pair| pair[0].count >= pair[1].count));
        let total: u32 = colors.iter().map(|c| c.count).sum();
        assert!(total <= 50 * 50 / COLOR_PIXEL_STRIDE as u32);
    }

    #[test]
    fn test_photographic_rule() {
        let colors = vec![DominantColor { color: [0, 0, 0], count: 1 }; 4];
        assert!(is_photographic(0.31, &colors));
        assert!(!is_photographic(0.3, &colors));
        assert!(!is_photographic(0.9, &colors[..3]));
    }

    #[tokio::test]
    async fn test_undecodable_input_degrades() {
        let analyzer = ImageAnalyzer::new(Arc::new(ImageBackend));
        let image = ImageBytes::new(b"not an image".to_vec(), "image/png");
        let analysis = analyzer.analyze(&image).await;
        assert!(analysis.is_degraded());
        assert_eq!(analysis.width, 0);
        assert_eq!(analysis.complexity, 0.5);
        assert!(analysis.is_photographic);
    }
}
