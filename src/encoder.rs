//! # Encoder/Resizer Module
//!
//! Esegue una `OptimizationStrategy`: decodifica, eventuale smart crop,
//! ridimensionamento di alta qualità e ri-codifica nel formato richiesto.
//!
//! ## Pipeline:
//! 1. Decodifica dei byte sorgente (`Decode` se illeggibili)
//! 2. Smart crop: rettangolo centrato con l'aspect ratio del target,
//!    tagliando l'asse più lungo in modo simmetrico
//! 3. Ricampionamento Lanczos3 alle dimensioni del piano
//! 4. Export nel formato e alla qualità della strategia (`Encode` se il codec
//!    rifiuta)
//!
//! Formato e qualità non vengono mai cambiati rispetto alla strategia.
//! Senza resize e senza crop i pixel non vengono ricampionati e le dimensioni
//! restano identiche all'originale.

use crate::error::OptimizeError;
use crate::surface::{ImageBackend, RasterBackend, RasterSurface};
use crate::types::{ImageBytes, OptimizationStrategy, OptimizedResult, Region};
use std::sync::Arc;
use tracing::debug;

/// Executes encode plans on a blocking worker
pub struct StrategyEncoder<B: RasterBackend = ImageBackend> {
    backend: Arc<B>,
}

impl<B: RasterBackend> Clone for StrategyEncoder<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: RasterBackend> StrategyEncoder<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn encode(
        &self,
        image: &ImageBytes,
        strategy: &OptimizationStrategy,
    ) -> Result<OptimizedResult, OptimizeError> {
        if !(strategy.quality > 0.0 && strategy.quality <= 1.0) {
            return Err(OptimizeError::Validation(format!(
                "strategy quality must be in (0, 1], got {}",
                strategy.quality
            )));
        }

        let backend = Arc::clone(&self.backend);
        let data = image.shared();
        let strategy = strategy.clone();

        tokio::task::spawn_blocking(move || encode_blocking(backend.as_ref(), &data, &strategy))
            .await?
    }
}

fn encode_blocking<B: RasterBackend>(
    backend: &B,
    data: &[u8],
    strategy: &OptimizationStrategy,
) -> Result<OptimizedResult, OptimizeError> {
    let source = backend.decode(data)?;
    let (width, height) = (source.width(), source.height());

    let (target_width, target_height) = if strategy.resize.needs_resize {
        (strategy.resize.target_width, strategy.resize.target_height)
    } else {
        (width, height)
    };

    let drawn = if strategy.use_smart_crop {
        let crop = smart_crop_region(width, height, target_width, target_height);
        debug!("Smart crop {:?} of {}x{} -> {}x{}", crop, width, height, target_width, target_height);
        Some(source.draw(crop, target_width, target_height))
    } else if strategy.resize.needs_resize {
        Some(source.draw(Region::full(width, height), target_width, target_height))
    } else {
        None
    };
    let surface = drawn.as_ref().unwrap_or(&source);

    let bytes = surface.export(
        strategy.target_format,
        strategy.quality,
        strategy.use_progressive_encoding,
    )?;

    debug!(
        "Encoded {}x{} {} at q={:.2}: {} bytes",
        surface.width(),
        surface.height(),
        strategy.target_format,
        strategy.quality,
        bytes.len()
    );

    Ok(OptimizedResult {
        bytes,
        format: strategy.target_format,
        width: surface.width(),
        height: surface.height(),
        applied_quality: strategy.quality,
        progressive_requested: strategy.use_progressive_encoding,
    })
}

/// Centered source rectangle with the target's aspect ratio
pub fn smart_crop_region(
    source_width: u32,
    source_height: u32,
    target_width: u32,
    target_height: u32,
) -> Region {
    if source_width == 0 || source_height == 0 || target_width == 0 || target_height == 0 {
        return Region::full(source_width, source_height);
    }

    let source_ratio = source_width as f64 / source_height as f64;
    let target_ratio = target_width as f64 / target_height as f64;

    if source_ratio > target_ratio {
        // wider than the target: trim left and right
        let width = ((source_height as f64 * target_ratio).round() as u32).clamp(1, source_width);
        Region::new((source_width - width) / 2, 0, width, source_height)
    } else {
        let height = ((source_width as f64 / target_ratio).round() as u32).clamp(1, source_height);
        Region::new(0, (source_height - height) / 2, source_width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutputFormat, ResizePlan};
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> ImageBytes {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        ImageBytes::new(out.into_inner(), "image/png")
    }

    fn strategy(format: OutputFormat, resize: ResizePlan, smart_crop: bool) -> OptimizationStrategy {
        OptimizationStrategy {
            target_format: format,
            quality: 0.8,
            resize,
            use_progressive_encoding: false,
            preserve_metadata: false,
            use_smart_crop: smart_crop,
        }
    }

    #[test]
    fn test_smart_crop_trims_longer_axis() {
        assert_eq!(smart_crop_region(400, 100, 100, 100), Region::new(150, 0, 100, 100));
        assert_eq!(smart_crop_region(100, 400, 100, 100), Region::new(0, 150, 100, 100));
        assert_eq!(smart_crop_region(200, 100, 100, 50), Region::new(0, 0, 200, 100));
    }

    #[tokio::test]
    async fn test_passthrough_preserves_dimensions() {
        let encoder = StrategyEncoder::new(Arc::new(ImageBackend));
        let image = png_bytes(123, 45);
        let plan = strategy(OutputFormat::Png, ResizePlan::unchanged(123, 45), false);

        let result = encoder.encode(&image, &plan).await.unwrap();
        assert_eq!((result.width, result.height), (123, 45));
        assert_eq!(result.format, OutputFormat::Png);
        assert_eq!(result.applied_quality, 0.8);
    }

    #[tokio::test]
    async fn test_resize_to_plan() {
        let encoder = StrategyEncoder::new(Arc::new(ImageBackend));
        let image = png_bytes(200, 100);
        let plan = strategy(
            OutputFormat::Jpeg,
            ResizePlan {
                target_width: 100,
                target_height: 50,
                needs_resize: true,
                scale_ratio: 0.5,
            },
            false,
        );

        let result = encoder.encode(&image, &plan).await.unwrap();
        assert_eq!((result.width, result.height), (100, 50));
        assert_eq!(&result.bytes[0..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_smart_crop_keeps_center_band() {
        // red sides, blue band over x in 150..250
        let img = RgbaImage::from_fn(400, 100, |x, _| {
            if (150..250).contains(&x) {
                Rgba([0, 0, 255, 255])
            } else {
                Rgba([255, 0, 0, 255])
            }
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        let image = ImageBytes::new(out.into_inner(), "image/png");

        let encoder = StrategyEncoder::new(Arc::new(ImageBackend));
        let plan = strategy(
            OutputFormat::Png,
            ResizePlan {
                target_width: 100,
                target_height: 100,
                needs_resize: true,
                scale_ratio: 1.0,
            },
            true,
        );

        let result = encoder.encode(&image, &plan).await.unwrap();
        assert_eq!((result.width, result.height), (100, 100));

        let decoded = image::load_from_memory(&result.bytes).unwrap().into_rgba8();
        assert_eq!(decoded.dimensions(), (100, 100));
        assert!(decoded.pixels().all(|px| *px == Rgba([0, 0, 255, 255])));
    }

    #[tokio::test]
    async fn test_undecodable_source_is_decode_error() {
        let encoder = StrategyEncoder::new(Arc::new(ImageBackend));
        let image = ImageBytes::new(vec![1, 2, 3, 4], "image/jpeg");
        let plan = strategy(OutputFormat::Jpeg, ResizePlan::unchanged(1, 1), false);
        let err = encoder.encode(&image, &plan).await.unwrap_err();
        assert!(matches!(err, OptimizeError::Decode(_)));
    }

    #[tokio::test]
    async fn test_invalid_quality_rejected() {
        let encoder = StrategyEncoder::new(Arc::new(ImageBackend));
        let plan = strategy(OutputFormat::Jpeg, ResizePlan::unchanged(4, 4), false).with_quality(0.0);
        let err = encoder.encode(&png_bytes(4, 4), &plan).await.unwrap_err();
        assert!(matches!(err, OptimizeError::Validation(_)));
    }
}
