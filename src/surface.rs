//! # Raster Surface Module
//!
//! Astrazione della superficie di disegno usata da analyzer, encoder e prober.
//!
//! ## Responsabilità:
//! - `RasterSurface`: dimensioni, lettura pixel RGBA di una regione,
//!   ridisegno scalato (ricampionamento di alta qualità), export in byte
//! - `RasterBackend`: decodifica dei byte sorgente, creazione di superfici
//!   vuote, riconoscimento del formato dei byte prodotti
//! - `ImageBackend`: implementazione basata sul crate `image` (più `webp`
//!   per la WebP lossy)
//!
//! ## Codec per formato:
//!
//! | Formato | Encoder                          | Qualità |
//! |---------|----------------------------------|---------|
//! | JPEG    | `image::codecs::jpeg` (baseline), `mozjpeg` (progressive) | ✅ |
//! | PNG     | `image::codecs::png` (Best)      | ❌ lossless |
//! | WebP    | `webp` (libwebp, lossy)          | ✅      |
//! | AVIF    | `image::codecs::avif` (feature `avif`) | ✅ |
//!
//! Senza la feature `avif` l'export AVIF fallisce con `Encode` e il prober
//! riporta il formato come non supportato.

use crate::error::OptimizeError;
use crate::types::{OutputFormat, Region};
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbImage, RgbaImage};
use mozjpeg::{ColorSpace, Compress, ScanMode};
use tracing::debug;

/// Drawing surface holding decoded RGBA pixels
pub trait RasterSurface: Send + Sized + 'static {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// RGBA8 bytes of `region`, row-major. The region is clipped to the surface.
    fn pixels(&self, region: Region) -> Vec<u8>;

    /// Draw `source` scaled to `width`×`height` onto a new surface
    fn draw(&self, source: Region, width: u32, height: u32) -> Self;

    /// Encode the surface; `quality` is in (0, 1]
    fn export(
        &self,
        format: OutputFormat,
        quality: f32,
        progressive: bool,
    ) -> Result<Vec<u8>, OptimizeError>;
}

/// Factory for surfaces
pub trait RasterBackend: Send + Sync + 'static {
    type Surface: RasterSurface;

    /// Decode raw bytes into a surface, failing with `OptimizeError::Decode`
    fn decode(&self, data: &[u8]) -> Result<Self::Surface, OptimizeError>;

    /// Fully transparent surface
    fn blank(&self, width: u32, height: u32) -> Self::Surface;

    /// Format of already encoded bytes, judged from their signature
    fn sniff(&self, data: &[u8]) -> Option<OutputFormat>;
}

/// Backend built on the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageBackend;

impl RasterBackend for ImageBackend {
    type Surface = ImageSurface;

    fn decode(&self, data: &[u8]) -> Result<ImageSurface, OptimizeError> {
        let decoded =
            image::load_from_memory(data).map_err(|e| OptimizeError::Decode(e.to_string()))?;
        Ok(ImageSurface {
            pixels: decoded.into_rgba8(),
        })
    }

    fn blank(&self, width: u32, height: u32) -> ImageSurface {
        ImageSurface {
            pixels: RgbaImage::new(width, height),
        }
    }

    fn sniff(&self, data: &[u8]) -> Option<OutputFormat> {
        match image::guess_format(data).ok()? {
            ImageFormat::WebP => Some(OutputFormat::Webp),
            ImageFormat::Avif => Some(OutputFormat::Avif),
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            _ => None,
        }
    }
}

/// RGBA surface backed by an `image::RgbaImage`
#[derive(Debug, Clone)]
pub struct ImageSurface {
    pixels: RgbaImage,
}

impl ImageSurface {
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    fn clip(&self, region: Region) -> Region {
        let x = region.x.min(self.pixels.width());
        let y = region.y.min(self.pixels.height());
        let width = region.width.min(self.pixels.width() - x);
        let height = region.height.min(self.pixels.height() - y);
        Region::new(x, y, width, height)
    }
}

impl RasterSurface for ImageSurface {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn pixels(&self, region: Region) -> Vec<u8> {
        let region = self.clip(region);
        if region.is_full(self.width(), self.height()) {
            return self.pixels.as_raw().clone();
        }
        imageops::crop_imm(&self.pixels, region.x, region.y, region.width, region.height)
            .to_image()
            .into_raw()
    }

    fn draw(&self, source: Region, width: u32, height: u32) -> Self {
        let source = self.clip(source);
        let cropped = if source.is_full(self.width(), self.height()) {
            self.pixels.clone()
        } else {
            imageops::crop_imm(&self.pixels, source.x, source.y, source.width, source.height)
                .to_image()
        };

        if cropped.width() == width && cropped.height() == height {
            return Self { pixels: cropped };
        }

        Self {
            pixels: imageops::resize(&cropped, width, height, FilterType::Lanczos3),
        }
    }

    fn export(
        &self,
        format: OutputFormat,
        quality: f32,
        progressive: bool,
    ) -> Result<Vec<u8>, OptimizeError> {
        let (width, height) = self.pixels.dimensions();
        let level = codec_quality(quality);
        let mut output = Vec::new();

        match format {
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = image::DynamicImage::ImageRgba8(self.pixels.clone()).into_rgb8();
                if progressive {
                    output = encode_progressive_jpeg(&rgb, level)?;
                } else {
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, level)
                        .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                        .map_err(|e| OptimizeError::encode(format, e.to_string()))?;
                }
            }
            OutputFormat::Png => {
                image::codecs::png::PngEncoder::new_with_quality(
                    &mut output,
                    image::codecs::png::CompressionType::Best,
                    image::codecs::png::FilterType::Adaptive,
                )
                .write_image(self.pixels.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(|e| OptimizeError::encode(format, e.to_string()))?;
            }
            OutputFormat::Webp => {
                let encoded = webp::Encoder::from_rgba(self.pixels.as_raw(), width, height)
                    .encode_simple(false, level as f32)
                    .map_err(|e| OptimizeError::encode(format, format!("{:?}", e)))?;
                output = encoded.to_vec();
            }
            OutputFormat::Avif => {
                encode_avif(&self.pixels, level, &mut output)?;
            }
        }

        if output.is_empty() {
            return Err(OptimizeError::encode(format, "encoder produced no output"));
        }
        Ok(output)
    }
}

/// Map a (0, 1] quality onto the 1-100 scale codecs expect
pub fn codec_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Progressive (SOF2) JPEG through mozjpeg; the `image` encoder only writes baseline
fn encode_progressive_jpeg(rgb: &RgbImage, level: u8) -> Result<Vec<u8>, OptimizeError> {
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(OptimizeError::encode(OutputFormat::Jpeg, "empty surface"));
    }
    let jpeg_error = |e: std::io::Error| OptimizeError::encode(OutputFormat::Jpeg, e.to_string());

    let mut comp = Compress::new(ColorSpace::JCS_RGB);
    comp.set_size(width as usize, height as usize);
    comp.set_quality(level as f32);
    comp.set_progressive_mode();
    comp.set_scan_optimization_mode(ScanMode::AllComponentsTogether);

    let mut output = Vec::new();
    let mut writer = comp.start_compress(&mut output).map_err(jpeg_error)?;
    writer.write_scanlines(rgb.as_raw()).map_err(jpeg_error)?;
    writer.finish().map_err(jpeg_error)?;

    debug!("Progressive JPEG {}x{} at q={}: {} bytes", width, height, level, output.len());
    Ok(output)
}

#[cfg(feature = "avif")]
fn encode_avif(pixels: &RgbaImage, level: u8, output: &mut Vec<u8>) -> Result<(), OptimizeError> {
    let (width, height) = pixels.dimensions();
    image::codecs::avif::AvifEncoder::new_with_speed_quality(output, 8, level)
        .write_image(pixels.as_raw(), width, height, ExtendedColorType::Rgba8)
        .map_err(|e| OptimizeError::encode(OutputFormat::Avif, e.to_string()))
}

#[cfg(not(feature = "avif"))]
fn encode_avif(_pixels: &RgbaImage, _level: u8, _output: &mut Vec<u8>) -> Result<(), OptimizeError> {
    Err(OptimizeError::encode(
        OutputFormat::Avif,
        "AVIF encoder not compiled in (enable the `avif` feature)",
    ))
}
