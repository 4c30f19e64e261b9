//! # Strategy Selector Module
//!
//! Converte analisi + policy in un piano di encoding concreto.
//! Funzione pura: stessa analisi e stessa policy producono sempre la stessa
//! strategia.
//!
//! ## Scelta del formato (in ordine):
//! 1. Trasparenza → webp se disponibile, altrimenti png
//! 2. Fotografica → avif, poi webp, altrimenti jpeg
//! 3. Grafica piatta (complessità < 0.3) → webp se disponibile, altrimenti png
//! 4. Altrimenti → `preferred_format` (o `fallback_format` se non disponibile)
//!
//! Un formato è disponibile se il runtime lo supporta (`FormatSupport`) e il
//! chiamante lo accetta (`supported_formats`).
//!
//! ## Qualità:
//! Parte da `default_quality`: +0.1 se complessità > 0.7, -0.1 se < 0.3,
//! ulteriore -0.05 oltre i 2 megapixel. Il risultato è sempre limitato a
//! `[min_quality, max_quality]`.
//!
//! ## Resize:
//! Mai ingrandire. Oltre `max_width`/`max_height` scala uniformemente di
//! `min(max_width / width, max_height / height)`.

use crate::capabilities::FormatSupport;
use crate::config::PolicyOptions;
use crate::error::OptimizeError;
use crate::types::{ImageAnalysis, OptimizationStrategy, OutputFormat, ResizePlan};
use tracing::debug;

pub const HIGH_COMPLEXITY: f64 = 0.7;
pub const LOW_COMPLEXITY: f64 = 0.3;
pub const LARGE_IMAGE_PIXELS: u64 = 2_000_000;
pub const COMPLEXITY_QUALITY_STEP: f32 = 0.1;
pub const LARGE_IMAGE_QUALITY_STEP: f32 = 0.05;
/// Aspect ratios beyond these bounds are smart-crop candidates
pub const WIDE_ASPECT_RATIO: f64 = 3.0;
pub const TALL_ASPECT_RATIO: f64 = 0.33;

/// Select the encode plan for one analyzed image
pub fn select_strategy(
    analysis: &ImageAnalysis,
    policy: &PolicyOptions,
    support: &FormatSupport,
) -> Result<OptimizationStrategy, OptimizeError> {
    policy.validate()?;

    // Degraded analyses carry 0×0 on purpose and pass through to the encoder
    if (analysis.width == 0 || analysis.height == 0) && !analysis.is_degraded() {
        return Err(OptimizeError::Validation(format!(
            "analysis has invalid dimensions {}x{}",
            analysis.width, analysis.height
        )));
    }

    let strategy = OptimizationStrategy {
        target_format: select_format(analysis, policy, support)?,
        quality: select_quality(analysis, policy),
        resize: plan_resize(analysis.width, analysis.height, policy),
        use_progressive_encoding: policy.enable_progressive_encoding && analysis.is_photographic,
        preserve_metadata: policy.preserve_metadata,
        use_smart_crop: policy.enable_smart_crop && should_smart_crop(analysis.aspect_ratio),
    };

    debug!(
        "Strategy: {} q={:.2} {}x{} resize={} crop={} progressive={}",
        strategy.target_format,
        strategy.quality,
        strategy.resize.target_width,
        strategy.resize.target_height,
        strategy.resize.needs_resize,
        strategy.use_smart_crop,
        strategy.use_progressive_encoding
    );

    Ok(strategy)
}

pub fn select_format(
    analysis: &ImageAnalysis,
    policy: &PolicyOptions,
    support: &FormatSupport,
) -> Result<OutputFormat, OptimizeError> {
    let available = |format: OutputFormat| support.supports(format) && policy.accepts(format);

    if analysis.has_transparency {
        return Ok(if available(OutputFormat::Webp) {
            OutputFormat::Webp
        } else {
            OutputFormat::Png
        });
    }

    if analysis.is_photographic {
        return Ok(if available(OutputFormat::Avif) {
            OutputFormat::Avif
        } else if available(OutputFormat::Webp) {
            OutputFormat::Webp
        } else {
            OutputFormat::Jpeg
        });
    }

    if analysis.complexity < LOW_COMPLEXITY {
        return Ok(if available(OutputFormat::Webp) {
            OutputFormat::Webp
        } else {
            OutputFormat::Png
        });
    }

    if available(policy.preferred_format) {
        Ok(policy.preferred_format)
    } else if available(policy.fallback_format) {
        debug!(
            "Preferred format {} unavailable, using fallback {}",
            policy.preferred_format, policy.fallback_format
        );
        Ok(policy.fallback_format)
    } else {
        Err(OptimizeError::UnsupportedFormat(format!(
            "neither preferred format {} nor fallback {} can be produced",
            policy.preferred_format, policy.fallback_format
        )))
    }
}

pub fn select_quality(analysis: &ImageAnalysis, policy: &PolicyOptions) -> f32 {
    let mut quality = policy.default_quality;

    if analysis.complexity > HIGH_COMPLEXITY {
        quality = (quality + COMPLEXITY_QUALITY_STEP).min(policy.max_quality);
    } else if analysis.complexity < LOW_COMPLEXITY {
        quality = (quality - COMPLEXITY_QUALITY_STEP).max(policy.min_quality);
    }

    if analysis.pixel_count > LARGE_IMAGE_PIXELS {
        quality = (quality - LARGE_IMAGE_QUALITY_STEP).max(policy.min_quality);
    }

    policy.clamp_quality(quality)
}

pub fn plan_resize(width: u32, height: u32, policy: &PolicyOptions) -> ResizePlan {
    let fits = width <= policy.max_width && height <= policy.max_height;
    if fits || width == 0 || height == 0 {
        return ResizePlan::unchanged(width, height);
    }

    let width_ratio = policy.max_width as f64 / width as f64;
    let height_ratio = policy.max_height as f64 / height as f64;
    let ratio = width_ratio.min(height_ratio);

    ResizePlan {
        target_width: ((width as f64 * ratio).round() as u32).clamp(1, width),
        target_height: ((height as f64 * ratio).round() as u32).clamp(1, height),
        needs_resize: true,
        scale_ratio: ratio,
    }
}

pub fn should_smart_crop(aspect_ratio: f64) -> bool {
    aspect_ratio > WIDE_ASPECT_RATIO || aspect_ratio < TALL_ASPECT_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DominantColor;

    fn analysis(width: u32, height: u32, complexity: f64) -> ImageAnalysis {
        let colors = if complexity > 0.3 { 5 } else { 2 };
        let dominant_colors = vec![DominantColor { color: [0, 0, 0], count: 1 }; colors];
        ImageAnalysis {
            width,
            height,
            aspect_ratio: width as f64 / height as f64,
            pixel_count: width as u64 * height as u64,
            complexity,
            has_transparency: false,
            is_photographic: complexity > 0.3 && colors > 3,
            dominant_colors,
            analysis_error: None,
        }
    }

    fn no_avif() -> FormatSupport {
        FormatSupport {
            avif: false,
            ..FormatSupport::all()
        }
    }

    #[test]
    fn test_large_photo_scenario() {
        let policy = PolicyOptions::default();
        let photo = analysis(3000, 2000, 0.8);

        let strategy = select_strategy(&photo, &policy, &FormatSupport::all()).unwrap();
        assert!(strategy.resize.needs_resize);
        assert!((strategy.resize.scale_ratio - 0.54).abs() < 1e-9);
        assert_eq!(strategy.resize.target_width, 1620);
        assert_eq!(strategy.resize.target_height, 1080);
        assert_eq!(strategy.target_format, OutputFormat::Avif);
        // +0.1 capped at 0.95, then -0.05 for > 2MP
        assert!((strategy.quality - 0.90).abs() < 1e-5);
        assert!(strategy.use_progressive_encoding);

        let webp = select_strategy(&photo, &policy, &no_avif()).unwrap();
        assert_eq!(webp.target_format, OutputFormat::Webp);

        let jpeg_only = FormatSupport {
            webp: false,
            avif: false,
            jpeg: true,
            png: true,
        };
        let jpeg = select_strategy(&photo, &policy, &jpeg_only).unwrap();
        assert_eq!(jpeg.target_format, OutputFormat::Jpeg);
    }

    #[test]
    fn test_transparent_icon_scenario() {
        let policy = PolicyOptions::default();
        let mut icon = analysis(100, 100, 0.0);
        icon.has_transparency = true;

        let strategy = select_strategy(&icon, &policy, &FormatSupport::all()).unwrap();
        assert_eq!(strategy.target_format, OutputFormat::Webp);
        assert!(!strategy.resize.needs_resize);
        assert_eq!(strategy.resize.target_width, 100);
        assert!((strategy.quality - 0.75).abs() < 1e-5);

        let no_webp = FormatSupport {
            webp: false,
            ..FormatSupport::all()
        };
        let strategy = select_strategy(&icon, &policy, &no_webp).unwrap();
        assert_eq!(strategy.target_format, OutputFormat::Png);
    }

    #[test]
    fn test_transparency_never_selects_jpeg() {
        let policy = PolicyOptions::default();
        for complexity in [0.0, 0.2, 0.5, 0.9] {
            let mut image = analysis(640, 480, complexity);
            image.has_transparency = true;
            for support in [FormatSupport::all(), no_avif(), FormatSupport { webp: false, ..no_avif() }] {
                let format = select_format(&image, &policy, &support).unwrap();
                assert!(matches!(format, OutputFormat::Webp | OutputFormat::Png));
            }
        }
    }

    #[test]
    fn test_declared_formats_limit_choice() {
        let policy = PolicyOptions {
            supported_formats: vec![OutputFormat::Jpeg, OutputFormat::Png],
            ..Default::default()
        };
        let photo = analysis(800, 600, 0.8);
        assert_eq!(
            select_format(&photo, &policy, &FormatSupport::all()).unwrap(),
            OutputFormat::Jpeg
        );
    }

    #[test]
    fn test_mid_complexity_uses_preferred_then_fallback() {
        // complexity 0.5 with few colors: not photographic, not flat
        let mut image = analysis(800, 600, 0.5);
        image.is_photographic = false;

        let policy = PolicyOptions {
            preferred_format: OutputFormat::Avif,
            ..Default::default()
        };
        assert_eq!(
            select_format(&image, &policy, &FormatSupport::all()).unwrap(),
            OutputFormat::Avif
        );
        assert_eq!(
            select_format(&image, &policy, &no_avif()).unwrap(),
            OutputFormat::Jpeg
        );

        let none = FormatSupport {
            webp: false,
            avif: false,
            jpeg: false,
            png: true,
        };
        assert!(matches!(
            select_format(&image, &policy, &none),
            Err(OptimizeError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_quality_always_within_bounds() {
        let policies = [
            PolicyOptions::default(),
            PolicyOptions {
                default_quality: 0.6,
                min_quality: 0.6,
                max_quality: 0.6,
                ..Default::default()
            },
            PolicyOptions {
                default_quality: 0.95,
                min_quality: 0.5,
                max_quality: 0.95,
                ..Default::default()
            },
        ];
        for policy in &policies {
            for complexity in [0.0, 0.29, 0.3, 0.5, 0.7, 0.71, 1.0] {
                for (w, h) in [(100, 100), (2000, 1001), (4000, 3000)] {
                    let q = select_quality(&analysis(w, h, complexity), policy);
                    assert!(q >= policy.min_quality && q <= policy.max_quality);
                }
            }
        }
    }

    #[test]
    fn test_no_resize_within_limits() {
        let policy = PolicyOptions::default();
        let plan = plan_resize(1920, 1080, &policy);
        assert!(!plan.needs_resize);
        assert_eq!((plan.target_width, plan.target_height), (1920, 1080));

        let plan = plan_resize(1000, 2000, &policy);
        assert!(plan.needs_resize);
        assert_eq!((plan.target_width, plan.target_height), (540, 1080));
        assert!(plan.target_width <= 1000 && plan.target_height <= 2000);
    }

    #[test]
    fn test_smart_crop_gated_by_policy() {
        let banner = analysis(4000, 1000, 0.5);
        let off = select_strategy(&banner, &PolicyOptions::default(), &FormatSupport::all()).unwrap();
        assert!(!off.use_smart_crop);

        let policy = PolicyOptions {
            enable_smart_crop: true,
            ..Default::default()
        };
        let on = select_strategy(&banner, &policy, &FormatSupport::all()).unwrap();
        assert!(on.use_smart_crop);

        assert!(should_smart_crop(0.2));
        assert!(!should_smart_crop(1.0));
    }

    #[test]
    fn test_invalid_policy_fails_fast() {
        let policy = PolicyOptions {
            min_quality: 0.9,
            max_quality: 0.7,
            ..Default::default()
        };
        let result = select_strategy(&analysis(10, 10, 0.5), &policy, &FormatSupport::all());
        assert!(matches!(result, Err(OptimizeError::Validation(_))));
    }

    #[test]
    fn test_zero_dimension_analysis_rejected() {
        let policy = PolicyOptions::default();
        let mut broken = analysis(5000, 1, 0.5);
        broken.height = 0;
        let result = select_strategy(&broken, &policy, &FormatSupport::all());
        assert!(matches!(result, Err(OptimizeError::Validation(_))));

        let plan = plan_resize(5000, 0, &policy);
        assert!(!plan.needs_resize);
        assert_eq!((plan.target_width, plan.target_height), (5000, 0));
    }

    #[test]
    fn test_degraded_analysis_passes_through() {
        let degraded = ImageAnalysis::degraded("truncated file");
        let strategy =
            select_strategy(&degraded, &PolicyOptions::default(), &FormatSupport::all()).unwrap();
        assert!(!strategy.resize.needs_resize);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let policy = PolicyOptions::default();
        let image = analysis(2500, 1400, 0.45);
        let first = select_strategy(&image, &policy, &FormatSupport::all()).unwrap();
        let second = select_strategy(&image, &policy, &FormatSupport::all()).unwrap();
        assert_eq!(first, second);
    }
}
