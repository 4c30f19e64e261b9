//! # Image Optimizer Orchestrator
//!
//! Collega analyzer, strategy selector ed encoder per una singola immagine e
//! fornisce le varianti thumbnail, conversione di formato e JPEG progressivo.
//!
//! `FormatSupport` viene sondato una volta alla costruzione e poi solo letto.

use crate::{
    analyzer::ImageAnalyzer,
    capabilities::FormatSupport,
    config::PolicyOptions,
    encoder::StrategyEncoder,
    error::OptimizeError,
    strategy,
    surface::{ImageBackend, RasterBackend},
    types::{ImageAnalysis, ImageBytes, OptimizationStrategy, OptimizedResult, OutputFormat},
};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of optimizing one image, paired with what went in
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    pub name: Option<String>,
    pub original_size: u64,
    pub original_mime: String,
    pub analysis: ImageAnalysis,
    pub strategy: OptimizationStrategy,
    pub optimized: OptimizedResult,
}

impl OptimizationOutcome {
    /// original size / optimized size
    pub fn compression_ratio(&self) -> f64 {
        let optimized = self.optimized.byte_size();
        if optimized == 0 {
            return 0.0;
        }
        self.original_size as f64 / optimized as f64
    }

    pub fn bytes_saved(&self) -> u64 {
        self.original_size.saturating_sub(self.optimized.byte_size())
    }
}

/// Entry point of the optimization pipeline
pub struct ImageOptimizer<B: RasterBackend = ImageBackend> {
    analyzer: ImageAnalyzer<B>,
    encoder: StrategyEncoder<B>,
    support: FormatSupport,
    policy: PolicyOptions,
}

impl ImageOptimizer<ImageBackend> {
    /// Optimizer on the `image` crate backend, probing format support once
    pub fn new(policy: PolicyOptions) -> Result<Self, OptimizeError> {
        Self::with_backend(ImageBackend, policy)
    }
}

impl<B: RasterBackend> ImageOptimizer<B> {
    pub fn with_backend(backend: B, policy: PolicyOptions) -> Result<Self, OptimizeError> {
        let support = FormatSupport::probe(&backend);
        Self::with_support(backend, policy, support)
    }

    /// Use an already computed `FormatSupport`
    pub fn with_support(
        backend: B,
        policy: PolicyOptions,
        support: FormatSupport,
    ) -> Result<Self, OptimizeError> {
        policy.validate()?;
        let backend = Arc::new(backend);
        Ok(Self {
            analyzer: ImageAnalyzer::new(Arc::clone(&backend)),
            encoder: StrategyEncoder::new(backend),
            support,
            policy,
        })
    }

    pub fn support(&self) -> &FormatSupport {
        &self.support
    }

    pub fn policy(&self) -> &PolicyOptions {
        &self.policy
    }

    pub async fn analyze(&self, image: &ImageBytes) -> ImageAnalysis {
        self.analyzer.analyze(image).await
    }

    pub fn select_strategy(
        &self,
        analysis: &ImageAnalysis,
        policy: &PolicyOptions,
    ) -> Result<OptimizationStrategy, OptimizeError> {
        strategy::select_strategy(analysis, policy, &self.support)
    }

    pub async fn encode(
        &self,
        image: &ImageBytes,
        strategy: &OptimizationStrategy,
    ) -> Result<OptimizedResult, OptimizeError> {
        self.encoder.encode(image, strategy).await
    }

    /// Analyze, plan and encode with the optimizer's own policy
    pub async fn optimize_image(
        &self,
        image: &ImageBytes,
    ) -> Result<OptimizationOutcome, OptimizeError> {
        self.optimize_image_with(image, &self.policy).await
    }

    pub async fn optimize_image_with(
        &self,
        image: &ImageBytes,
        policy: &PolicyOptions,
    ) -> Result<OptimizationOutcome, OptimizeError> {
        let analysis = self.analyze(image).await;
        let strategy = self.select_strategy(&analysis, policy)?;
        self.finish(image, analysis, strategy).await
    }

    /// Thumbnail fitting in `size`×`size` (policy thumbnail size by default)
    pub async fn create_thumbnail(
        &self,
        image: &ImageBytes,
        size: Option<u32>,
    ) -> Result<OptimizationOutcome, OptimizeError> {
        let size = size.unwrap_or(self.policy.thumbnail_size);
        if size == 0 {
            return Err(OptimizeError::Validation(
                "thumbnail size must be greater than 0".to_string(),
            ));
        }
        debug!("Creating {}px thumbnail", size);
        self.optimize_image_with(image, &self.policy.for_thumbnail(size)).await
    }

    /// Re-encode into `target` at `quality`, keeping the original dimensions
    pub async fn convert_format(
        &self,
        image: &ImageBytes,
        target: OutputFormat,
        quality: f32,
    ) -> Result<OptimizationOutcome, OptimizeError> {
        if !self.support.supports(target) {
            return Err(OptimizeError::UnsupportedFormat(target.to_string()));
        }

        let policy = self.policy.without_size_limits();
        let analysis = self.analyze(image).await;
        let strategy = self
            .select_strategy(&analysis, &policy)?
            .with_format(target)
            .with_quality(policy.clamp_quality(quality));
        self.finish(image, analysis, strategy).await
    }

    /// Progressive JPEG conversion, no resize
    pub async fn create_progressive_jpeg(
        &self,
        image: &ImageBytes,
        quality: f32,
    ) -> Result<OptimizationOutcome, OptimizeError> {
        if !self.support.supports(OutputFormat::Jpeg) {
            return Err(OptimizeError::UnsupportedFormat(OutputFormat::Jpeg.to_string()));
        }

        let policy = self.policy.without_size_limits();
        let analysis = self.analyze(image).await;
        let strategy = self
            .select_strategy(&analysis, &policy)?
            .with_format(OutputFormat::Jpeg)
            .with_quality(policy.clamp_quality(quality))
            .with_progressive(true);
        self.finish(image, analysis, strategy).await
    }

    async fn finish(
        &self,
        image: &ImageBytes,
        analysis: ImageAnalysis,
        strategy: OptimizationStrategy,
    ) -> Result<OptimizationOutcome, OptimizeError> {
        let optimized = self.encode(image, &strategy).await?;

        let outcome = OptimizationOutcome {
            name: image.name().map(str::to_string),
            original_size: image.len(),
            original_mime: image.mime_type().to_string(),
            analysis,
            strategy,
            optimized,
        };

        info!(
            "Optimized {} ({} -> {} bytes, {}, ratio {:.2})",
            outcome.name.as_deref().unwrap_or("<memory>"),
            outcome.original_size,
            outcome.optimized.byte_size(),
            outcome.optimized.format,
            outcome.compression_ratio()
        );

        Ok(outcome)
    }
}
