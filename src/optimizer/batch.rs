//! # Batch Orchestrator
//!
//! Ottimizza molte immagini con concorrenza limitata.
//!
//! ## Strategia:
//! - L'input viene diviso in chunk di `max_concurrent_batch_items` elementi
//! - I chunk vengono processati in sequenza, gli elementi di un chunk in parallelo
//! - Il fallimento di un elemento resta confinato al suo risultato
//! - Le dimensioni aggregate usano la dimensione originale per gli elementi
//!   falliti, così un errore non conta mai come risparmio

use crate::{
    config::PolicyOptions,
    error::OptimizeError,
    file_manager::FileManager,
    optimizer::image_optimizer::{ImageOptimizer, OptimizationOutcome},
    surface::RasterBackend,
    types::ImageBytes,
};
use futures::future::join_all;
use tracing::{debug, error, info};

/// Outcome of one batch item
#[derive(Debug)]
pub struct BatchItemResult {
    pub index: usize,
    pub name: Option<String>,
    pub original_size: u64,
    pub outcome: Result<OptimizationOutcome, OptimizeError>,
}

impl BatchItemResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Optimized size, or the original size when the item failed
    pub fn effective_size(&self) -> u64 {
        match &self.outcome {
            Ok(outcome) => outcome.optimized.byte_size(),
            Err(_) => self.original_size,
        }
    }
}

/// Aggregate result of a batch run
#[derive(Debug, Default)]
pub struct BatchResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub items: Vec<BatchItemResult>,
    pub total_original_size: u64,
    pub total_optimized_size: u64,
}

impl BatchResult {
    fn from_items(items: Vec<BatchItemResult>) -> Self {
        let successful = items.iter().filter(|item| item.is_success()).count();
        Self {
            total: items.len(),
            successful,
            failed: items.len() - successful,
            total_original_size: items.iter().map(|item| item.original_size).sum(),
            total_optimized_size: items.iter().map(BatchItemResult::effective_size).sum(),
            items,
        }
    }

    pub fn bytes_saved(&self) -> u64 {
        self.total_original_size.saturating_sub(self.total_optimized_size)
    }

    pub fn savings_percent(&self) -> f64 {
        FileManager::calculate_reduction(self.total_original_size, self.total_optimized_size)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} images | Optimized: {} | Failed: {} | Total saved: {} ({:.2}%)",
            self.total,
            self.successful,
            self.failed,
            FileManager::format_size(self.bytes_saved()),
            self.savings_percent()
        )
    }
}

impl<B: RasterBackend> ImageOptimizer<B> {
    pub async fn optimize_batch(&self, images: &[ImageBytes], policy: &PolicyOptions) -> BatchResult {
        self.optimize_batch_with_progress(images, policy, |_| {}).await
    }

    /// Batch optimization calling `on_item` as each item completes, in input order
    pub async fn optimize_batch_with_progress<F>(
        &self,
        images: &[ImageBytes],
        policy: &PolicyOptions,
        mut on_item: F,
    ) -> BatchResult
    where
        F: FnMut(&BatchItemResult),
    {
        let chunk_size = policy.max_concurrent_batch_items.max(1);
        let mut items = Vec::with_capacity(images.len());

        info!(
            "Optimizing {} images in chunks of {}",
            images.len(),
            chunk_size
        );

        for (chunk_index, chunk) in images.chunks(chunk_size).enumerate() {
            debug!("Starting chunk {} ({} items)", chunk_index, chunk.len());
            let base = chunk_index * chunk_size;

            let outcomes = join_all(
                chunk
                    .iter()
                    .map(|image| self.optimize_image_with(image, policy)),
            )
            .await;

            for (offset, (image, outcome)) in chunk.iter().zip(outcomes).enumerate() {
                if let Err(e) = &outcome {
                    error!(
                        "Failed to optimize {}: {}",
                        image.name().unwrap_or("<memory>"),
                        e
                    );
                }
                let item = BatchItemResult {
                    index: base + offset,
                    name: image.name().map(str::to_string),
                    original_size: image.len(),
                    outcome,
                };
                on_item(&item);
                items.push(item);
            }
        }

        let result = BatchResult::from_items(items);
        info!("{}", result.format_summary());
        result
    }
}
