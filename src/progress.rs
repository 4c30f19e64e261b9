//! # Progress Tracking and Statistics Module
//!
//! Feedback visuale per l'esecuzione da CLI e statistiche della run.
//!
//! ## Componenti principali:
//! - `ProgressManager`: progress bar `indicatif` aggiornata a ogni immagine completata
//! - `RunStats`: contatori della run, inclusi i file scartati dal filtro upload
//!   e quelli scritti nel progetto
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:04] [========================>---------------] 12/20 (60%) ✅ cover.png: 41.3% saved
//! ```
//!
//! ## Esempio:
//! ```rust,ignore
//! let progress = ProgressManager::new(images.len() as u64);
//! let mut stats = RunStats::new();
//! stats.add_optimized(original_size, new_size);
//! progress.update("✅ cover.png");
//! progress.finish(&stats.format_summary());
//! ```

use crate::file_manager::FileManager;
use crate::optimizer::BatchItemResult;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages progress reporting for image optimization
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    pub fn new(total_images: u64) -> Self {
        let bar = ProgressBar::new(total_images);

        // Template is static; a parse failure keeps the default style
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        ) {
            bar.set_style(style.progress_chars("=>-"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress bar that draws nothing (JSON mode)
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Advance for a finished batch item
    pub fn record(&self, item: &BatchItemResult) {
        let name = item.name.as_deref().unwrap_or("<memory>");
        let message = match &item.outcome {
            Ok(outcome) => format!(
                "✅ {}: {:.1}% saved",
                name,
                FileManager::calculate_reduction(outcome.original_size, outcome.optimized.byte_size())
            ),
            Err(e) => format!("❌ {}: {}", name, e),
        };
        self.update(&message);
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();

        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }

        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        spinner
    }
}

/// Counters for one CLI run
#[derive(Debug, Default)]
pub struct RunStats {
    pub images_processed: usize,
    pub images_optimized: usize,
    pub images_rejected: usize,
    pub images_stored: usize,
    pub errors: usize,
    pub total_original_size: u64,
    pub total_bytes_saved: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_optimized(&mut self, original_size: u64, new_size: u64) {
        self.images_processed += 1;
        self.images_optimized += 1;
        self.total_original_size += original_size;
        self.total_bytes_saved += original_size.saturating_sub(new_size);
    }

    /// Image refused by the upload filter before optimization
    pub fn add_rejected(&mut self) {
        self.images_rejected += 1;
    }

    pub fn add_stored(&mut self) {
        self.images_stored += 1;
    }

    pub fn add_error(&mut self, original_size: u64) {
        self.images_processed += 1;
        self.errors += 1;
        self.total_original_size += original_size;
    }

    pub fn add_item(&mut self, item: &BatchItemResult) {
        match &item.outcome {
            Ok(outcome) => self.add_optimized(outcome.original_size, outcome.optimized.byte_size()),
            Err(_) => self.add_error(item.original_size),
        }
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        if self.total_original_size > 0 {
            (self.total_bytes_saved as f64 / self.total_original_size as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} images | Optimized: {} | Stored: {} | Rejected: {} | Errors: {} | Total saved: {} ({:.2}%)",
            self.images_processed,
            self.images_optimized,
            self.images_stored,
            self.images_rejected,
            self.errors,
            FileManager::format_size(self.total_bytes_saved),
            self.overall_reduction_percent()
        )
    }
}
