//! # Optimizer Module
//!
//! Orchestrazione della pipeline:
//! - `image_optimizer`: Singola immagine (analisi → strategia → encoding) e varianti
//! - `batch`: Batch con chunk a concorrenza limitata e statistiche aggregate

pub mod batch;
pub mod image_optimizer;

pub use batch::{BatchItemResult, BatchResult};
pub use image_optimizer::{ImageOptimizer, OptimizationOutcome};
