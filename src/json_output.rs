//! # JSON Output Module
//!
//! Output strutturato in JSON (una riga per messaggio su stdout) per i
//! processi che pilotano la CLI, come l'editor.
//!
//! ## Tipi di messaggi:
//! - `probe`: Formati di output disponibili
//! - `start`: Inizio del batch
//! - `file_complete`: Fine elaborazione di una immagine (successo o errore)
//! - `suggestions`: Report del suggestion generator
//! - `complete`: Statistiche finali del batch
//! - `error`: Errore generale

use crate::capabilities::FormatSupport;
use crate::config::PolicyOptions;
use crate::optimizer::{BatchItemResult, BatchResult};
use crate::sink::StoredImage;
use crate::suggestions::SuggestionReport;
use crate::types::OutputFormat;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    #[serde(rename = "probe")]
    Probe { support: FormatSupport },

    #[serde(rename = "start")]
    Start {
        total_images: usize,
        rejected: usize,
        config: JsonConfig,
    },

    #[serde(rename = "file_complete")]
    FileComplete {
        index: usize,
        name: Option<String>,
        original_size: u64,
        optimized_size: u64,
        reduction_percent: f64,
        format: Option<OutputFormat>,
        width: Option<u32>,
        height: Option<u32>,
        stored: Option<StoredImage>,
        error: Option<String>,
    },

    #[serde(rename = "suggestions")]
    Suggestions {
        name: Option<String>,
        report: SuggestionReport,
    },

    #[serde(rename = "complete")]
    Complete {
        total: usize,
        successful: usize,
        failed: usize,
        total_original_size: u64,
        total_optimized_size: u64,
        savings_percent: f64,
        duration_seconds: f64,
    },

    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Policy summary echoed in the `start` message
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonConfig {
    pub default_quality: f32,
    pub max_width: u32,
    pub max_height: u32,
    pub preferred_format: OutputFormat,
    pub enable_smart_crop: bool,
    pub max_concurrent_batch_items: usize,
    pub dry_run: bool,
}

impl JsonConfig {
    pub fn new(policy: &PolicyOptions, dry_run: bool) -> Self {
        Self {
            default_quality: policy.default_quality,
            max_width: policy.max_width,
            max_height: policy.max_height,
            preferred_format: policy.preferred_format,
            enable_smart_crop: policy.enable_smart_crop,
            max_concurrent_batch_items: policy.max_concurrent_batch_items,
            dry_run,
        }
    }
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn probe(support: FormatSupport) -> Self {
        Self::Probe { support }
    }

    pub fn start(total_images: usize, rejected: usize, config: JsonConfig) -> Self {
        Self::Start {
            total_images,
            rejected,
            config,
        }
    }

    pub fn file_complete(item: &BatchItemResult, stored: Option<StoredImage>) -> Self {
        match &item.outcome {
            Ok(outcome) => {
                let optimized_size = outcome.optimized.byte_size();
                Self::FileComplete {
                    index: item.index,
                    name: item.name.clone(),
                    original_size: item.original_size,
                    optimized_size,
                    reduction_percent: crate::file_manager::FileManager::calculate_reduction(
                        item.original_size,
                        optimized_size,
                    ),
                    format: Some(outcome.optimized.format),
                    width: Some(outcome.optimized.width),
                    height: Some(outcome.optimized.height),
                    stored,
                    error: None,
                }
            }
            Err(e) => Self::FileComplete {
                index: item.index,
                name: item.name.clone(),
                original_size: item.original_size,
                optimized_size: item.original_size,
                reduction_percent: 0.0,
                format: None,
                width: None,
                height: None,
                stored: None,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn suggestions(name: Option<String>, report: SuggestionReport) -> Self {
        Self::Suggestions { name, report }
    }

    pub fn complete(result: &BatchResult, duration_seconds: f64) -> Self {
        Self::Complete {
            total: result.total,
            successful: result.successful,
            failed: result.failed,
            total_original_size: result.total_original_size,
            total_optimized_size: result.total_optimized_size,
            savings_percent: result.savings_percent(),
            duration_seconds,
        }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}
