//! # Hugo Image Optimizer Library
//!
//! Pipeline di ottimizzazione immagini per i contenuti di un sito Hugo:
//! analisi, scelta della strategia, ri-codifica e ridimensionamento.
//!
//! ## Architettura dei moduli:
//! - `surface`: Astrazione della superficie raster (decode, crop/resize, export)
//! - `capabilities`: Probe dei formati di output disponibili
//! - `analyzer`: Complessità, trasparenza, colori dominanti, classificazione
//! - `strategy`: Scelta di formato, qualità e dimensioni target
//! - `encoder`: Applica la strategia e produce i byte codificati
//! - `optimizer`: Orchestrazione singola e batch
//! - `suggestions`: Raccomandazioni senza ri-codifica
//! - `config`: Policy di ottimizzazione e validazione
//! - `error`: Tipi di errore
//! - `file_manager`: Discovery, caricamento e filtro upload
//! - `sink`: Scrittura nel progetto Hugo
//! - `progress` / `json_output`: Feedback per la CLI
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use hugo_image_optimizer::{ImageOptimizer, PolicyOptions};
//!
//! let optimizer = ImageOptimizer::new(PolicyOptions::default())?;
//! let outcome = optimizer.optimize_image(&image).await?;
//! ```

pub mod analyzer;
pub mod capabilities;
pub mod config;
pub mod encoder;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod optimizer;
pub mod progress;
pub mod sink;
pub mod strategy;
pub mod suggestions;
pub mod surface;
pub mod types;

pub use capabilities::FormatSupport;
pub use config::PolicyOptions;
pub use error::OptimizeError;
pub use optimizer::{BatchItemResult, BatchResult, ImageOptimizer, OptimizationOutcome};
pub use sink::{FileSink, StoredImage};
pub use suggestions::SuggestionReport;
pub use surface::{ImageBackend, RasterBackend, RasterSurface};
pub use types::{ImageAnalysis, ImageBytes, OptimizationStrategy, OptimizedResult, OutputFormat};
