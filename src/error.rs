//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore della pipeline di ottimizzazione.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` enum per categorizzare gli errori della pipeline
//! - Separa errori sui dati (`Decode`) da errori di policy/programmazione
//!   (`UnsupportedFormat`, `Validation`)
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Decode`: I byte sorgente non sono un'immagine leggibile
//! - `Encode`: Il codec ha rifiutato il formato o non ha prodotto output
//! - `UnsupportedFormat`: Formato richiesto non disponibile nel runtime
//! - `Validation`: Parametri di policy o strategia non validi
//! - `Io` / `Image`: Conversioni automatiche da errori standard
//! - `Task`: Job bloccante terminato in modo anomalo
//!
//! L'analisi degradata non è un errore: l'analyzer restituisce sempre un
//! `ImageAnalysis` con il campo `analysis_error` valorizzato.
//!
//! ## Esempio:
//! ```rust,ignore
//! if !support.supports(format) {
//!     return Err(OptimizeError::UnsupportedFormat(format.to_string()));
//! }
//! ```

use crate::types::OutputFormat;

/// Errors produced by the optimization pipeline
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error ({format}): {reason}")]
    Encode { format: OutputFormat, reason: String },

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl OptimizeError {
    pub fn encode(format: OutputFormat, reason: impl Into<String>) -> Self {
        Self::Encode {
            format,
            reason: reason.into(),
        }
    }

    /// True for failures caused by the input data rather than by the caller
    pub fn is_data_error(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Image(_))
    }
}

impl From<tokio::task::JoinError> for OptimizeError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
