//! # Suggestion Generator Module
//!
//! Esegue solo l'analisi e produce raccomandazioni leggibili con una stima
//! euristica del risparmio. Nessuna ri-codifica: la stima non è mai un
//! risultato garantito.
//!
//! ## Regole (indipendenti, tutte quelle applicabili, in ordine):
//! - Oltre 1920×1080 → resize (impatto alto)
//! - PNG senza trasparenza → conversione formato (impatto medio)
//! - Complessità < 0.3 → riduzione qualità (impatto basso)
//!
//! ## Stima:
//! Rapporto 0.6 per le fotografiche, 0.8 per la grafica semplice, 0.7 altrimenti.

use crate::optimizer::ImageOptimizer;
use crate::surface::RasterBackend;
use crate::types::{ImageAnalysis, ImageBytes};
use serde::{Deserialize, Serialize};

pub const SUGGEST_MAX_WIDTH: u32 = 1920;
pub const SUGGEST_MAX_HEIGHT: u32 = 1080;
pub const PHOTO_SIZE_RATIO: f64 = 0.6;
pub const SIMPLE_GRAPHIC_SIZE_RATIO: f64 = 0.8;
pub const DEFAULT_SIZE_RATIO: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Resize,
    Format,
    Quality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub message: String,
    pub impact: Impact,
}

/// Heuristic estimate, not the result of an encode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavingsEstimate {
    pub estimated_size: f64,
    pub savings: f64,
    pub savings_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionReport {
    pub analysis: ImageAnalysis,
    pub suggestions: Vec<Suggestion>,
    pub estimated_savings: SavingsEstimate,
}

impl<B: RasterBackend> ImageOptimizer<B> {
    /// Analyze `image` and recommend optimizations without encoding it
    pub async fn suggest(&self, image: &ImageBytes) -> SuggestionReport {
        let analysis = self.analyze(image).await;
        build_report(image, analysis)
    }
}

pub fn build_report(image: &ImageBytes, analysis: ImageAnalysis) -> SuggestionReport {
    let suggestions = suggestions_for(image, &analysis);
    let estimated_savings = estimate_savings(&analysis, image.len());
    SuggestionReport {
        analysis,
        suggestions,
        estimated_savings,
    }
}

pub fn suggestions_for(image: &ImageBytes, analysis: &ImageAnalysis) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    if analysis.width > SUGGEST_MAX_WIDTH || analysis.height > SUGGEST_MAX_HEIGHT {
        suggestions.push(Suggestion {
            kind: SuggestionKind::Resize,
            message: format!(
                "Scale the image down from {}x{} to fit {}x{} to reduce file size",
                analysis.width, analysis.height, SUGGEST_MAX_WIDTH, SUGGEST_MAX_HEIGHT
            ),
            impact: Impact::High,
        });
    }

    if image.mime_type().eq_ignore_ascii_case("image/png") && !analysis.has_transparency {
        suggestions.push(Suggestion {
            kind: SuggestionKind::Format,
            message: "Opaque PNG: convert to JPEG or WebP".to_string(),
            impact: Impact::Medium,
        });
    }

    if analysis.complexity < 0.3 {
        suggestions.push(Suggestion {
            kind: SuggestionKind::Quality,
            message: "Low visual complexity: quality can be lowered without visible loss".to_string(),
            impact: Impact::Low,
        });
    }

    suggestions
}

pub fn estimate_savings(analysis: &ImageAnalysis, original_size: u64) -> SavingsEstimate {
    let ratio = if analysis.is_photographic {
        PHOTO_SIZE_RATIO
    } else if analysis.complexity < 0.3 {
        SIMPLE_GRAPHIC_SIZE_RATIO
    } else {
        DEFAULT_SIZE_RATIO
    };

    let original = original_size as f64;
    let estimated_size = original * ratio;
    let savings = original - estimated_size;
    let savings_percentage = if original_size > 0 {
        savings / original * 100.0
    } else {
        0.0
    };

    SavingsEstimate {
        estimated_size,
        savings,
        savings_percentage,
    }
}
