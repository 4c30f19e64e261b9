//! # Format Capability Prober
//!
//! Determina quali formati di output il runtime è in grado di produrre.
//!
//! Per ogni formato candidato viene esportata una superficie 1×1: il formato
//! è supportato solo se l'encoder accetta la richiesta e i byte prodotti
//! dichiarano davvero quel formato. L'assenza di un formato è un normale
//! `false`, mai un errore.
//!
//! Il risultato va calcolato una volta all'avvio e passato ai componenti
//! (nessuna cache globale nascosta).

use crate::surface::{RasterBackend, RasterSurface};
use crate::types::OutputFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Output encodings available in this runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSupport {
    pub webp: bool,
    pub avif: bool,
    pub jpeg: bool,
    pub png: bool,
}

impl FormatSupport {
    /// Probe every candidate format against `backend`
    pub fn probe<B: RasterBackend>(backend: &B) -> Self {
        let support = Self {
            webp: probe_format(backend, OutputFormat::Webp),
            avif: probe_format(backend, OutputFormat::Avif),
            jpeg: probe_format(backend, OutputFormat::Jpeg),
            png: probe_format(backend, OutputFormat::Png),
        };
        info!("Output format support: {}", support);
        support
    }

    /// Every format flagged as supported
    pub fn all() -> Self {
        Self {
            webp: true,
            avif: true,
            jpeg: true,
            png: true,
        }
    }

    pub fn supports(&self, format: OutputFormat) -> bool {
        match format {
            OutputFormat::Webp => self.webp,
            OutputFormat::Avif => self.avif,
            OutputFormat::Jpeg => self.jpeg,
            OutputFormat::Png => self.png,
        }
    }

    pub fn supported(&self) -> Vec<OutputFormat> {
        OutputFormat::ALL
            .into_iter()
            .filter(|format| self.supports(*format))
            .collect()
    }
}

impl fmt::Display for FormatSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |on: bool| if on { "yes" } else { "no" };
        write!(
            f,
            "webp={} avif={} jpeg={} png={}",
            flag(self.webp),
            flag(self.avif),
            flag(self.jpeg),
            flag(self.png)
        )
    }
}

/// Encode a 1×1 surface and check the produced bytes declare `format`
fn probe_format<B: RasterBackend>(backend: &B, format: OutputFormat) -> bool {
    let surface = backend.blank(1, 1);
    match surface.export(format, 0.8, false) {
        Ok(bytes) => {
            let declared = backend.sniff(&bytes);
            if declared != Some(format) {
                debug!("Probe for {} produced {:?} instead", format, declared);
                return false;
            }
            true
        }
        Err(e) => {
            debug!("Probe for {} rejected: {}", format, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::ImageBackend;

    #[test]
    fn test_probe_image_backend() {
        let support = FormatSupport::probe(&ImageBackend);
        assert!(support.jpeg);
        assert!(support.png);
        assert!(support.webp);
        assert_eq!(support.avif, cfg!(feature = "avif"));
    }

    #[test]
    fn test_probe_is_idempotent() {
        assert_eq!(
            FormatSupport::probe(&ImageBackend),
            FormatSupport::probe(&ImageBackend)
        );
    }

    #[test]
    fn test_supported_list() {
        let support = FormatSupport {
            webp: false,
            avif: false,
            jpeg: true,
            png: true,
        };
        assert_eq!(support.supported(), vec![OutputFormat::Jpeg, OutputFormat::Png]);
        assert!(!support.supports(OutputFormat::Webp));
    }
}
