//! Text recognition boundary.
//!
//! The real engine shells out to an installed Tesseract binary; the trait
//! exists so the extraction matrix can be exercised with fake recognizers
//! in tests.

use anyhow::{anyhow, Result};
use image::GrayImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use super::psm::PsmMode;

/// Maps (image, page-segmentation config) to recognized text.
///
/// A failing call for one configuration must be tolerated by callers; it is
/// an ordinary per-pass outcome, not a pipeline error.
pub trait TextRecognizer {
    fn recognize(&self, img: &GrayImage, mode: PsmMode) -> Result<String>;
}

/// Tesseract invoked as a subprocess, one call per (image, PSM) pair.
pub struct TesseractEngine {
    executable: PathBuf,
}

impl TesseractEngine {
    /// Locates the Tesseract install. Failure here is fatal for a scan run:
    /// there is no per-document fallback for a systemically absent engine.
    pub fn locate() -> Result<Self> {
        let executable = crate::config::find_tesseract().ok_or_else(|| {
            anyhow!(
                "Tesseract OCR not found. Install from: \
                 https://github.com/UB-Mannheim/tesseract/wiki"
            )
        })?;
        Ok(Self { executable })
    }

    #[cfg(test)]
    pub fn with_executable(executable: PathBuf) -> Self {
        Self { executable }
    }
}

impl TextRecognizer for TesseractEngine {
    fn recognize(&self, img: &GrayImage, mode: PsmMode) -> Result<String> {
        // Tesseract reads from a file, so round-trip through a temp PNG
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())?;

        let output = Command::new(&self.executable)
            .arg(temp_input.path())
            .arg("stdout")
            .arg("-l")
            .arg("eng")
            .arg("--psm")
            .arg(mode.flag())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed ({}): {}", mode.label(), stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
