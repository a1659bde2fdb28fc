//! Completion-score extraction from activity screenshots.
//!
//! This module provides:
//! - The recognition boundary (`TextRecognizer`, `TesseractEngine`)
//! - The fixed preprocessing and page-segmentation catalogs
//! - Percentage parsing and consensus analysis
//! - The multi-pass extraction matrix (`extract_completion`)

pub mod consensus;
pub mod engine;
pub mod extract;
pub mod parse;
pub mod preprocess;
pub mod psm;

pub use engine::{TesseractEngine, TextRecognizer};
pub use extract::{extract_completion, ExtractionResult};
pub use psm::PsmMode;

use anyhow::{Context, Result};
use std::path::Path;

/// High-level entry point: image file -> extraction result.
///
/// Loads the image, converts to grayscale, and runs the full recognition
/// matrix with the given consensus parameters.
pub fn scan_image<R: TextRecognizer>(
    recognizer: &R,
    path: &Path,
    min_results: usize,
    tolerance: u32,
) -> Result<ExtractionResult> {
    let gray = image::open(path)
        .with_context(|| format!("Could not read image: {}", path.display()))?
        .to_luma8();

    crate::log(&format!(
        "Processing image: {} ({}x{})",
        path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
        gray.width(),
        gray.height()
    ));

    Ok(extract_completion(recognizer, &gray, min_results, tolerance))
}
