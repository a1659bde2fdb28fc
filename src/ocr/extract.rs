//! Multi-pass completion extraction.
//!
//! Runs the full preprocessing x page-segmentation matrix (5 x 7 = 35
//! recognition calls) over one image, collects one reading per pair, and
//! hands the pool to consensus analysis. Each pair is isolated: a failing
//! OCR call contributes a "nothing recognized" reading and the matrix keeps
//! going.

use image::GrayImage;

use super::consensus::{self, ConsensusOutcome, Reading};
use super::engine::TextRecognizer;
use super::parse::block_reading;
use super::preprocess::PreprocessVariant;
use super::psm::PsmMode;

/// Terminal result of scanning one image.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Accepted completion percentage; None when no consensus was reached
    pub score: Option<u8>,
    /// Human-readable explanation of how the result was (or wasn't) reached
    pub rationale: String,
    /// Size of the winning group, 0 on failure
    pub group_size: usize,
}

impl ExtractionResult {
    /// The score to persist: inconclusive scans record 0, with the rationale
    /// making clear it is a "no result", not a measured 0%.
    pub fn score_or_zero(&self) -> u8 {
        self.score.unwrap_or(0)
    }
}

/// Runs every (preprocessing, PSM) pair over the image and reduces the
/// resulting readings to one accepted score.
pub fn extract_completion<R: TextRecognizer>(
    recognizer: &R,
    gray: &GrayImage,
    min_results: usize,
    tolerance: u32,
) -> ExtractionResult {
    let mut readings: Vec<Reading> = Vec::with_capacity(35);

    for variant in PreprocessVariant::ALL {
        let processed = variant.apply(gray);

        for mode in PsmMode::ALL {
            let source = format!("{}+{}", variant.label(), mode.label());

            let value = match recognizer.recognize(&processed, mode) {
                Ok(text) => block_reading(&text),
                Err(e) => {
                    crate::log(&format!("Pass {} failed: {}", source, e));
                    0
                }
            };

            if value > 0 {
                crate::log(&format!("Pass {}: {}%", source, value));
            }

            readings.push(Reading::new(value, source));
        }
    }

    summarize(consensus::analyze(&readings, min_results, tolerance), min_results)
}

/// Converts a consensus outcome into the terminal result with its rationale.
fn summarize(outcome: ConsensusOutcome, min_results: usize) -> ExtractionResult {
    match outcome {
        ConsensusOutcome::Accepted {
            score,
            mean,
            group_size,
            sources,
        } => {
            let shown: Vec<&str> = sources.iter().take(5).map(String::as_str).collect();
            let suffix = if sources.len() > 5 { ", ..." } else { "" };
            ExtractionResult {
                score: Some(score),
                rationale: format!(
                    "Consensus from {} passes (avg: {:.1}% -> {}%; agreeing: {}{})",
                    group_size,
                    mean,
                    score,
                    shown.join(", "),
                    suffix
                ),
                group_size,
            }
        }
        ConsensusOutcome::Insufficient { count } => ExtractionResult {
            score: None,
            rationale: format!("Insufficient results ({} < {})", count, min_results),
            group_size: 0,
        },
        ConsensusOutcome::NoConsensus { largest_group } => ExtractionResult {
            score: None,
            rationale: format!(
                "No consensus: largest group has {} results (need >={})",
                largest_group, min_results
            ),
            group_size: 0,
        },
    }
}
