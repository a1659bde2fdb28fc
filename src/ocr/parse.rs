//! Percentage extraction from raw recognized text.
//!
//! A single OCR pass produces free-form, often garbled text. This module
//! pulls every plausible completion percentage out of it and reduces the
//! block to one reading.

use anyhow::Result;
use regex::Regex;

/// Textual patterns that plausibly carry the completion score, in match order.
/// All are applied; the candidate pool is the union of their captures.
const PERCENT_PATTERNS: [&str; 5] = [
    r"(?i)completion[:\s]*(\d{1,3})%",
    r"(?i)(\d{1,3})%\s*completed?",
    r"(\d{1,3})%",
    r"(?i)score[:\s]*(\d{1,3})%",
    r"(?i)progress[:\s]*(\d{1,3})%",
];

/// Extracts all candidate percentages from a block of recognized text.
///
/// Every match of every pattern is parsed; values outside [0, 100] and
/// non-numeric captures are silently dropped. An empty result is a normal
/// outcome, not an error.
pub fn extract_percentages(text: &str) -> Result<Vec<u8>> {
    let mut found = Vec::new();

    for pattern in PERCENT_PATTERNS {
        let regex = Regex::new(pattern)?;
        for captures in regex.captures_iter(text) {
            let Some(m) = captures.get(1) else {
                continue;
            };
            let Ok(value) = m.as_str().parse::<u32>() else {
                continue;
            };
            if value <= 100 {
                found.push(value as u8);
            }
        }
    }

    Ok(found)
}

/// Reduces one recognized text block to a single reading.
///
/// The maximum candidate wins: stray small matches (lone digits picked up
/// elsewhere on the screen) are less likely to be the true score than the
/// largest plausible percentage. Zero candidates yield 0, which downstream
/// consensus treats as "nothing recognized", never as a genuine 0%.
pub fn block_reading(text: &str) -> u8 {
    match extract_percentages(text) {
        Ok(values) => values.into_iter().max().unwrap_or(0),
        Err(_) => 0,
    }
}
