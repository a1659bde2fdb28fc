//! Per-student scanning and the batch run over the images directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::results::{append_record, StudentRecord};
use crate::config::SUPPORTED_IMAGE_EXTENSIONS;
use crate::ocr::{scan_image, TextRecognizer};

/// Outcome of scanning one student's screenshot.
#[derive(Debug, Clone)]
pub struct StudentScan {
    pub record: StudentRecord,
    pub rationale: String,
    /// True when the OCR passes agreed on a score.
    pub conclusive: bool,
}

/// Totals from one batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub scanned: usize,
    pub missing: Vec<String>,
    pub inconclusive: Vec<String>,
}

/// Filename stems that plausibly are student IDs: all digits, or
/// alphanumeric of at least four characters.
fn is_plausible_id(stem: &str) -> bool {
    if stem.is_empty() {
        return false;
    }
    if stem.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    stem.len() >= 4 && stem.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Finds the screenshot for a student ID, trying extensions in preference
/// order.
pub fn find_image_for_id(images_dir: &Path, id: &str) -> Option<PathBuf> {
    SUPPORTED_IMAGE_EXTENSIONS
        .iter()
        .map(|ext| images_dir.join(format!("{}.{}", id, ext)))
        .find(|p| p.exists())
}

/// Lists the student IDs present in the images directory, sorted and
/// deduplicated.
pub fn list_student_ids(images_dir: &Path) -> Result<Vec<String>> {
    let mut ids: Vec<String> = std::fs::read_dir(images_dir)
        .with_context(|| format!("Could not read {}", images_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| {
                    SUPPORTED_IMAGE_EXTENSIONS
                        .iter()
                        .any(|s| s.eq_ignore_ascii_case(e))
                })
        })
        .filter_map(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
        .filter(|stem| is_plausible_id(stem))
        .collect();
    ids.sort();
    ids.dedup();
    Ok(ids)
}

/// Scans one student. Returns None when no screenshot exists; a student with
/// a screenshot always produces a record, scored zero when the OCR passes
/// could not agree.
pub fn scan_student<R: TextRecognizer>(
    recognizer: &R,
    images_dir: &Path,
    id: &str,
    min_results: usize,
    tolerance: u32,
) -> Result<Option<StudentScan>> {
    let Some(image_path) = find_image_for_id(images_dir, id) else {
        crate::log(&format!("No image found for ID {}", id));
        return Ok(None);
    };

    let extraction = scan_image(recognizer, &image_path, min_results, tolerance)?;
    let conclusive = extraction.score.is_some();
    let score = extraction.score_or_zero();
    crate::log(&format!("ID {}: score {} ({})", id, score, extraction.rationale));

    Ok(Some(StudentScan {
        record: StudentRecord::new(id, score),
        rationale: extraction.rationale,
        conclusive,
    }))
}

/// Scans every student in the images directory. When a results path is
/// given, each record is appended to the CSV as soon as it is produced, so
/// an interrupted batch loses at most the student in flight.
pub fn scan_all<R: TextRecognizer>(
    recognizer: &R,
    images_dir: &Path,
    min_results: usize,
    tolerance: u32,
    results_path: Option<&Path>,
) -> Result<(Vec<StudentRecord>, BatchSummary)> {
    let ids = list_student_ids(images_dir)?;
    crate::log(&format!("Scanning {} student(s)", ids.len()));

    let mut records = Vec::new();
    let mut summary = BatchSummary::default();
    for id in &ids {
        match scan_student(recognizer, images_dir, id, min_results, tolerance)? {
            Some(scan) => {
                if let Some(path) = results_path {
                    append_record(path, &scan.record)?;
                }
                if !scan.conclusive {
                    summary.inconclusive.push(id.clone());
                }
                records.push(scan.record);
                summary.scanned += 1;
            }
            None => summary.missing.push(id.clone()),
        }
    }
    Ok((records, summary))
}

/// Formats the grading table and score statistics for a finished batch:
/// one row per student, then the totals and the average over non-zero
/// scores.
pub fn batch_report(records: &[StudentRecord], summary: &BatchSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<12} {:>5}  Status\n", "ID Number", "Score"));
    for record in records {
        let status = if summary.inconclusive.contains(&record.id) {
            "check manually"
        } else {
            "ok"
        };
        out.push_str(&format!(
            "{:<12} {:>5}  {}\n",
            record.id, record.score, status
        ));
    }

    let scored: Vec<u32> = records
        .iter()
        .filter(|r| r.score > 0)
        .map(|r| r.score as u32)
        .collect();
    out.push_str(&format!(
        "Total: {} student(s), {} with a readable score\n",
        records.len(),
        scored.len()
    ));
    if !scored.is_empty() {
        let average = scored.iter().sum::<u32>() as f64 / scored.len() as f64;
        out.push_str(&format!("Average score (non-zero): {:.1}%\n", average));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::PsmMode;
    use image::GrayImage;
    use tempfile::tempdir;

    struct FixedRecognizer {
        text: String,
    }

    impl TextRecognizer for FixedRecognizer {
        fn recognize(&self, _img: &GrayImage, _mode: PsmMode) -> Result<String> {
            Ok(self.text.clone())
        }
    }

    fn write_blank_image(dir: &Path, name: &str) {
        GrayImage::new(16, 16).save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_is_plausible_id() {
        assert!(is_plausible_id("24075450"));
        assert!(is_plausible_id("7"));
        assert!(is_plausible_id("abc123"));
        assert!(!is_plausible_id("abc"));
        assert!(!is_plausible_id("note-s"));
        assert!(!is_plausible_id(""));
    }

    #[test]
    fn test_find_image_prefers_jpg() {
        let dir = tempdir().unwrap();
        write_blank_image(dir.path(), "1234.png");
        write_blank_image(dir.path(), "1234.jpg");

        let found = find_image_for_id(dir.path(), "1234").unwrap();
        assert_eq!(found.extension().unwrap(), "jpg");
    }

    #[test]
    fn test_list_student_ids_filters_and_sorts() {
        let dir = tempdir().unwrap();
        write_blank_image(dir.path(), "300.png");
        write_blank_image(dir.path(), "100.jpg");
        write_blank_image(dir.path(), "100.png");
        write_blank_image(dir.path(), "abc.png");
        std::fs::write(dir.path().join("100.txt"), "not an image").unwrap();

        let ids = list_student_ids(dir.path()).unwrap();
        assert_eq!(ids, vec!["100", "300"]);
    }

    #[test]
    fn test_scan_student_full_pipeline() {
        let dir = tempdir().unwrap();
        write_blank_image(dir.path(), "24075450.png");
        let recognizer = FixedRecognizer {
            text: "Completion: 75%".to_string(),
        };

        let scan = scan_student(&recognizer, dir.path(), "24075450", 3, 2)
            .unwrap()
            .unwrap();
        assert!(scan.conclusive);
        assert_eq!(
            scan.record,
            StudentRecord {
                id: "24075450".to_string(),
                score: 75,
                final_marks: 75,
            }
        );
    }

    #[test]
    fn test_scan_student_missing_image() {
        let dir = tempdir().unwrap();
        let recognizer = FixedRecognizer {
            text: "Completion: 75%".to_string(),
        };

        let result = scan_student(&recognizer, dir.path(), "999", 3, 2).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_scan_student_unreadable_scores_zero() {
        let dir = tempdir().unwrap();
        write_blank_image(dir.path(), "555.png");
        let recognizer = FixedRecognizer {
            text: "no percentages here".to_string(),
        };

        let scan = scan_student(&recognizer, dir.path(), "555", 3, 2)
            .unwrap()
            .unwrap();
        assert!(!scan.conclusive);
        assert_eq!(scan.record.score, 0);
    }

    #[test]
    fn test_scan_all_summary() {
        let dir = tempdir().unwrap();
        write_blank_image(dir.path(), "100.png");
        write_blank_image(dir.path(), "200.png");
        let recognizer = FixedRecognizer {
            text: "87% completed".to_string(),
        };

        let (records, summary) = scan_all(&recognizer, dir.path(), 3, 2, None).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(summary.scanned, 2);
        assert!(summary.missing.is_empty());
        assert!(summary.inconclusive.is_empty());
        assert!(records.iter().all(|r| r.score == 87));
    }

    #[test]
    fn test_scan_all_appends_records_as_produced() {
        let dir = tempdir().unwrap();
        write_blank_image(dir.path(), "100.png");
        write_blank_image(dir.path(), "200.png");
        let csv = dir.path().join("out.csv");
        let recognizer = FixedRecognizer {
            text: "Completion: 75%".to_string(),
        };

        scan_all(&recognizer, dir.path(), 3, 2, Some(&csv)).unwrap();

        let content = std::fs::read_to_string(&csv).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["ID Number,Score,Final Marks", "100,75,75", "200,75,75"]);
    }

    #[test]
    fn test_empty_batch_writes_no_csv() {
        let dir = tempdir().unwrap();
        let csv = dir.path().join("out.csv");
        let recognizer = FixedRecognizer {
            text: String::new(),
        };

        let (records, _) = scan_all(&recognizer, dir.path(), 3, 2, Some(&csv)).unwrap();
        assert!(records.is_empty());
        assert!(!csv.exists());
    }

    #[test]
    fn test_batch_report_table_and_average() {
        let records = vec![
            StudentRecord::new("100", 80),
            StudentRecord::new("200", 90),
            StudentRecord::new("300", 0),
        ];
        let summary = BatchSummary {
            scanned: 3,
            missing: vec![],
            inconclusive: vec!["300".to_string()],
        };

        let report = batch_report(&records, &summary);
        let lines: Vec<&str> = report.lines().collect();
        assert!(lines[0].starts_with("ID Number"));
        assert!(lines[1].contains("100") && lines[1].ends_with("ok"));
        assert!(lines[3].contains("300") && lines[3].ends_with("check manually"));
        assert!(report.contains("Total: 3 student(s), 2 with a readable score"));
        // Zero scores are excluded from the average
        assert!(report.contains("Average score (non-zero): 85.0%"));
    }

    #[test]
    fn test_batch_report_all_unreadable_has_no_average() {
        let records = vec![StudentRecord::new("100", 0)];
        let summary = BatchSummary {
            scanned: 1,
            missing: vec![],
            inconclusive: vec!["100".to_string()],
        };

        let report = batch_report(&records, &summary);
        assert!(!report.contains("Average"));
    }
}
