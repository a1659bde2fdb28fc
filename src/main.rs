//! Packet Tracer Mark Scanner
//!
//! Console tool that captures Packet Tracer activity windows to screenshots
//! and reads the completion percentage out of them with Tesseract, writing
//! the scores to a CSV file for grading.

mod capture;
mod config;
mod ocr;
mod paths;
mod scan;

use anyhow::Result;
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;

use ocr::TesseractEngine;

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join("pka_scanner.log");
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn main() -> Result<()> {
    // Log panics before the process dies
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        eprintln!("[PANIC]{} {}", location, msg);
    }));

    paths::ensure_directories()?;
    config::init_config();

    log("Packet Tracer Mark Scanner started");
    run_menu()
}

fn prompt(message: &str) -> String {
    print!("{}", message);
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);
    line.trim().to_string()
}

fn run_menu() -> Result<()> {
    loop {
        println!();
        println!("=== Packet Tracer Mark Scanner ===");
        println!("  1. Validate setup");
        println!("  2. Capture activity screenshots");
        println!("  3. Scan marks from screenshots");
        println!("  4. Capture and scan everything");
        println!("  5. Exit");

        match prompt("Choice: ").as_str() {
            "1" => validate_setup(),
            "2" => run_capture(),
            "3" => {
                if let Err(e) = run_scan() {
                    log(&format!("Scan failed: {:#}", e));
                }
            }
            "4" => {
                run_capture();
                if let Err(e) = run_scan_all() {
                    log(&format!("Scan failed: {:#}", e));
                }
            }
            "5" | "q" | "" => {
                log("Exiting");
                return Ok(());
            }
            other => println!("Unknown choice: {}", other),
        }
    }
}

fn validate_setup() {
    log("Validating setup...");
    let issues = config::validate_environment();
    if issues.is_empty() {
        log("Setup looks good: Tesseract and Packet Tracer found");
    } else {
        for issue in &issues {
            log(&format!("Issue: {}", issue));
        }
    }
    log(&format!("Documents directory: {}", paths::get_pka_dir().display()));
    log(&format!("Images directory:    {}", paths::get_images_dir().display()));
    log(&format!("Results directory:   {}", paths::get_results_dir().display()));
}

#[cfg(windows)]
fn run_capture() {
    let Some(executable) = config::find_packet_tracer() else {
        log("Cisco Packet Tracer not found; cannot capture. Run option 1 for details.");
        return;
    };
    match capture::capture_all_documents(&executable) {
        Ok((captured, failed)) => {
            log(&format!(
                "Capture finished: {} captured, {} failed",
                captured, failed
            ));
        }
        Err(e) => log(&format!("Capture run failed: {:#}", e)),
    }
}

#[cfg(not(windows))]
fn run_capture() {
    log("Screenshot capture requires Windows; scan existing images instead.");
}

fn run_scan() -> Result<()> {
    match prompt("Scan [a]ll students or a single [i]d? ").as_str() {
        "i" => {
            let id = prompt("Student ID: ");
            if id.is_empty() {
                return Ok(());
            }
            run_scan_one(&id)
        }
        _ => run_scan_all(),
    }
}

fn run_scan_one(id: &str) -> Result<()> {
    let recognizer = TesseractEngine::locate()?;
    let cfg = config::get_config();
    match scan::scan_student(
        &recognizer,
        &paths::get_images_dir(),
        id,
        cfg.consensus_min_results,
        cfg.consensus_tolerance,
    )? {
        Some(scan) => {
            println!("ID {}: score {} ({})", id, scan.record.score, scan.rationale);
        }
        None => println!("No screenshot found for ID {}", id),
    }
    Ok(())
}

fn run_scan_all() -> Result<()> {
    let recognizer = TesseractEngine::locate()?;
    let cfg = config::get_config();
    let path = scan::results_file_path(&paths::get_results_dir());
    let (records, summary) = scan::scan_all(
        &recognizer,
        &paths::get_images_dir(),
        cfg.consensus_min_results,
        cfg.consensus_tolerance,
        Some(&path),
    )?;

    if records.is_empty() {
        log("No student images found; nothing to write");
        return Ok(());
    }

    println!();
    print!("{}", scan::batch_report(&records, &summary));
    log(&format!("Results written to {}", path.display()));
    if !summary.missing.is_empty() {
        log(&format!("Missing images: {}", summary.missing.join(", ")));
    }
    Ok(())
}
