//! Packet Tracer process lifecycle and the batch capture entry point.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::Duration;

use super::acquire::{AcquisitionFlow, ActivityHost};
use super::chain::{capture_with_fallback, save_jpeg};
use super::win32::{close_packet_tracer_windows, find_packet_tracer_windows, position_window,
    GdiBackend};
use super::window::smallest_activity;
use crate::config::{get_config, SUPPORTED_IMAGE_EXTENSIONS};
use crate::paths;

/// One Packet Tracer launch. Cleanup is idempotent and also runs from Drop,
/// so an early return can never leave the process behind.
pub struct PtSession {
    executable: PathBuf,
    child: Option<Child>,
    activity_handle: Option<isize>,
    cleaned: bool,
}

impl PtSession {
    pub fn new(executable: &Path) -> Self {
        Self {
            executable: executable.to_path_buf(),
            child: None,
            activity_handle: None,
            cleaned: false,
        }
    }
}

impl ActivityHost for PtSession {
    fn launch(&mut self, document: &Path) -> Result<()> {
        let child = Command::new(&self.executable)
            .arg(document)
            .spawn()
            .with_context(|| {
                format!("Could not start Packet Tracer: {}", self.executable.display())
            })?;
        crate::log(&format!("Packet Tracer started (pid {})", child.id()));
        self.child = Some(child);
        self.cleaned = false;
        Ok(())
    }

    fn settle(&mut self) {
        let secs = get_config().launch_wait_secs;
        crate::log(&format!("Waiting {}s for Packet Tracer to initialize...", secs));
        std::thread::sleep(Duration::from_secs(secs));
    }

    fn poll_activity_window(&mut self) -> Result<bool> {
        let windows = find_packet_tracer_windows()?;
        match smallest_activity(&windows) {
            Some(desc) => {
                crate::log(&format!(
                    "Activity window: \"{}\" ({}x{})",
                    desc.title, desc.rect.width, desc.rect.height
                ));
                self.activity_handle = Some(desc.handle);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn wait_interval(&mut self) {
        std::thread::sleep(Duration::from_secs(get_config().window_poll_secs));
    }

    fn position_window(&mut self) -> Result<()> {
        let handle = self
            .activity_handle
            .ok_or_else(|| anyhow!("No activity window recorded"))?;
        position_window(handle, &get_config().capture_zone)?;
        Ok(())
    }

    fn capture(&mut self, output: &Path) -> Result<()> {
        let handle = self
            .activity_handle
            .ok_or_else(|| anyhow!("No activity window recorded"))?;
        let windows = find_packet_tracer_windows()?;
        let desc = windows
            .iter()
            .find(|w| w.handle == handle)
            .ok_or_else(|| anyhow!("Activity window disappeared before capture"))?;

        let mut backend = GdiBackend::new(desc);
        let outcome = capture_with_fallback(&mut backend, desc.rect)?;
        save_jpeg(&outcome.image, output)
            .with_context(|| format!("Could not write {}", output.display()))?;
        Ok(())
    }

    fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;

        let closed = close_packet_tracer_windows();
        if closed > 0 {
            crate::log(&format!("Closed {} Packet Tracer window(s)", closed));
            std::thread::sleep(Duration::from_secs(get_config().cleanup_delay_secs));
        }

        if let Some(mut child) = self.child.take() {
            match child.try_wait() {
                Ok(Some(status)) => {
                    crate::log(&format!("Packet Tracer exited: {}", status));
                }
                _ => {
                    // Window close was ignored; stop the process directly
                    if let Err(e) = child.kill() {
                        crate::log(&format!("Could not kill Packet Tracer: {}", e));
                    }
                    let _ = child.wait();
                    crate::log("Packet Tracer terminated");
                }
            }
        }
    }
}

impl Drop for PtSession {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Derives the image filename for an activity document: the document stem
/// (normally the student ID) with a .jpg extension, under images/.
fn output_path_for(document: &Path) -> Result<PathBuf> {
    let stem = document
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("Unusable document name: {}", document.display()))?;
    Ok(paths::get_images_dir().join(format!("{}.jpg", stem)))
}

/// Captures one activity document end to end.
pub fn capture_document(executable: &Path, document: &Path) -> Result<PathBuf> {
    let output = output_path_for(document)?;
    let mut session = PtSession::new(executable);
    let max_polls = get_config().max_window_polls() as u64;
    AcquisitionFlow::new(&mut session, document, &output, max_polls).run()?;
    Ok(output)
}

/// Captures every .pka document in the documents directory. Already-captured
/// documents (an image with any supported extension exists) are skipped.
pub fn capture_all_documents(executable: &Path) -> Result<(usize, usize)> {
    let pka_dir = paths::get_pka_dir();
    let images_dir = paths::get_images_dir();

    let mut documents: Vec<PathBuf> = std::fs::read_dir(&pka_dir)
        .with_context(|| format!("Could not read {}", pka_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pka"))
        })
        .collect();
    documents.sort();

    if documents.is_empty() {
        crate::log(&format!("No .pka documents in {}", pka_dir.display()));
        return Ok((0, 0));
    }
    crate::log(&format!("Found {} document(s) to capture", documents.len()));

    let mut captured = 0;
    let mut failed = 0;
    for (index, document) in documents.iter().enumerate() {
        let stem = document
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let already = SUPPORTED_IMAGE_EXTENSIONS
            .iter()
            .any(|ext| images_dir.join(format!("{}.{}", stem, ext)).exists());
        if already {
            crate::log(&format!("Skipping {} (image already exists)", stem));
            continue;
        }

        crate::log(&format!(
            "[{}/{}] Capturing {}",
            index + 1,
            documents.len(),
            document.display()
        ));
        match capture_document(executable, document) {
            Ok(path) => {
                crate::log(&format!("Saved {}", path.display()));
                captured += 1;
            }
            Err(e) => {
                crate::log(&format!("Capture failed: {:#}", e));
                failed += 1;
            }
        }
        // Let the desktop settle between launches
        std::thread::sleep(Duration::from_secs(3));
    }

    Ok((captured, failed))
}
