//! Scanner configuration.
//!
//! Loads settings from config.json at startup. Provides consensus parameters,
//! capture geometry, timing constants, and external tool discovery.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<ScannerConfig> = OnceLock::new();

/// Image extensions searched when looking up a student's screenshot.
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "tiff"];

/// Known Packet Tracer install locations, in order of preference.
const PACKET_TRACER_CANDIDATES: [&str; 7] = [
    r"C:\Program Files\Cisco Packet Tracer 8.2.2\bin\PacketTracer.exe",
    r"C:\Program Files\Cisco Packet Tracer 8.2.1\bin\PacketTracer.exe",
    r"C:\Program Files\Cisco Packet Tracer 8.2.0\bin\PacketTracer.exe",
    r"C:\Program Files\Cisco Packet Tracer 8.1.1\bin\PacketTracer.exe",
    r"C:\Program Files (x86)\Cisco Packet Tracer 8.2.2\bin\PacketTracer.exe",
    r"C:\Program Files (x86)\Cisco Packet Tracer 8.2.1\bin\PacketTracer.exe",
    r"C:\Program Files (x86)\Cisco Packet Tracer 8.1.1\bin\PacketTracer.exe",
];

/// Known Tesseract install locations checked before falling back to PATH.
const TESSERACT_CANDIDATES: [&str; 3] = [
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    r"C:\Tesseract-OCR\tesseract.exe",
];

/// Screen rectangle the activity window is moved into before capture.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CaptureZone {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Default for CaptureZone {
    fn default() -> Self {
        Self {
            x: 50,
            y: 50,
            width: 800,
            height: 600,
        }
    }
}

/// Complete scanner configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Minimum number of agreeing OCR readings required for a trusted score
    #[serde(default = "default_min_results")]
    pub consensus_min_results: usize,
    /// Maximum distance (in percent points) between a reading and a group key
    #[serde(default = "default_tolerance")]
    pub consensus_tolerance: u32,
    /// Seconds to wait after launching Packet Tracer before polling for windows
    #[serde(default = "default_launch_wait")]
    pub launch_wait_secs: u64,
    /// Maximum seconds to wait for an activity window to appear
    #[serde(default = "default_window_wait")]
    pub window_wait_secs: u64,
    /// Poll interval while waiting for the activity window
    #[serde(default = "default_window_poll")]
    pub window_poll_secs: u64,
    /// Seconds to wait after posting close requests before killing the process
    #[serde(default = "default_cleanup_delay")]
    pub cleanup_delay_secs: u64,
    /// Where the activity window is positioned for capture
    #[serde(default)]
    pub capture_zone: CaptureZone,
    /// Explicit tesseract executable path (skips discovery when set)
    #[serde(default)]
    pub tesseract_path: Option<String>,
    /// Explicit Packet Tracer executable path (skips discovery when set)
    #[serde(default)]
    pub packet_tracer_path: Option<String>,
}

fn default_min_results() -> usize {
    3
}

fn default_tolerance() -> u32 {
    2
}

fn default_launch_wait() -> u64 {
    15
}

fn default_window_wait() -> u64 {
    60
}

fn default_window_poll() -> u64 {
    2
}

fn default_cleanup_delay() -> u64 {
    2
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            consensus_min_results: default_min_results(),
            consensus_tolerance: default_tolerance(),
            launch_wait_secs: default_launch_wait(),
            window_wait_secs: default_window_wait(),
            window_poll_secs: default_window_poll(),
            cleanup_delay_secs: default_cleanup_delay(),
            capture_zone: CaptureZone::default(),
            tesseract_path: None,
            packet_tracer_path: None,
        }
    }
}

impl ScannerConfig {
    /// Maximum number of window-appearance polls derived from the timing settings.
    pub fn max_window_polls(&self) -> u32 {
        (self.window_wait_secs / self.window_poll_secs.max(1)) as u32
    }
}

/// Loads configuration from config.json next to the executable, or defaults.
fn load_config() -> ScannerConfig {
    let config_path = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("config.json")))
        .unwrap_or_else(|| Path::new("config.json").to_path_buf());

    if config_path.exists() {
        match fs::read_to_string(&config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log("Config loaded from config.json");
                    return config;
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse config.json: {}. Using defaults.",
                        e
                    ));
                }
            },
            Err(e) => {
                crate::log(&format!("Failed to read config.json: {}. Using defaults.", e));
            }
        }
    } else {
        crate::log("config.json not found. Using default config.");
    }

    ScannerConfig::default()
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config() {
    let _ = CONFIG.set(load_config());
}

/// Returns a reference to the global configuration.
/// Panics if called before init_config().
pub fn get_config() -> &'static ScannerConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
}

/// Finds the Tesseract executable: configured path, known installs, then PATH.
pub fn find_tesseract() -> Option<PathBuf> {
    if let Some(path) = &get_config().tesseract_path {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    for candidate in TESSERACT_CANDIDATES {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return Some(p);
        }
    }

    // Fall back to PATH
    if let Ok(output) = Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Some(PathBuf::from("tesseract"));
        }
    }

    None
}

/// Finds the Packet Tracer executable: configured path, then known installs.
pub fn find_packet_tracer() -> Option<PathBuf> {
    if let Some(path) = &get_config().packet_tracer_path {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    PACKET_TRACER_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Checks that all external dependencies are available.
/// Returns a list of human-readable issues; empty means the setup is usable.
pub fn validate_environment() -> Vec<String> {
    let mut issues = Vec::new();

    match find_tesseract() {
        Some(path) => {
            let runs = Command::new(&path)
                .arg("--version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false);
            if !runs {
                issues.push(format!(
                    "Tesseract found at {} but failed to run",
                    path.display()
                ));
            }
        }
        None => {
            issues.push(
                "Tesseract OCR not found. Install from: \
                 https://github.com/UB-Mannheim/tesseract/wiki"
                    .to_string(),
            );
        }
    }

    if find_packet_tracer().is_none() {
        issues.push("Cisco Packet Tracer not found. Install Packet Tracer 8.x".to_string());
    }

    if let Err(e) = crate::paths::ensure_directories() {
        issues.push(format!("Could not create project directories: {}", e));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contract() {
        let config = ScannerConfig::default();
        assert_eq!(config.consensus_min_results, 3);
        assert_eq!(config.consensus_tolerance, 2);
        assert_eq!(config.capture_zone.x, 50);
        assert_eq!(config.capture_zone.y, 50);
    }

    #[test]
    fn test_max_window_polls() {
        let config = ScannerConfig::default();
        // 60s total at 2s intervals
        assert_eq!(config.max_window_polls(), 30);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ScannerConfig =
            serde_json::from_str(r#"{"consensus_min_results": 5}"#).unwrap();
        assert_eq!(config.consensus_min_results, 5);
        assert_eq!(config.consensus_tolerance, 2);
        assert_eq!(config.launch_wait_secs, 15);
    }
}
