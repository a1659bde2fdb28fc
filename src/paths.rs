use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the directory scanned for `<student id>.<ext>` images: `<exe_dir>/images/`
pub fn get_images_dir() -> PathBuf {
    get_exe_dir().join("images")
}

/// Returns the directory scanned for `.pka` activity files: `<exe_dir>/pka/`
pub fn get_pka_dir() -> PathBuf {
    get_exe_dir().join("pka")
}

/// Returns the directory where result CSVs are written: `<exe_dir>/results/`
pub fn get_results_dir() -> PathBuf {
    get_exe_dir().join("results")
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    std::fs::create_dir_all(get_images_dir())?;
    std::fs::create_dir_all(get_pka_dir())?;
    std::fs::create_dir_all(get_results_dir())?;
    Ok(())
}
