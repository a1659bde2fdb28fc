//! Batch scanning of captured screenshots and CSV result output.

pub mod results;
pub mod scanner;

pub use results::results_file_path;
pub use scanner::{batch_report, scan_all, scan_student};
