//! Screenshot acquisition: launching Packet Tracer for each activity
//! document, locating its results window, and capturing it through a chain
//! of fallback strategies.

pub mod acquire;
pub mod chain;
pub mod window;

#[cfg(windows)]
pub mod session;
#[cfg(windows)]
pub mod win32;

#[cfg(windows)]
pub use session::capture_all_documents;
