//! Acquisition flow for one activity document, expressed as an explicit
//! state machine: launch the host application, wait for the results dialog
//! to appear, position it, run the capture chain, then tear everything down.
//! Cleanup runs exactly once whether the flow succeeds or fails.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// The side effects the acquisition flow needs from its host application.
/// The Win32 session implements this against a real Packet Tracer process;
/// tests drive the state machine with a scripted host.
pub trait ActivityHost {
    /// Starts the host application with the given activity document.
    fn launch(&mut self, document: &Path) -> Result<()>;
    /// Blocks while the freshly launched application initializes.
    fn settle(&mut self);
    /// One poll for the activity results window. Ok(true) once it exists.
    fn poll_activity_window(&mut self) -> Result<bool>;
    /// Blocks between window polls.
    fn wait_interval(&mut self);
    /// Moves the found window into the capture zone and forces a repaint.
    fn position_window(&mut self) -> Result<()>;
    /// Runs the capture chain and writes the result to `output`.
    fn capture(&mut self, output: &Path) -> Result<()>;
    /// Closes windows and terminates the host process.
    fn cleanup(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Idle,
    Launching,
    AwaitingWindow,
    Positioning,
    Capturing,
    Success,
    Failed,
    CleanedUp,
}

/// Drives one document through the acquisition states.
pub struct AcquisitionFlow<'a, H: ActivityHost> {
    host: &'a mut H,
    document: PathBuf,
    output: PathBuf,
    state: AcquisitionState,
    polls: u64,
    max_polls: u64,
    failure: Option<String>,
}

impl<'a, H: ActivityHost> AcquisitionFlow<'a, H> {
    pub fn new(host: &'a mut H, document: &Path, output: &Path, max_polls: u64) -> Self {
        Self {
            host,
            document: document.to_path_buf(),
            output: output.to_path_buf(),
            state: AcquisitionState::Idle,
            polls: 0,
            max_polls,
            failure: None,
        }
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    fn fail(&mut self, message: String) {
        crate::log(&message);
        self.failure = Some(message);
        self.state = AcquisitionState::Failed;
    }

    /// Advances the flow by one transition.
    pub fn step(&mut self) {
        match self.state {
            AcquisitionState::Idle => {
                self.state = AcquisitionState::Launching;
            }
            AcquisitionState::Launching => {
                crate::log(&format!("Launching: {}", self.document.display()));
                match self.host.launch(&self.document) {
                    Ok(()) => {
                        self.host.settle();
                        self.state = AcquisitionState::AwaitingWindow;
                    }
                    Err(e) => self.fail(format!("Launch failed: {}", e)),
                }
            }
            AcquisitionState::AwaitingWindow => match self.host.poll_activity_window() {
                Ok(true) => {
                    crate::log("Activity window found");
                    self.state = AcquisitionState::Positioning;
                }
                Ok(false) => {
                    self.polls += 1;
                    if self.polls >= self.max_polls {
                        self.fail("Activity window never appeared".to_string());
                    } else {
                        self.host.wait_interval();
                    }
                }
                Err(e) => self.fail(format!("Window search failed: {}", e)),
            },
            AcquisitionState::Positioning => match self.host.position_window() {
                Ok(()) => self.state = AcquisitionState::Capturing,
                Err(e) => self.fail(format!("Window positioning failed: {}", e)),
            },
            AcquisitionState::Capturing => match self.host.capture(&self.output) {
                Ok(()) => {
                    crate::log(&format!("Captured: {}", self.output.display()));
                    self.state = AcquisitionState::Success;
                }
                Err(e) => self.fail(format!("Capture failed: {}", e)),
            },
            AcquisitionState::Success | AcquisitionState::Failed => {
                self.host.cleanup();
                self.state = AcquisitionState::CleanedUp;
            }
            AcquisitionState::CleanedUp => {}
        }
    }

    /// Runs the flow to completion, including cleanup.
    pub fn run(&mut self) -> Result<()> {
        let mut succeeded = false;
        while self.state != AcquisitionState::CleanedUp {
            if self.state == AcquisitionState::Success {
                succeeded = true;
            }
            self.step();
        }
        if succeeded {
            Ok(())
        } else {
            Err(anyhow!(
                "Acquisition failed for {}: {}",
                self.document.display(),
                self.failure.as_deref().unwrap_or("unknown error")
            ))
        }
    }
}
