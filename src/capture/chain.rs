//! Fallback chain of screenshot strategies.
//!
//! Qt windows on Windows fail to render into a capture in several distinct
//! ways, so three techniques are tried in a fixed order, each gated by an
//! approximate distinct-color count (a blank or garbled buffer has very few
//! colors). The chain stops at the first strategy whose quality gate passes;
//! the last strategy accepts unconditionally.

use anyhow::{anyhow, Result};
use image::RgbImage;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// A screen rectangle in absolute pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }
}

/// Minimum distinct colors for a direct screen grab to count as real content.
const SCREEN_GRAB_MIN_COLORS: usize = 100;

/// Minimum distinct colors for an off-screen window render to be accepted.
const RENDER_MIN_COLORS: usize = 50;

/// PrintWindow-style rendering flag variants, tried in this order.
pub const RENDER_FLAGS: [u32; 4] = [3, 1, 0, 2];

/// Pixel source for one target window. The Win32 implementation wraps GDI;
/// tests inject fakes.
pub trait CaptureBackend {
    /// Grabs the pixels of a screen rectangle.
    fn grab_screen(&mut self, rect: Rect) -> Result<RgbImage>;
    /// Renders the window's surface off-screen under the given flag variant.
    fn render_window(&mut self, flag: u32) -> Result<RgbImage>;
    /// Flashes/forces a redraw of the window so a following grab sees content.
    fn flash_window(&mut self) -> Result<()>;
}

/// The capture technique an attempt used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMethod {
    ScreenGrab,
    WindowRender,
    ForcedGrab,
}

/// Diagnostic record of one strategy attempt.
#[derive(Debug, Clone)]
pub struct CaptureAttempt {
    pub method: CaptureMethod,
    pub detail: String,
    pub color_count: Option<usize>,
    pub accepted: bool,
}

/// A successful capture plus the full attempt history.
#[derive(Debug)]
pub struct CaptureOutcome {
    pub image: RgbImage,
    pub attempts: Vec<CaptureAttempt>,
}

/// Counts distinct colors in the captured pixels. Used as a cheap proxy for
/// "did we capture real content or a blank/garbled buffer".
pub fn distinct_color_count(img: &RgbImage) -> usize {
    let mut colors: HashSet<[u8; 3]> = HashSet::new();
    for pixel in img.pixels() {
        colors.insert(pixel.0);
    }
    colors.len()
}

/// Runs the strategy chain for one window.
///
/// Strategies are tried strictly in order; a throwing strategy is recorded
/// as a failed attempt and the next one is tried. Only an error in the final
/// unconditional grab exhausts the chain.
pub fn capture_with_fallback<B: CaptureBackend>(
    backend: &mut B,
    rect: Rect,
) -> Result<CaptureOutcome> {
    let mut attempts: Vec<CaptureAttempt> = Vec::new();

    // Strategy 1: direct screen grab of the positioned window
    match backend.grab_screen(rect) {
        Ok(img) => {
            let colors = distinct_color_count(&img);
            let accepted = colors > SCREEN_GRAB_MIN_COLORS;
            attempts.push(CaptureAttempt {
                method: CaptureMethod::ScreenGrab,
                detail: "screen grab".to_string(),
                color_count: Some(colors),
                accepted,
            });
            if accepted {
                crate::log(&format!("Screen capture successful: {} colors", colors));
                return Ok(CaptureOutcome {
                    image: img,
                    attempts,
                });
            }
            crate::log(&format!(
                "Screen capture insufficient: {} colors",
                colors
            ));
        }
        Err(e) => {
            attempts.push(CaptureAttempt {
                method: CaptureMethod::ScreenGrab,
                detail: format!("screen grab failed: {}", e),
                color_count: None,
                accepted: false,
            });
            crate::log(&format!("Screen capture failed: {}", e));
        }
    }

    // Strategy 2: off-screen window render under each flag variant
    for flag in RENDER_FLAGS {
        match backend.render_window(flag) {
            Ok(img) => {
                let colors = distinct_color_count(&img);
                let accepted = colors > RENDER_MIN_COLORS;
                attempts.push(CaptureAttempt {
                    method: CaptureMethod::WindowRender,
                    detail: format!("render flag {}", flag),
                    color_count: Some(colors),
                    accepted,
                });
                if accepted {
                    crate::log(&format!(
                        "Window render successful (flag {}): {} colors",
                        flag, colors
                    ));
                    return Ok(CaptureOutcome {
                        image: img,
                        attempts,
                    });
                }
            }
            Err(e) => {
                attempts.push(CaptureAttempt {
                    method: CaptureMethod::WindowRender,
                    detail: format!("render flag {} failed: {}", flag, e),
                    color_count: None,
                    accepted: false,
                });
            }
        }
    }

    // Strategy 3: flash the window, then grab unconditionally
    let forced = backend
        .flash_window()
        .and_then(|_| backend.grab_screen(rect));
    match forced {
        Ok(img) => {
            let colors = distinct_color_count(&img);
            attempts.push(CaptureAttempt {
                method: CaptureMethod::ForcedGrab,
                detail: "forced grab".to_string(),
                color_count: Some(colors),
                accepted: true,
            });
            crate::log(&format!("Force capture completed: {} colors", colors));
            Ok(CaptureOutcome {
                image: img,
                attempts,
            })
        }
        Err(e) => {
            attempts.push(CaptureAttempt {
                method: CaptureMethod::ForcedGrab,
                detail: format!("forced grab failed: {}", e),
                color_count: None,
                accepted: false,
            });
            for attempt in &attempts {
                crate::log(&format!("  capture attempt: {:?}", attempt));
            }
            Err(anyhow!("All capture strategies exhausted: {}", e))
        }
    }
}

/// Saves a captured image as a high-quality JPEG.
pub fn save_jpeg(img: &RgbImage, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(BufWriter::new(file), 95);
    img.write_with_encoder(encoder)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Image with exactly `n` distinct colors.
    fn image_with_colors(n: usize) -> RgbImage {
        let mut img = RgbImage::new(n.max(1) as u32, 1);
        for (i, pixel) in img.pixels_mut().enumerate() {
            *pixel = Rgb([(i % 256) as u8, (i / 256) as u8, 0]);
        }
        img
    }

    const RECT: Rect = Rect {
        x: 0,
        y: 0,
        width: 10,
        height: 10,
    };

    struct FakeBackend {
        screen_colors: Option<usize>, // None = error
        render_colors: Vec<Option<usize>>,
        screen_calls: usize,
        render_calls: usize,
        flash_calls: usize,
    }

    impl FakeBackend {
        fn new(screen_colors: Option<usize>, render_colors: Vec<Option<usize>>) -> Self {
            Self {
                screen_colors,
                render_colors,
                screen_calls: 0,
                render_calls: 0,
                flash_calls: 0,
            }
        }
    }

    impl CaptureBackend for FakeBackend {
        fn grab_screen(&mut self, _rect: Rect) -> Result<RgbImage> {
            self.screen_calls += 1;
            match self.screen_colors {
                Some(n) => Ok(image_with_colors(n)),
                None => Err(anyhow!("screen grab unavailable")),
            }
        }

        fn render_window(&mut self, _flag: u32) -> Result<RgbImage> {
            let index = self.render_calls;
            self.render_calls += 1;
            match self.render_colors.get(index).copied().flatten() {
                Some(n) => Ok(image_with_colors(n)),
                None => Err(anyhow!("render unavailable")),
            }
        }

        fn flash_window(&mut self) -> Result<()> {
            self.flash_calls += 1;
            Ok(())
        }
    }

    #[test]
    fn test_distinct_color_count() {
        assert_eq!(distinct_color_count(&image_with_colors(1)), 1);
        assert_eq!(distinct_color_count(&image_with_colors(120)), 120);
    }

    #[test]
    fn test_first_strategy_short_circuits() {
        let mut backend = FakeBackend::new(Some(150), vec![Some(200); 4]);
        let outcome = capture_with_fallback(&mut backend, RECT).unwrap();

        assert_eq!(backend.screen_calls, 1);
        assert_eq!(backend.render_calls, 0);
        assert_eq!(backend.flash_calls, 0);
        assert_eq!(outcome.attempts.len(), 1);
        assert!(outcome.attempts[0].accepted);
        assert_eq!(outcome.attempts[0].method, CaptureMethod::ScreenGrab);
    }

    #[test]
    fn test_threshold_is_strictly_greater() {
        // Exactly 100 colors is not enough for strategy 1
        let mut backend = FakeBackend::new(Some(100), vec![Some(80)]);
        let outcome = capture_with_fallback(&mut backend, RECT).unwrap();

        assert_eq!(outcome.attempts[0].accepted, false);
        assert_eq!(outcome.attempts[1].method, CaptureMethod::WindowRender);
        assert!(outcome.attempts[1].accepted);
    }

    #[test]
    fn test_render_flags_tried_in_order() {
        // First two flag variants produce blank buffers, third passes the gate
        let mut backend = FakeBackend::new(
            Some(5),
            vec![Some(10), Some(20), Some(60), Some(200)],
        );
        let outcome = capture_with_fallback(&mut backend, RECT).unwrap();

        assert_eq!(backend.render_calls, 3);
        let render_attempts: Vec<&CaptureAttempt> = outcome
            .attempts
            .iter()
            .filter(|a| a.method == CaptureMethod::WindowRender)
            .collect();
        assert_eq!(render_attempts.len(), 3);
        assert!(render_attempts[2].accepted);
        assert!(render_attempts[2].detail.contains("flag 0"));
    }

    #[test]
    fn test_forced_grab_accepts_any_quality() {
        // Screen grab and all renders are useless; forced grab wins anyway
        let mut backend = FakeBackend::new(Some(2), vec![None, None, None, None]);
        let outcome = capture_with_fallback(&mut backend, RECT).unwrap();

        assert_eq!(backend.flash_calls, 1);
        let last = outcome.attempts.last().unwrap();
        assert_eq!(last.method, CaptureMethod::ForcedGrab);
        assert!(last.accepted);
        assert_eq!(last.color_count, Some(2));
        // One screen attempt, four render attempts, one forced
        assert_eq!(outcome.attempts.len(), 6);
    }

    #[test]
    fn test_throwing_strategy_moves_to_next() {
        let mut backend = FakeBackend::new(None, vec![Some(120)]);
        let outcome = capture_with_fallback(&mut backend, RECT).unwrap();

        assert!(!outcome.attempts[0].accepted);
        assert!(outcome.attempts[0].detail.contains("failed"));
        assert!(outcome.attempts[1].accepted);
    }

    #[test]
    fn test_chain_exhaustion_is_hard_failure() {
        struct DeadBackend;
        impl CaptureBackend for DeadBackend {
            fn grab_screen(&mut self, _rect: Rect) -> Result<RgbImage> {
                Err(anyhow!("no screen"))
            }
            fn render_window(&mut self, _flag: u32) -> Result<RgbImage> {
                Err(anyhow!("no render"))
            }
            fn flash_window(&mut self) -> Result<()> {
                Err(anyhow!("no flash"))
            }
        }

        let result = capture_with_fallback(&mut DeadBackend, RECT);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("All capture strategies exhausted"));
    }
}
