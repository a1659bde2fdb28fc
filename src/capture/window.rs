//! Window classification for Packet Tracer.
//!
//! Packet Tracer opens a main workspace window plus a separate activity
//! results dialog, and the two must be told apart by title. Enumeration
//! itself is platform code; classification and selection live here so they
//! can be tested anywhere.

use super::chain::Rect;

/// Title substrings that identify the activity results dialog.
const ACTIVITY_TITLE_MARKERS: [&str; 1] = ["pt activity"];

/// Title substrings that identify the main workspace window.
const MAIN_TITLE_MARKERS: [&str; 2] = ["cisco packet tracer", "packet tracer"];

/// What kind of Packet Tracer window a title describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRole {
    /// The activity results dialog that shows the completion percentage.
    Activity,
    /// The main Packet Tracer workspace.
    Main,
}

/// A visible top-level window found during enumeration.
#[derive(Debug, Clone)]
pub struct WindowDesc {
    /// Native window handle, stored as an integer so this type stays portable.
    pub handle: isize,
    pub title: String,
    pub rect: Rect,
    pub role: WindowRole,
}

/// Classifies a window title, or returns None for unrelated windows.
///
/// The activity markers are checked first: the dialog's title also contains
/// "packet tracer" in some releases, and the dialog must win.
pub fn classify_title(title: &str) -> Option<WindowRole> {
    let lower = title.to_lowercase();
    if ACTIVITY_TITLE_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(WindowRole::Activity);
    }
    if MAIN_TITLE_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(WindowRole::Main);
    }
    None
}

/// Picks the activity dialog to capture: the smallest activity window by
/// area, since the results dialog is always smaller than the workspace.
pub fn smallest_activity(windows: &[WindowDesc]) -> Option<&WindowDesc> {
    windows
        .iter()
        .filter(|w| w.role == WindowRole::Activity)
        .min_by_key(|w| w.rect.area())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(handle: isize, title: &str, width: i32, height: i32) -> Option<WindowDesc> {
        classify_title(title).map(|role| WindowDesc {
            handle,
            title: title.to_string(),
            rect: Rect {
                x: 0,
                y: 0,
                width,
                height,
            },
            role,
        })
    }

    #[test]
    fn test_classify_activity_title() {
        assert_eq!(
            classify_title("PT Activity: Lab 4.2.1"),
            Some(WindowRole::Activity)
        );
        assert_eq!(classify_title("pt activity"), Some(WindowRole::Activity));
    }

    #[test]
    fn test_classify_main_title() {
        assert_eq!(
            classify_title("Cisco Packet Tracer 8.2"),
            Some(WindowRole::Main)
        );
        assert_eq!(
            classify_title("Packet Tracer - lab.pka"),
            Some(WindowRole::Main)
        );
    }

    #[test]
    fn test_activity_marker_wins_over_main_marker() {
        assert_eq!(
            classify_title("Packet Tracer PT Activity: Results"),
            Some(WindowRole::Activity)
        );
    }

    #[test]
    fn test_unrelated_title_is_ignored() {
        assert_eq!(classify_title("Notepad"), None);
        assert_eq!(classify_title(""), None);
    }

    #[test]
    fn test_smallest_activity_window_selected() {
        let windows: Vec<WindowDesc> = [
            desc(1, "Cisco Packet Tracer", 1920, 1080),
            desc(2, "PT Activity: big", 900, 700),
            desc(3, "PT Activity: small", 640, 480),
        ]
        .into_iter()
        .flatten()
        .collect();

        let chosen = smallest_activity(&windows).unwrap();
        assert_eq!(chosen.handle, 3);
    }

    #[test]
    fn test_no_activity_window() {
        let windows: Vec<WindowDesc> = [desc(1, "Cisco Packet Tracer", 1920, 1080)]
            .into_iter()
            .flatten()
            .collect();
        assert!(smallest_activity(&windows).is_none());
    }
}
