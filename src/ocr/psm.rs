//! Fixed catalog of Tesseract page-segmentation configurations.
//!
//! Each activity screenshot is recognized under every one of these modes;
//! the catalog is closed and ordered so the pass matrix and its logging
//! stay deterministic.

/// A Tesseract page-segmentation assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsmMode {
    /// Fully automatic page segmentation (--psm 3)
    Auto,
    /// Uniform block of text (--psm 6)
    Block,
    /// Single text line (--psm 7)
    Line,
    /// Single word (--psm 8)
    Word,
    /// Sparse text (--psm 11)
    Sparse,
    /// Sparse text with orientation detection (--psm 12)
    SparseOsd,
    /// Raw line, no heuristics (--psm 13)
    RawLine,
}

impl PsmMode {
    /// All modes tried per preprocessed image, in fixed order.
    pub const ALL: [PsmMode; 7] = [
        PsmMode::Auto,
        PsmMode::Block,
        PsmMode::Line,
        PsmMode::Word,
        PsmMode::Sparse,
        PsmMode::SparseOsd,
        PsmMode::RawLine,
    ];

    /// The value passed to `--psm`.
    pub fn flag(self) -> &'static str {
        match self {
            PsmMode::Auto => "3",
            PsmMode::Block => "6",
            PsmMode::Line => "7",
            PsmMode::Word => "8",
            PsmMode::Sparse => "11",
            PsmMode::SparseOsd => "12",
            PsmMode::RawLine => "13",
        }
    }

    /// Short label used in logs and candidate source tags.
    pub fn label(self) -> &'static str {
        match self {
            PsmMode::Auto => "PSM 3",
            PsmMode::Block => "PSM 6",
            PsmMode::Line => "PSM 7",
            PsmMode::Word => "PSM 8",
            PsmMode::Sparse => "PSM 11",
            PsmMode::SparseOsd => "PSM 12",
            PsmMode::RawLine => "PSM 13",
        }
    }
}
