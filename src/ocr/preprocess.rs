//! Fixed bank of grayscale transforms applied before text recognition.
//!
//! Screenshots of the activity window vary a lot in contrast and rendering
//! quality, so each image is recognized under several transforms and the
//! results are cross-checked downstream. The catalog is closed and ordered;
//! every transform is deterministic.

use image::{GrayImage, Luma};

/// A named preprocessing transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprocessVariant {
    /// Mild linear contrast stretch (gain 1.2, bias +10)
    Stretch,
    /// Global histogram equalization
    Equalize,
    /// Aggressive linear stretch (gain 2.0, bias +30)
    HighContrast,
    /// Per-tile histogram equalization over an 8x8 grid
    TileEqualize,
    /// Mean-blur then Otsu binarization
    OtsuThreshold,
}

impl PreprocessVariant {
    /// All variants applied per image, in fixed order.
    pub const ALL: [PreprocessVariant; 5] = [
        PreprocessVariant::Stretch,
        PreprocessVariant::Equalize,
        PreprocessVariant::HighContrast,
        PreprocessVariant::TileEqualize,
        PreprocessVariant::OtsuThreshold,
    ];

    /// Short label used in logs and candidate source tags.
    pub fn label(self) -> &'static str {
        match self {
            PreprocessVariant::Stretch => "stretch",
            PreprocessVariant::Equalize => "equalize",
            PreprocessVariant::HighContrast => "high-contrast",
            PreprocessVariant::TileEqualize => "tile-equalize",
            PreprocessVariant::OtsuThreshold => "otsu",
        }
    }

    /// Applies this transform to a grayscale image.
    pub fn apply(self, img: &GrayImage) -> GrayImage {
        match self {
            PreprocessVariant::Stretch => linear_stretch(img, 1.2, 10.0),
            PreprocessVariant::Equalize => equalize(img),
            PreprocessVariant::HighContrast => linear_stretch(img, 2.0, 30.0),
            PreprocessVariant::TileEqualize => tile_equalize(img, 8),
            PreprocessVariant::OtsuThreshold => otsu_binarize(img),
        }
    }
}

/// Applies `v' = v * gain + bias`, saturating to [0, 255].
fn linear_stretch(img: &GrayImage, gain: f32, bias: f32) -> GrayImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        let v = (pixel[0] as f32 * gain + bias).clamp(0.0, 255.0);
        *pixel = Luma([v as u8]);
    }
    out
}

fn histogram(pixels: impl Iterator<Item = u8>) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for v in pixels {
        hist[v as usize] += 1;
    }
    hist
}

/// Builds the value remap table for histogram equalization.
fn equalize_map(hist: &[u32; 256], pixel_count: u32) -> [u8; 256] {
    let mut map = [0u8; 256];
    if pixel_count == 0 {
        return map;
    }
    let mut cumulative = 0u64;
    for (v, &count) in hist.iter().enumerate() {
        cumulative += count as u64;
        map[v] = ((cumulative * 255) / pixel_count as u64) as u8;
    }
    map
}

/// Global histogram equalization.
fn equalize(img: &GrayImage) -> GrayImage {
    let hist = histogram(img.pixels().map(|p| p[0]));
    let map = equalize_map(&hist, img.width() * img.height());

    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        *pixel = Luma([map[pixel[0] as usize]]);
    }
    out
}

/// Histogram equalization applied independently to each tile of a
/// `grid` x `grid` partition. Small residual tiles at the right/bottom edges
/// are folded into the last full tile.
fn tile_equalize(img: &GrayImage, grid: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    if width < grid || height < grid {
        return equalize(img);
    }

    let tile_w = width / grid;
    let tile_h = height / grid;
    let mut out = GrayImage::new(width, height);

    for ty in 0..grid {
        for tx in 0..grid {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            // Last row/column of tiles absorbs the remainder
            let x1 = if tx == grid - 1 { width } else { x0 + tile_w };
            let y1 = if ty == grid - 1 { height } else { y0 + tile_h };

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[img.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let map = equalize_map(&hist, (x1 - x0) * (y1 - y0));

            for y in y0..y1 {
                for x in x0..x1 {
                    let v = img.get_pixel(x, y)[0];
                    out.put_pixel(x, y, Luma([map[v as usize]]));
                }
            }
        }
    }

    out
}

/// 3x3 mean blur; edge pixels average over the in-bounds neighborhood.
fn mean_blur(img: &GrayImage) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut out = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let mut sum: u32 = 0;
            let mut count: u32 = 0;
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    if nx >= 0 && ny >= 0 && (nx as u32) < width && (ny as u32) < height {
                        sum += img.get_pixel(nx as u32, ny as u32)[0] as u32;
                        count += 1;
                    }
                }
            }
            out.put_pixel(x, y, Luma([(sum / count.max(1)) as u8]));
        }
    }

    out
}

/// Finds the threshold maximizing between-class variance (Otsu's method).
fn otsu_level(hist: &[u32; 256], pixel_count: u32) -> u8 {
    if pixel_count == 0 {
        return 0;
    }

    let total = pixel_count as f64;
    let weighted_sum: f64 = hist
        .iter()
        .enumerate()
        .map(|(v, &count)| v as f64 * count as f64)
        .sum();

    let mut best_level = 0u8;
    let mut best_variance = 0.0f64;
    let mut background_count = 0.0f64;
    let mut background_sum = 0.0f64;

    for level in 0..256usize {
        background_count += hist[level] as f64;
        if background_count == 0.0 {
            continue;
        }
        let foreground_count = total - background_count;
        if foreground_count == 0.0 {
            break;
        }

        background_sum += level as f64 * hist[level] as f64;
        let mean_bg = background_sum / background_count;
        let mean_fg = (weighted_sum - background_sum) / foreground_count;
        let variance =
            background_count * foreground_count * (mean_bg - mean_fg) * (mean_bg - mean_fg);

        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }

    best_level
}

/// Smooths with a mean blur, then binarizes at the Otsu threshold.
fn otsu_binarize(img: &GrayImage) -> GrayImage {
    let blurred = mean_blur(img);
    let hist = histogram(blurred.pixels().map(|p| p[0]));
    let level = otsu_level(&hist, blurred.width() * blurred.height());

    let mut out = blurred;
    for pixel in out.pixels_mut() {
        *pixel = Luma([if pixel[0] > level { 255 } else { 0 }]);
    }
    out
}
