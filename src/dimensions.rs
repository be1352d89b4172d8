use std::fmt;

/// Pixel size of an image or drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Compute the size an image should be drawn at before re-encoding.
///
/// With `maintain_aspect_ratio` the image is fitted inside the
/// `max_width` x `max_height` box: width first, then height, each step
/// recomputing the other side from the current ratio. Without it, each
/// side is clamped on its own. Images are never upscaled, and neither side
/// drops below one pixel.
pub fn calculate_dimensions(
    original_width: u32,
    original_height: u32,
    max_width: u32,
    max_height: Option<u32>,
    maintain_aspect_ratio: bool,
) -> Dimensions {
    let mut width = original_width;
    let mut height = original_height;

    if width > max_width {
        if maintain_aspect_ratio {
            height = scale_side(height, max_width, width);
        }
        width = max_width;
    }

    if let Some(max_height) = max_height.filter(|&h| h > 0) {
        if height > max_height {
            if maintain_aspect_ratio {
                width = scale_side(width, max_height, height);
            }
            height = max_height;
        }
    }

    Dimensions::new(width.max(1), height.max(1))
}

/// `round(side * numerator / denominator)`, saturating at `u32::MAX`.
fn scale_side(side: u32, numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return side;
    }
    let scaled = (side as f64 * numerator as f64 / denominator as f64).round();
    scaled.min(u32::MAX as f64) as u32
}
