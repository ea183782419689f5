use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

// Supported image formats
pub const IMG_FORMATS: &[&str] = &["bmp", "jpeg", "jpg", "png", "tif", "tiff", "webp"];

// Precomputed HashSet of image extensions for fast lookup
pub static IMAGE_EXTENSIONS_SET: OnceLock<HashSet<String>> = OnceLock::new();

/// Get the image extensions set
pub fn get_image_extensions_set() -> &'static HashSet<String> {
    IMAGE_EXTENSIONS_SET.get_or_init(|| IMG_FORMATS.iter().map(|ext| ext.to_lowercase()).collect())
}

/// Absolute pixel rectangle with a top-left origin, as exported by ImageJ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawBox {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl RawBox {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl fmt::Display for RawBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Pixel dimensions of an image in row-major order: height first, then width.
///
/// `channels` is `None` for single-channel images, mirroring how a decoded
/// grayscale array has only two dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub height: u32,
    pub width: u32,
    pub channels: Option<u8>,
}

impl ImageShape {
    pub fn new(height: u32, width: u32) -> Self {
        Self {
            height,
            width,
            channels: None,
        }
    }

    pub fn with_channels(height: u32, width: u32, channels: u8) -> Self {
        Self {
            height,
            width,
            channels: Some(channels),
        }
    }
}

impl fmt::Display for ImageShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channels {
            Some(c) => write!(f, "({}, {}, {})", self.height, self.width, c),
            None => write!(f, "({}, {})", self.height, self.width),
        }
    }
}

/// Box coordinates relative to the image size.
///
/// `(x, y)` is the top-left corner. Values are usually within `[0, 1]` but
/// boxes lying outside the image are passed through unclamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedBox {
    /// Center form used by YOLO label files: `(cx, cy, w, h)`
    pub fn to_center(&self) -> (f64, f64, f64, f64) {
        (
            self.x + self.width / 2.0,
            self.y + self.height / 2.0,
            self.width,
            self.height,
        )
    }

    /// Scale back to absolute pixels, rounding to the nearest integer
    pub fn to_absolute(&self, shape: &ImageShape) -> RawBox {
        let w = shape.width as f64;
        let h = shape.height as f64;
        RawBox {
            x: (self.x * w).round() as i64,
            y: (self.y * h).round() as i64,
            width: (self.width * w).round() as i64,
            height: (self.height * h).round() as i64,
        }
    }
}
