use crate::types::{ImageShape, NormalizedBox, RawBox};

/// Scale an absolute box into coordinates relative to the image size.
///
/// No clamping is applied: boxes reaching outside the image produce values
/// outside `[0, 1]`.
pub fn normalize(raw: &RawBox, shape: &ImageShape) -> NormalizedBox {
    let w = shape.width as f64;
    let h = shape.height as f64;
    NormalizedBox {
        x: raw.x as f64 / w,
        y: raw.y as f64 / h,
        width: raw.width as f64 / w,
        height: raw.height as f64 / h,
    }
}
