//! # Layer Operations
//!
//! Small building blocks of the compositor: cropping to content, flat
//! recoloring, proportional scaling and the three-layer shadowed paste.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// Offsets and colors of the three-layer paste.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowStyle {
    /// Flat color of the bottom layer
    pub shadow: Rgba<u8>,
    /// Flat color of the middle layer
    pub contour: Rgba<u8>,
    /// Offset of the middle layer from the base position
    pub contour_offset: (i64, i64),
    /// Offset of the element itself from the base position
    pub element_offset: (i64, i64),
}

/// Bounding box `(x, y, width, height)` of the pixels with non-zero alpha.
pub fn content_bounds(image: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] > 0 {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    found.then(|| (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Crops an image to its opaque bounding box. Fully transparent images are
/// returned unchanged.
pub fn crop_to_content(image: &RgbaImage) -> RgbaImage {
    match content_bounds(image) {
        Some((x, y, width, height)) => imageops::crop_imm(image, x, y, width, height).to_image(),
        None => image.clone(),
    }
}

/// Replaces every pixel with non-zero alpha by `color`, keeping the shape.
///
/// All four channels of `color` are applied, so a translucent color yields a
/// translucent silhouette.
pub fn silhouette(image: &RgbaImage, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y)[3] > 0 {
            color
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// Scales both dimensions by `factor`, rounding up. Images are never
/// enlarged.
pub fn scale_by(image: &RgbaImage, factor: f64) -> RgbaImage {
    let (width, height) = scaled_dimensions(image.dimensions(), factor);
    if (width, height) == image.dimensions() {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::CatmullRom)
}

/// Dimensions after scaling by `factor`, rounding up and never growing.
pub fn scaled_dimensions((width, height): (u32, u32), factor: f64) -> (u32, u32) {
    let factor = factor.min(1.0);
    let scale = |dim: u32| ((dim as f64 * factor).ceil() as u32).clamp(1, dim.max(1));
    (scale(width), scale(height))
}

/// Pastes `element` with a drop shadow and a contour.
///
/// Three alpha-masked pastes are stacked: a flat shadow at `position`, a flat
/// contour at `position + contour_offset` and the element at
/// `position + element_offset`. Nothing is blurred.
pub fn paste_with_shadow(
    base: &mut RgbaImage,
    element: &RgbaImage,
    position: (i64, i64),
    style: &ShadowStyle,
) {
    let (x, y) = position;
    let shadow = silhouette(element, style.shadow);
    let contour = silhouette(element, style.contour);

    imageops::overlay(base, &shadow, x, y);
    imageops::overlay(
        base,
        &contour,
        x + style.contour_offset.0,
        y + style.contour_offset.1,
    );
    imageops::overlay(
        base,
        element,
        x + style.element_offset.0,
        y + style.element_offset.1,
    );
}
