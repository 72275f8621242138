//! # Name Typography
//!
//! Renders a creature name as stroked text: a filled glyph run with a thick
//! dark stroke, overlaid by a thinner bright outline whose interior is
//! transparent. The result is cropped to its content.

use super::layers::crop_to_content;
use ab_glyph::{point, Font, FontVec, GlyphId, PxScale, ScaleFont};
use image::imageops;
use image::{Rgba, RgbaImage};

/// Colors and stroke widths of the name banner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Font size in points
    pub font_size: f32,
    /// Glyph fill
    pub fill: Rgba<u8>,
    /// Thick stroke drawn under the fill
    pub stroke: Rgba<u8>,
    /// Radius of the thick stroke in pixels
    pub stroke_width: u32,
    /// Thin outline drawn over the stroke
    pub outline: Rgba<u8>,
    /// Radius of the thin outline in pixels
    pub outline_width: u32,
}

/// Glyph coverage of a line of text on a padded canvas.
struct Coverage {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl Coverage {
    fn rasterize(font: &FontVec, text: &str, font_size: f32, padding: u32) -> Self {
        let scale = font
            .pt_to_px_scale(font_size)
            .unwrap_or_else(|| PxScale::from(font_size));
        let scaled = font.as_scaled(scale);

        let mut caret = 0.0f32;
        let mut previous: Option<GlyphId> = None;
        let mut placed = Vec::with_capacity(text.len());
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(previous) = previous {
                caret += scaled.kern(previous, id);
            }
            placed.push((id, caret));
            caret += scaled.h_advance(id);
            previous = Some(id);
        }

        let width = caret.ceil().max(1.0) as u32 + 2 * padding;
        let height = (scaled.ascent() - scaled.descent()).ceil().max(1.0) as u32 + 2 * padding;
        let mut values = vec![0.0f32; (width * height) as usize];
        let baseline = padding as f32 + scaled.ascent();

        for (id, x) in placed {
            let glyph = id.with_scale_and_position(scale, point(padding as f32 + x, baseline));
            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, c| {
                let px = bounds.min.x as i64 + i64::from(gx);
                let py = bounds.min.y as i64 + i64::from(gy);
                if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                    let idx = (py as u32 * width + px as u32) as usize;
                    values[idx] = values[idx].max(c.clamp(0.0, 1.0));
                }
            });
        }

        Self {
            width,
            height,
            values,
        }
    }

    fn ink(&self) -> Vec<bool> {
        self.values.iter().map(|&c| c > 0.0).collect()
    }
}

/// Grows a binary mask by a disk of the given radius.
fn dilate(mask: &[bool], width: u32, height: u32, radius: u32) -> Vec<bool> {
    let r = radius as i64;
    let disk: Vec<(i64, i64)> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .filter(|(dx, dy)| dx * dx + dy * dy <= r * r)
        .collect();

    let (w, h) = (i64::from(width), i64::from(height));
    let mut grown = vec![false; mask.len()];
    for (idx, _) in mask.iter().enumerate().filter(|(_, &set)| set) {
        let (x, y) = (idx as i64 % w, idx as i64 / w);
        for (dx, dy) in &disk {
            let (nx, ny) = (x + dx, y + dy);
            if nx >= 0 && ny >= 0 && nx < w && ny < h {
                grown[(ny * w + nx) as usize] = true;
            }
        }
    }
    grown
}

fn mix(under: Rgba<u8>, over: Rgba<u8>, amount: f32) -> Rgba<u8> {
    let lerp = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * amount).round() as u8;
    Rgba([
        lerp(under[0], over[0]),
        lerp(under[1], over[1]),
        lerp(under[2], over[2]),
        lerp(under[3], over[3]),
    ])
}

/// Renders `text` as a stroked, outlined banner cropped to its content.
pub fn render_stroked_text(font: &FontVec, text: &str, style: &TextStyle) -> RgbaImage {
    let padding = style.stroke_width.max(style.outline_width) + 2;
    let coverage = Coverage::rasterize(font, text, style.font_size, padding);
    let (width, height) = (coverage.width, coverage.height);
    let ink = coverage.ink();

    let stroke = dilate(&ink, width, height, style.stroke_width);
    let mut banner = RgbaImage::from_fn(width, height, |x, y| {
        let idx = (y * width + x) as usize;
        let under = if stroke[idx] {
            style.stroke
        } else {
            Rgba([0, 0, 0, 0])
        };
        mix(under, style.fill, coverage.values[idx])
    });

    let outline_mask = dilate(&ink, width, height, style.outline_width);
    let outline = RgbaImage::from_fn(width, height, |x, y| {
        let idx = (y * width + x) as usize;
        if outline_mask[idx] {
            let mut color = style.outline;
            color[3] = (f32::from(color[3]) * (1.0 - coverage.values[idx])).round() as u8;
            color
        } else {
            Rgba([0, 0, 0, 0])
        }
    });

    imageops::overlay(&mut banner, &outline, 0, 0);
    crop_to_content(&banner)
}
