//! # Imaging Module
//!
//! Layered compositor producing the encounter images.
//!
//! A render stacks, on top of an opaque background:
//! - the creature sprite, or its flat silhouette while it is still unknown
//! - the game logo
//! - an unknown glyph (silhouette) or the creature name (reveal)
//!
//! Every element goes through the same three-layer paste, then the result is
//! downscaled and encoded as a GIF.

pub mod layers;
pub mod text;

pub use layers::*;
pub use text::*;

use crate::{OakError, OakResult};
use ab_glyph::FontVec;
use image::codecs::gif::GifEncoder;
use image::{DynamicImage, ExtendedColorType, Rgba, RgbaImage};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// What a render shows of the creature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Full-color sprite and the creature name
    Reveal,
    /// Flat silhouette and an unknown glyph
    Silhouette,
}

/// Fixed image and font assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub background: PathBuf,
    pub logo: PathBuf,
    pub unknown_glyph: PathBuf,
    pub font: PathBuf,
}

impl AssetPaths {
    /// Resolves every asset relative to `root`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let defaults = Self::default();
        Self {
            background: root.join(defaults.background),
            logo: root.join(defaults.logo),
            unknown_glyph: root.join(defaults.unknown_glyph),
            font: root.join(defaults.font),
        }
    }

    /// Loads asset paths from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> OakResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            background: PathBuf::from("data/images/misc/background_image.jpg"),
            logo: PathBuf::from("data/images/misc/pokemon_logo.png"),
            unknown_glyph: PathBuf::from("data/images/misc/question_mark.png"),
            font: PathBuf::from("data/fonts/Playhouse Medium.ttf"),
        }
    }
}

/// Colors, offsets, scales and anchors of the composition.
///
/// Anchors are fractions of the background size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorSettings {
    pub silhouette_color: [u8; 4],
    pub shadow_color: [u8; 4],
    pub contour_color: [u8; 4],
    pub contour_offset: (i64, i64),
    pub element_offset: (i64, i64),
    /// Center of the sprite
    pub sprite_anchor: (f64, f64),
    /// Smallest distance of the sprite from the top-left corner
    pub sprite_margin: i64,
    pub logo_scale: f64,
    /// Top-left corner of the logo
    pub logo_anchor: (f64, f64),
    pub unknown_scale: f64,
    /// Top-left corner of the unknown glyph
    pub unknown_anchor: (f64, f64),
    /// Center of the name banner
    pub name_anchor: (f64, f64),
    pub font_size: f32,
    pub text_fill: [u8; 4],
    pub text_stroke: [u8; 4],
    pub text_stroke_width: u32,
    pub text_outline: [u8; 4],
    pub text_outline_width: u32,
    /// Final downscale factor
    pub output_scale: f64,
    /// GIF quantizer speed, 1 (best) to 30 (fastest)
    pub gif_speed: i32,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        let blue = [22, 104, 151, 255];
        Self {
            silhouette_color: blue,
            shadow_color: [72, 86, 112, 135],
            contour_color: [28, 69, 90, 180],
            contour_offset: (15, -12),
            element_offset: (20, -15),
            sprite_anchor: (0.25, 0.40),
            sprite_margin: 10,
            logo_scale: 0.5,
            logo_anchor: (0.45, 0.6),
            unknown_scale: 0.75,
            unknown_anchor: (0.6, 0.15),
            name_anchor: (0.71, 0.33),
            font_size: 100.0,
            text_fill: blue,
            text_stroke: [0, 0, 0, 255],
            text_stroke_width: 7,
            text_outline: [252, 202, 49, 255],
            text_outline_width: 5,
            output_scale: 0.6,
            gif_speed: 10,
        }
    }
}

impl CompositorSettings {
    /// Three-layer paste style.
    pub fn shadow_style(&self) -> ShadowStyle {
        ShadowStyle {
            shadow: Rgba(self.shadow_color),
            contour: Rgba(self.contour_color),
            contour_offset: self.contour_offset,
            element_offset: self.element_offset,
        }
    }

    /// Name banner style.
    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            font_size: self.font_size,
            fill: Rgba(self.text_fill),
            stroke: Rgba(self.text_stroke),
            stroke_width: self.text_stroke_width,
            outline: Rgba(self.text_outline),
            outline_width: self.text_outline_width,
        }
    }

    /// Checks scales and encoder settings.
    pub fn validate(&self) -> OakResult<()> {
        for (name, scale) in [
            ("logo", self.logo_scale),
            ("unknown glyph", self.unknown_scale),
            ("output", self.output_scale),
        ] {
            if !(scale > 0.0 && scale <= 1.0) {
                return Err(OakError::Config(format!(
                    "{} scale {} is not within (0, 1]",
                    name, scale
                )));
            }
        }
        if !(1..=30).contains(&self.gif_speed) {
            return Err(OakError::Config(format!(
                "gif speed {} is not within [1, 30]",
                self.gif_speed
            )));
        }
        if self.font_size.is_nan() || self.font_size <= 0.0 {
            return Err(OakError::Config("font size must be positive".to_string()));
        }
        Ok(())
    }
}

/// Renders encounter images from sprite files.
///
/// Rendering is deterministic: the same sprite, name, mode and assets always
/// produce the same bytes. A silhouette never depends on the name.
#[derive(Debug, Clone)]
pub struct Compositor {
    assets: AssetPaths,
    settings: CompositorSettings,
}

impl Compositor {
    /// Creates a compositor after validating its settings.
    pub fn new(assets: AssetPaths, settings: CompositorSettings) -> OakResult<Self> {
        settings.validate()?;
        Ok(Self { assets, settings })
    }

    pub fn assets(&self) -> &AssetPaths {
        &self.assets
    }

    pub fn settings(&self) -> &CompositorSettings {
        &self.settings
    }

    /// Composes the encounter image and encodes it as a GIF.
    pub fn render(&self, sprite: &Path, name: &str, mode: RenderMode) -> OakResult<Vec<u8>> {
        let started = Instant::now();
        let settings = &self.settings;
        let style = settings.shadow_style();

        let mut base = DynamicImage::ImageRgb8(open_image(&self.assets.background)?.to_rgb8())
            .to_rgba8();
        let (width, height) = base.dimensions();
        let (width_f, height_f) = (f64::from(width), f64::from(height));

        let mut creature = crop_to_content(&open_image(sprite)?.to_rgba8());
        if mode == RenderMode::Silhouette {
            creature = silhouette(&creature, Rgba(settings.silhouette_color));
        }
        let sprite_position = (
            settings.sprite_margin.max(
                (width_f * settings.sprite_anchor.0 - f64::from(creature.width()) / 2.0).ceil()
                    as i64,
            ),
            settings.sprite_margin.max(
                (height_f * settings.sprite_anchor.1 - f64::from(creature.height()) / 2.0).ceil()
                    as i64,
            ),
        );
        paste_with_shadow(&mut base, &creature, sprite_position, &style);

        let logo = crop_to_content(&scale_by(
            &open_image(&self.assets.logo)?.to_rgba8(),
            settings.logo_scale,
        ));
        paste_with_shadow(
            &mut base,
            &logo,
            anchor_point((width_f, height_f), settings.logo_anchor),
            &style,
        );

        match mode {
            RenderMode::Silhouette => {
                let unknown = crop_to_content(&scale_by(
                    &open_image(&self.assets.unknown_glyph)?.to_rgba8(),
                    settings.unknown_scale,
                ));
                paste_with_shadow(
                    &mut base,
                    &unknown,
                    anchor_point((width_f, height_f), settings.unknown_anchor),
                    &style,
                );
            }
            RenderMode::Reveal => {
                let font = load_font(&self.assets.font)?;
                let banner =
                    render_stroked_text(&font, &name.to_uppercase(), &settings.text_style());
                let position = (
                    (width_f * settings.name_anchor.0 - f64::from(banner.width()) / 2.0).ceil()
                        as i64,
                    (height_f * settings.name_anchor.1 - f64::from(banner.height()) / 2.0).ceil()
                        as i64,
                );
                paste_with_shadow(&mut base, &banner, position, &style);
            }
        }

        let output = DynamicImage::ImageRgba8(scale_by(&base, settings.output_scale)).to_rgb8();
        let bytes = encode_gif(&output, settings.gif_speed)?;
        debug!(
            "Rendered {:?} of {} in {:?} ({} bytes)",
            mode,
            sprite.display(),
            started.elapsed(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Renders on a blocking worker thread so callers on the async runtime
    /// are never stalled by image work.
    pub async fn render_detached(
        &self,
        sprite: PathBuf,
        name: String,
        mode: RenderMode,
    ) -> OakResult<Vec<u8>> {
        let compositor = self.clone();
        tokio::task::spawn_blocking(move || compositor.render(&sprite, &name, mode))
            .await
            .map_err(|err| OakError::Worker(err.to_string()))?
    }
}

fn anchor_point((width, height): (f64, f64), (ax, ay): (f64, f64)) -> (i64, i64) {
    ((width * ax).ceil() as i64, (height * ay).ceil() as i64)
}

fn open_image(path: &Path) -> OakResult<DynamicImage> {
    image::open(path).map_err(|err| OakError::AssetMissing {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

fn load_font(path: &Path) -> OakResult<FontVec> {
    let missing = |reason: String| OakError::AssetMissing {
        path: path.to_path_buf(),
        reason,
    };
    let bytes = std::fs::read(path).map_err(|err| missing(err.to_string()))?;
    FontVec::try_from_vec(bytes).map_err(|err| missing(err.to_string()))
}

fn encode_gif(image: &image::RgbImage, speed: i32) -> OakResult<Vec<u8>> {
    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut bytes, speed);
        encoder.encode(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )?;
    }
    Ok(bytes)
}

/// Builds a flat RGBA image, used for placeholder assets.
pub fn flat_image(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color))
}
