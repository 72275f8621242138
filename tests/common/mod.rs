//! Fixture assets shared by the integration tests.

#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use oakoak::{AssetPaths, Compositor, CompositorSettings};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SYSTEM_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

/// A temporary data directory with a background, logo, unknown glyph,
/// a sprite folder and a catalog file.
pub struct Fixture {
    pub dir: TempDir,
    pub assets: AssetPaths,
    pub sprites: PathBuf,
    pub catalog: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let sprites = root.join("sprites");
        std::fs::create_dir_all(&sprites).unwrap();

        let assets = AssetPaths {
            background: root.join("background.png"),
            logo: root.join("logo.png"),
            unknown_glyph: root.join("unknown.png"),
            font: PathBuf::from(SYSTEM_FONT),
        };
        gradient(320, 200).save(&assets.background).unwrap();
        blob(80, 40, Rgba([220, 40, 40, 255])).save(&assets.logo).unwrap();
        blob(30, 50, Rgba([40, 40, 220, 255])).save(&assets.unknown_glyph).unwrap();

        for (name, color) in [
            ("0025_01_global_n_n_mf.png", Rgba([250, 220, 40, 255])),
            ("0025_01_global_s_n_mf.png", Rgba([250, 180, 40, 255])),
            ("0026_01_global_n_n_mf.png", Rgba([230, 150, 30, 255])),
            ("0026_01_global_s_n_mf.png", Rgba([240, 130, 90, 255])),
            ("0026_02_alolan_n_n_mf.png", Rgba([200, 120, 40, 255])),
            ("0026_02_alolan_s_n_mf.png", Rgba([220, 90, 60, 255])),
            ("0133_01_global_n_n_md.png", Rgba([160, 110, 60, 255])),
            ("0133_01_global_s_n_md.png", Rgba([200, 200, 200, 255])),
            ("0019_01_global_n_n_mf.png", Rgba([150, 90, 170, 255])),
            ("0019_01_global_s_n_mf.png", Rgba([190, 190, 110, 255])),
            ("0808_01_global_n_n_uk.png", Rgba([140, 140, 150, 255])),
            ("0808_01_global_s_n_uk.png", Rgba([210, 170, 120, 255])),
        ] {
            blob(64, 64, color).save(sprites.join(name)).unwrap();
        }

        let catalog = root.join("catalog.json");
        std::fs::write(
            &catalog,
            r#"[
                {"id": 25, "number": 25, "name": "Pikachu", "generation": 1, "rarity": "common",
                 "types": ["electric"], "abilities": {"primary": "static", "hidden": "lightning-rod"}},
                {"id": 26, "number": 26, "name": "Raichu", "generation": 1, "rarity": "common",
                 "types": ["electric"], "abilities": {"primary": "static"}},
                {"id": 10026, "number": 26, "form": 2, "region": "alolan", "name": "Raichu",
                 "generation": 1, "rarity": "ultra-rare", "types": ["electric", "psychic"],
                 "abilities": {"primary": "surge-surfer"}},
                {"id": 133, "number": 133, "name": "Eevee", "generation": 1, "rarity": "rare",
                 "abilities": {"primary": "run-away", "secondary": "adaptability"}},
                {"id": 19, "number": 19, "name": "Rattata", "generation": 1, "rarity": "ultra-common",
                 "abilities": {"primary": "guts"}},
                {"id": 808, "number": 808, "name": "Meltan", "generation": 7, "rarity": "ultra-rare",
                 "legendary": true, "abilities": {"primary": "magnet-pull"}}
            ]"#,
        )
        .unwrap();

        Self {
            dir,
            assets,
            sprites,
            catalog,
        }
    }

    pub fn sprite(&self, name: &str) -> PathBuf {
        self.sprites.join(name)
    }

    /// Panics when the system font used by reveal renders is missing.
    pub fn require_font(&self) {
        assert!(
            Path::new(SYSTEM_FONT).exists(),
            "reveal tests need {}",
            SYSTEM_FONT
        );
    }

    pub fn compositor(&self) -> Compositor {
        Compositor::new(self.assets.clone(), CompositorSettings::default()).unwrap()
    }
}

fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 255 / width) as u8, (y * 255 / height) as u8, 180, 255])
    })
}

/// An ellipse of `color` on a transparent canvas with a margin around it.
fn blob(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let (rx, ry) = (cx - 6.0, cy - 6.0);
    RgbaImage::from_fn(width, height, |x, y| {
        let dx = (x as f32 + 0.5 - cx) / rx;
        let dy = (y as f32 + 0.5 - cy) / ry;
        if dx * dx + dy * dy <= 1.0 {
            color
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}
