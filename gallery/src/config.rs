use std::path::Path;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::gallery_wall::WallName;

pub const DEFAULT_CONFIG_PATH: &'static str = "data/gallery.json";

/// Everything we need to know to build the room. Loaded once at startup and
/// never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GalleryConfig {
    pub room: RoomDimensions,
    pub glow: GlowConfig,
    pub highlight: HighlightConfig,
    pub logo: LogoConfig,
    pub frames: FramesConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomDimensions {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl Default for RoomDimensions {
    fn default() -> Self {
        RoomDimensions {
            width: 32.0,
            height: 12.0,
            depth: 48.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlowConfig {
    pub main_texture_fixed_size: u32,
    pub blur_kernel_size: u32,
    pub intensity: f64,
}

impl Default for GlowConfig {
    fn default() -> Self {
        GlowConfig {
            main_texture_fixed_size: 1024,
            blur_kernel_size: 64,
            intensity: 0.55,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HighlightConfig {
    pub blur_size: f64,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        HighlightConfig { blur_size: 2.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogoConfig {
    pub enabled: bool,
    pub wall: WallName,
    pub width: f64,
    pub height: f64,
    /// Vertical position relative to the wall's center.
    pub y: f64,
    pub texture: String,
}

impl Default for LogoConfig {
    fn default() -> Self {
        LogoConfig {
            enabled: false,
            wall: WallName::Front,
            width: 8.0,
            height: 2.0,
            y: 4.0,
            texture: "assets/logo.png".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FramesConfig {
    pub default_frame: DefaultFrame,
    pub walls: Vec<WallFramesConfig>,
    /// Keep frames at least this far away from the corners of each wall.
    pub edge_margin: f64,
    /// Demo image every frame starts out with.
    pub default_image: Option<String>,
}

impl Default for FramesConfig {
    fn default() -> Self {
        FramesConfig {
            default_frame: DefaultFrame::default(),
            walls: vec![
                WallFramesConfig::new(WallName::Front, 2, 4, 2.4),
                WallFramesConfig::new(WallName::Right, 2, 3, 2.2),
                WallFramesConfig::new(WallName::Back, 2, 4, 2.4),
                WallFramesConfig::new(WallName::Left, 2, 3, 2.2),
            ],
            edge_margin: 1.0,
            default_image: Some("assets/one.jpg".into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultFrame {
    pub outer_width: f64,
    pub outer_height: f64,
    pub image_inset: f64,
    pub plaque_height: f64,
}

impl Default for DefaultFrame {
    fn default() -> Self {
        DefaultFrame {
            outer_width: 6.0,
            outer_height: 4.0,
            image_inset: 0.25,
            plaque_height: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WallFramesConfig {
    pub wall: WallName,
    pub rows: usize,
    pub cols: usize,
    /// Smallest acceptable horizontal gap between neighboring frames.
    #[serde(default)]
    pub gap_x: f64,
    #[serde(default)]
    pub gap_y: f64,
    #[serde(default)]
    pub y_offset: f64,
}

impl WallFramesConfig {
    fn new(wall: WallName, rows: usize, cols: usize, gap_x: f64) -> Self {
        WallFramesConfig {
            wall,
            rows,
            cols,
            gap_x,
            gap_y: 2.0,
            y_offset: 0.5,
        }
    }
}

impl GalleryConfig {
    pub fn from_json<T: AsRef<str>>(json: T) -> Result<Self> {
        Ok(serde_json::from_str(json.as_ref())?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| anyhow!("Unable to read {}: {err}", path.display()))?;
        match GalleryConfig::from_json(json) {
            Ok(config) => Ok(config),
            Err(err) => Err(anyhow!("Failed to parse {}: {}", path.display(), err)),
        }
    }

    /// Like `load()`, but falls back to the built-in demo layout if the
    /// config can't be read.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match GalleryConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("{err}, using the default gallery layout.");
                GalleryConfig::default()
            }
        }
    }
}
