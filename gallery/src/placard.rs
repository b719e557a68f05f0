use anyhow::Result;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

use crate::{gallery_wall::WallName, image::ImageSource, local_storage::LocalStorage};

pub const DEFAULT_PLACARD_TITLE: &'static str = "Untitled";

const PLACARD_KEY_PREFIX: &'static str = "gallery.placard";

/// The little label underneath a frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Placard {
    pub title: String,
    #[serde(default)]
    pub link: String,
}

impl Default for Placard {
    fn default() -> Self {
        Placard {
            title: DEFAULT_PLACARD_TITLE.into(),
            link: String::new(),
        }
    }
}

impl Placard {
    pub fn new<T: Into<String>, U: Into<String>>(title: T, link: U) -> Self {
        Placard {
            title: title.into(),
            link: link.into(),
        }
    }

    /// Makes up a placard for a freshly assigned image, titled after its filename.
    pub fn from_source(source: &ImageSource) -> Self {
        match source {
            ImageSource::Url(url) => {
                let path = url.split(['?', '#']).next().unwrap_or(url);
                Placard::new(title_from_path(path), url.clone())
            }
            ImageSource::File(path) => Placard::new(
                title_from_path(&path.to_string_lossy()),
                String::new(),
            ),
            ImageSource::DataUri(_) | ImageSource::InlineSvg(_) => Placard::default(),
        }
    }
}

/// The last path segment, percent-decoded, without its extension.
fn title_from_path(path: &str) -> String {
    let segment = path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let stem = match segment.rfind('.') {
        Some(idx) if idx > 0 => &segment[..idx],
        _ => segment,
    };
    let decoded = percent_decode_str(stem).decode_utf8_lossy();
    let title = decoded.trim();
    if title.is_empty() {
        DEFAULT_PLACARD_TITLE.into()
    } else {
        title.to_owned()
    }
}

/// How hosts should draw placard textures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacardStyle {
    pub texture_width: u32,
    pub texture_height: u32,
    pub background: &'static str,
    pub title_color: &'static str,
    pub title_font_px: u32,
    pub link_color: &'static str,
    pub link_font_px: u32,
}

pub const PLACARD_STYLE: PlacardStyle = PlacardStyle {
    texture_width: 512,
    texture_height: 128,
    background: "#111111",
    title_color: "#ffffff",
    title_font_px: 38,
    link_color: "#73c7ff",
    link_font_px: 24,
};

pub fn placard_key(wall: WallName, wall_index: usize) -> String {
    format!("{PLACARD_KEY_PREFIX}.{wall}.{wall_index}")
}

pub fn save_placard(
    storage: &mut LocalStorage,
    wall: WallName,
    wall_index: usize,
    placard: &Placard,
) -> Result<()> {
    storage.set_item(
        placard_key(wall, wall_index),
        serde_json::to_string(placard)?,
    )
}

/// Returns the stored placard for the given slot, if there is one.
///
/// Unreadable entries are logged and treated as missing.
pub fn load_placard(
    storage: &LocalStorage,
    wall: WallName,
    wall_index: usize,
) -> Result<Option<Placard>> {
    let key = placard_key(wall, wall_index);
    let Some(value) = storage.get_item(&key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&value) {
        Ok(placard) => Ok(Some(placard)),
        Err(err) => {
            log::warn!("Ignoring unreadable placard {key}: {err}");
            Ok(None)
        }
    }
}
