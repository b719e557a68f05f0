use anyhow::Result;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::{gallery::GalleryMode, local_storage::LocalStorage};

pub const SOUNDCLOUD_STORAGE_KEY: &'static str = "gallery.soundcloud.url";

pub const DEFAULT_SOUNDCLOUD_URL: &'static str =
    "https://soundcloud.com/vertigo01/sets/detroit-techno";

const SOUNDCLOUD_PLAYER_URL: &'static str = "https://w.soundcloud.com/player/?url=";

const SOUNDCLOUD_WIDGET_PARAMS: [&'static str; 6] = [
    "color=%23111111",
    "hide_related=false",
    "show_comments=true",
    "show_user=true",
    "show_reposts=false",
    "show_teaser=true",
];

/// Same characters JavaScript's `encodeURIComponent()` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmbedOptions {
    pub visual: bool,
    pub auto_play: bool,
}

/// The URL of the SoundCloud widget that plays `track_or_set_url`.
pub fn build_embed_url<T: AsRef<str>>(track_or_set_url: T, options: EmbedOptions) -> String {
    let mut params: Vec<String> = SOUNDCLOUD_WIDGET_PARAMS
        .iter()
        .map(|param| param.to_string())
        .collect();
    params.push(format!("visual={}", options.visual));
    params.push(format!("auto_play={}", options.auto_play));
    format!(
        "{SOUNDCLOUD_PLAYER_URL}{}&{}",
        utf8_percent_encode(track_or_set_url.as_ref(), URI_COMPONENT),
        params.join("&")
    )
}

/// The chosen audio URL, or the default if nobody has picked one.
pub fn get_audio_url(storage: &LocalStorage) -> Result<String> {
    Ok(storage
        .get_item(SOUNDCLOUD_STORAGE_KEY)?
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SOUNDCLOUD_URL.to_owned()))
}

/// Remembers the chosen audio URL. Blank URLs are ignored; returns whether
/// anything was saved.
pub fn set_audio_url<T: AsRef<str>>(storage: &mut LocalStorage, url: T) -> Result<bool> {
    let url = url.as_ref().trim();
    if url.is_empty() {
        return Ok(false);
    }
    storage.set_item(SOUNDCLOUD_STORAGE_KEY, url)?;
    Ok(true)
}

/// How the audio should be presented in a given mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AudioPresentation {
    /// A visible player widget that the curator controls.
    Overlay { embed_url: String },
    /// An invisible player that starts on its own.
    HiddenAutoplay { embed_url: String },
}

impl AudioPresentation {
    pub fn for_mode<T: AsRef<str>>(mode: GalleryMode, url: T) -> Self {
        match mode {
            GalleryMode::Admin => AudioPresentation::Overlay {
                embed_url: build_embed_url(
                    url,
                    EmbedOptions {
                        visual: false,
                        auto_play: false,
                    },
                ),
            },
            GalleryMode::View => AudioPresentation::HiddenAutoplay {
                embed_url: build_embed_url(
                    url,
                    EmbedOptions {
                        visual: false,
                        auto_play: true,
                    },
                ),
            },
        }
    }

    pub fn embed_url(&self) -> &str {
        match self {
            AudioPresentation::Overlay { embed_url } => embed_url,
            AudioPresentation::HiddenAutoplay { embed_url } => embed_url,
        }
    }
}
