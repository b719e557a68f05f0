use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use crate::{data_uri::DataUri, gallery_cache::GalleryCache};
use anyhow::{anyhow, Result};
use image::{Rgba, RgbaImage};
use resvg::{tiny_skia, usvg};
use serde::{Deserialize, Serialize};

const JPG_EXT: &'static str = ".jpg";

const JPEG_EXT: &'static str = ".jpeg";

const SVG_EXT: &'static str = ".svg";

pub(crate) const SVG_CONTENT_TYPE: &'static str = "image/svg+xml";

/// The image formats we know how to find in a directory or URL.
const SUPPORTED_LOWERCASE_IMAGE_FORMATS: [&'static str; 7] =
    [JPG_EXT, JPEG_EXT, ".png", ".webp", ".gif", ".bmp", SVG_EXT];

/// How much of a file to look at when guessing whether it's SVG markup.
const SNIFF_LEN: usize = 256;

/// Rasterized vector art is scaled down to fit in this many pixels on its longest side.
const MAX_SVG_DIMENSION: u32 = 2048;

const PLACEHOLDER_SIZE: u32 = 256;

const PLACEHOLDER_CELL_SIZE: u32 = 32;

const PLACEHOLDER_LIGHT: Rgba<u8> = Rgba([0xbb, 0xbb, 0xbb, 0xff]);

const PLACEHOLDER_DARK: Rgba<u8> = Rgba([0x77, 0x77, 0x77, 0xff]);

/// Returns the file extension for the given image filename, if it's a supported one.
///
/// The extension will be lowercased, and will include the leading period.
pub fn get_supported_image_ext(filename: &str) -> Option<&'static str> {
    let lowercase_filename = filename.to_lowercase();
    for format in SUPPORTED_LOWERCASE_IMAGE_FORMATS {
        if lowercase_filename.ends_with(format) {
            return Some(format);
        }
    }
    None
}

/// All the images directly inside `dir`, sorted by filename.
pub fn list_image_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut result = vec![];
    for entry_result in std::fs::read_dir(dir.as_ref())? {
        let entry = entry_result?;
        let path = entry.path();
        if path.is_file() && get_supported_image_ext(&entry.file_name().to_string_lossy()).is_some()
        {
            result.push(path);
        }
    }
    result.sort();
    Ok(result)
}

/// Where a frame's picture comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum ImageSource {
    /// An `http://` or `https://` URL.
    Url(String),
    /// A `data:` URI with the image inlined.
    DataUri(String),
    /// Raw SVG markup.
    InlineSvg(String),
    /// A file on the local filesystem.
    File(PathBuf),
}

impl ImageSource {
    pub fn parse<T: AsRef<str>>(value: T) -> Self {
        let value = value.as_ref().trim();
        let lowercase_prefix: String = value.chars().take(8).collect::<String>().to_lowercase();
        if lowercase_prefix.starts_with("data:") {
            ImageSource::DataUri(value.to_owned())
        } else if lowercase_prefix.starts_with("<svg") || lowercase_prefix.starts_with("<?xml") {
            ImageSource::InlineSvg(value.to_owned())
        } else if lowercase_prefix.starts_with("http://") || lowercase_prefix.starts_with("https://")
        {
            ImageSource::Url(value.to_owned())
        } else {
            ImageSource::File(PathBuf::from(value.strip_prefix("file://").unwrap_or(value)))
        }
    }
}

impl Display for ImageSource {
    /// Something short enough to put in a log message.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageSource::Url(url) => write!(f, "{url}"),
            ImageSource::DataUri(uri) => write!(f, "inline data ({} bytes)", uri.len()),
            ImageSource::InlineSvg(markup) => write!(f, "inline SVG ({} bytes)", markup.len()),
            ImageSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Why a texture looks the way it does.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureOrigin {
    Loaded,
    Placeholder { reason: String },
}

#[derive(Debug, Clone)]
pub struct Texture {
    pub image: RgbaImage,
    pub origin: TextureOrigin,
}

impl Texture {
    pub fn is_placeholder(&self) -> bool {
        matches!(self.origin, TextureOrigin::Placeholder { .. })
    }

    /// A short status line suitable for showing on screen, if something went wrong.
    pub fn status(&self) -> Option<String> {
        match &self.origin {
            TextureOrigin::Loaded => None,
            TextureOrigin::Placeholder { reason } => Some(format!("Image unavailable: {reason}")),
        }
    }
}

/// A neutral gray checkerboard, shown wherever an image couldn't be loaded.
pub fn placeholder_image() -> RgbaImage {
    RgbaImage::from_fn(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, |x, y| {
        if (x / PLACEHOLDER_CELL_SIZE + y / PLACEHOLDER_CELL_SIZE) % 2 == 0 {
            PLACEHOLDER_LIGHT
        } else {
            PLACEHOLDER_DARK
        }
    })
}

/// Whether `bytes` look like SVG markup rather than a raster format.
pub(crate) fn looks_like_svg(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let head = &bytes[start..bytes.len().min(start + SNIFF_LEN)];
    let head = String::from_utf8_lossy(head).to_lowercase();
    head.starts_with("<svg") || head.starts_with("<?xml") || head.starts_with("<!doctype svg")
}

fn decode_raster(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

fn rasterize_svg(markup: &[u8]) -> Result<RgbaImage> {
    let tree = usvg::Tree::from_data(markup, &usvg::Options::default())?;
    let size = tree.size().to_int_size();
    let longest = size.width().max(size.height());
    let scale = if longest > MAX_SVG_DIMENSION {
        MAX_SVG_DIMENSION as f32 / longest as f32
    } else {
        1.0
    };
    let width = ((size.width() as f32 * scale).round() as u32).max(1);
    let height = ((size.height() as f32 * scale).round() as u32).max(1);
    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("Unable to allocate {width}x{height} pixmap"))?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    let mut image = RgbaImage::new(width, height);
    for (pixel, premultiplied) in image.pixels_mut().zip(pixmap.pixels()) {
        let color = premultiplied.demultiply();
        *pixel = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    Ok(image)
}

/// Vector markup is rasterized even when it was labeled as something else.
fn decode_image(bytes: &[u8], is_svg: bool) -> Result<RgbaImage> {
    if is_svg || looks_like_svg(bytes) {
        rasterize_svg(bytes)
    } else {
        decode_raster(bytes)
    }
}

/// Fetches and decodes an image. Any failure along the way is an error.
pub fn load_image(cache: &GalleryCache, source: &ImageSource) -> Result<RgbaImage> {
    match source {
        ImageSource::Url(url) => {
            let fetched = cache.fetch_image(url)?;
            decode_image(&fetched.bytes, fetched.is_svg())
        }
        ImageSource::DataUri(uri) => {
            let data_uri = DataUri::parse(uri)?;
            if !data_uri.is_image() {
                return Err(anyhow!("Content type is {}", data_uri.media_type));
            }
            decode_image(&data_uri.decode()?, data_uri.is_svg())
        }
        ImageSource::InlineSvg(markup) => rasterize_svg(markup.as_bytes()),
        ImageSource::File(path) => {
            let bytes = std::fs::read(path)
                .map_err(|err| anyhow!("Unable to read {}: {err}", path.display()))?;
            decode_image(
                &bytes,
                get_supported_image_ext(&path.to_string_lossy()) == Some(SVG_EXT),
            )
        }
    }
}

/// Like `load_image()`, but never fails: if anything goes wrong, the
/// problem is logged and the placeholder checkerboard is returned instead.
pub fn load_texture_or_placeholder(cache: &GalleryCache, source: &ImageSource) -> Texture {
    match load_image(cache, source) {
        Ok(image) => Texture {
            image,
            origin: TextureOrigin::Loaded,
        },
        Err(err) => {
            log::warn!("Unable to load image from {source}: {err:#}");
            Texture {
                image: placeholder_image(),
                origin: TextureOrigin::Placeholder {
                    reason: format!("{err:#}"),
                },
            }
        }
    }
}
