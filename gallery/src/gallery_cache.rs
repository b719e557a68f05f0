use anyhow::{anyhow, Result};
use std::{
    fs::create_dir_all,
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};
use tempfile::NamedTempFile;
use ureq::{Agent, AgentBuilder};

use crate::image::{get_supported_image_ext, looks_like_svg, SVG_CONTENT_TYPE};

const TIMEOUT_SECS: u64 = 10;

const ROOT_CACHE_SUBDIR: &'static str = "images";

/// Refuse to download anything bigger than this.
const MAX_IMAGE_BYTES: u64 = 64 * 1024 * 1024;

/// A downloaded (or previously downloaded) image, still encoded.
#[derive(Debug)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    /// The response's content type, or a guess based on the contents and file
    /// extension if it came out of the cache.
    pub content_type: String,
}

impl FetchedImage {
    pub fn is_svg(&self) -> bool {
        self.content_type == SVG_CONTENT_TYPE
    }
}

pub struct GalleryCache {
    cache_dir: PathBuf,
    agent: Agent,
}

impl GalleryCache {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            agent: AgentBuilder::new()
                .timeout(Duration::from_secs(TIMEOUT_SECS))
                .build(),
        }
    }

    pub fn get_cached_path<T: AsRef<str>>(&self, relative_pathname: T) -> PathBuf {
        let mut result = self.cache_dir.clone();
        for path_part in relative_pathname.as_ref().split("/") {
            result.push(path_part);
        }
        result
    }

    /// Where an image downloaded from `url` lives in the cache.
    pub fn get_cached_image_filename<T: AsRef<str>>(&self, url: T) -> String {
        let url = url.as_ref();
        let hash = format!("{:x}", md5::compute(url.as_bytes()));
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let ext = get_supported_image_ext(path).unwrap_or(".img");
        format!("{ROOT_CACHE_SUBDIR}/{hash}{ext}")
    }

    /// Fetches an image over HTTP, or from the cache if we've fetched it before.
    ///
    /// Anything that isn't a 200 response with an `image/*` content type is
    /// an error.
    pub fn fetch_image<T: AsRef<str>>(&self, url: T) -> Result<FetchedImage> {
        let url = url.as_ref();
        let filename = self.get_cached_image_filename(url);
        let cached_path = self.get_cached_path(&filename);
        if cached_path.exists() {
            log::debug!("Using cached {} for {url}.", cached_path.display());
            let bytes = std::fs::read(&cached_path)?;
            let content_type = if looks_like_svg(&bytes) {
                SVG_CONTENT_TYPE
            } else {
                content_type_for_filename(&filename)
            };
            return Ok(FetchedImage {
                bytes,
                content_type: content_type.to_owned(),
            });
        }
        log::info!("Fetching {url}...");
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(anyhow!("Got HTTP {status}"));
            }
            Err(err) => return Err(err.into()),
        };
        if response.status() != 200 {
            return Err(anyhow!("Got HTTP {}", response.status()));
        }
        let content_type = response.content_type().to_lowercase();
        if !content_type.starts_with("image/") {
            return Err(anyhow!("Content type is {}", content_type));
        }
        let mut bytes = vec![];
        response
            .into_reader()
            .take(MAX_IMAGE_BYTES + 1)
            .read_to_end(&mut bytes)?;
        if bytes.len() as u64 > MAX_IMAGE_BYTES {
            return Err(anyhow!("Image is larger than {MAX_IMAGE_BYTES} bytes"));
        }
        if let Err(err) = self.write_cached_file(&cached_path, &bytes) {
            // Not being able to cache isn't a reason to not show the image.
            log::warn!("Unable to cache {}: {err:?}", cached_path.display());
        }
        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }

    /// Writes to a temporary file next to `cached_path` and renames it into
    /// place, so a partial download never shows up in the cache.
    fn write_cached_file(&self, cached_path: &Path, bytes: &[u8]) -> Result<()> {
        let parent_dir = ensure_parent_dir(cached_path)?;
        let mut outfile = NamedTempFile::new_in(parent_dir)?;
        outfile.write_all(bytes)?;
        outfile.persist(cached_path)?;
        Ok(())
    }
}

fn content_type_for_filename(filename: &str) -> &'static str {
    match get_supported_image_ext(filename) {
        Some(".png") => "image/png",
        Some(".jpg") | Some(".jpeg") => "image/jpeg",
        Some(".webp") => "image/webp",
        Some(".gif") => "image/gif",
        Some(".bmp") => "image/bmp",
        Some(".svg") => SVG_CONTENT_TYPE,
        _ => "image/unknown",
    }
}

fn ensure_parent_dir(cached_path: &Path) -> Result<&Path> {
    let parent_dir = cached_path
        .parent()
        .ok_or_else(|| anyhow!("{} has no parent directory", cached_path.display()))?;
    create_dir_all(parent_dir)?;
    Ok(parent_dir)
}
