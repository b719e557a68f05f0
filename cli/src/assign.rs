use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};
use clap::Args;
use gallery::{
    config::GalleryConfig, gallery::Gallery, image::list_image_files,
    image_loader::ImageLoader, local_storage::LocalStorage,
};

#[derive(Args, Debug)]
pub struct AssignArgs {
    /// Text file with one image URL, data URI or path per line.
    #[arg(long, conflicts_with = "dir", required_unless_present = "dir")]
    pub urls: Option<PathBuf>,

    /// Directory of images to use, in filename order.
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Where to write the frame textures.
    #[arg(short, long, default_value = "frames")]
    pub out: PathBuf,

    /// Keep placards saved from an earlier run instead of naming them after the new images.
    #[arg(long)]
    pub keep_placards: bool,
}

/// Blank lines and lines starting with `#` are skipped.
pub fn parse_url_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

fn collect_sources(args: &AssignArgs) -> Result<Vec<String>> {
    if let Some(urls) = &args.urls {
        let contents = fs::read_to_string(urls)
            .map_err(|err| anyhow!("Unable to read {}: {err}", urls.display()))?;
        let sources = parse_url_list(&contents);
        log::info!("Read {} image sources from {}.", sources.len(), urls.display());
        return Ok(sources);
    }
    if let Some(dir) = &args.dir {
        let sources: Vec<String> = list_image_files(dir)?
            .into_iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        log::info!("Found {} images in {}.", sources.len(), dir.display());
        return Ok(sources);
    }
    Err(anyhow!("Either --urls or --dir is required"))
}

fn frame_texture_path(out: &Path, frame_index: usize) -> PathBuf {
    out.join(format!("frame-{frame_index:02}.png"))
}

pub fn run_assign(
    config: GalleryConfig,
    storage: &mut LocalStorage,
    cache_dir: PathBuf,
    args: &AssignArgs,
) -> Result<()> {
    let sources = collect_sources(args)?;
    if sources.is_empty() {
        return Err(anyhow!("No images to assign"));
    }
    let mut gallery = Gallery::new(config)?;
    let requests = gallery.assign_images_round_robin(&sources)?;
    if args.keep_placards {
        let restored = gallery.restore_placards(storage)?;
        log::info!("Kept {restored} saved placards.");
    }
    fs::create_dir_all(&args.out)?;

    let mut loader = ImageLoader::spawn(cache_dir);
    for request in requests {
        loader.request(request)?;
    }
    let total = gallery.frames().len();
    let mut done = 0;
    while let Some(loaded) = loader.recv_blocking() {
        if !gallery.apply_loaded(&loaded) {
            continue;
        }
        let path = frame_texture_path(&args.out, loaded.frame_index);
        loaded.image().save(&path)?;
        done += 1;
        println!(
            "{done}/{total} frame #{} -> {}{}",
            loaded.frame_index,
            path.display(),
            if loaded.is_placeholder() { " (placeholder)" } else { "" }
        );
    }
    if let Some(err) = loader.fatal_error() {
        return Err(anyhow!("Image loader failed: {err}"));
    }
    loader.shutdown();

    gallery.save_placards(storage)?;
    let placards_path = args.out.join("placards.json");
    let placards: Vec<_> = gallery.frames().iter().map(|frame| &frame.placard).collect();
    fs::write(&placards_path, serde_json::to_string_pretty(&placards)?)?;
    println!("Wrote {}.", placards_path.display());

    if let Some(status) = gallery.status() {
        println!("{status}");
    }
    Ok(())
}
