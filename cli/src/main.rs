use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gallery::{
    audio::{get_audio_url, set_audio_url, AudioPresentation},
    config::{GalleryConfig, DEFAULT_CONFIG_PATH},
    gallery::GalleryMode,
    gallery_wall::WallName,
    local_storage::{LocalStorage, DEFAULT_LOCAL_STORAGE_FILENAME},
    placard::{load_placard, save_placard, Placard},
    scene::build_scene,
};
use rusqlite::Connection;

mod assign;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Gallery config file. The built-in demo layout is used if it can't be read.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Where placards and settings are persisted.
    #[arg(long, default_value = DEFAULT_LOCAL_STORAGE_FILENAME)]
    db: PathBuf,

    /// Where downloaded images are cached.
    #[arg(long, default_value = "cache")]
    cache_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the room, frames and placard positions as JSON.
    Scene,

    /// Distribute images across the frames and render their textures to PNGs.
    Assign(assign::AssignArgs),

    /// Read or write a frame's placard.
    Placard {
        #[command(subcommand)]
        command: PlacardCommand,
    },

    /// Read or write the background audio.
    Audio {
        #[command(subcommand)]
        command: AudioCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PlacardCommand {
    Get {
        #[arg(short, long)]
        wall: WallName,

        /// Index of the frame on its wall.
        #[arg(short, long)]
        index: usize,
    },
    Set {
        #[arg(short, long)]
        wall: WallName,

        /// Index of the frame on its wall.
        #[arg(short, long)]
        index: usize,

        #[arg(short, long)]
        title: String,

        #[arg(short, long, default_value = "")]
        link: String,
    },
}

#[derive(Subcommand, Debug)]
enum AudioCommand {
    Get,
    Set {
        url: String,
    },
    /// Print how the audio player should be embedded in the given mode.
    Embed {
        #[arg(short, long, value_parser = parse_mode, default_value = "admin")]
        mode: GalleryMode,
    },
}

fn parse_mode(value: &str) -> Result<GalleryMode> {
    match value.to_lowercase().as_str() {
        "admin" => Ok(GalleryMode::Admin),
        "view" => Ok(GalleryMode::View),
        _ => Err(anyhow::anyhow!("expected 'admin' or 'view'")),
    }
}

fn open_storage(args: &Args) -> Result<LocalStorage> {
    LocalStorage::new(Connection::open(&args.db)?)
}

fn run() -> Result<()> {
    let args = Args::parse();
    match &args.command {
        Command::Scene => {
            let config = GalleryConfig::load_or_default(&args.config);
            let scene = build_scene(&config)?;
            println!("{}", serde_json::to_string_pretty(&scene)?);
        }
        Command::Assign(assign_args) => {
            let config = GalleryConfig::load_or_default(&args.config);
            let mut storage = open_storage(&args)?;
            assign::run_assign(config, &mut storage, args.cache_dir.clone(), assign_args)?;
        }
        Command::Placard { command } => {
            let mut storage = open_storage(&args)?;
            match command {
                PlacardCommand::Get { wall, index } => {
                    let placard = load_placard(&storage, *wall, *index)?.unwrap_or_default();
                    println!("{}", serde_json::to_string_pretty(&placard)?);
                }
                PlacardCommand::Set {
                    wall,
                    index,
                    title,
                    link,
                } => {
                    save_placard(&mut storage, *wall, *index, &Placard::new(title, link))?;
                    println!("Saved placard for {wall} #{index}.");
                }
            }
        }
        Command::Audio { command } => {
            let mut storage = open_storage(&args)?;
            match command {
                AudioCommand::Get => {
                    println!("{}", get_audio_url(&storage)?);
                }
                AudioCommand::Set { url } => {
                    if set_audio_url(&mut storage, url)? {
                        println!("Saved audio URL.");
                    } else {
                        println!("Ignoring blank audio URL.");
                    }
                }
                AudioCommand::Embed { mode } => {
                    let presentation = AudioPresentation::for_mode(*mode, get_audio_url(&storage)?);
                    println!("{}", serde_json::to_string_pretty(&presentation)?);
                }
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        println!("error: {:#}", err);
        process::exit(1);
    }
}
