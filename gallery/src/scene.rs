use serde::Serialize;

use crate::{
    config::{GalleryConfig, GlowConfig, HighlightConfig, RoomDimensions},
    gallery_wall::{GalleryWall, WallName},
    geometry::{Size2, Vec3},
    layout::{layout_gallery, FramePlacement, LayoutError},
    placard::{PlacardStyle, PLACARD_STYLE},
};

/// The logo sits just in front of its wall.
const LOGO_OFFSET: f64 = 0.01;

/// Neon white, bright enough to bloom under the glow layer.
const LOGO_EMISSIVE_COLOR: [f64; 3] = [0.9, 0.9, 0.9];

/// Emissive tint for the frame's backing board, which gives the LED edge look.
const FRAME_EMISSIVE_COLOR: [f64; 3] = [0.0, 0.15, 0.3];

const WALL_COLOR: [f64; 3] = [0.06, 0.06, 0.08];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoPlacement {
    pub wall: WallName,
    pub position: Vec3,
    pub rotation_y: f64,
    pub size: Size2,
    pub texture: String,
    pub emissive_color: [f64; 3],
}

/// Everything a host engine needs to build the room.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryScene {
    pub room: RoomDimensions,
    pub wall_color: [f64; 3],
    pub walls: Vec<GalleryWall>,
    pub logo: Option<LogoPlacement>,
    pub frames: Vec<FramePlacement>,
    pub frame_emissive_color: [f64; 3],
    pub placard_style: PlacardStyle,
    pub glow: GlowConfig,
    pub highlight: HighlightConfig,
}

pub fn build_scene(config: &GalleryConfig) -> Result<GalleryScene, LayoutError> {
    let walls = GalleryWall::all_for_room(&config.room);
    let logo = if config.logo.enabled {
        let wall = GalleryWall::for_room(config.logo.wall, &config.room);
        Some(LogoPlacement {
            wall: wall.name,
            position: wall.to_world(0.0, config.logo.y, LOGO_OFFSET),
            rotation_y: wall.rotation_y,
            size: Size2 {
                width: config.logo.width,
                height: config.logo.height,
            },
            texture: config.logo.texture.clone(),
            emissive_color: LOGO_EMISSIVE_COLOR,
        })
    } else {
        None
    };
    Ok(GalleryScene {
        room: config.room,
        wall_color: WALL_COLOR,
        walls,
        logo,
        frames: layout_gallery(config)?,
        frame_emissive_color: FRAME_EMISSIVE_COLOR,
        placard_style: PLACARD_STYLE,
        glow: config.glow,
        highlight: config.highlight,
    })
}
