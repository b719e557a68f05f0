use std::{f64::consts::PI, fmt::Display, str::FromStr};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::{config::RoomDimensions, geometry::Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WallName {
    #[default]
    Front,
    Back,
    Left,
    Right,
}

impl WallName {
    pub fn all() -> [WallName; 4] {
        [WallName::Front, WallName::Back, WallName::Left, WallName::Right]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WallName::Front => "front",
            WallName::Back => "back",
            WallName::Left => "left",
            WallName::Right => "right",
        }
    }
}

impl Display for WallName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WallName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WallName::all()
            .into_iter()
            .find(|wall| wall.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("Unknown wall '{s}', expected front, back, left or right"))
    }
}

/// One of the four walls of the room, with enough geometry to hang things on it.
///
/// Wall-local coordinates have their origin at the center of the wall: `x`
/// grows toward the right of someone standing in the room facing the wall,
/// `y` grows upward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryWall {
    pub name: WallName,
    pub width: f64,
    pub height: f64,
    pub center: Vec3,
    /// Unit vector pointing from the wall into the room.
    pub normal: Vec3,
    /// Unit vector along the wall in the direction of increasing local `x`.
    pub tangent: Vec3,
    /// Rotation about the Y axis, in radians, that turns a plane facing +Z
    /// into one facing the room.
    pub rotation_y: f64,
}

impl GalleryWall {
    pub fn for_room(name: WallName, room: &RoomDimensions) -> Self {
        let mid_y = room.height / 2.0;
        let (width, center, normal, tangent, rotation_y) = match name {
            WallName::Front => (
                room.width,
                Vec3::new(0.0, mid_y, -room.depth / 2.0),
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 0.0),
                0.0,
            ),
            WallName::Back => (
                room.width,
                Vec3::new(0.0, mid_y, room.depth / 2.0),
                Vec3::new(0.0, 0.0, -1.0),
                Vec3::new(-1.0, 0.0, 0.0),
                PI,
            ),
            WallName::Left => (
                room.depth,
                Vec3::new(-room.width / 2.0, mid_y, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, -1.0),
                PI / 2.0,
            ),
            WallName::Right => (
                room.depth,
                Vec3::new(room.width / 2.0, mid_y, 0.0),
                Vec3::new(-1.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
                -PI / 2.0,
            ),
        };
        GalleryWall {
            name,
            width,
            height: room.height,
            center,
            normal,
            tangent,
            rotation_y,
        }
    }

    pub fn all_for_room(room: &RoomDimensions) -> Vec<GalleryWall> {
        WallName::all()
            .into_iter()
            .map(|name| GalleryWall::for_room(name, room))
            .collect()
    }

    /// Converts wall-local coordinates to room coordinates, `offset` units
    /// in front of the wall surface.
    pub fn to_world(&self, x: f64, y: f64, offset: f64) -> Vec3 {
        self.center + self.tangent * x + Vec3::new(0.0, y, 0.0) + self.normal * offset
    }
}

#[cfg(test)]
mod tests {
    use crate::{config::RoomDimensions, geometry::Vec3};

    use super::{GalleryWall, WallName};

    #[test]
    fn test_wall_name_parses() {
        assert_eq!("front".parse::<WallName>().unwrap(), WallName::Front);
        assert_eq!(" Right ".parse::<WallName>().unwrap(), WallName::Right);
        assert!("ceiling".parse::<WallName>().is_err());
        assert_eq!(WallName::Left.to_string(), "left");
    }

    #[test]
    fn test_walls_face_into_the_room() {
        let room = RoomDimensions::default();
        for wall in GalleryWall::all_for_room(&room) {
            // Moving along the normal gets us closer to the room's center.
            let center = Vec3::new(0.0, room.height / 2.0, 0.0);
            let inside = wall.to_world(0.0, 0.0, 1.0);
            assert!(inside.distance(center) < wall.center.distance(center));
            // The tangent lies in the wall's plane.
            assert_eq!(wall.tangent.dot(wall.normal), 0.0);
            // The rotation turns +Z into the normal.
            assert!((wall.rotation_y.sin() - wall.normal.x).abs() < 1e-9);
            assert!((wall.rotation_y.cos() - wall.normal.z).abs() < 1e-9);
        }
    }

    #[test]
    fn test_wall_widths_follow_the_room() {
        let room = RoomDimensions {
            width: 10.0,
            height: 5.0,
            depth: 20.0,
        };
        assert_eq!(GalleryWall::for_room(WallName::Front, &room).width, 10.0);
        assert_eq!(GalleryWall::for_room(WallName::Back, &room).width, 10.0);
        assert_eq!(GalleryWall::for_room(WallName::Left, &room).width, 20.0);
        assert_eq!(GalleryWall::for_room(WallName::Right, &room).width, 20.0);
    }

    #[test]
    fn test_to_world_on_front_wall() {
        let room = RoomDimensions::default();
        let front = GalleryWall::for_room(WallName::Front, &room);
        assert_eq!(
            front.to_world(2.0, 1.0, 0.5),
            Vec3::new(2.0, 7.0, -23.5)
        );
    }
}
