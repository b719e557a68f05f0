use serde::Serialize;

use crate::{image::ImageSource, layout::FramePlacement, placard::Placard};

pub const MIN_TEXTURE_SCALE: f64 = 0.1;

pub const MAX_TEXTURE_SCALE: f64 = 6.0;

/// Each wheel notch zooms by this fraction.
const ZOOM_STEP: f64 = 0.08;

/// How the picture is positioned inside its frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureState {
    pub scale: f64,
    pub u_offset: f64,
    pub v_offset: f64,
    pub flip_h: bool,
    pub flip_v: bool,
}

impl Default for TextureState {
    fn default() -> Self {
        TextureState {
            scale: 1.0,
            u_offset: 0.0,
            v_offset: 0.0,
            flip_h: false,
            flip_v: false,
        }
    }
}

/// Where a pan started, so that moves are relative to it rather than cumulative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanStart {
    pub pointer_x: f64,
    pub pointer_y: f64,
    pub u_offset: f64,
    pub v_offset: f64,
}

impl TextureState {
    /// UV scale to hand to the renderer; a flip is a negative scale.
    pub fn uv_scale(&self) -> (f64, f64) {
        let u = if self.flip_h { -self.scale } else { self.scale };
        let v = if self.flip_v { -self.scale } else { self.scale };
        (u, v)
    }

    pub fn toggle_flip_h(&mut self) {
        self.flip_h = !self.flip_h;
    }

    pub fn toggle_flip_v(&mut self) {
        self.flip_v = !self.flip_v;
    }

    pub fn pan_start(&self, pointer_x: f64, pointer_y: f64) -> PanStart {
        PanStart {
            pointer_x,
            pointer_y,
            u_offset: self.u_offset,
            v_offset: self.v_offset,
        }
    }

    /// Moves the picture by the pointer's travel since `start`, measured as a
    /// fraction of the canvas. Screen Y grows downward but V grows upward.
    pub fn pan(
        &mut self,
        start: &PanStart,
        pointer_x: f64,
        pointer_y: f64,
        canvas_width: f64,
        canvas_height: f64,
    ) {
        if canvas_width <= 0.0 || canvas_height <= 0.0 {
            return;
        }
        let dx = (pointer_x - start.pointer_x) / canvas_width;
        let dy = (pointer_y - start.pointer_y) / canvas_height;
        self.u_offset = start.u_offset + dx;
        self.v_offset = start.v_offset - dy;
    }

    /// Zooms in response to a wheel event; only the sign of `delta_y` matters.
    pub fn zoom(&mut self, delta_y: f64) {
        let step = if delta_y > 0.0 {
            ZOOM_STEP
        } else if delta_y < 0.0 {
            -ZOOM_STEP
        } else {
            0.0
        };
        self.scale = (self.scale * (1.0 + step)).clamp(MIN_TEXTURE_SCALE, MAX_TEXTURE_SCALE);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TextureStatus {
    /// Nothing has been asked for yet.
    Empty,
    Pending,
    Loaded { width: u32, height: u32 },
    Placeholder { reason: String },
}

/// A placed picture slot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub placement: FramePlacement,
    pub placard: Placard,
    pub image: Option<ImageSource>,
    pub texture: TextureStatus,
    pub texture_state: TextureState,
    /// Bumped every time a new image is bound, so late results for an older
    /// image can be recognized and dropped.
    pub generation: u64,
}

impl Frame {
    pub fn new(placement: FramePlacement) -> Self {
        Frame {
            placement,
            placard: Placard::default(),
            image: None,
            texture: TextureStatus::Empty,
            texture_state: TextureState::default(),
            generation: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.placement.index
    }

    /// Binds a new image, returning the generation its load must report back with.
    pub fn bind_image(&mut self, source: ImageSource) -> u64 {
        self.generation += 1;
        self.image = Some(source);
        self.texture = TextureStatus::Pending;
        self.generation
    }
}
