use std::fmt::Display;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    config::GalleryConfig,
    frame::{Frame, PanStart, TextureStatus},
    image::{ImageSource, TextureOrigin},
    image_loader::{LoadRequest, LoadedTexture},
    layout::{layout_gallery, LayoutError},
    local_storage::LocalStorage,
    placard::{load_placard, save_placard, Placard},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GalleryMode {
    /// Curators can change images, placards and framing.
    #[default]
    Admin,
    /// Visitors can look around, nothing else.
    View,
}

impl Display for GalleryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GalleryMode::Admin => write!(f, "Admin"),
            GalleryMode::View => write!(f, "View"),
        }
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum GalleryError {
    #[error("there is no frame #{index} (the gallery has {count})")]
    NoSuchFrame { index: usize, count: usize },

    #[error("no frame is selected")]
    NoActiveFrame,

    #[error("only available in Admin mode")]
    NotInAdminMode,

    #[error("frame edit mode is off")]
    NotInEditMode,
}

/// The room's frames plus everything the curator can do to them.
pub struct Gallery {
    frames: Vec<Frame>,
    mode: GalleryMode,
    active_frame: Option<usize>,
    edit_mode: bool,
    pan: Option<PanStart>,
}

impl Gallery {
    /// Lays out the room's frames. Each frame starts out showing the
    /// config's demo image, if it has one.
    pub fn new(config: GalleryConfig) -> Result<Self, LayoutError> {
        let placements = layout_gallery(&config)?;
        let default_image = config.frames.default_image.as_ref().map(ImageSource::parse);
        let frames = placements
            .into_iter()
            .map(|placement| {
                let mut frame = Frame::new(placement);
                if let Some(source) = &default_image {
                    frame.bind_image(source.clone());
                }
                frame
            })
            .collect();
        Ok(Gallery {
            frames,
            mode: GalleryMode::default(),
            active_frame: None,
            edit_mode: false,
            pan: None,
        })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Result<&Frame, GalleryError> {
        let count = self.frames.len();
        self.frames
            .get(index)
            .ok_or(GalleryError::NoSuchFrame { index, count })
    }

    fn frame_mut(&mut self, index: usize) -> Result<&mut Frame, GalleryError> {
        let count = self.frames.len();
        self.frames
            .get_mut(index)
            .ok_or(GalleryError::NoSuchFrame { index, count })
    }

    pub fn mode(&self) -> GalleryMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: GalleryMode) {
        if mode == self.mode {
            return;
        }
        log::info!("Switching to {mode} mode.");
        self.mode = mode;
        if mode == GalleryMode::View {
            self.edit_mode = false;
            self.pan = None;
        }
    }

    pub fn toggle_mode(&mut self) -> GalleryMode {
        self.set_mode(match self.mode {
            GalleryMode::Admin => GalleryMode::View,
            GalleryMode::View => GalleryMode::Admin,
        });
        self.mode
    }

    fn require_admin(&self) -> Result<(), GalleryError> {
        if self.mode != GalleryMode::Admin {
            return Err(GalleryError::NotInAdminMode);
        }
        Ok(())
    }

    /// The frame that should be highlighted, if any.
    pub fn active_frame(&self) -> Option<usize> {
        self.active_frame
    }

    pub fn select_frame(&mut self, index: usize) -> Result<(), GalleryError> {
        self.frame(index)?;
        if self.active_frame != Some(index) {
            self.pan = None;
        }
        self.active_frame = Some(index);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.active_frame = None;
        self.pan = None;
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn toggle_edit_mode(&mut self) -> Result<bool, GalleryError> {
        self.require_admin()?;
        self.edit_mode = !self.edit_mode;
        if !self.edit_mode {
            self.pan = None;
        }
        Ok(self.edit_mode)
    }

    /// While this is true, the host should stop the camera from reacting to
    /// the pointer.
    pub fn is_panning(&self) -> bool {
        self.pan.is_some()
    }

    fn editable_active_frame(&mut self) -> Result<&mut Frame, GalleryError> {
        self.require_admin()?;
        let index = self.active_frame.ok_or(GalleryError::NoActiveFrame)?;
        self.frame_mut(index)
    }

    pub fn flip_h(&mut self) -> Result<(), GalleryError> {
        self.editable_active_frame()?.texture_state.toggle_flip_h();
        Ok(())
    }

    pub fn flip_v(&mut self) -> Result<(), GalleryError> {
        self.editable_active_frame()?.texture_state.toggle_flip_v();
        Ok(())
    }

    pub fn begin_pan(&mut self, pointer_x: f64, pointer_y: f64) -> Result<(), GalleryError> {
        if !self.edit_mode {
            return Err(GalleryError::NotInEditMode);
        }
        let start = self
            .editable_active_frame()?
            .texture_state
            .pan_start(pointer_x, pointer_y);
        self.pan = Some(start);
        Ok(())
    }

    /// Moves the active frame's picture. Does nothing unless a pan is in progress.
    pub fn pan_to(
        &mut self,
        pointer_x: f64,
        pointer_y: f64,
        canvas_width: f64,
        canvas_height: f64,
    ) -> Result<(), GalleryError> {
        let Some(start) = self.pan else {
            return Ok(());
        };
        self.editable_active_frame()?.texture_state.pan(
            &start,
            pointer_x,
            pointer_y,
            canvas_width,
            canvas_height,
        );
        Ok(())
    }

    pub fn end_pan(&mut self) {
        self.pan = None;
    }

    pub fn zoom(&mut self, delta_y: f64) -> Result<(), GalleryError> {
        if !self.edit_mode {
            return Err(GalleryError::NotInEditMode);
        }
        self.editable_active_frame()?.texture_state.zoom(delta_y);
        Ok(())
    }

    fn load_request_for(frame: &Frame) -> Option<LoadRequest> {
        frame.image.as_ref().map(|source| LoadRequest {
            frame_index: frame.index(),
            generation: frame.generation,
            source: source.clone(),
        })
    }

    /// Load requests for whatever every frame is currently bound to.
    pub fn initial_load_requests(&self) -> Vec<LoadRequest> {
        self.frames.iter().filter_map(Gallery::load_request_for).collect()
    }

    pub fn set_frame_image(
        &mut self,
        index: usize,
        source: ImageSource,
    ) -> Result<LoadRequest, GalleryError> {
        self.require_admin()?;
        let frame = self.frame_mut(index)?;
        let generation = frame.bind_image(source.clone());
        Ok(LoadRequest {
            frame_index: index,
            generation,
            source,
        })
    }

    pub fn set_placard(&mut self, index: usize, placard: Placard) -> Result<(), GalleryError> {
        self.require_admin()?;
        self.frame_mut(index)?.placard = placard;
        Ok(())
    }

    /// Hands out `sources` to the frames in order, starting over from the
    /// first source when we run out. Every frame gets a placard named after
    /// its new image.
    ///
    /// Returns the loads that need to happen; an empty list of sources changes nothing.
    pub fn assign_images_round_robin<T: AsRef<str>>(
        &mut self,
        sources: &[T],
    ) -> Result<Vec<LoadRequest>, GalleryError> {
        self.require_admin()?;
        if sources.is_empty() {
            return Ok(vec![]);
        }
        let sources: Vec<ImageSource> = sources.iter().map(ImageSource::parse).collect();
        let mut requests = Vec::with_capacity(self.frames.len());
        for (i, frame) in self.frames.iter_mut().enumerate() {
            let source = sources[i % sources.len()].clone();
            frame.placard = Placard::from_source(&source);
            let generation = frame.bind_image(source.clone());
            requests.push(LoadRequest {
                frame_index: i,
                generation,
                source,
            });
        }
        log::info!(
            "Assigned {} images across {} frames.",
            sources.len(),
            self.frames.len()
        );
        Ok(requests)
    }

    /// Records a finished load. Returns false if the frame has moved on to a
    /// different image since the load was requested.
    pub fn apply_loaded(&mut self, loaded: &LoadedTexture) -> bool {
        let Some(frame) = self.frames.get_mut(loaded.frame_index) else {
            log::warn!("Got a texture for nonexistent frame #{}.", loaded.frame_index);
            return false;
        };
        if frame.generation != loaded.generation {
            log::debug!(
                "Dropping stale texture for frame #{} (generation {} != {}).",
                loaded.frame_index,
                loaded.generation,
                frame.generation
            );
            return false;
        }
        frame.texture = match &loaded.texture.origin {
            TextureOrigin::Loaded => {
                let (width, height) = loaded.texture.image.dimensions();
                TextureStatus::Loaded { width, height }
            }
            TextureOrigin::Placeholder { reason } => TextureStatus::Placeholder {
                reason: reason.clone(),
            },
        };
        true
    }

    /// Status line for the host to show, if any frame failed to load.
    pub fn status(&self) -> Option<String> {
        let failed = self
            .frames
            .iter()
            .filter(|frame| matches!(frame.texture, TextureStatus::Placeholder { .. }))
            .count();
        if failed == 0 {
            None
        } else {
            Some(format!("{failed} of {} images could not be loaded.", self.frames.len()))
        }
    }

    /// Replaces placards with whatever was saved for each slot.
    pub fn restore_placards(&mut self, storage: &LocalStorage) -> Result<usize> {
        let mut restored = 0;
        for frame in self.frames.iter_mut() {
            let placement = &frame.placement;
            if let Some(placard) = load_placard(storage, placement.wall, placement.wall_index)? {
                frame.placard = placard;
                restored += 1;
            }
        }
        log::debug!("Restored {restored} placards.");
        Ok(restored)
    }

    pub fn save_placards(&self, storage: &mut LocalStorage) -> Result<()> {
        for frame in &self.frames {
            let placement = &frame.placement;
            save_placard(storage, placement.wall, placement.wall_index, &frame.placard)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::{GalleryConfig, WallFramesConfig},
        frame::TextureStatus,
        gallery_wall::WallName,
        image::{placeholder_image, ImageSource, Texture, TextureOrigin},
        image_loader::LoadedTexture,
        local_storage::LocalStorage,
        placard::Placard,
    };

    use super::{Gallery, GalleryError, GalleryMode};

    fn small_config() -> GalleryConfig {
        let mut config = GalleryConfig::default();
        config.frames.walls = vec![
            WallFramesConfig {
                wall: WallName::Front,
                rows: 1,
                cols: 3,
                gap_x: 1.0,
                gap_y: 0.0,
                y_offset: 0.0,
            },
            WallFramesConfig {
                wall: WallName::Back,
                rows: 1,
                cols: 2,
                gap_x: 1.0,
                gap_y: 0.0,
                y_offset: 0.0,
            },
        ];
        config.frames.default_image = None;
        config
    }

    fn loaded(frame_index: usize, generation: u64, origin: TextureOrigin) -> LoadedTexture {
        LoadedTexture {
            request_id: 1,
            frame_index,
            generation,
            texture: Texture {
                image: placeholder_image(),
                origin,
            },
        }
    }

    #[test]
    fn test_new_gallery_binds_default_image() {
        let gallery = Gallery::new(GalleryConfig::default()).unwrap();
        assert_eq!(gallery.frames().len(), 28);
        assert_eq!(gallery.mode(), GalleryMode::Admin);
        let requests = gallery.initial_load_requests();
        assert_eq!(requests.len(), 28);
        assert_eq!(requests[0].source, ImageSource::parse("assets/one.jpg"));

        let gallery = Gallery::new(small_config()).unwrap();
        assert!(gallery.initial_load_requests().is_empty());
        assert_eq!(gallery.frame(0).unwrap().texture, TextureStatus::Empty);
    }

    #[test]
    fn test_bad_layout_is_a_config_error() {
        let mut config = small_config();
        config.frames.walls[0].cols = 0;
        assert!(Gallery::new(config).is_err());
    }

    #[test]
    fn test_round_robin_assignment() {
        let mut gallery = Gallery::new(small_config()).unwrap();
        assert!(gallery
            .assign_images_round_robin::<&str>(&[])
            .unwrap()
            .is_empty());
        assert_eq!(gallery.frame(0).unwrap().image, None);

        let requests = gallery
            .assign_images_round_robin(&[
                "https://example.com/one.png",
                "https://example.com/Two%20Birds.jpg",
            ])
            .unwrap();
        assert_eq!(requests.len(), 5);
        let urls: Vec<String> = requests
            .iter()
            .map(|request| request.source.to_string())
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/one.png",
                "https://example.com/Two%20Birds.jpg",
                "https://example.com/one.png",
                "https://example.com/Two%20Birds.jpg",
                "https://example.com/one.png",
            ]
        );
        assert_eq!(gallery.frame(1).unwrap().placard.title, "Two Birds");
        assert_eq!(gallery.frame(4).unwrap().placard.title, "one");
        assert_eq!(gallery.frame(4).unwrap().texture, TextureStatus::Pending);
    }

    #[test]
    fn test_stale_loads_are_ignored() {
        let mut gallery = Gallery::new(small_config()).unwrap();
        let first = gallery
            .set_frame_image(0, ImageSource::parse("a.png"))
            .unwrap();
        let second = gallery
            .set_frame_image(0, ImageSource::parse("b.png"))
            .unwrap();
        assert!(!gallery.apply_loaded(&loaded(0, first.generation, TextureOrigin::Loaded)));
        assert_eq!(gallery.frame(0).unwrap().texture, TextureStatus::Pending);

        assert!(gallery.apply_loaded(&loaded(0, second.generation, TextureOrigin::Loaded)));
        assert_eq!(
            gallery.frame(0).unwrap().texture,
            TextureStatus::Loaded {
                width: 256,
                height: 256
            }
        );
        assert_eq!(gallery.status(), None);

        let third = gallery
            .set_frame_image(1, ImageSource::parse("c.png"))
            .unwrap();
        assert!(gallery.apply_loaded(&loaded(
            1,
            third.generation,
            TextureOrigin::Placeholder {
                reason: "nope".into()
            }
        )));
        assert_eq!(
            gallery.status(),
            Some("1 of 5 images could not be loaded.".into())
        );
        assert!(!gallery.apply_loaded(&loaded(99, 1, TextureOrigin::Loaded)));
    }

    #[test]
    fn test_view_mode_is_read_only() {
        let mut gallery = Gallery::new(small_config()).unwrap();
        gallery.select_frame(0).unwrap();
        gallery.toggle_edit_mode().unwrap();
        assert_eq!(gallery.toggle_mode(), GalleryMode::View);
        assert!(!gallery.is_edit_mode());

        assert_eq!(
            gallery.assign_images_round_robin(&["a.png"]).unwrap_err(),
            GalleryError::NotInAdminMode
        );
        assert_eq!(
            gallery.set_placard(0, Placard::default()).unwrap_err(),
            GalleryError::NotInAdminMode
        );
        assert_eq!(gallery.flip_h().unwrap_err(), GalleryError::NotInAdminMode);
        assert_eq!(
            gallery.toggle_edit_mode().unwrap_err(),
            GalleryError::NotInAdminMode
        );
        // Selecting (highlighting) still works for visitors.
        gallery.select_frame(2).unwrap();
        assert_eq!(gallery.active_frame(), Some(2));

        assert_eq!(gallery.toggle_mode(), GalleryMode::Admin);
        gallery.set_placard(0, Placard::new("Hi", "")).unwrap();
        assert_eq!(gallery.frame(0).unwrap().placard.title, "Hi");
    }

    #[test]
    fn test_editing_the_active_frame() {
        let mut gallery = Gallery::new(small_config()).unwrap();
        assert_eq!(gallery.flip_h().unwrap_err(), GalleryError::NoActiveFrame);
        assert_eq!(
            gallery.select_frame(17).unwrap_err(),
            GalleryError::NoSuchFrame {
                index: 17,
                count: 5
            }
        );

        gallery.select_frame(1).unwrap();
        gallery.flip_h().unwrap();
        gallery.flip_v().unwrap();
        assert_eq!(
            gallery.frame(1).unwrap().texture_state.uv_scale(),
            (-1.0, -1.0)
        );

        // Panning and zooming need edit mode.
        assert_eq!(gallery.zoom(1.0).unwrap_err(), GalleryError::NotInEditMode);
        assert_eq!(
            gallery.begin_pan(0.0, 0.0).unwrap_err(),
            GalleryError::NotInEditMode
        );
        assert!(gallery.toggle_edit_mode().unwrap());

        gallery.zoom(1.0).unwrap();
        assert!((gallery.frame(1).unwrap().texture_state.scale - 1.08).abs() < 1e-9);

        // Moving without pressing first does nothing.
        gallery.pan_to(100.0, 100.0, 100.0, 100.0).unwrap();
        assert_eq!(gallery.frame(1).unwrap().texture_state.u_offset, 0.0);

        gallery.begin_pan(10.0, 10.0).unwrap();
        assert!(gallery.is_panning());
        gallery.pan_to(60.0, 35.0, 100.0, 100.0).unwrap();
        gallery.end_pan();
        assert!(!gallery.is_panning());
        let state = gallery.frame(1).unwrap().texture_state;
        assert!((state.u_offset - 0.5).abs() < 1e-9);
        assert!((state.v_offset + 0.25).abs() < 1e-9);

        // Other frames are untouched.
        assert_eq!(gallery.frame(0).unwrap().texture_state.scale, 1.0);
    }

    #[test]
    fn test_clear_selection_ends_pan() {
        let mut gallery = Gallery::new(small_config()).unwrap();
        gallery.select_frame(2).unwrap();
        gallery.toggle_edit_mode().unwrap();
        gallery.begin_pan(0.0, 0.0).unwrap();
        assert!(gallery.is_panning());

        gallery.clear_selection();
        assert_eq!(gallery.active_frame(), None);
        assert!(!gallery.is_panning());
        // With nothing selected, moving the pointer is a no-op.
        gallery.pan_to(50.0, 50.0, 100.0, 100.0).unwrap();
        assert_eq!(gallery.frame(2).unwrap().texture_state.u_offset, 0.0);
        assert_eq!(gallery.zoom(1.0).unwrap_err(), GalleryError::NoActiveFrame);
        // Edit mode itself is left alone.
        assert!(gallery.is_edit_mode());
    }

    #[test]
    fn test_switching_to_view_mode_ends_pan() {
        let mut gallery = Gallery::new(small_config()).unwrap();
        gallery.select_frame(0).unwrap();
        gallery.toggle_edit_mode().unwrap();
        gallery.begin_pan(10.0, 10.0).unwrap();
        assert!(gallery.is_panning());

        gallery.set_mode(GalleryMode::View);
        assert!(!gallery.is_panning());
        assert!(!gallery.is_edit_mode());
        assert_eq!(gallery.active_frame(), Some(0));
        gallery.pan_to(60.0, 60.0, 100.0, 100.0).unwrap();
        assert_eq!(gallery.frame(0).unwrap().texture_state.u_offset, 0.0);

        // Coming back to admin mode doesn't resume the old pan.
        gallery.set_mode(GalleryMode::Admin);
        assert!(!gallery.is_panning());
        assert!(!gallery.is_edit_mode());
    }

    #[test]
    fn test_placards_survive_a_reload() {
        let mut storage = LocalStorage::open_in_memory().unwrap();
        let mut gallery = Gallery::new(small_config()).unwrap();
        gallery
            .set_placard(3, Placard::new("Back wall, first", "https://example.com"))
            .unwrap();
        gallery.save_placards(&mut storage).unwrap();

        let mut reloaded = Gallery::new(small_config()).unwrap();
        assert_eq!(reloaded.restore_placards(&storage).unwrap(), 5);
        assert_eq!(
            reloaded.frame(3).unwrap().placard,
            Placard::new("Back wall, first", "https://example.com")
        );
        assert_eq!(reloaded.frame(3).unwrap().placement.wall, WallName::Back);
        assert_eq!(reloaded.frame(3).unwrap().placement.wall_index, 0);
        assert_eq!(reloaded.frame(0).unwrap().placard, Placard::default());
    }
}
