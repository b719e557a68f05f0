use serde::Serialize;

use crate::{
    config::{DefaultFrame, GalleryConfig, WallFramesConfig},
    gallery_wall::{GalleryWall, WallName},
    geometry::{Size2, Vec3},
};

/// How far in front of the wall surface the frame's backing board sits.
pub const FRAME_BACK_OFFSET: f64 = 0.02;

/// How far in front of the wall surface the image plane sits.
pub const FRAME_IMAGE_OFFSET: f64 = 0.01;

pub const PLAQUE_OFFSET: f64 = 0.009;

/// Rounding slack allowed when checking whether frames fit exactly.
const FIT_TOLERANCE: f64 = 1e-9;

/// Placards are this fraction of the frame's outer width.
const PLAQUE_WIDTH_RATIO: f64 = 0.8;

/// The placard's center sits this many placard-heights below the frame's bottom edge.
const PLAQUE_DROP_RATIO: f64 = 0.8;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("{wall} wall: at least one frame is required")]
    NoFrames { wall: WallName },

    #[error("{wall} wall: usable span of {span} is narrower than a frame ({frame_width})")]
    SpanTooNarrow {
        wall: WallName,
        span: f64,
        frame_width: f64,
    },

    #[error("{wall} wall: {count} frames of width {frame_width} don't fit in a span of {span}")]
    FramesDoNotFit {
        wall: WallName,
        count: usize,
        frame_width: f64,
        span: f64,
    },

    #[error("{wall} wall: {rows} rows need {needed} of vertical space but the wall is {available} tall")]
    RowsDoNotFit {
        wall: WallName,
        rows: usize,
        needed: f64,
        available: f64,
    },

    #[error("{wall} wall is configured more than once")]
    DuplicateWall { wall: WallName },

    #[error("invalid frame geometry: {0}")]
    InvalidFrameGeometry(String),
}

/// A row of frames along one wall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallLayout {
    pub wall: WallName,
    pub span_min: f64,
    pub span_max: f64,
    pub count: usize,
    pub frame_width: f64,
    /// If the frames would end up closer together than this, spread them
    /// uniformly across the whole span instead.
    pub min_gap: f64,
}

impl WallLayout {
    /// The usable span of a wall, i.e. its full width minus `edge_margin`
    /// on both sides to keep frames out of the corners.
    pub fn for_wall(
        wall: &GalleryWall,
        edge_margin: f64,
        count: usize,
        frame_width: f64,
        min_gap: f64,
    ) -> Result<Self, LayoutError> {
        let half = wall.width / 2.0;
        if !edge_margin.is_finite() || edge_margin < 0.0 || edge_margin >= half {
            return Err(LayoutError::InvalidFrameGeometry(format!(
                "edge margin {edge_margin} doesn't leave any room on the {} wall",
                wall.name
            )));
        }
        Ok(WallLayout {
            wall: wall.name,
            span_min: -half + edge_margin,
            span_max: half - edge_margin,
            count,
            frame_width,
            min_gap,
        })
    }

    pub fn centers(&self) -> Result<Vec<f64>, LayoutError> {
        distribute_centers(
            self.wall,
            self.span_min,
            self.span_max,
            self.frame_width,
            self.count,
            self.min_gap,
        )
    }
}

/// Computes evenly spaced frame centers along `[span_min, span_max]`.
///
/// The leftover space after subtracting the frames' total width is shared
/// between the `count - 1` gaps, so the outermost frames touch the ends of
/// the span. If that gap would be smaller than `min_gap`, the span is split
/// into `count` equal cells and each frame is centered in its cell instead.
pub fn distribute_centers(
    wall: WallName,
    span_min: f64,
    span_max: f64,
    frame_width: f64,
    count: usize,
    min_gap: f64,
) -> Result<Vec<f64>, LayoutError> {
    if ![span_min, span_max, frame_width, min_gap]
        .iter()
        .all(|value| value.is_finite())
    {
        return Err(LayoutError::InvalidFrameGeometry(format!(
            "{wall} wall has non-finite layout parameters"
        )));
    }
    if frame_width <= 0.0 {
        return Err(LayoutError::InvalidFrameGeometry(format!(
            "frame width must be positive, got {frame_width}"
        )));
    }
    if count == 0 {
        return Err(LayoutError::NoFrames { wall });
    }
    let span = span_max - span_min;
    if span < frame_width - FIT_TOLERANCE {
        return Err(LayoutError::SpanTooNarrow {
            wall,
            span,
            frame_width,
        });
    }
    let leftover = span - frame_width * count as f64;
    if leftover < -FIT_TOLERANCE {
        return Err(LayoutError::FramesDoNotFit {
            wall,
            count,
            frame_width,
            span,
        });
    }
    if count == 1 {
        return Ok(vec![span_min + span / 2.0]);
    }
    let gap = leftover.max(0.0) / (count - 1) as f64;
    let centers = if gap < min_gap {
        let cell = span / count as f64;
        (0..count)
            .map(|i| span_min + cell * (i as f64 + 0.5))
            .collect()
    } else {
        let first = span_min + frame_width / 2.0;
        (0..count)
            .map(|i| first + (frame_width + gap) * i as f64)
            .collect()
    };
    Ok(centers)
}

/// Vertical centers for `rows` stacked rows of frames, top row first.
///
/// The block of rows is centered on the wall's center, then nudged up by
/// `y_offset`.
pub fn stack_rows(rows: usize, frame_height: f64, gap_y: f64, y_offset: f64) -> Vec<f64> {
    let total_height = block_height(rows, frame_height, gap_y);
    let top = total_height / 2.0 - frame_height / 2.0 + y_offset;
    (0..rows)
        .map(|row| top - (frame_height + gap_y) * row as f64)
        .collect()
}

fn block_height(rows: usize, frame_height: f64, gap_y: f64) -> f64 {
    if rows == 0 {
        return 0.0;
    }
    rows as f64 * frame_height + (rows - 1) as f64 * gap_y
}

/// Where a single frame (and its placard) goes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FramePlacement {
    /// Index across the whole gallery.
    pub index: usize,
    pub wall: WallName,
    /// Index among the frames on this wall, in row-major order.
    pub wall_index: usize,
    pub row: usize,
    pub col: usize,
    /// Wall-local center of the frame.
    pub local_x: f64,
    pub local_y: f64,
    pub position: Vec3,
    pub rotation_y: f64,
    pub outer_size: Size2,
    pub image_position: Vec3,
    pub image_size: Size2,
    pub plaque_position: Vec3,
    pub plaque_size: Size2,
}

fn validate_frame(frame: &DefaultFrame) -> Result<(), LayoutError> {
    let values = [
        frame.outer_width,
        frame.outer_height,
        frame.image_inset,
        frame.plaque_height,
    ];
    if !values.iter().all(|value| value.is_finite()) {
        return Err(LayoutError::InvalidFrameGeometry(
            "frame dimensions must be finite".into(),
        ));
    }
    if frame.outer_width <= 0.0 || frame.outer_height <= 0.0 {
        return Err(LayoutError::InvalidFrameGeometry(format!(
            "frame must have a positive size, got {}x{}",
            frame.outer_width, frame.outer_height
        )));
    }
    if frame.image_inset < 0.0
        || frame.image_inset * 2.0 >= frame.outer_width.min(frame.outer_height)
    {
        return Err(LayoutError::InvalidFrameGeometry(format!(
            "image inset {} leaves no room for the image",
            frame.image_inset
        )));
    }
    if frame.plaque_height < 0.0 {
        return Err(LayoutError::InvalidFrameGeometry(format!(
            "plaque height must not be negative, got {}",
            frame.plaque_height
        )));
    }
    Ok(())
}

fn plaque_drop(frame: &DefaultFrame) -> f64 {
    frame.outer_height / 2.0 + frame.plaque_height * PLAQUE_DROP_RATIO
}

fn layout_wall(
    wall: &GalleryWall,
    wall_config: &WallFramesConfig,
    frame: &DefaultFrame,
    edge_margin: f64,
    first_index: usize,
) -> Result<Vec<FramePlacement>, LayoutError> {
    if wall_config.rows == 0 {
        return Err(LayoutError::NoFrames { wall: wall.name });
    }
    if !wall_config.gap_y.is_finite() || wall_config.gap_y < 0.0 {
        return Err(LayoutError::InvalidFrameGeometry(format!(
            "{} wall: row gap must not be negative, got {}",
            wall.name, wall_config.gap_y
        )));
    }
    if !wall_config.y_offset.is_finite() {
        return Err(LayoutError::InvalidFrameGeometry(format!(
            "{} wall: vertical offset must be finite",
            wall.name
        )));
    }
    let wall_layout = WallLayout::for_wall(
        wall,
        edge_margin,
        wall_config.cols,
        frame.outer_width,
        wall_config.gap_x,
    )?;
    let xs = wall_layout.centers()?;
    let ys = stack_rows(
        wall_config.rows,
        frame.outer_height,
        wall_config.gap_y,
        wall_config.y_offset,
    );

    // Everything, including the placard under the bottom row, has to stay on the wall.
    let half_height = wall.height / 2.0;
    let top = ys[0] + frame.outer_height / 2.0;
    let bottom = ys[ys.len() - 1] - plaque_drop(frame) - frame.plaque_height / 2.0;
    if top > half_height || bottom < -half_height {
        return Err(LayoutError::RowsDoNotFit {
            wall: wall.name,
            rows: wall_config.rows,
            needed: top - bottom,
            available: wall.height,
        });
    }

    let image_size = Size2 {
        width: frame.outer_width - frame.image_inset * 2.0,
        height: frame.outer_height - frame.image_inset * 2.0,
    };
    let plaque_size = Size2 {
        width: frame.outer_width * PLAQUE_WIDTH_RATIO,
        height: frame.plaque_height,
    };
    let mut placements = Vec::with_capacity(xs.len() * ys.len());
    for (row, &y) in ys.iter().enumerate() {
        for (col, &x) in xs.iter().enumerate() {
            let wall_index = placements.len();
            let plaque_y = y - plaque_drop(frame);
            placements.push(FramePlacement {
                index: first_index + wall_index,
                wall: wall.name,
                wall_index,
                row,
                col,
                local_x: x,
                local_y: y,
                position: wall.to_world(x, y, FRAME_BACK_OFFSET),
                rotation_y: wall.rotation_y,
                outer_size: Size2 {
                    width: frame.outer_width,
                    height: frame.outer_height,
                },
                image_position: wall.to_world(x, y, FRAME_IMAGE_OFFSET),
                image_size,
                plaque_position: wall.to_world(x, plaque_y, PLAQUE_OFFSET),
                plaque_size,
            });
        }
    }
    Ok(placements)
}

/// Lays out every configured wall, in config order. Each wall may only be
/// configured once, since placards are keyed by wall and position.
pub fn layout_gallery(config: &GalleryConfig) -> Result<Vec<FramePlacement>, LayoutError> {
    let frame = &config.frames.default_frame;
    validate_frame(frame)?;
    let mut placements = vec![];
    let mut seen_walls = Vec::with_capacity(config.frames.walls.len());
    for wall_config in &config.frames.walls {
        if seen_walls.contains(&wall_config.wall) {
            return Err(LayoutError::DuplicateWall {
                wall: wall_config.wall,
            });
        }
        seen_walls.push(wall_config.wall);
        let wall = GalleryWall::for_room(wall_config.wall, &config.room);
        let mut wall_placements = layout_wall(
            &wall,
            wall_config,
            frame,
            config.frames.edge_margin,
            placements.len(),
        )?;
        log::debug!(
            "Placed {} frames on the {} wall.",
            wall_placements.len(),
            wall.name
        );
        placements.append(&mut wall_placements);
    }
    Ok(placements)
}

#[cfg(test)]
mod tests {
    use crate::{
        config::{GalleryConfig, WallFramesConfig},
        gallery_wall::WallName,
    };

    use super::{distribute_centers, layout_gallery, stack_rows, LayoutError};

    const FRONT: WallName = WallName::Front;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}");
        }
    }

    #[test]
    fn test_single_frame_is_centered() {
        assert_close(
            &distribute_centers(FRONT, -5.0, 15.0, 2.0, 1, 1.0).unwrap(),
            &[5.0],
        );
    }

    #[test]
    fn test_frames_touch_span_ends_when_gap_is_wide_enough() {
        // 30 of span, 3 frames of 6 = 12 left over, 6 per gap.
        assert_close(
            &distribute_centers(FRONT, -15.0, 15.0, 6.0, 3, 2.0).unwrap(),
            &[-12.0, 0.0, 12.0],
        );
    }

    #[test]
    fn test_narrow_gap_falls_back_to_even_split() {
        // Gap would be (30 - 24) / 3 = 2, which is under the minimum of 2.4.
        assert_close(
            &distribute_centers(FRONT, -15.0, 15.0, 6.0, 4, 2.4).unwrap(),
            &[-11.25, -3.75, 3.75, 11.25],
        );
    }

    #[test]
    fn test_degenerate_configuration_is_rejected() {
        assert_eq!(
            distribute_centers(FRONT, 0.0, 10.0, 2.0, 0, 0.0),
            Err(LayoutError::NoFrames { wall: FRONT })
        );
        assert!(matches!(
            distribute_centers(FRONT, 0.0, 1.0, 2.0, 1, 0.0),
            Err(LayoutError::SpanTooNarrow { .. })
        ));
        assert!(matches!(
            distribute_centers(FRONT, 0.0, 10.0, 3.0, 4, 0.0),
            Err(LayoutError::FramesDoNotFit { count: 4, .. })
        ));
        assert!(matches!(
            distribute_centers(FRONT, 0.0, f64::NAN, 3.0, 1, 0.0),
            Err(LayoutError::InvalidFrameGeometry(_))
        ));
        assert!(matches!(
            distribute_centers(FRONT, 0.0, 10.0, 0.0, 1, 0.0),
            Err(LayoutError::InvalidFrameGeometry(_))
        ));
    }

    #[test]
    fn test_exact_fit_is_allowed() {
        assert_close(
            &distribute_centers(FRONT, 0.0, 9.0, 3.0, 3, 1.0).unwrap(),
            &[1.5, 4.5, 7.5],
        );
    }

    #[test]
    fn test_stack_rows_works() {
        assert_close(&stack_rows(1, 4.0, 2.0, 0.0), &[0.0]);
        assert_close(&stack_rows(2, 4.0, 2.0, 0.5), &[3.5, -2.5]);
        assert_close(&stack_rows(3, 2.0, 1.0, 0.0), &[3.0, 0.0, -3.0]);
    }

    #[test]
    fn test_default_gallery_layout() {
        let placements = layout_gallery(&GalleryConfig::default()).unwrap();
        // 2x4 + 2x3 + 2x4 + 2x3
        assert_eq!(placements.len(), 28);
        for (i, placement) in placements.iter().enumerate() {
            assert_eq!(placement.index, i);
        }

        let front: Vec<_> = placements
            .iter()
            .filter(|p| p.wall == WallName::Front)
            .collect();
        assert_eq!(front.len(), 8);
        assert_eq!(front[0].wall_index, 0);
        assert_eq!(front[7].wall_index, 7);
        assert_eq!((front[5].row, front[5].col), (1, 1));
        assert!((front[0].local_x + 11.25).abs() < 1e-9);
        assert!((front[0].local_y - 3.5).abs() < 1e-9);
        // Top row sits at wall-center height (6) plus the local y.
        assert!((front[0].position.y - 9.5).abs() < 1e-9);
        assert!((front[0].position.z + 23.98).abs() < 1e-9);
        assert!((front[0].image_size.width - 5.5).abs() < 1e-9);
        assert!((front[0].plaque_size.width - 4.8).abs() < 1e-9);
        assert!((front[0].plaque_position.y - (9.5 - 2.0 - 0.4)).abs() < 1e-9);

        let right: Vec<_> = placements
            .iter()
            .filter(|p| p.wall == WallName::Right)
            .collect();
        assert_eq!(right.len(), 6);
        // Right wall is 48 deep, with a margin of 1 the span is 46 and the
        // gap is (46 - 18) / 2 = 14.
        let xs: Vec<f64> = right[0..3].iter().map(|p| p.local_x).collect();
        assert_close(&xs, &[-20.0, 0.0, 20.0]);
    }

    #[test]
    fn test_rows_that_overflow_the_wall_are_rejected() {
        let mut config = GalleryConfig::default();
        config.frames.walls = vec![WallFramesConfig {
            wall: WallName::Left,
            rows: 3,
            cols: 1,
            gap_x: 0.0,
            gap_y: 2.0,
            y_offset: 0.0,
        }];
        assert!(matches!(
            layout_gallery(&config),
            Err(LayoutError::RowsDoNotFit { rows: 3, .. })
        ));
    }

    #[test]
    fn test_zero_rows_is_rejected() {
        let mut config = GalleryConfig::default();
        config.frames.walls[1].rows = 0;
        assert_eq!(
            layout_gallery(&config),
            Err(LayoutError::NoFrames {
                wall: WallName::Right
            })
        );
    }

    #[test]
    fn test_bad_inset_is_rejected() {
        let mut config = GalleryConfig::default();
        config.frames.default_frame.image_inset = 2.0;
        assert!(matches!(
            layout_gallery(&config),
            Err(LayoutError::InvalidFrameGeometry(_))
        ));
    }

    #[test]
    fn test_duplicate_walls_are_rejected() {
        let mut config = GalleryConfig::default();
        let front = config.frames.walls[0];
        config.frames.walls.push(front);
        assert_eq!(
            layout_gallery(&config),
            Err(LayoutError::DuplicateWall {
                wall: WallName::Front
            })
        );
    }

    #[test]
    fn test_bad_edge_margin_is_rejected() {
        for edge_margin in [-5.0, f64::NAN, 16.0, 100.0] {
            let mut config = GalleryConfig::default();
            config.frames.edge_margin = edge_margin;
            assert!(
                matches!(
                    layout_gallery(&config),
                    Err(LayoutError::InvalidFrameGeometry(_))
                ),
                "edge margin {edge_margin} should be rejected"
            );
        }
    }

    #[test]
    fn test_frames_stay_inside_wall_with_wide_margin() {
        let mut config = GalleryConfig::default();
        config.frames.edge_margin = 3.0;
        let placements = layout_gallery(&config).unwrap();
        for placement in placements.iter().filter(|p| p.wall == WallName::Front) {
            assert!(placement.local_x - 3.0 >= -16.0 + 3.0 - 1e-9);
            assert!(placement.local_x + 3.0 <= 16.0 - 3.0 + 1e-9);
        }
    }

    #[test]
    fn test_bad_row_spacing_is_rejected() {
        let bad_walls = [
            (-3.0, 0.0),
            (f64::NAN, 0.0),
            (f64::INFINITY, 0.0),
            (2.0, f64::NAN),
            (2.0, f64::NEG_INFINITY),
        ];
        for (gap_y, y_offset) in bad_walls {
            let mut config = GalleryConfig::default();
            config.frames.walls = vec![WallFramesConfig {
                wall: WallName::Front,
                rows: 2,
                cols: 2,
                gap_x: 2.0,
                gap_y,
                y_offset,
            }];
            assert!(
                matches!(
                    layout_gallery(&config),
                    Err(LayoutError::InvalidFrameGeometry(_))
                ),
                "gap_y {gap_y} with y_offset {y_offset} should be rejected"
            );
        }
    }
}
