//! Overlay geometry for the photo booth
//!
//! Geometry is kept in percentages of the frame so the same placement stays
//! valid across camera resolutions and orientation changes. Height is never
//! stored; it is derived from the width, the frame aspect ratio and the
//! overlay's natural proportions.

use crate::{Error, Result};

/// Center used when an overlay is larger than the frame along an axis
const FRAME_MIDPOINT: f64 = 50.0;

/// Allowed overlay width, in percent of the frame width
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeRange {
    min: f64,
    max: f64,
}

impl SizeRange {
    /// Creates a range with `0 < min <= max <= 100`
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !(min > 0.0 && min <= max && max <= 100.0) {
            return Err(Error::InvalidSizeRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Smallest allowed width
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest allowed width
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Snaps a width into the range; NaN snaps to `min`
    pub fn clamp(&self, width_percent: f64) -> f64 {
        if width_percent.is_nan() {
            return self.min;
        }
        width_percent.clamp(self.min, self.max)
    }
}

/// Position and size of an overlay over the frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayGeometry {
    /// Width as a percentage of the frame width
    pub width_percent: f64,
    /// Center as a percentage of the frame width
    pub center_x_percent: f64,
    /// Center as a percentage of the frame height
    pub center_y_percent: f64,
}

impl OverlayGeometry {
    /// Creates a geometry; nothing is clamped until it meets a variant
    pub fn new(width_percent: f64, center_x_percent: f64, center_y_percent: f64) -> Self {
        Self {
            width_percent,
            center_x_percent,
            center_y_percent,
        }
    }
}

/// A named logo configuration with its own default placement and size range
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayVariant {
    pub key: String,
    /// Natural pixel width of the logo asset
    pub natural_width: u32,
    /// Natural pixel height of the logo asset
    pub natural_height: u32,
    pub size_range: SizeRange,
    pub default_geometry: OverlayGeometry,
}

impl OverlayVariant {
    /// Creates a variant; zero natural dimensions are treated as one pixel
    pub fn new(
        key: impl Into<String>,
        natural_width: u32,
        natural_height: u32,
        size_range: SizeRange,
        default_geometry: OverlayGeometry,
    ) -> Self {
        Self {
            key: key.into(),
            natural_width: natural_width.max(1),
            natural_height: natural_height.max(1),
            size_range,
            default_geometry,
        }
    }

    /// Natural height over natural width
    pub fn height_ratio(&self) -> f64 {
        f64::from(self.natural_height) / f64::from(self.natural_width)
    }

    /// Derived height in percent of the frame height.
    ///
    /// `frame_aspect_ratio` is frame width over frame height.
    pub fn height_percent(&self, width_percent: f64, frame_aspect_ratio: f64) -> f64 {
        width_percent * frame_aspect_ratio * self.height_ratio()
    }

    /// Largest width whose derived height still fits the frame, kept inside
    /// the size range. Never below `min`, even if `min` itself overflows.
    pub fn max_fitting_width(&self, frame_aspect_ratio: f64) -> f64 {
        let fitting = 100.0 / (frame_aspect_ratio * self.height_ratio());
        fitting.min(self.size_range.max()).max(self.size_range.min())
    }

    /// Clamps width into the size range and down to the largest width that
    /// fits the frame, then keeps the box on-frame
    pub fn clamp(&self, geometry: OverlayGeometry, frame_aspect_ratio: f64) -> OverlayGeometry {
        let width_percent = self
            .size_range
            .clamp(geometry.width_percent)
            .min(self.max_fitting_width(frame_aspect_ratio));
        self.clamp_center(
            OverlayGeometry {
                width_percent,
                ..geometry
            },
            frame_aspect_ratio,
        )
    }

    /// Keeps the box on-frame without shrinking the width to fit.
    ///
    /// An overlay taller than the frame is pinned to the frame's vertical
    /// midpoint instead.
    pub fn clamp_center(&self, geometry: OverlayGeometry, frame_aspect_ratio: f64) -> OverlayGeometry {
        let width_percent = self.size_range.clamp(geometry.width_percent);
        let half_width = width_percent / 2.0;
        let half_height = self.height_percent(width_percent, frame_aspect_ratio) / 2.0;

        OverlayGeometry {
            width_percent,
            center_x_percent: clamp_axis(geometry.center_x_percent, half_width),
            center_y_percent: clamp_axis(geometry.center_y_percent, half_height),
        }
    }
}

/// Keeps `[center - half, center + half]` inside `[0, 100]`
fn clamp_axis(center: f64, half_extent: f64) -> f64 {
    if half_extent >= FRAME_MIDPOINT {
        tracing::warn!(half_extent, "overlay exceeds the frame, centering it");
        return FRAME_MIDPOINT;
    }
    if center.is_nan() {
        return FRAME_MIDPOINT;
    }
    center.clamp(half_extent, 100.0 - half_extent)
}

/// Checks a frame aspect ratio (width over height)
pub fn validate_aspect_ratio(frame_aspect_ratio: f64) -> Result<f64> {
    if frame_aspect_ratio.is_finite() && frame_aspect_ratio > 0.0 {
        Ok(frame_aspect_ratio)
    } else {
        Err(Error::InvalidAspectRatio(frame_aspect_ratio))
    }
}

/// The stock logo variants: a wide wordmark for the front camera and a
/// square emblem for the back camera
pub fn default_variants() -> Vec<OverlayVariant> {
    vec![
        OverlayVariant::new(
            "front",
            600,
            240,
            SizeRange { min: 18.0, max: 48.0 },
            OverlayGeometry::new(32.0, 50.0, 82.0),
        ),
        OverlayVariant::new(
            "back",
            500,
            500,
            SizeRange { min: 20.0, max: 50.0 },
            OverlayGeometry::new(36.0, 50.0, 50.0),
        ),
    ]
}

/// Ownership of an in-progress drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub pointer_id: u32,
    /// Overlay center minus pointer position at grab time
    offset_x: f64,
    offset_y: f64,
}

impl DragSession {
    /// Starts a drag, remembering where on the overlay the pointer grabbed it
    pub fn begin(pointer_id: u32, pointer_x: f64, pointer_y: f64, geometry: &OverlayGeometry) -> Self {
        Self {
            pointer_id,
            offset_x: geometry.center_x_percent - pointer_x,
            offset_y: geometry.center_y_percent - pointer_y,
        }
    }

    /// Whether `pointer_id` is the pointer holding this drag
    pub fn owns(&self, pointer_id: u32) -> bool {
        self.pointer_id == pointer_id
    }

    /// Center the overlay should move to for the given pointer position
    pub fn target(&self, pointer_x: f64, pointer_y: f64) -> (f64, f64) {
        (pointer_x + self.offset_x, pointer_y + self.offset_y)
    }
}

/// Live geometry of one overlay variant on the current frame
#[derive(Debug, Clone)]
pub struct OverlayState {
    variant: OverlayVariant,
    geometry: OverlayGeometry,
    frame_aspect_ratio: f64,
    drag: Option<DragSession>,
}

impl OverlayState {
    /// Creates the state at the variant's default placement
    pub fn new(variant: OverlayVariant, frame_aspect_ratio: f64) -> Result<Self> {
        let frame_aspect_ratio = validate_aspect_ratio(frame_aspect_ratio)?;
        let geometry = variant.clamp(variant.default_geometry, frame_aspect_ratio);
        Ok(Self {
            variant,
            geometry,
            frame_aspect_ratio,
            drag: None,
        })
    }

    /// The variant this state places
    pub fn variant(&self) -> &OverlayVariant {
        &self.variant
    }

    /// Current clamped geometry
    pub fn geometry(&self) -> OverlayGeometry {
        self.geometry
    }

    /// Frame width over frame height the geometry is clamped against
    pub fn frame_aspect_ratio(&self) -> f64 {
        self.frame_aspect_ratio
    }

    /// Derived height in percent of the frame height
    pub fn height_percent(&self) -> f64 {
        self.variant
            .height_percent(self.geometry.width_percent, self.frame_aspect_ratio)
    }

    /// Whether some pointer currently owns the drag
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Sets the width, clamped to the size range and to what fits the frame,
    /// then keeps the box on-frame
    pub fn set_width_percent(&mut self, width_percent: f64) -> OverlayGeometry {
        self.apply(OverlayGeometry {
            width_percent,
            ..self.geometry
        })
    }

    /// Moves the center, clamped so the box stays on-frame
    pub fn set_center(&mut self, x_percent: f64, y_percent: f64) -> OverlayGeometry {
        self.apply_position(OverlayGeometry {
            center_x_percent: x_percent,
            center_y_percent: y_percent,
            ..self.geometry
        })
    }

    /// Grabs the overlay with a pointer.
    ///
    /// Returns `false` and leaves the current drag alone when another pointer
    /// already owns it.
    pub fn begin_drag(&mut self, pointer_id: u32, pointer_x: f64, pointer_y: f64) -> bool {
        if let Some(drag) = &self.drag {
            if !drag.owns(pointer_id) {
                tracing::debug!(
                    pointer_id,
                    owner = drag.pointer_id,
                    variant = %self.variant.key,
                    "ignoring second pointer"
                );
                return false;
            }
        }
        self.drag = Some(DragSession::begin(pointer_id, pointer_x, pointer_y, &self.geometry));
        true
    }

    /// Moves the overlay with its owning pointer; other pointers are ignored
    pub fn drag_to(&mut self, pointer_id: u32, pointer_x: f64, pointer_y: f64) -> Option<OverlayGeometry> {
        let drag = self.drag.filter(|drag| drag.owns(pointer_id))?;
        let (x, y) = drag.target(pointer_x, pointer_y);
        Some(self.set_center(x, y))
    }

    /// Drops the drag whatever pointer owns it, returning that pointer
    pub fn cancel_drag(&mut self) -> Option<u32> {
        self.drag.take().map(|drag| drag.pointer_id)
    }

    /// Releases the drag; a no-op for a pointer that does not own it
    pub fn end_drag(&mut self, pointer_id: u32) -> bool {
        match self.drag {
            Some(drag) if drag.owns(pointer_id) => {
                self.drag = None;
                true
            }
            _ => false,
        }
    }

    /// Restores the variant's default placement for the current frame shape
    pub fn reset_to_default(&mut self) -> OverlayGeometry {
        self.drag = None;
        self.apply(self.variant.default_geometry)
    }

    /// Re-clamps the stored placement for a new frame shape.
    ///
    /// Width is kept as is, so on a much wider frame the box can end up
    /// taller than the frame; it is then pinned to the vertical midpoint
    /// until the next width change or reset shrinks it to fit.
    pub fn set_frame_aspect_ratio(&mut self, frame_aspect_ratio: f64) -> Result<OverlayGeometry> {
        self.frame_aspect_ratio = validate_aspect_ratio(frame_aspect_ratio)?;
        Ok(self.apply_position(self.geometry))
    }

    fn apply(&mut self, geometry: OverlayGeometry) -> OverlayGeometry {
        let geometry = self.variant.clamp(geometry, self.frame_aspect_ratio);
        self.store(geometry)
    }

    fn apply_position(&mut self, geometry: OverlayGeometry) -> OverlayGeometry {
        let geometry = self.variant.clamp_center(geometry, self.frame_aspect_ratio);
        self.store(geometry)
    }

    fn store(&mut self, geometry: OverlayGeometry) -> OverlayGeometry {
        self.geometry = geometry;
        tracing::debug!(
            variant = %self.variant.key,
            width = self.geometry.width_percent,
            x = self.geometry.center_x_percent,
            y = self.geometry.center_y_percent,
            "overlay geometry updated"
        );
        self.geometry
    }
}
