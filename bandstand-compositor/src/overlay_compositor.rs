//! Overlay compositor for the photo booth

use crate::{CapturedComposite, Error, OverlayAsset, Result, VideoFrameSource};
use bandstand_core::{
    default_variants, validate_aspect_ratio, OverlayGeometry, OverlayState, OverlayVariant,
};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// Relative difference between aspect ratios worth a warning at capture time
const ASPECT_TOLERANCE: f64 = 0.01;

/// An overlay's box in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Compositor holding one overlay per variant, with one of them active
#[derive(Debug, Clone)]
pub struct OverlayCompositor {
    overlays: Vec<OverlayState>,
    active: usize,
    frame_aspect_ratio: f64,
}

impl OverlayCompositor {
    /// Creates a compositor with every variant at its default placement.
    /// The first variant starts active.
    pub fn new(variants: Vec<OverlayVariant>, frame_aspect_ratio: f64) -> Result<Self> {
        if variants.is_empty() {
            return Err(Error::NoVariants);
        }
        let frame_aspect_ratio = validate_aspect_ratio(frame_aspect_ratio)?;
        let overlays = variants
            .into_iter()
            .map(|variant| OverlayState::new(variant, frame_aspect_ratio))
            .collect::<bandstand_core::Result<Vec<_>>>()?;

        Ok(Self {
            overlays,
            active: 0,
            frame_aspect_ratio,
        })
    }

    /// Creates a compositor with the stock "front" and "back" variants
    pub fn with_default_variants(frame_aspect_ratio: f64) -> Result<Self> {
        Self::new(default_variants(), frame_aspect_ratio)
    }

    fn index_of(&self, key: &str) -> Result<usize> {
        self.overlays
            .iter()
            .position(|o| o.variant().key == key)
            .ok_or_else(|| bandstand_core::Error::UnknownVariant(key.to_string()).into())
    }

    /// Makes the named variant the one that mutations and captures apply to.
    ///
    /// A drag held on the outgoing variant is released, since its pointer
    /// can no longer reach it through the forwarding methods.
    pub fn select_variant(&mut self, key: &str) -> Result<()> {
        let index = self.index_of(key)?;
        if index != self.active {
            if let Some(pointer_id) = self.active_mut().cancel_drag() {
                tracing::debug!(
                    pointer_id,
                    variant = %self.active().variant().key,
                    "released drag on variant switch"
                );
            }
            self.active = index;
        }
        Ok(())
    }

    /// State of the selected variant
    pub fn active(&self) -> &OverlayState {
        &self.overlays[self.active]
    }

    fn active_mut(&mut self) -> &mut OverlayState {
        &mut self.overlays[self.active]
    }

    /// State of any variant by key
    pub fn overlay(&self, key: &str) -> Option<&OverlayState> {
        self.overlays.iter().find(|o| o.variant().key == key)
    }

    /// States of every variant, in configuration order
    pub fn overlays(&self) -> &[OverlayState] {
        &self.overlays
    }

    /// Geometry of the active variant
    pub fn geometry(&self) -> OverlayGeometry {
        self.active().geometry()
    }

    /// Frame width over frame height every variant is clamped against
    pub fn frame_aspect_ratio(&self) -> f64 {
        self.frame_aspect_ratio
    }

    /// Resizes the selected variant, see [`OverlayState::set_width_percent`]
    pub fn set_width_percent(&mut self, width_percent: f64) -> OverlayGeometry {
        self.active_mut().set_width_percent(width_percent)
    }

    /// Moves the selected variant, see [`OverlayState::set_center`]
    pub fn set_center(&mut self, x_percent: f64, y_percent: f64) -> OverlayGeometry {
        self.active_mut().set_center(x_percent, y_percent)
    }

    /// Returns `false` when another pointer already owns the drag
    pub fn begin_drag(&mut self, pointer_id: u32, x_percent: f64, y_percent: f64) -> bool {
        self.active_mut().begin_drag(pointer_id, x_percent, y_percent)
    }

    /// Moves the selected variant with its owning pointer
    pub fn drag_to(&mut self, pointer_id: u32, x_percent: f64, y_percent: f64) -> Option<OverlayGeometry> {
        self.active_mut().drag_to(pointer_id, x_percent, y_percent)
    }

    /// Releases the selected variant's drag if `pointer_id` owns it
    pub fn end_drag(&mut self, pointer_id: u32) -> bool {
        self.active_mut().end_drag(pointer_id)
    }

    /// Restores a variant's default placement against the current frame shape
    pub fn reset_to_default(&mut self, key: &str) -> Result<OverlayGeometry> {
        let index = self.index_of(key)?;
        Ok(self.overlays[index].reset_to_default())
    }

    /// Re-clamps every variant for a new frame shape. Widths are kept.
    pub fn on_frame_aspect_ratio_changed(&mut self, frame_aspect_ratio: f64) -> Result<()> {
        let frame_aspect_ratio = validate_aspect_ratio(frame_aspect_ratio)?;
        for overlay in &mut self.overlays {
            overlay.set_frame_aspect_ratio(frame_aspect_ratio)?;
        }
        self.frame_aspect_ratio = frame_aspect_ratio;
        tracing::debug!(frame_aspect_ratio, "frame aspect ratio changed");
        Ok(())
    }

    /// Convenience for a frame size change; ignored while the size is zero
    pub fn on_frame_resized(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.on_frame_aspect_ratio_changed(f64::from(width) / f64::from(height))
    }

    /// On-screen box of the active overlay, using the frame-derived height
    pub fn pixel_rect(&self, frame_width: u32, frame_height: u32) -> PixelRect {
        let geometry = self.geometry();
        let width = geometry.width_percent / 100.0 * f64::from(frame_width);
        let height = self.active().height_percent() / 100.0 * f64::from(frame_height);
        to_pixel_rect(&geometry, width, height, frame_width, frame_height)
    }

    /// Draws the current camera frame at native resolution, then bakes the
    /// active overlay in at its current geometry.
    ///
    /// The drawn height follows the decoded logo's own proportions. Clamping
    /// uses the variant's declared natural size, so the two agree only when
    /// the asset matches its variant.
    pub fn capture(&self, frame: &impl VideoFrameSource, overlay: &OverlayAsset) -> Result<CapturedComposite> {
        let (frame_width, frame_height) = frame.dimensions();
        if frame_width == 0 || frame_height == 0 {
            return Err(Error::SourceNotReady("video frame has no dimensions".to_string()));
        }
        let logo = overlay.image()?;

        let state = self.active();
        let variant = state.variant();
        let frame_aspect = f64::from(frame_width) / f64::from(frame_height);
        if (frame_aspect / self.frame_aspect_ratio - 1.0).abs() > ASPECT_TOLERANCE {
            tracing::warn!(
                captured = frame_aspect,
                tracked = self.frame_aspect_ratio,
                "captured frame shape differs from tracked aspect ratio"
            );
        }
        let logo_ratio = f64::from(logo.height()) / f64::from(logo.width());
        if (logo_ratio / variant.height_ratio() - 1.0).abs() > ASPECT_TOLERANCE {
            tracing::warn!(
                variant = %variant.key,
                asset = logo_ratio,
                declared = variant.height_ratio(),
                "overlay asset proportions differ from its variant"
            );
        }

        let mut canvas = RgbaImage::new(frame_width, frame_height);
        frame.draw_into(&mut canvas)?;

        let geometry = state.geometry();
        let width = (geometry.width_percent / 100.0 * f64::from(frame_width)).round().max(1.0);
        let height = (width * logo_ratio).round().max(1.0);
        let rect = to_pixel_rect(&geometry, width, height, frame_width, frame_height);

        let scaled = imageops::resize(logo, rect.width, rect.height, FilterType::Triangle);
        overlay_image(&mut canvas, &scaled, rect.x, rect.y);

        tracing::debug!(
            variant = %variant.key,
            frame_width,
            frame_height,
            x = rect.x,
            y = rect.y,
            width = rect.width,
            height = rect.height,
            "captured composite"
        );
        Ok(CapturedComposite::new(canvas, variant.key.clone()))
    }
}

fn to_pixel_rect(
    geometry: &OverlayGeometry,
    width: f64,
    height: f64,
    frame_width: u32,
    frame_height: u32,
) -> PixelRect {
    let center_x = geometry.center_x_percent / 100.0 * f64::from(frame_width);
    let center_y = geometry.center_y_percent / 100.0 * f64::from(frame_height);
    PixelRect {
        x: (center_x - width / 2.0).round() as i32,
        y: (center_y - height / 2.0).round() as i32,
        width: width.round().max(1.0) as u32,
        height: height.round().max(1.0) as u32,
    }
}

/// Alpha-blends `overlay` onto `base` with its top-left corner at `(x, y)`
fn overlay_image(base: &mut RgbaImage, overlay: &RgbaImage, x: i32, y: i32) {
    let base_width = base.width() as i32;
    let base_height = base.height() as i32;

    let src_x_start = 0.max(-x);
    let src_y_start = 0.max(-y);
    let src_x_end = (overlay.width() as i32).min(base_width - x);
    let src_y_end = (overlay.height() as i32).min(base_height - y);

    if src_x_start >= src_x_end || src_y_start >= src_y_end {
        return;
    }

    for src_y in src_y_start..src_y_end {
        for src_x in src_x_start..src_x_end {
            let dest_x = (x + src_x) as u32;
            let dest_y = (y + src_y) as u32;

            let top = *overlay.get_pixel(src_x as u32, src_y as u32);
            let bottom = *base.get_pixel(dest_x, dest_y);

            let alpha = f32::from(top[3]) / 255.0;
            let inv_alpha = 1.0 - alpha;
            let mix = |c: usize| {
                (f32::from(top[c]) * alpha + f32::from(bottom[c]) * inv_alpha).round() as u8
            };
            let out_alpha = (f32::from(top[3]) + f32::from(bottom[3]) * inv_alpha).round() as u8;
            let blended = Rgba([mix(0), mix(1), mix(2), out_alpha]);

            base.put_pixel(dest_x, dest_y, blended);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandstand_core::SizeRange;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn badge() -> OverlayVariant {
        OverlayVariant::new(
            "badge",
            20,
            10,
            SizeRange::new(10.0, 50.0).unwrap(),
            OverlayGeometry::new(20.0, 50.0, 50.0),
        )
    }

    fn is_red(pixel: &Rgba<u8>) -> bool {
        pixel[0] > 250 && pixel[2] < 5
    }

    fn is_blue(pixel: &Rgba<u8>) -> bool {
        pixel[2] > 250 && pixel[0] < 5
    }

    #[test]
    fn test_capture_places_overlay() {
        let compositor = OverlayCompositor::new(vec![badge()], 2.0).unwrap();
        let frame = RgbaImage::from_pixel(200, 100, RED);
        let logo = OverlayAsset::from(RgbaImage::from_pixel(20, 10, BLUE));

        let composite = compositor.capture(&frame, &logo).unwrap();
        assert_eq!((composite.width(), composite.height()), (200, 100));
        assert_eq!(composite.variant(), "badge");

        // 40x20 overlay centered at (100, 50)
        let image = composite.image();
        assert!(is_blue(image.get_pixel(100, 50)));
        assert!(is_blue(image.get_pixel(81, 41)));
        assert!(is_blue(image.get_pixel(118, 58)));
        assert!(is_red(image.get_pixel(78, 50)));
        assert!(is_red(image.get_pixel(121, 50)));
        assert!(is_red(image.get_pixel(100, 38)));
        assert!(is_red(image.get_pixel(10, 10)));
    }

    #[test]
    fn test_capture_uses_asset_proportions() {
        let compositor = OverlayCompositor::new(vec![badge()], 2.0).unwrap();
        let frame = RgbaImage::from_pixel(200, 100, RED);
        // Square asset on a 2:1 variant draws 40x40, not 40x20
        let logo = OverlayAsset::from(RgbaImage::from_pixel(10, 10, BLUE));

        let composite = compositor.capture(&frame, &logo).unwrap();
        let image = composite.image();
        assert!(is_blue(image.get_pixel(100, 33)));
        assert!(is_blue(image.get_pixel(100, 66)));
        assert!(is_red(image.get_pixel(100, 27)));
    }

    #[test]
    fn test_transparent_overlay_keeps_frame() {
        let compositor = OverlayCompositor::new(vec![badge()], 2.0).unwrap();
        let frame = RgbaImage::from_pixel(200, 100, RED);
        let logo = OverlayAsset::from(RgbaImage::from_pixel(20, 10, Rgba([0, 0, 255, 0])));

        let composite = compositor.capture(&frame, &logo).unwrap();
        assert!(is_red(composite.image().get_pixel(100, 50)));
        assert_eq!(composite.image().get_pixel(100, 50)[3], 255);
    }

    #[test]
    fn test_capture_before_camera_ready() {
        let compositor = OverlayCompositor::with_default_variants(16.0 / 9.0).unwrap();
        let frame = RgbaImage::new(0, 0);
        let logo = OverlayAsset::from(RgbaImage::from_pixel(60, 24, BLUE));

        let result = compositor.capture(&frame, &logo);
        assert!(matches!(result, Err(Error::SourceNotReady(_))));
    }

    #[test]
    fn test_capture_with_failed_asset() {
        let compositor = OverlayCompositor::with_default_variants(16.0 / 9.0).unwrap();
        let frame = RgbaImage::from_pixel(160, 90, RED);
        let logo = OverlayAsset::Failed("truncated file".to_string());

        let result = compositor.capture(&frame, &logo);
        assert!(matches!(result, Err(Error::SourceNotReady(_))));
    }

    #[test]
    fn test_overlay_clipped_at_frame_edge() {
        let mut base = RgbaImage::from_pixel(10, 10, RED);
        let top = RgbaImage::from_pixel(4, 4, BLUE);
        overlay_image(&mut base, &top, -2, 8);
        assert_eq!(*base.get_pixel(0, 9), BLUE);
        assert_eq!(*base.get_pixel(1, 8), BLUE);
        assert_eq!(*base.get_pixel(2, 9), RED);
        assert_eq!(*base.get_pixel(0, 7), RED);

        // Entirely off-frame is a no-op
        overlay_image(&mut base, &top, 20, 20);
    }

    #[test]
    fn test_select_variant() {
        let mut compositor = OverlayCompositor::with_default_variants(4.0 / 3.0).unwrap();
        assert_eq!(compositor.active().variant().key, "front");

        compositor.select_variant("back").unwrap();
        assert_eq!(compositor.active().variant().key, "back");
        compositor.set_width_percent(45.0);
        assert_eq!(compositor.overlay("back").unwrap().geometry().width_percent, 45.0);
        assert_eq!(compositor.overlay("front").unwrap().geometry().width_percent, 32.0);

        assert!(matches!(
            compositor.select_variant("side"),
            Err(Error::Core(bandstand_core::Error::UnknownVariant(_)))
        ));
        assert!(matches!(OverlayCompositor::new(vec![], 1.0), Err(Error::NoVariants)));
    }

    #[test]
    fn test_aspect_change_reclamps_every_variant() {
        let mut compositor = OverlayCompositor::with_default_variants(9.0 / 16.0).unwrap();
        compositor.set_center(50.0, 97.0);
        compositor.select_variant("back").unwrap();
        compositor.set_center(50.0, 85.0);

        compositor.on_frame_resized(1920, 1080).unwrap();
        for overlay in compositor.overlays() {
            let geometry = overlay.geometry();
            let half_height = overlay.height_percent() / 2.0;
            assert!(geometry.center_y_percent + half_height <= 100.0 + 1e-9);
        }
        assert_eq!(compositor.overlay("front").unwrap().geometry().width_percent, 32.0);
        assert_eq!(compositor.overlay("back").unwrap().geometry().width_percent, 36.0);

        // Zero-size frames are ignored, bad ratios rejected
        compositor.on_frame_resized(0, 1080).unwrap();
        assert!((compositor.frame_aspect_ratio() - 16.0 / 9.0).abs() < 1e-9);
        assert!(compositor.on_frame_aspect_ratio_changed(-1.0).is_err());
    }

    #[test]
    fn test_drag_and_reset_through_compositor() {
        let mut compositor = OverlayCompositor::with_default_variants(4.0 / 3.0).unwrap();
        assert!(compositor.begin_drag(3, 50.0, 80.0));
        assert!(!compositor.begin_drag(4, 10.0, 10.0));
        let geometry = compositor.drag_to(3, 40.0, 70.0).unwrap();
        assert!((geometry.center_x_percent - 40.0).abs() < 1e-9);
        assert!((geometry.center_y_percent - 72.0).abs() < 1e-9);
        assert!(compositor.end_drag(3));

        let geometry = compositor.reset_to_default("front").unwrap();
        assert_eq!(geometry, OverlayGeometry::new(32.0, 50.0, 82.0));
    }

    #[test]
    fn test_variant_switch_releases_drag() {
        let mut compositor = OverlayCompositor::with_default_variants(4.0 / 3.0).unwrap();
        assert!(compositor.begin_drag(1, 50.0, 80.0));

        compositor.select_variant("back").unwrap();
        assert!(!compositor.overlay("front").unwrap().is_dragging());
        assert!(!compositor.end_drag(1));

        // Flipping back, a different pointer can grab the overlay
        compositor.select_variant("front").unwrap();
        assert!(compositor.begin_drag(2, 50.0, 80.0));
        assert!(compositor.drag_to(2, 45.0, 75.0).is_some());
        assert_eq!(compositor.drag_to(1, 10.0, 10.0), None);
    }

    #[test]
    fn test_reselecting_same_variant_keeps_drag() {
        let mut compositor = OverlayCompositor::with_default_variants(4.0 / 3.0).unwrap();
        assert!(compositor.begin_drag(1, 50.0, 80.0));
        compositor.select_variant("front").unwrap();
        assert!(compositor.active().is_dragging());
        assert!(compositor.end_drag(1));
    }

    #[test]
    fn test_pixel_rect_uses_frame_height() {
        let compositor = OverlayCompositor::new(vec![badge()], 2.0).unwrap();
        // height% = 20 * 2 * 0.5 = 20 → 20px of a 100px frame
        let rect = compositor.pixel_rect(200, 100);
        assert_eq!(rect, PixelRect { x: 80, y: 40, width: 40, height: 20 });
    }
}
