//! Video frame sources

use crate::Result;
use image::{DynamicImage, GenericImage, RgbaImage};

/// Anything that can hand over the current camera frame
pub trait VideoFrameSource {
    /// Current frame size in pixels; `(0, 0)` until the camera delivers a frame
    fn dimensions(&self) -> (u32, u32);

    /// Draws the current frame pixel-for-pixel at the canvas origin.
    /// The canvas has exactly [`Self::dimensions`].
    fn draw_into(&self, canvas: &mut RgbaImage) -> Result<()>;
}

impl VideoFrameSource for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        RgbaImage::dimensions(self)
    }

    fn draw_into(&self, canvas: &mut RgbaImage) -> Result<()> {
        canvas.copy_from(self, 0, 0)?;
        Ok(())
    }
}

impl VideoFrameSource for DynamicImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn draw_into(&self, canvas: &mut RgbaImage) -> Result<()> {
        canvas.copy_from(&self.to_rgba8(), 0, 0)?;
        Ok(())
    }
}
