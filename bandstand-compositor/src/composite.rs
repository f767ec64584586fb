//! Captured stills

use crate::Result;
use image::RgbaImage;
use std::path::Path;

/// A camera frame with an overlay baked in. Each capture produces a new one.
#[derive(Debug, Clone)]
pub struct CapturedComposite {
    image: RgbaImage,
    variant: String,
}

impl CapturedComposite {
    pub(crate) fn new(image: RgbaImage, variant: impl Into<String>) -> Self {
        Self {
            image,
            variant: variant.into(),
        }
    }

    /// The composited pixels
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Width in pixels, the camera frame's native width
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels, the camera frame's native height
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Key of the overlay variant baked into the image
    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// Takes the pixels out of the composite
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Saves the still, choosing the format from the file extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.image.save(path)?;
        Ok(())
    }
}
