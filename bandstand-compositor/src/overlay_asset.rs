//! Overlay logo decoding

use crate::{Error, Result};
use image::RgbaImage;
use std::path::Path;

/// A logo image as handed to the compositor
#[derive(Debug, Clone)]
pub enum OverlayAsset {
    /// Decoded RGBA pixels
    Ready(RgbaImage),
    /// Decoding failed; the reason is kept for the capture error
    Failed(String),
}

impl OverlayAsset {
    /// Decodes an encoded image (PNG, JPEG, WebP, ...) from memory
    pub fn decode(data: &[u8]) -> Self {
        match image::load_from_memory(data) {
            Ok(img) => Self::Ready(img.to_rgba8()),
            Err(e) => {
                tracing::warn!(error = %e, "overlay asset failed to decode");
                Self::Failed(e.to_string())
            }
        }
    }

    /// Decodes an image file
    pub fn open(path: impl AsRef<Path>) -> Self {
        match image::open(path.as_ref()) {
            Ok(img) => Self::Ready(img.to_rgba8()),
            Err(e) => {
                tracing::warn!(path = %path.as_ref().display(), error = %e, "overlay asset failed to load");
                Self::Failed(e.to_string())
            }
        }
    }

    /// Whether the asset holds non-empty decoded pixels
    pub fn is_ready(&self) -> bool {
        self.image().is_ok()
    }

    /// The decoded pixels, or "source not ready" for a failed or empty asset
    pub fn image(&self) -> Result<&RgbaImage> {
        match self {
            Self::Ready(img) if img.width() > 0 && img.height() > 0 => Ok(img),
            Self::Ready(_) => Err(Error::SourceNotReady("overlay asset is empty".to_string())),
            Self::Failed(reason) => Err(Error::SourceNotReady(format!(
                "overlay asset failed to decode: {}",
                reason
            ))),
        }
    }
}

impl From<RgbaImage> for OverlayAsset {
    fn from(img: RgbaImage) -> Self {
        Self::Ready(img)
    }
}
