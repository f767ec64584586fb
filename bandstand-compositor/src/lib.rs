//! Bandstand Compositor Library
//!
//! This library keeps the photo booth's logo overlays positioned over a live
//! camera frame and bakes the active overlay into a captured still.

pub mod composite;
pub mod frame_source;
pub mod overlay_asset;
pub mod overlay_compositor;

pub use composite::CapturedComposite;
pub use frame_source::VideoFrameSource;
pub use overlay_asset::OverlayAsset;
pub use overlay_compositor::{OverlayCompositor, PixelRect};

/// Result type for bandstand-compositor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for bandstand-compositor operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Bandstand core error: {0}")]
    Core(#[from] bandstand_core::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Source not ready: {0}")]
    SourceNotReady(String),

    #[error("No overlay variants configured")]
    NoVariants,
}
