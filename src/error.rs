//! Failures the viewer reports instead of hanging or panicking.
//!
//! Plumbing errors (device setup, decoding, I/O) travel as `anyhow::Error`.
//! [`ViewerError`] covers the cases the viewer itself detects and surfaces
//! in the log while it keeps the loading overlay up.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewerError {
    /// A manifest entry could not be fetched or decoded.
    #[error("asset {url} could not be loaded: {reason}")]
    AssetFailed { url: String, reason: String },

    /// The model requires a glTF extension this loader cannot decode.
    #[error("asset {url} requires the unsupported glTF extension {extension}")]
    UnsupportedExtension { url: String, extension: String },

    /// The model has no direct child with the expected name.
    #[error("the loaded model has no node named {name:?}")]
    MissingNode { name: String },

    #[error("loading did not complete within {0:?}")]
    LoadTimedOut(Duration),

    #[error("{value:?} is not a #rrggbb colour")]
    InvalidColour { value: String },
}
