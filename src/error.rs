use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop the walk-through before the first frame.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("shadow target for {0} has zero size")]
    ZeroSizedShadowTarget(String),
    #[error("unable to load texture {path}")]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("unable to load model {path}: {reason}")]
    Model { path: PathBuf, reason: String },
}
