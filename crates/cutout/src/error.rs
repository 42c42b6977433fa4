use thiserror::Error;

use crate::types::Region;

#[derive(Error, Debug)]
pub enum CutoutError {
    #[error("Invalid region {region}: no positive area inside a {width}x{height} image")]
    InvalidRegion {
        region: Region,
        width: u32,
        height: u32,
    },

    #[error("Invalid region proposal: {0}")]
    InvalidProposal(String),

    #[error("Unsupported image mode: {0}")]
    UnsupportedImageMode(String),

    #[error("Failed to decode or encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CutoutError>;
