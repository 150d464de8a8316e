//! Error types for contact_dsp

use thiserror::Error;

use crate::pool::Handle;

#[derive(Error, Debug)]
pub enum SynthError {
    #[error("Capacity must be greater than zero")]
    ZeroCapacity,

    #[error("Collection is already allocated")]
    AlreadyAllocated,

    #[error("Handle {0} is not active")]
    InactiveHandle(Handle),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f32),

    #[error("Block size {requested} exceeds maximum {max}")]
    BlockSize { requested: usize, max: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Modal data error: {0}")]
    ModalData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown body: {0}")]
    UnknownBody(u32),

    #[error("Unknown surface: {0}")]
    UnknownSurface(u32),

    #[error("Unknown resonator: {0}")]
    UnknownResonator(u32),
}

pub type Result<T> = std::result::Result<T, SynthError>;
