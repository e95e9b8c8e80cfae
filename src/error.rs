use std::fmt;

use thiserror::Error;

/// Errors raised by the debug adapter transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// Reading from or writing to the adapter stream failed
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The adapter sent something that is not a valid protocol message
    #[error("malformed protocol message: {0}")]
    Malformed(String),

    /// A message body could not be (de)serialized
    #[error("protocol encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The adapter answered the request with `success: false`
    #[error("request '{command}' failed: {message}")]
    Request { command: String, message: String },

    /// The adapter did not answer in time
    #[error("request '{0}' timed out")]
    Timeout(String),

    /// The adapter closed the connection
    #[error("debug adapter disconnected")]
    Disconnected,
}

/// How a failure should be surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Configuration or data problem the user can fix
    Warning,
    /// Session or protocol failure
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Every way an image capture can fail
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("configuration incomplete: {} is empty", .0.join(", "))]
    ConfigIncomplete(Vec<&'static str>),

    #[error("imageClassName is not a valid type map: {0}")]
    InvalidTypeMap(String),

    #[error("no variable selected")]
    NoVariable,

    #[error("the debug session has no threads")]
    NoThreads,

    #[error("no thread with a stack frame found")]
    NoActiveThread,

    #[error("image type '{0}' is not defined in imageClassName")]
    UnknownType(String),

    #[error("field '{field}' is not numeric: {raw}")]
    FieldNotNumeric { field: String, raw: String },

    #[error("field '{field}' value {value} is out of range")]
    FieldOutOfRange { field: String, value: u64 },

    #[error("image data pointer has no memory reference: {0}")]
    NoMemoryReference(String),

    #[error("image data pointer is {0}")]
    InvalidMemoryReference(String),

    #[error("bits per pixel must be 8, 16, 24 or 32, got {0}")]
    InvalidBitDepth(u64),

    #[error("{width}x{height} image at {bits_per_pixel} bpp exceeds the {max} byte limit")]
    ImageTooLarge {
        width: u32,
        height: u32,
        bits_per_pixel: u32,
        max: u64,
    },

    #[error("image data length {actual} does not match expected {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("memory read failed: {0}")]
    MemoryReadFailed(String),

    #[error("not a readable raster file: {0}")]
    InvalidRaster(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to output image: {0}")]
    Output(#[from] std::io::Error),
}

impl ViewerError {
    /// Classify this error for display
    pub fn severity(&self) -> Severity {
        match self {
            ViewerError::ConfigIncomplete(_)
            | ViewerError::NoVariable
            | ViewerError::FieldNotNumeric { .. }
            | ViewerError::FieldOutOfRange { .. }
            | ViewerError::NoMemoryReference(_)
            | ViewerError::InvalidMemoryReference(_)
            | ViewerError::InvalidBitDepth(_)
            | ViewerError::ImageTooLarge { .. }
            | ViewerError::SizeMismatch { .. } => Severity::Warning,
            ViewerError::InvalidTypeMap(_)
            | ViewerError::NoThreads
            | ViewerError::NoActiveThread
            | ViewerError::UnknownType(_)
            | ViewerError::MemoryReadFailed(_)
            | ViewerError::InvalidRaster(_)
            | ViewerError::Transport(_)
            | ViewerError::Output(_) => Severity::Error,
        }
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;
