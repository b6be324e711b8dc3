//! PAT codec error types

use std::io;
use thiserror::Error;

/// Errors that can occur while reading or writing .pat files
#[derive(Error, Debug)]
pub enum PatError {
    #[error("IO error: {0}")]
    Io(io::Error),

    #[error("Invalid signature: {0:?}")]
    InvalidSignature([u8; 4]),

    #[error("Unsupported PAT version: {0}")]
    UnsupportedVersion(u16),

    #[error("Unsupported pattern sub-version: {0}")]
    UnsupportedSubVersion(u32),

    #[error("Unsupported channel depth: {0}")]
    UnsupportedDepth(u16),

    #[error("Unexpected end of data")]
    UnexpectedEof,

    #[error("Pattern '{name}' is too large: {width}x{height}")]
    DimensionsTooLarge {
        name: String,
        width: u32,
        height: u32,
    },

    #[error("File contains no usable patterns")]
    NoPatterns,

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("String decoding error: {0}")]
    StringDecode(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl From<io::Error> for PatError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEof
        } else {
            Self::Io(err)
        }
    }
}

impl From<PatError> for String {
    fn from(err: PatError) -> Self {
        err.to_string()
    }
}
