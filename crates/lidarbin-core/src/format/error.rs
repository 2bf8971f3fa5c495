use std::fmt;

use thiserror::Error;

/// Structure being decoded when an error occurred.
///
/// Task and pulse positions are zero-based, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Magic,
    FileHeader,
    TaskHeader { task: usize },
    PulseHeader { task: usize, pulse: usize },
    PulsePayload { task: usize, pulse: usize },
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Magic => write!(f, "magic"),
            Stage::FileHeader => write!(f, "file header"),
            Stage::TaskHeader { task } => write!(f, "task {task} header"),
            Stage::PulseHeader { task, pulse } => {
                write!(f, "task {task} pulse {pulse} header")
            }
            Stage::PulsePayload { task, pulse } => {
                write!(f, "task {task} pulse {pulse} payload")
            }
        }
    }
}

/// Errors returned by bin file decoding.
///
/// Every variant is fatal to the whole decode; no partial file is returned.
///
/// # Examples
/// ```
/// use lidarbin_core::{DecodeError, decode};
///
/// let err = decode(b"NOTABINFILE....").unwrap_err();
/// assert!(matches!(err, DecodeError::BadMagic { .. }));
/// assert!(err.to_string().contains("bad magic"));
/// ```
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("bad magic: expected \"DIRSIGPROTO\", found {found:?}")]
    BadMagic { found: Vec<u8> },
    #[error("unsupported format version: {version}")]
    UnsupportedVersion { version: u8 },
    #[error(
        "truncated input in {stage} at offset {offset}: need {needed} bytes, got {available}"
    )]
    TruncatedInput {
        stage: Stage,
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("zlib decompression failed in {stage} at offset {offset}: {message}")]
    DecompressionFailed {
        stage: Stage,
        offset: usize,
        message: String,
    },
    #[error(
        "payload size mismatch in {stage} at offset {offset}: expected {expected} bytes, got {actual}"
    )]
    SizeMismatch {
        stage: Stage,
        offset: usize,
        expected: u64,
        actual: u64,
    },
}

impl DecodeError {
    pub fn stage(&self) -> Stage {
        match self {
            DecodeError::BadMagic { .. } => Stage::Magic,
            DecodeError::UnsupportedVersion { .. } => Stage::FileHeader,
            DecodeError::TruncatedInput { stage, .. }
            | DecodeError::DecompressionFailed { stage, .. }
            | DecodeError::SizeMismatch { stage, .. } => *stage,
        }
    }

    /// Byte offset where the failing structure or field starts.
    pub fn offset(&self) -> usize {
        match self {
            DecodeError::BadMagic { .. } => 0,
            DecodeError::UnsupportedVersion { .. } => super::layout::MAGIC.len(),
            DecodeError::TruncatedInput { offset, .. }
            | DecodeError::DecompressionFailed { offset, .. }
            | DecodeError::SizeMismatch { offset, .. } => *offset,
        }
    }
}
