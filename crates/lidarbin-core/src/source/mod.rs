mod file;

pub use file::{decode_files_parallel, decode_reader, map_file, read_bin_file};

use thiserror::Error;

use crate::DecodeError;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}
