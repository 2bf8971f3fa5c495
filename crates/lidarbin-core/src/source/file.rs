use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use rayon::prelude::*;
use tracing::debug;

use super::SourceError;
use crate::{BinFile, DecodeOptions, decode_with_options};

/// Memory-map a capture for read-only access.
pub fn map_file(path: &Path) -> Result<Mmap, SourceError> {
    let file = File::open(path)?;
    // Safety: the mapping is read-only and captures are not rewritten while decoding.
    let map = unsafe { Mmap::map(&file) }?;
    Ok(map)
}

/// Decode a capture from disk.
pub fn read_bin_file(path: &Path, options: DecodeOptions) -> Result<BinFile, SourceError> {
    let map = map_file(path)?;
    debug!(path = %path.display(), bytes = map.len(), "mapped capture");
    Ok(decode_with_options(&map, options)?)
}

/// Decode a capture from any reader by buffering it fully.
pub fn decode_reader<R: Read>(mut reader: R, options: DecodeOptions) -> Result<BinFile, SourceError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(decode_with_options(&bytes, options)?)
}

/// Decode independent captures concurrently; results keep the input order.
pub fn decode_files_parallel(
    paths: &[PathBuf],
    options: DecodeOptions,
) -> Vec<Result<BinFile, SourceError>> {
    paths
        .par_iter()
        .map(|path| read_bin_file(path, options))
        .collect()
}
