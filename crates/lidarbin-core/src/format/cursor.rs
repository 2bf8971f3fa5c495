use serde::{Deserialize, Serialize};

use super::error::{DecodeError, Stage};
use super::layout;

/// Byte order declared by the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    /// Map the header tag: 0 is big-endian, anything else little-endian.
    pub fn from_tag(tag: u8) -> Self {
        if tag == 0 {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ByteOrder::Big => "big",
            ByteOrder::Little => "little",
        }
    }
}

/// Sequential reader over an in-memory capture.
///
/// The position only moves forward. Every failed read reports the stage the
/// cursor was last pointed at, so decoders never annotate errors by hand.
///
/// # Examples
/// ```
/// use lidarbin_core::format::cursor::{ByteCursor, ByteOrder};
///
/// let bytes = [0x00, 0x00, 0x00, 0x05];
/// let mut cursor = ByteCursor::new(&bytes);
/// assert_eq!(cursor.read_u32(ByteOrder::Big).unwrap(), 5);
/// assert_eq!(cursor.position(), 4);
/// ```
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    position: usize,
    stage: Stage,
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            position: 0,
            stage: Stage::Magic,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    pub fn read_exact(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::TruncatedInput {
                stage: self.stage,
                offset: self.position,
                needed: len,
                available: self.remaining(),
            });
        }
        let start = self.position;
        self.position += len;
        Ok(&self.bytes[start..self.position])
    }

    /// Like `read_exact`, for on-disk lengths that may not fit in `usize`.
    pub fn read_exact_u64(&mut self, len: u64) -> Result<&'a [u8], DecodeError> {
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        self.read_exact(len)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let bytes = self.read_exact(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Single bytes have no byte order.
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let [value] = self.read_array::<1>()?;
        Ok(value)
    }

    pub fn read_u16(&mut self, order: ByteOrder) -> Result<u16, DecodeError> {
        let bytes = self.read_array::<2>()?;
        Ok(match order {
            ByteOrder::Big => u16::from_be_bytes(bytes),
            ByteOrder::Little => u16::from_le_bytes(bytes),
        })
    }

    pub fn read_u32(&mut self, order: ByteOrder) -> Result<u32, DecodeError> {
        let bytes = self.read_array::<4>()?;
        Ok(match order {
            ByteOrder::Big => u32::from_be_bytes(bytes),
            ByteOrder::Little => u32::from_le_bytes(bytes),
        })
    }

    pub fn read_u64(&mut self, order: ByteOrder) -> Result<u64, DecodeError> {
        let bytes = self.read_array::<8>()?;
        Ok(match order {
            ByteOrder::Big => u64::from_be_bytes(bytes),
            ByteOrder::Little => u64::from_le_bytes(bytes),
        })
    }

    pub fn read_f64(&mut self, order: ByteOrder) -> Result<f64, DecodeError> {
        Ok(f64::from_bits(self.read_u64(order)?))
    }

    pub fn read_f64_array<const N: usize>(
        &mut self,
        order: ByteOrder,
    ) -> Result<[f64; N], DecodeError> {
        let mut out = [0.0; N];
        for value in out.iter_mut() {
            *value = self.read_f64(order)?;
        }
        Ok(out)
    }

    /// Row-major 4x4 matrix of float64 values.
    pub fn read_matrix4(
        &mut self,
        order: ByteOrder,
    ) -> Result<[[f64; layout::MATRIX_DIM]; layout::MATRIX_DIM], DecodeError> {
        let mut out = [[0.0; layout::MATRIX_DIM]; layout::MATRIX_DIM];
        for row in out.iter_mut() {
            *row = self.read_f64_array::<{ layout::MATRIX_DIM }>(order)?;
        }
        Ok(out)
    }

    /// Fixed-width text field with trailing NUL padding removed.
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String, DecodeError> {
        let bytes = self.read_exact(len)?;
        Ok(decode_fixed_string(bytes))
    }
}

pub(crate) fn decode_fixed_string(bytes: &[u8]) -> String {
    let raw = String::from_utf8_lossy(bytes);
    raw.trim_end_matches('\0').to_string()
}

/// Decode packed float64 samples in the given byte order.
pub(crate) fn decode_f64_samples(bytes: &[u8], order: ByteOrder) -> Vec<f64> {
    bytes
        .chunks_exact(layout::SAMPLE_BYTES)
        .map(|chunk| {
            let mut raw = [0u8; layout::SAMPLE_BYTES];
            raw.copy_from_slice(chunk);
            match order {
                ByteOrder::Big => f64::from_be_bytes(raw),
                ByteOrder::Little => f64::from_le_bytes(raw),
            }
        })
        .collect()
}
