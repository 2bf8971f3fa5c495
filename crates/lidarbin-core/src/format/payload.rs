use std::io::Read;

use flate2::read::ZlibDecoder;
use ndarray::{Array2, Array3, Axis, s};
use tracing::warn;

use super::cursor::{ByteCursor, ByteOrder, decode_f64_samples};
use super::error::{DecodeError, Stage};
use super::layout::{self, Compression};
use super::pulse_header::PulseHeader;

/// Active and passive terms split out of one pulse payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseSamples {
    /// `(x, y, samples_per_time_bin * time_gate_bin_count)`, photons.
    pub active: Array3<f64>,
    /// `(x, y)`, scaled by the range gate width at decode time.
    pub passive: Array2<f64>,
}

/// Pixel grid the payload is reshaped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelGrid {
    pub x: u32,
    pub y: u32,
}

/// Expected decompressed payload size in bytes; saturates instead of overflowing.
pub fn expected_payload_bytes(header: &PulseHeader, grid: PixelGrid) -> u64 {
    u64::from(grid.x)
        .saturating_mul(u64::from(grid.y))
        .saturating_mul(header.channel_count())
        .saturating_mul(layout::SAMPLE_BYTES as u64)
}

/// Read the stored payload bytes that follow a pulse header.
pub fn read_payload<'a>(
    cursor: &mut ByteCursor<'a>,
    header: &PulseHeader,
    task: usize,
    pulse: usize,
) -> Result<&'a [u8], DecodeError> {
    cursor.set_stage(Stage::PulsePayload { task, pulse });
    cursor.read_exact_u64(header.pulse_data_bytes)
}

/// Inflate (when needed), validate and reshape a stored payload.
///
/// `offset` is the position of the stored payload in the file and is only
/// used for error context.
pub fn decode_payload(
    stored: &[u8],
    header: &PulseHeader,
    grid: PixelGrid,
    order: ByteOrder,
    stage: Stage,
    offset: usize,
) -> Result<PulseSamples, DecodeError> {
    let expected = expected_payload_bytes(header, grid);

    let inflated;
    let raw: &[u8] = match header.compression {
        Compression::Zlib => {
            inflated = inflate(stored, expected, stage, offset)?;
            &inflated
        }
        Compression::None => stored,
        Compression::Unknown(code) => {
            warn!(%stage, code, "unknown compression code, treating payload as raw");
            stored
        }
    };

    if raw.len() as u64 != expected {
        return Err(DecodeError::SizeMismatch {
            stage,
            offset,
            expected,
            actual: raw.len() as u64,
        });
    }

    if header.pulse_data_type != layout::PULSE_DATA_TYPE_F64 {
        warn!(
            %stage,
            pulse_data_type = header.pulse_data_type,
            "unexpected pulse data type, decoding as float64"
        );
    }

    // Sizes fit in usize here: `expected` matched an in-memory buffer length.
    let shape = (
        grid.x as usize,
        grid.y as usize,
        header.channel_count() as usize,
    );
    let samples = decode_f64_samples(raw, order);
    let cube = Array3::from_shape_vec(shape, samples).map_err(|_| DecodeError::SizeMismatch {
        stage,
        offset,
        expected,
        actual: raw.len() as u64,
    })?;

    let active = cube.slice(s![.., .., 1..]).to_owned();
    let range_gate_width = header.range_gate_width();
    let passive = cube.index_axis(Axis(2), 0).mapv(|value| value * range_gate_width);

    Ok(PulseSamples { active, passive })
}

fn inflate(
    stored: &[u8],
    expected: u64,
    stage: Stage,
    offset: usize,
) -> Result<Vec<u8>, DecodeError> {
    // One byte past the expected size is enough to detect an oversized stream.
    let limit = expected.saturating_add(1);
    let capacity = usize::try_from(expected)
        .unwrap_or(0)
        .min(stored.len().saturating_mul(16));
    let mut out = Vec::with_capacity(capacity);
    ZlibDecoder::new(stored)
        .take(limit)
        .read_to_end(&mut out)
        .map_err(|err| DecodeError::DecompressionFailed {
            stage,
            offset,
            message: err.to_string(),
        })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression as ZlibLevel;
    use flate2::write::ZlibEncoder;

    use super::{PixelGrid, decode_payload, expected_payload_bytes};
    use crate::format::cursor::ByteOrder;
    use crate::format::error::{DecodeError, Stage};
    use crate::format::layout::Compression;
    use crate::format::pulse_header::{
        AffinePointing, MountGeometry, PulseHeader, PulseSequencing,
    };

    fn header(bins: u32, samples_per_bin: u32, compression: Compression) -> PulseHeader {
        PulseHeader {
            pulse_time: 0.0,
            time_gate_start: 1.0,
            time_gate_stop: 3.0,
            time_gate_bin_count: bins,
            samples_per_time_bin: samples_per_bin,
            platform_location: [0.0; 3],
            platform_rotation: [0.0; 3],
            mount: MountGeometry::Affine {
                transmitter: AffinePointing {
                    to_mount: [[0.0; 4]; 4],
                    mount_to_platform: [[0.0; 4]; 4],
                },
                receiver: AffinePointing {
                    to_mount: [[0.0; 4]; 4],
                    mount_to_platform: [[0.0; 4]; 4],
                },
            },
            transmitter_pointing_rotation: [0.0; 3],
            receiver_pointing_rotation: [0.0; 3],
            pulse_data_type: 5,
            compression,
            sequencing: PulseSequencing::Index(0),
            pulse_data_bytes: 0,
            mueller: None,
        }
    }

    fn encode(values: &[f64]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    const STAGE: Stage = Stage::PulsePayload { task: 0, pulse: 0 };

    #[test]
    fn splits_passive_and_active() {
        // 2x1 grid, 2 bins: [passive, a0, a1] per pixel.
        let raw = encode(&[0.5, 1.0, 2.0, 0.25, 3.0, 4.0]);
        let grid = PixelGrid { x: 2, y: 1 };
        let samples = decode_payload(
            &raw,
            &header(2, 1, Compression::None),
            grid,
            ByteOrder::Little,
            STAGE,
            0,
        )
        .unwrap();
        assert_eq!(samples.active.dim(), (2, 1, 2));
        assert_eq!(samples.active[[1, 0, 1]], 4.0);
        // Passive scaled by the 2 s range gate.
        assert_eq!(samples.passive[[0, 0]], 1.0);
        assert_eq!(samples.passive[[1, 0]], 0.5);
    }

    #[test]
    fn samples_per_bin_multiply_active_channels() {
        let header = header(2, 3, Compression::None);
        let grid = PixelGrid { x: 1, y: 1 };
        assert_eq!(expected_payload_bytes(&header, grid), 7 * 8);
        let raw = encode(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let samples =
            decode_payload(&raw, &header, grid, ByteOrder::Little, STAGE, 0).unwrap();
        assert_eq!(samples.active.dim(), (1, 1, 6));
    }

    #[test]
    fn inflates_zlib_payload() {
        let raw = encode(&[0.5, 1.0, 2.0, 0.25, 3.0, 4.0]);
        let mut encoder = ZlibEncoder::new(Vec::new(), ZlibLevel::default());
        encoder.write_all(&raw).unwrap();
        let compressed = encoder.finish().unwrap();

        let grid = PixelGrid { x: 1, y: 2 };
        let plain = decode_payload(
            &raw,
            &header(2, 1, Compression::None),
            grid,
            ByteOrder::Little,
            STAGE,
            0,
        )
        .unwrap();
        let inflated = decode_payload(
            &compressed,
            &header(2, 1, Compression::Zlib),
            grid,
            ByteOrder::Little,
            STAGE,
            0,
        )
        .unwrap();
        assert_eq!(plain, inflated);
    }

    #[test]
    fn corrupt_zlib_fails() {
        let err = decode_payload(
            &[0x78, 0x9c, 0xff, 0xff, 0xff],
            &header(1, 1, Compression::Zlib),
            PixelGrid { x: 1, y: 1 },
            ByteOrder::Little,
            STAGE,
            42,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::DecompressionFailed { offset: 42, .. }
        ));
    }

    #[test]
    fn wrong_length_is_size_mismatch() {
        let raw = encode(&[0.5, 1.0, 2.0]);
        let err = decode_payload(
            &raw,
            &header(2, 1, Compression::None),
            PixelGrid { x: 2, y: 1 },
            ByteOrder::Little,
            STAGE,
            0,
        )
        .unwrap_err();
        match err {
            DecodeError::SizeMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, 48);
                assert_eq!(actual, 24);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn oversized_inflate_is_size_mismatch() {
        let raw = encode(&[0.0; 10]);
        let mut encoder = ZlibEncoder::new(Vec::new(), ZlibLevel::default());
        encoder.write_all(&raw).unwrap();
        let compressed = encoder.finish().unwrap();
        let err = decode_payload(
            &compressed,
            &header(1, 1, Compression::Zlib),
            PixelGrid { x: 1, y: 1 },
            ByteOrder::Little,
            STAGE,
            0,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::SizeMismatch {
                expected: 16,
                actual: 17,
                ..
            }
        ));
    }
}
