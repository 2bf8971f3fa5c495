use serde::{Deserialize, Serialize};

use super::cursor::{ByteCursor, ByteOrder};
use super::error::{DecodeError, Stage};
use super::layout::{self, Compression, LayoutVersion};

pub type Matrix4 = [[f64; layout::MATRIX_DIM]; layout::MATRIX_DIM];

/// Three-character Euler angle order tag (e.g. `XYZ`), stored verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AngleOrder(pub [u8; layout::ANGLE_ORDER_LEN]);

impl AngleOrder {
    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

/// Mount pointing as written by versions 0 and 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyPointing {
    pub offset: [f64; 3],
    pub angle_order: AngleOrder,
}

/// Mount pointing as written from version 2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinePointing {
    pub to_mount: Matrix4,
    pub mount_to_platform: Matrix4,
}

/// Transmitter and receiver mounting geometry, one shape per layout family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MountGeometry {
    Legacy {
        platform_angle_order: AngleOrder,
        transmitter: LegacyPointing,
        receiver: LegacyPointing,
    },
    Affine {
        transmitter: AffinePointing,
        receiver: AffinePointing,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseSequencing {
    /// Versions 0 and 1.
    DeltaHistogram(u8),
    /// Version 2 and later.
    Index(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMueller {
    pub transmit: Matrix4,
    pub receive: Matrix4,
}

/// Geometry and timing metadata for one pulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseHeader {
    pub pulse_time: f64,
    pub time_gate_start: f64,
    pub time_gate_stop: f64,
    pub time_gate_bin_count: u32,
    /// Always 1 for version 0 files, which do not store it.
    pub samples_per_time_bin: u32,
    pub platform_location: [f64; 3],
    pub platform_rotation: [f64; 3],
    pub mount: MountGeometry,
    pub transmitter_pointing_rotation: [f64; 3],
    pub receiver_pointing_rotation: [f64; 3],
    pub pulse_data_type: u32,
    pub compression: Compression,
    pub sequencing: PulseSequencing,
    /// Stored (possibly compressed) payload length in bytes.
    pub pulse_data_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mueller: Option<SystemMueller>,
}

impl PulseHeader {
    pub fn range_gate_width(&self) -> f64 {
        self.time_gate_stop - self.time_gate_start
    }

    /// Active samples per pixel.
    pub fn active_bin_count(&self) -> u64 {
        u64::from(self.samples_per_time_bin) * u64::from(self.time_gate_bin_count)
    }

    /// Values per pixel in the payload: one passive channel, then the active bins.
    pub fn channel_count(&self) -> u64 {
        self.active_bin_count().saturating_add(1)
    }

    pub fn pulse_index(&self) -> Option<u32> {
        match self.sequencing {
            PulseSequencing::Index(index) => Some(index),
            PulseSequencing::DeltaHistogram(_) => None,
        }
    }
}

/// Options that change the on-disk pulse header shape.
#[derive(Debug, Clone, Copy)]
pub struct PulseLayout {
    pub version: LayoutVersion,
    pub order: ByteOrder,
    pub legacy_32bit: bool,
}

fn read_angle_order(cursor: &mut ByteCursor<'_>) -> Result<AngleOrder, DecodeError> {
    Ok(AngleOrder(cursor.read_array::<{ layout::ANGLE_ORDER_LEN }>()?))
}

pub fn decode_pulse_header(
    cursor: &mut ByteCursor<'_>,
    pulse_layout: PulseLayout,
    task: usize,
    pulse: usize,
) -> Result<PulseHeader, DecodeError> {
    let PulseLayout {
        version,
        order,
        legacy_32bit,
    } = pulse_layout;
    cursor.set_stage(Stage::PulseHeader { task, pulse });

    let pulse_time = cursor.read_f64(order)?;
    let time_gate_start = cursor.read_f64(order)?;
    let time_gate_stop = cursor.read_f64(order)?;
    let time_gate_bin_count = cursor.read_u32(order)?;
    let samples_per_time_bin = if version.has_samples_per_time_bin() {
        cursor.read_u32(order)?
    } else {
        1
    };
    let platform_location = cursor.read_f64_array::<3>(order)?;

    let (mount, transmitter_pointing_rotation, receiver_pointing_rotation, platform_rotation) =
        if version.has_affine_mounts() {
            let platform_rotation = cursor.read_f64_array::<3>(order)?;
            let tx_to_mount = cursor.read_matrix4(order)?;
            let tx_rotation = cursor.read_f64_array::<3>(order)?;
            let tx_mount_to_platform = cursor.read_matrix4(order)?;
            let rx_to_mount = cursor.read_matrix4(order)?;
            let rx_rotation = cursor.read_f64_array::<3>(order)?;
            let rx_mount_to_platform = cursor.read_matrix4(order)?;
            let mount = MountGeometry::Affine {
                transmitter: AffinePointing {
                    to_mount: tx_to_mount,
                    mount_to_platform: tx_mount_to_platform,
                },
                receiver: AffinePointing {
                    to_mount: rx_to_mount,
                    mount_to_platform: rx_mount_to_platform,
                },
            };
            (mount, tx_rotation, rx_rotation, platform_rotation)
        } else {
            let platform_angle_order = read_angle_order(cursor)?;
            let platform_rotation = cursor.read_f64_array::<3>(order)?;
            let tx_offset = cursor.read_f64_array::<3>(order)?;
            let tx_angle_order = read_angle_order(cursor)?;
            let tx_rotation = cursor.read_f64_array::<3>(order)?;
            let rx_offset = cursor.read_f64_array::<3>(order)?;
            let rx_angle_order = read_angle_order(cursor)?;
            let rx_rotation = cursor.read_f64_array::<3>(order)?;
            let mount = MountGeometry::Legacy {
                platform_angle_order,
                transmitter: LegacyPointing {
                    offset: tx_offset,
                    angle_order: tx_angle_order,
                },
                receiver: LegacyPointing {
                    offset: rx_offset,
                    angle_order: rx_angle_order,
                },
            };
            (mount, tx_rotation, rx_rotation, platform_rotation)
        };

    let pulse_data_type = cursor.read_u32(order)?;
    let compression = Compression::from_code(cursor.read_u8()?);
    let sequencing = if version.has_pulse_index() {
        PulseSequencing::Index(cursor.read_u32(order)?)
    } else {
        PulseSequencing::DeltaHistogram(cursor.read_u8()?)
    };
    let pulse_data_bytes = if version.pulse_data_bytes_is_u32(legacy_32bit) {
        u64::from(cursor.read_u32(order)?)
    } else {
        cursor.read_u64(order)?
    };
    let mueller = if version.has_mueller_matrices() {
        Some(SystemMueller {
            transmit: cursor.read_matrix4(order)?,
            receive: cursor.read_matrix4(order)?,
        })
    } else {
        None
    };

    Ok(PulseHeader {
        pulse_time,
        time_gate_start,
        time_gate_stop,
        time_gate_bin_count,
        samples_per_time_bin,
        platform_location,
        platform_rotation,
        mount,
        transmitter_pointing_rotation,
        receiver_pointing_rotation,
        pulse_data_type,
        compression,
        sequencing,
        pulse_data_bytes,
        mueller,
    })
}
