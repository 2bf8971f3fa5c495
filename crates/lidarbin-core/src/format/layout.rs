use serde::{Deserialize, Serialize};

pub const MAGIC: &[u8; 11] = b"DIRSIGPROTO";

pub const CREATION_DATE_TIME_LEN: usize = 15;
pub const DIRSIG_VERSION_LEN: usize = 32;
pub const SIMULATION_DESCRIPTION_LEN: usize = 256;
pub const MOUNT_TYPE_LEN: usize = 16;

pub const TASK_DESCRIPTION_LEN: usize = 64;
pub const TASK_DATE_TIME_LEN: usize = 15;

pub const ANGLE_ORDER_LEN: usize = 3;
pub const MATRIX_DIM: usize = 4;

pub const SAMPLE_BYTES: usize = std::mem::size_of::<f64>();

/// Pulse data type code for float64 samples, the only type ever written.
pub const PULSE_DATA_TYPE_F64: u32 = 5;

pub const COMPRESSION_NONE: u8 = 0;
pub const COMPRESSION_ZLIB: u8 = 1;

/// Newest format version with a known layout.
pub const LATEST_FORMAT_VERSION: u8 = 2;

/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// On-disk layout family selected from the format version tag.
///
/// Every version-gated field asks the variant instead of comparing raw
/// version numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutVersion {
    V0,
    V1,
    V2Plus,
}

impl LayoutVersion {
    pub fn from_format_version(version: u8) -> Self {
        match version {
            0 => LayoutVersion::V0,
            1 => LayoutVersion::V1,
            _ => LayoutVersion::V2Plus,
        }
    }

    /// Array offsets and lens distortion in the file header (version > 0).
    pub fn has_array_geometry(self) -> bool {
        self != LayoutVersion::V0
    }

    /// Focal plane array id in the file header (version > 1).
    pub fn has_focal_plane_array_id(self) -> bool {
        self == LayoutVersion::V2Plus
    }

    /// Samples per time bin in the pulse header (version > 0).
    pub fn has_samples_per_time_bin(self) -> bool {
        self != LayoutVersion::V0
    }

    /// Mount geometry as 4x4 affines instead of offsets and angle orders.
    pub fn has_affine_mounts(self) -> bool {
        self == LayoutVersion::V2Plus
    }

    /// Pulse index (u32) instead of the delta histogram flag (u8).
    pub fn has_pulse_index(self) -> bool {
        self == LayoutVersion::V2Plus
    }

    pub fn has_mueller_matrices(self) -> bool {
        self == LayoutVersion::V2Plus
    }

    /// Whether `pulse_data_bytes` is stored as a u32 for this layout.
    ///
    /// Builds of the simulator where `long` was 32 bits wrote a u32 here
    /// before version 2 fixed the width at 64 bits.
    pub fn pulse_data_bytes_is_u32(self, legacy_32bit: bool) -> bool {
        legacy_32bit && self != LayoutVersion::V2Plus
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    None,
    Zlib,
    Unknown(u8),
}

impl Compression {
    pub fn from_code(code: u8) -> Self {
        match code {
            COMPRESSION_NONE => Compression::None,
            COMPRESSION_ZLIB => Compression::Zlib,
            other => Compression::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Compression::None => COMPRESSION_NONE,
            Compression::Zlib => COMPRESSION_ZLIB,
            Compression::Unknown(code) => code,
        }
    }
}
