use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;
use time::macros::format_description;
use tracing::warn;

use super::cursor::{ByteCursor, ByteOrder};
use super::error::{DecodeError, Stage};
use super::layout::{self, LayoutVersion};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneOrigin {
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
}

/// Focal plane offsets and lens distortion, present from version 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrayGeometry {
    pub x_array_offset: f64,
    pub y_array_offset: f64,
    pub lens_distortion_k1: f64,
    pub lens_distortion_k2: f64,
}

/// Capture-wide header at the start of every bin file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    pub format_version: u8,
    pub byte_order_tag: u8,
    pub byte_order: ByteOrder,
    pub creation_date_time: String,
    pub dirsig_version: String,
    pub simulation_description: String,
    pub scene_origin: SceneOrigin,
    pub transmitter_mount_type: String,
    pub receiver_mount_type: String,
    pub x_pixel_count: u32,
    pub y_pixel_count: u32,
    pub x_pixel_pitch: f64,
    pub y_pixel_pitch: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_geometry: Option<ArrayGeometry>,
    pub task_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focal_plane_array_id: Option<u16>,
}

impl FileHeader {
    pub fn layout(&self) -> LayoutVersion {
        LayoutVersion::from_format_version(self.format_version)
    }

    /// Parse the `YYYYMMDDThhmmss` creation stamp, if well formed.
    ///
    /// # Examples
    /// ```
    /// let stamp = lidarbin_core::parse_date_time("20130209T134501").unwrap();
    /// assert_eq!(stamp.year(), 2013);
    /// assert_eq!(stamp.second(), 1);
    /// assert!(lidarbin_core::parse_date_time("not a date").is_none());
    /// ```
    pub fn creation_time(&self) -> Option<PrimitiveDateTime> {
        parse_date_time(&self.creation_date_time)
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.x_pixel_count) * u64::from(self.y_pixel_count)
    }
}

/// Parse a 15-character `YYYYMMDDThhmmss` timestamp field.
pub fn parse_date_time(text: &str) -> Option<PrimitiveDateTime> {
    let format = format_description!("[year][month][day]T[hour][minute][second]");
    PrimitiveDateTime::parse(text.trim(), &format).ok()
}

/// Check the magic literal. Must be called with the cursor at byte 0.
pub fn decode_magic(cursor: &mut ByteCursor<'_>) -> Result<(), DecodeError> {
    cursor.set_stage(Stage::Magic);
    let available = cursor.remaining().min(layout::MAGIC.len());
    if available < layout::MAGIC.len() {
        let found = cursor.read_exact(available)?.to_vec();
        return Err(DecodeError::BadMagic { found });
    }
    let magic = cursor.read_exact(layout::MAGIC.len())?;
    if magic != layout::MAGIC {
        return Err(DecodeError::BadMagic {
            found: magic.to_vec(),
        });
    }
    Ok(())
}

/// Decode the magic and the file header that follows it.
///
/// The version and byte order tags are single bytes and are read before the
/// byte order is known; every later field uses the declared order.
pub fn decode_file_header(
    cursor: &mut ByteCursor<'_>,
    accept_newer_versions: bool,
) -> Result<FileHeader, DecodeError> {
    decode_magic(cursor)?;
    cursor.set_stage(Stage::FileHeader);

    let format_version = cursor.read_u8()?;
    if format_version > layout::LATEST_FORMAT_VERSION {
        if !accept_newer_versions {
            return Err(DecodeError::UnsupportedVersion {
                version: format_version,
            });
        }
        warn!(
            format_version,
            "decoding newer format version with the version 2 layout"
        );
    }
    let layout_version = LayoutVersion::from_format_version(format_version);

    let byte_order_tag = cursor.read_u8()?;
    let order = ByteOrder::from_tag(byte_order_tag);

    let creation_date_time = cursor.read_fixed_string(layout::CREATION_DATE_TIME_LEN)?;
    let dirsig_version = cursor.read_fixed_string(layout::DIRSIG_VERSION_LEN)?;
    let simulation_description = cursor.read_fixed_string(layout::SIMULATION_DESCRIPTION_LEN)?;
    let scene_origin = SceneOrigin {
        latitude: cursor.read_f64(order)?,
        longitude: cursor.read_f64(order)?,
        height: cursor.read_f64(order)?,
    };
    let transmitter_mount_type = cursor.read_fixed_string(layout::MOUNT_TYPE_LEN)?;
    let receiver_mount_type = cursor.read_fixed_string(layout::MOUNT_TYPE_LEN)?;
    let x_pixel_count = cursor.read_u32(order)?;
    let y_pixel_count = cursor.read_u32(order)?;
    let x_pixel_pitch = cursor.read_f64(order)?;
    let y_pixel_pitch = cursor.read_f64(order)?;

    let array_geometry = if layout_version.has_array_geometry() {
        Some(ArrayGeometry {
            x_array_offset: cursor.read_f64(order)?,
            y_array_offset: cursor.read_f64(order)?,
            lens_distortion_k1: cursor.read_f64(order)?,
            lens_distortion_k2: cursor.read_f64(order)?,
        })
    } else {
        None
    };

    let task_count = cursor.read_u32(order)?;
    let focal_plane_array_id = if layout_version.has_focal_plane_array_id() {
        Some(cursor.read_u16(order)?)
    } else {
        None
    };

    Ok(FileHeader {
        format_version,
        byte_order_tag,
        byte_order: order,
        creation_date_time,
        dirsig_version,
        simulation_description,
        scene_origin,
        transmitter_mount_type,
        receiver_mount_type,
        x_pixel_count,
        y_pixel_count,
        x_pixel_pitch,
        y_pixel_pitch,
        array_geometry,
        task_count,
        focal_plane_array_id,
    })
}
