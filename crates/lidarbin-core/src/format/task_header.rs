use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use super::cursor::{ByteCursor, ByteOrder};
use super::error::{DecodeError, Stage};
use super::file_header::parse_date_time;
use super::layout;

/// Descriptive metadata for one acquisition task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskHeader {
    pub description: String,
    pub start_date_time: String,
    pub stop_date_time: String,
    pub focal_length: f64,
    pub pulse_repetition_frequency: f64,
    pub pulse_duration: f64,
    pub pulse_energy: f64,
    pub laser_spectral_center: f64,
    pub laser_spectral_width: f64,
    /// Number of pulses that follow this header; zero is legal.
    pub pulse_count: u32,
}

impl TaskHeader {
    pub fn start_time(&self) -> Option<PrimitiveDateTime> {
        parse_date_time(&self.start_date_time)
    }

    pub fn stop_time(&self) -> Option<PrimitiveDateTime> {
        parse_date_time(&self.stop_date_time)
    }
}

pub fn decode_task_header(
    cursor: &mut ByteCursor<'_>,
    order: ByteOrder,
    task: usize,
) -> Result<TaskHeader, DecodeError> {
    cursor.set_stage(Stage::TaskHeader { task });
    Ok(TaskHeader {
        description: cursor.read_fixed_string(layout::TASK_DESCRIPTION_LEN)?,
        start_date_time: cursor.read_fixed_string(layout::TASK_DATE_TIME_LEN)?,
        stop_date_time: cursor.read_fixed_string(layout::TASK_DATE_TIME_LEN)?,
        focal_length: cursor.read_f64(order)?,
        pulse_repetition_frequency: cursor.read_f64(order)?,
        pulse_duration: cursor.read_f64(order)?,
        pulse_energy: cursor.read_f64(order)?,
        laser_spectral_center: cursor.read_f64(order)?,
        laser_spectral_width: cursor.read_f64(order)?,
        pulse_count: cursor.read_u32(order)?,
    })
}
