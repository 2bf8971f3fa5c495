//! JSON-friendly summaries of decoded captures.
//!
//! Summaries carry headers and per-pulse statistics but no sample arrays, so
//! they stay small for large captures. Ordering follows the document order of
//! tasks and pulses.

use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;
use time::macros::format_description;

use crate::{BinFile, ByteOrder, Compression, Pulse, Task};

/// Current summary schema version.
pub const SUMMARY_VERSION: u32 = 1;

/// Tool metadata embedded in summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

impl ToolInfo {
    pub fn current() -> Self {
        Self {
            name: "lidarbin".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Input capture metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided by the caller.
    pub path: String,
    pub bytes: u64,
}

/// Summary of one capture.
///
/// # Examples
/// ```
/// use lidarbin_core::{FileSummary, InputInfo, decode};
///
/// # let mut bytes = b"DIRSIGPROTO\x02\x01".to_vec();
/// # bytes.extend_from_slice(b"20130209T134501");
/// # bytes.resize(bytes.len() + 32 + 256 + 24 + 32, 0);
/// # bytes.extend_from_slice(&1u32.to_le_bytes());
/// # bytes.extend_from_slice(&1u32.to_le_bytes());
/// # bytes.resize(bytes.len() + 48 + 4 + 2, 0);
/// let bin = decode(&bytes)?;
/// let input = InputInfo {
///     path: "capture.bin".to_string(),
///     bytes: bytes.len() as u64,
/// };
/// let summary = FileSummary::from_bin_file(&bin, input);
/// assert_eq!(summary.task_count, 0);
/// assert_eq!(summary.creation_time.as_deref(), Some("2013-02-09T13:45:01"));
/// # Ok::<(), lidarbin_core::DecodeError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    pub summary_version: u32,
    pub tool: ToolInfo,
    pub input: InputInfo,
    pub format_version: u8,
    pub byte_order: ByteOrder,
    pub dirsig_version: String,
    pub simulation_description: String,
    /// Raw `YYYYMMDDThhmmss` text as stored.
    pub creation_date_time: String,
    /// ISO 8601 rendering, absent when the stored text does not parse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
    pub x_pixel_count: u32,
    pub y_pixel_count: u32,
    pub task_count: u32,
    pub pulse_count: usize,
    pub tasks: Vec<TaskSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub index: usize,
    pub description: String,
    pub start_date_time: String,
    pub stop_date_time: String,
    pub pulse_repetition_frequency: f64,
    pub pulse_energy: f64,
    pub pulse_count: u32,
    pub pulses: Vec<PulseSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseSummary {
    pub index: usize,
    pub pulse_time: f64,
    pub time_gate_start: f64,
    pub time_gate_stop: f64,
    pub time_gate_bin_count: u32,
    pub samples_per_time_bin: u32,
    pub compression: Compression,
    pub pulse_data_bytes: u64,
    /// `[x, y, active bins]`.
    pub shape: [usize; 3],
    pub stats: PulseStats,
}

/// Value ranges and totals of one pulse's terms.
///
/// Minimum and maximum are absent for empty arrays (zero time bins).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_max: Option<f64>,
    pub active_sum: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passive_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passive_max: Option<f64>,
    pub passive_sum: f64,
}

impl PulseStats {
    pub fn from_pulse(pulse: &Pulse) -> Self {
        let (active_min, active_max) = min_max(pulse.active.iter().copied());
        let (passive_min, passive_max) = min_max(pulse.passive.iter().copied());
        Self {
            active_min,
            active_max,
            active_sum: pulse.active.sum(),
            passive_min,
            passive_max,
            passive_sum: pulse.passive.sum(),
        }
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (Option<f64>, Option<f64>) {
    values.fold((None, None), |(min, max), value| {
        (
            Some(min.map_or(value, |m: f64| m.min(value))),
            Some(max.map_or(value, |m: f64| m.max(value))),
        )
    })
}

fn format_date_time(value: PrimitiveDateTime) -> Option<String> {
    value
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]"
        ))
        .ok()
}

impl FileSummary {
    pub fn from_bin_file(bin: &BinFile, input: InputInfo) -> Self {
        let header = &bin.header;
        Self {
            summary_version: SUMMARY_VERSION,
            tool: ToolInfo::current(),
            input,
            format_version: header.format_version,
            byte_order: header.byte_order,
            dirsig_version: header.dirsig_version.clone(),
            simulation_description: header.simulation_description.clone(),
            creation_date_time: header.creation_date_time.clone(),
            creation_time: header.creation_time().and_then(format_date_time),
            x_pixel_count: header.x_pixel_count,
            y_pixel_count: header.y_pixel_count,
            task_count: header.task_count,
            pulse_count: bin.pulse_count(),
            tasks: bin
                .tasks
                .iter()
                .enumerate()
                .map(|(index, task)| TaskSummary::from_task(index, task))
                .collect(),
        }
    }
}

impl TaskSummary {
    pub fn from_task(index: usize, task: &Task) -> Self {
        let header = &task.header;
        Self {
            index,
            description: header.description.clone(),
            start_date_time: header.start_date_time.clone(),
            stop_date_time: header.stop_date_time.clone(),
            pulse_repetition_frequency: header.pulse_repetition_frequency,
            pulse_energy: header.pulse_energy,
            pulse_count: header.pulse_count,
            pulses: task
                .pulses
                .iter()
                .enumerate()
                .map(|(index, pulse)| PulseSummary::from_pulse(index, pulse))
                .collect(),
        }
    }
}

impl PulseSummary {
    pub fn from_pulse(index: usize, pulse: &Pulse) -> Self {
        let header = &pulse.header;
        let (x, y, bins) = pulse.shape_triplet();
        Self {
            index,
            pulse_time: header.pulse_time,
            time_gate_start: header.time_gate_start,
            time_gate_stop: header.time_gate_stop,
            time_gate_bin_count: header.time_gate_bin_count,
            samples_per_time_bin: header.samples_per_time_bin,
            compression: header.compression,
            pulse_data_bytes: header.pulse_data_bytes,
            shape: [x, y, bins],
            stats: pulse.stats(),
        }
    }
}
