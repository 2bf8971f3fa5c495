//! Signal and range derivation from decoded pulses.
//!
//! These are pure functions over decoded arrays and timing metadata. The
//! per-file collectors return one `Vec` per task holding one entry per pulse,
//! in document order.

use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayView3, Axis};
use thiserror::Error;

use crate::BinFile;
use crate::format::layout::SPEED_OF_LIGHT;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignalError {
    #[error("passive shape {passive:?} does not match active pixel grid {active:?}")]
    ShapeMismatch {
        active: (usize, usize, usize),
        passive: (usize, usize),
    },
}

/// Width of one time bin in seconds.
///
/// `bin_count` evenly spaced samples span the gate inclusively, so the width
/// is the step between them. A single-bin (or empty) gate is one bin wide.
///
/// # Examples
/// ```
/// use lidarbin_core::signal::time_bin_width;
///
/// assert_eq!(time_bin_width(10.0, 12.0, 1), 2.0);
/// assert_eq!(time_bin_width(10.0, 12.0, 3), 1.0);
/// ```
pub fn time_bin_width(time_gate_start: f64, time_gate_stop: f64, bin_count: u32) -> f64 {
    let gate = time_gate_stop - time_gate_start;
    if bin_count <= 1 {
        gate
    } else {
        gate / f64::from(bin_count - 1)
    }
}

/// Combine active and passive terms into a signal in photons.
///
/// `signal[x][y][k] = active[x][y][k] + passive[x][y] * time_bin_width`, with
/// the passive grid replicated along the time-bin axis.
pub fn signal(
    active: ArrayView3<'_, f64>,
    passive: ArrayView2<'_, f64>,
    time_bin_width: f64,
) -> Result<Array3<f64>, SignalError> {
    let (x, y, bins) = active.dim();
    if passive.dim() != (x, y) {
        return Err(SignalError::ShapeMismatch {
            active: active.dim(),
            passive: passive.dim(),
        });
    }
    let per_bin = passive.mapv(|value| value * time_bin_width).insert_axis(Axis(2));
    let replicated = per_bin
        .broadcast((x, y, bins))
        .ok_or(SignalError::ShapeMismatch {
            active: active.dim(),
            passive: passive.dim(),
        })?;
    Ok(&active + &replicated)
}

/// Range in meters to each of `bin_count` evenly spaced gate samples.
///
/// # Examples
/// ```
/// use lidarbin_core::signal::bin_ranges;
///
/// let ranges = bin_ranges(0.0, 1e-7, 3);
/// assert_eq!(ranges.len(), 3);
/// assert!((ranges[2] - 14.9896229).abs() < 1e-6);
/// ```
pub fn bin_ranges(time_gate_start: f64, time_gate_stop: f64, bin_count: u32) -> Array1<f64> {
    Array1::linspace(time_gate_start, time_gate_stop, bin_count as usize)
        .mapv(|time| time * SPEED_OF_LIGHT / 2.0)
}

/// One-way range for a round-trip time through a medium.
pub fn time_to_range(time: f64, index_of_refraction: f64) -> f64 {
    time * SPEED_OF_LIGHT / (2.0 * index_of_refraction)
}

pub fn passive_terms(bin: &BinFile) -> Vec<Vec<Array2<f64>>> {
    bin.tasks
        .iter()
        .map(|task| task.pulses.iter().map(|pulse| pulse.passive.clone()).collect())
        .collect()
}

pub fn active_terms(bin: &BinFile) -> Vec<Vec<Array3<f64>>> {
    bin.tasks
        .iter()
        .map(|task| task.pulses.iter().map(|pulse| pulse.active.clone()).collect())
        .collect()
}

pub fn signals(bin: &BinFile) -> Result<Vec<Vec<Array3<f64>>>, SignalError> {
    bin.tasks
        .iter()
        .map(|task| task.pulses.iter().map(|pulse| pulse.signal()).collect())
        .collect()
}

pub fn ranges(bin: &BinFile) -> Vec<Vec<Array1<f64>>> {
    bin.tasks
        .iter()
        .map(|task| task.pulses.iter().map(|pulse| pulse.bin_ranges()).collect())
        .collect()
}
