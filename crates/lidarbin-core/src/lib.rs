//! lidarbin core library for decoding DIRSIG waveform lidar captures.
//!
//! This crate turns a raw "bin" capture (file header, tasks, pulses with
//! optionally zlib-compressed float64 payloads) into typed headers and
//! `ndarray` arrays of active and passive signal terms. Decoding is
//! byte-oriented and side-effect free; all file I/O is isolated in `source`.
//! Derived quantities (signal in photons, range in meters) live in `signal`.
//!
//! Invariants:
//! - Decoding the same bytes always yields the same tree.
//! - `active.dim() == (x, y, samples_per_time_bin * time_gate_bin_count)`.
//! - Any malformed structure aborts the whole decode; there are no partial
//!   results.
//!
//! Version française (résumé):
//! Cette crate décode les fichiers « bin » lidar de DIRSIG : en-tête, tâches,
//! impulsions, charges utiles (zlib optionnel) vers des tableaux `ndarray`.
//! Les E/S restent dans `source`, les dérivations (signal, portée) dans
//! `signal`. Toute erreur interrompt le décodage complet.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use lidarbin_core::{DecodeOptions, read_bin_file};
//!
//! let bin = read_bin_file(Path::new("capture.bin"), DecodeOptions::default())?;
//! println!("tasks: {}", bin.tasks.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayViewD, Axis};
use serde::{Deserialize, Serialize};

pub mod format;
pub mod index;
pub mod signal;
mod source;
pub mod summary;

pub use format::cursor::ByteOrder;
pub use format::error::{DecodeError, Stage};
pub use format::file_header::{ArrayGeometry, FileHeader, SceneOrigin, parse_date_time};
pub use format::layout::{Compression, LayoutVersion};
pub use format::pulse_header::{
    AffinePointing, AngleOrder, LegacyPointing, Matrix4, MountGeometry, PulseHeader,
    PulseSequencing, SystemMueller,
};
pub use format::task_header::TaskHeader;
pub use index::{PulseIndex, PulseLocation};
pub use signal::SignalError;
pub use source::{SourceError, decode_files_parallel, decode_reader, map_file, read_bin_file};
pub use summary::{
    FileSummary, InputInfo, PulseStats, PulseSummary, SUMMARY_VERSION, TaskSummary, ToolInfo,
};

/// Options controlling how a capture is decoded.
///
/// # Examples
/// ```
/// use lidarbin_core::DecodeOptions;
///
/// let options = DecodeOptions {
///     legacy_32bit: true,
///     ..DecodeOptions::default()
/// };
/// assert!(!options.accept_newer_versions);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Read `pulse_data_bytes` as u32 in version 0/1 files written by 32-bit
    /// builds of the simulator. Has no effect from version 2.
    pub legacy_32bit: bool,
    /// Decode versions newer than 2 with the version 2 layout instead of
    /// failing with `UnsupportedVersion`.
    pub accept_newer_versions: bool,
}

/// A fully decoded capture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinFile {
    pub header: FileHeader,
    pub tasks: Vec<Task>,
}

/// One acquisition task and its pulses in document order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub header: TaskHeader,
    pub pulses: Vec<Pulse>,
}

/// One laser pulse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pulse {
    pub header: PulseHeader,
    /// Active term in photons, `(x, y, active bins)`.
    pub active: Array3<f64>,
    /// Passive term, already scaled by the range gate width.
    pub passive: Array2<f64>,
}

/// Decode a capture held in memory with default options.
pub fn decode(bytes: &[u8]) -> Result<BinFile, DecodeError> {
    decode_with_options(bytes, DecodeOptions::default())
}

pub fn decode_with_options(bytes: &[u8], options: DecodeOptions) -> Result<BinFile, DecodeError> {
    format::bin_file::decode_bin_file(bytes, options)
}

impl BinFile {
    pub fn task(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn pulse_count(&self) -> usize {
        self.tasks.iter().map(|task| task.pulses.len()).sum()
    }

    pub fn pulses(&self) -> impl Iterator<Item = &Pulse> + '_ {
        self.tasks.iter().flat_map(|task| task.pulses.iter())
    }
}

impl Task {
    pub fn pulse(&self, index: usize) -> Option<&Pulse> {
        self.pulses.get(index)
    }
}

impl Pulse {
    pub fn range_gate_width(&self) -> f64 {
        self.header.range_gate_width()
    }

    /// Active samples per pixel (`samples_per_time_bin * time_gate_bin_count`).
    pub fn num_time_bins(&self) -> usize {
        self.active.len_of(Axis(2))
    }

    /// `(x, y)` pixel grid size.
    pub fn array_size(&self) -> (usize, usize) {
        let (x, y, _) = self.active.dim();
        (x, y)
    }

    pub fn shape_triplet(&self) -> (usize, usize, usize) {
        self.active.dim()
    }

    pub fn is_single_pixel(&self) -> bool {
        self.array_size() == (1, 1)
    }

    pub fn time_bin_width(&self) -> f64 {
        signal::time_bin_width(
            self.header.time_gate_start,
            self.header.time_gate_stop,
            self.header.time_gate_bin_count,
        )
    }

    /// Signal in photons: active plus per-bin passive contribution.
    pub fn signal(&self) -> Result<Array3<f64>, SignalError> {
        signal::signal(self.active.view(), self.passive.view(), self.time_bin_width())
    }

    /// Range in meters to each time gate bin.
    pub fn bin_ranges(&self) -> Array1<f64> {
        signal::bin_ranges(
            self.header.time_gate_start,
            self.header.time_gate_stop,
            self.header.time_gate_bin_count,
        )
    }

    /// Sample times spanning the gate, one per active sample.
    pub fn bin_times(&self) -> Array1<f64> {
        Array1::linspace(
            self.header.time_gate_start,
            self.header.time_gate_stop,
            self.num_time_bins(),
        )
    }

    /// Active term with the pixel axes dropped for a 1x1 grid.
    pub fn squeezed_active(&self) -> ArrayViewD<'_, f64> {
        if self.is_single_pixel() {
            self.active
                .index_axis(Axis(0), 0)
                .index_axis_move(Axis(0), 0)
                .into_dyn()
        } else {
            self.active.view().into_dyn()
        }
    }

    /// Passive term as a scalar (0-D) view for a 1x1 grid.
    pub fn squeezed_passive(&self) -> ArrayViewD<'_, f64> {
        let passive: ArrayView2<'_, f64> = self.passive.view();
        if self.is_single_pixel() {
            passive
                .index_axis_move(Axis(0), 0)
                .index_axis_move(Axis(0), 0)
                .into_dyn()
        } else {
            passive.into_dyn()
        }
    }

    pub fn stats(&self) -> PulseStats {
        PulseStats::from_pulse(self)
    }
}
