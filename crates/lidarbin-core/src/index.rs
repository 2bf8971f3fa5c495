//! Two-phase decoding: locate every pulse first, decode payloads later.
//!
//! `PulseIndex::scan` walks the headers in document order and skips over the
//! stored payloads without inflating them. The resulting index supports
//! random access to single pulses and a parallel decode of all payloads that
//! produces the same tree as a sequential decode.
//!
//! Version française (résumé):
//! Un premier passage localise chaque impulsion (en-tête + plage d'octets de
//! la charge utile) ; le second décode les charges utiles, une à la fois ou en
//! parallèle avec `rayon`, avec un résultat identique au décodage séquentiel.

use std::ops::Range;

use rayon::prelude::*;
use tracing::debug;

use crate::format::bin_file::FileContext;
use crate::format::cursor::ByteCursor;
use crate::format::error::{DecodeError, Stage};
use crate::format::file_header::{FileHeader, decode_file_header};
use crate::format::payload::{PulseSamples, decode_payload, read_payload};
use crate::format::pulse_header::{PulseHeader, decode_pulse_header};
use crate::format::task_header::{TaskHeader, decode_task_header};
use crate::{BinFile, DecodeOptions, Pulse, Task};

/// Where one pulse lives in the capture.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseLocation {
    pub task: usize,
    pub pulse: usize,
    /// Offset of the pulse header.
    pub header_offset: usize,
    /// Stored payload byte range.
    pub payload: Range<usize>,
    pub header: PulseHeader,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PulseIndex {
    pub header: FileHeader,
    pub tasks: Vec<TaskHeader>,
    /// All pulses in document order.
    pub pulses: Vec<PulseLocation>,
    options: DecodeOptions,
}

impl PulseIndex {
    /// Walk all headers without decoding payloads.
    ///
    /// Fails with the same error a full decode would report first. When the
    /// walk breaks on structure (truncation, bad header), payloads located
    /// before the break are checked so an earlier payload error wins.
    /// Otherwise payload content errors only surface when decoded.
    pub fn scan(bytes: &[u8], options: DecodeOptions) -> Result<Self, DecodeError> {
        let mut cursor = ByteCursor::new(bytes);
        let header = decode_file_header(&mut cursor, options.accept_newer_versions)?;
        let mut index = Self {
            header,
            tasks: Vec::new(),
            pulses: Vec::new(),
            options,
        };

        if let Err(err) = index.walk_tasks(&mut cursor) {
            debug!(
                located = index.pulses.len(),
                %err,
                "index walk stopped, checking located payloads"
            );
            return Err(index.first_payload_error(bytes).unwrap_or(err));
        }
        debug!(
            tasks = index.tasks.len(),
            pulses = index.pulses.len(),
            "indexed bin file"
        );
        Ok(index)
    }

    fn walk_tasks(&mut self, cursor: &mut ByteCursor<'_>) -> Result<(), DecodeError> {
        let context = FileContext::new(&self.header, self.options);
        self.tasks.reserve(self.header.task_count.min(1024) as usize);
        for task in 0..self.header.task_count as usize {
            let task_header = decode_task_header(cursor, context.order(), task)?;
            let pulse_count = task_header.pulse_count as usize;
            self.tasks.push(task_header);
            for pulse in 0..pulse_count {
                let header_offset = cursor.position();
                let pulse_header =
                    decode_pulse_header(cursor, context.pulse_layout, task, pulse)?;
                let start = cursor.position();
                read_payload(cursor, &pulse_header, task, pulse)?;
                self.pulses.push(PulseLocation {
                    task,
                    pulse,
                    header_offset,
                    payload: start..cursor.position(),
                    header: pulse_header,
                });
            }
        }
        Ok(())
    }

    /// Decode located payloads and keep the first failure in document order.
    fn first_payload_error(&self, bytes: &[u8]) -> Option<DecodeError> {
        let results: Vec<Option<DecodeError>> = self
            .pulses
            .par_iter()
            .map(|location| self.decode_samples(bytes, location).err())
            .collect();
        results.into_iter().flatten().next()
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    pub fn locate(&self, task: usize, pulse: usize) -> Option<&PulseLocation> {
        self.pulses
            .iter()
            .find(|location| location.task == task && location.pulse == pulse)
    }

    /// Decode one indexed pulse. `bytes` must be the buffer that was scanned.
    pub fn decode_pulse(&self, bytes: &[u8], location: &PulseLocation) -> Result<Pulse, DecodeError> {
        let samples = self.decode_samples(bytes, location)?;
        Ok(Pulse {
            header: location.header.clone(),
            active: samples.active,
            passive: samples.passive,
        })
    }

    /// Decode every payload on the rayon pool and assemble the full tree.
    ///
    /// When several payloads fail, the error of the first one in document
    /// order is returned.
    pub fn decode_parallel(&self, bytes: &[u8]) -> Result<BinFile, DecodeError> {
        let decoded: Vec<Result<Pulse, DecodeError>> = self
            .pulses
            .par_iter()
            .map(|location| self.decode_pulse(bytes, location))
            .collect();

        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .map(|header| Task {
                header: header.clone(),
                pulses: Vec::with_capacity(header.pulse_count.min(4096) as usize),
            })
            .collect();
        for (location, pulse) in self.pulses.iter().zip(decoded) {
            let pulse = pulse?;
            if let Some(task) = tasks.get_mut(location.task) {
                task.pulses.push(pulse);
            }
        }

        Ok(BinFile {
            header: self.header.clone(),
            tasks,
        })
    }

    fn decode_samples(
        &self,
        bytes: &[u8],
        location: &PulseLocation,
    ) -> Result<PulseSamples, DecodeError> {
        let context = FileContext::new(&self.header, self.options);
        let stage = Stage::PulsePayload {
            task: location.task,
            pulse: location.pulse,
        };
        let stored = bytes
            .get(location.payload.clone())
            .ok_or(DecodeError::TruncatedInput {
                stage,
                offset: location.payload.start,
                needed: location.payload.len(),
                available: bytes.len().saturating_sub(location.payload.start),
            })?;
        decode_payload(
            stored,
            &location.header,
            context.grid,
            context.order(),
            stage,
            location.payload.start,
        )
    }
}
