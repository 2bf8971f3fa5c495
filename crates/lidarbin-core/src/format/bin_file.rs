use tracing::{debug, info};

use crate::{BinFile, DecodeOptions, Pulse, Task};

use super::cursor::{ByteCursor, ByteOrder};
use super::error::{DecodeError, Stage};
use super::file_header::{FileHeader, decode_file_header};
use super::payload::{PixelGrid, decode_payload, read_payload};
use super::pulse_header::{PulseLayout, decode_pulse_header};
use super::task_header::decode_task_header;

/// Shared per-file decode parameters derived from the file header.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FileContext {
    pub pulse_layout: PulseLayout,
    pub grid: PixelGrid,
}

impl FileContext {
    pub(crate) fn new(header: &FileHeader, options: DecodeOptions) -> Self {
        Self {
            pulse_layout: PulseLayout {
                version: header.layout(),
                order: header.byte_order,
                legacy_32bit: options.legacy_32bit,
            },
            grid: PixelGrid {
                x: header.x_pixel_count,
                y: header.y_pixel_count,
            },
        }
    }

    pub(crate) fn order(&self) -> ByteOrder {
        self.pulse_layout.order
    }
}

/// Decode a complete bin file in document order.
pub fn decode_bin_file(bytes: &[u8], options: DecodeOptions) -> Result<BinFile, DecodeError> {
    let mut cursor = ByteCursor::new(bytes);
    let header = decode_file_header(&mut cursor, options.accept_newer_versions)?;
    let context = FileContext::new(&header, options);
    debug!(
        format_version = header.format_version,
        byte_order = header.byte_order.as_str(),
        task_count = header.task_count,
        x_pixels = header.x_pixel_count,
        y_pixels = header.y_pixel_count,
        "decoded file header"
    );

    let mut tasks = Vec::with_capacity(header.task_count.min(1024) as usize);
    for task_pos in 0..header.task_count as usize {
        tasks.push(decode_task(&mut cursor, &context, task_pos)?);
    }

    if !cursor.is_empty() {
        debug!(
            trailing_bytes = cursor.remaining(),
            "ignoring bytes after the last task"
        );
    }
    info!(
        tasks = tasks.len(),
        pulses = tasks.iter().map(|task| task.pulses.len()).sum::<usize>(),
        "decoded bin file"
    );

    Ok(BinFile { header, tasks })
}

fn decode_task(
    cursor: &mut ByteCursor<'_>,
    context: &FileContext,
    task_pos: usize,
) -> Result<Task, DecodeError> {
    let header = decode_task_header(cursor, context.order(), task_pos)?;
    debug!(
        task = task_pos,
        pulse_count = header.pulse_count,
        "decoded task header"
    );

    let mut pulses = Vec::with_capacity(header.pulse_count.min(4096) as usize);
    for pulse_pos in 0..header.pulse_count as usize {
        pulses.push(decode_pulse(cursor, context, task_pos, pulse_pos)?);
    }
    Ok(Task { header, pulses })
}

fn decode_pulse(
    cursor: &mut ByteCursor<'_>,
    context: &FileContext,
    task: usize,
    pulse: usize,
) -> Result<Pulse, DecodeError> {
    let header = decode_pulse_header(cursor, context.pulse_layout, task, pulse)?;
    let offset = cursor.position();
    let stored = read_payload(cursor, &header, task, pulse)?;
    let samples = decode_payload(
        stored,
        &header,
        context.grid,
        context.order(),
        Stage::PulsePayload { task, pulse },
        offset,
    )?;
    debug!(
        task,
        pulse,
        stored_bytes = header.pulse_data_bytes,
        compression = ?header.compression,
        "decoded pulse"
    );
    Ok(Pulse {
        header,
        active: samples.active,
        passive: samples.passive,
    })
}
