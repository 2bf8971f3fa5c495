mod common;

use common::{Fixture, FixturePulse};
use lidarbin_core::signal::{ranges, signals};
use lidarbin_core::{
    ByteOrder, Compression, DecodeError, DecodeOptions, MountGeometry, PulseIndex,
    PulseSequencing, Stage, decode, decode_with_options,
};

#[test]
fn decodes_v2_grid_end_to_end() {
    let bytes = Fixture::new(2, 2, 2)
        .task(vec![FixturePulse::ramp(2, 2, 1, 1)])
        .build();
    let bin = decode(&bytes).unwrap();

    assert_eq!(bin.header.format_version, 2);
    assert_eq!(bin.header.byte_order, ByteOrder::Little);
    assert_eq!(bin.header.focal_plane_array_id, Some(1));
    assert_eq!(bin.tasks.len(), 1);
    assert_eq!(bin.tasks[0].header.pulse_count, 1);

    let pulse = &bin.tasks[0].pulses[0];
    assert!(matches!(pulse.header.mount, MountGeometry::Affine { .. }));
    assert_eq!(pulse.header.sequencing, PulseSequencing::Index(0));
    assert!(pulse.header.mueller.is_some());
    assert_eq!(pulse.active.dim(), (2, 2, 1));
    assert_eq!(pulse.passive.dim(), (2, 2));
    assert_eq!(pulse.active[[0, 0, 0]], 1.0);
    assert_eq!(pulse.active[[1, 1, 0]], 31.0);
    let width = pulse.range_gate_width();
    assert_eq!(pulse.passive[[1, 1]], 3.0 * width);
    assert_eq!(pulse.passive[[0, 0]], 0.0);
}

#[test]
fn decoding_is_deterministic() {
    let bytes = Fixture::new(2, 2, 1)
        .task(vec![
            FixturePulse::ramp(2, 1, 3, 2),
            FixturePulse::ramp(2, 1, 3, 2).zlib(),
        ])
        .build();
    assert_eq!(decode(&bytes).unwrap(), decode(&bytes).unwrap());
}

#[test]
fn bad_magic_is_rejected() {
    let mut bytes = Fixture::new(2, 1, 1).build();
    bytes[0] = b'X';
    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err, DecodeError::BadMagic { .. }));
    assert_eq!(err.stage(), Stage::Magic);
}

#[test]
fn newer_version_requires_opt_in() {
    let mut bytes = Fixture::new(2, 1, 1)
        .task(vec![FixturePulse::ramp(1, 1, 2, 1)])
        .build();
    bytes[11] = 3;
    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err, DecodeError::UnsupportedVersion { version: 3 }));

    let options = DecodeOptions {
        accept_newer_versions: true,
        ..DecodeOptions::default()
    };
    let bin = decode_with_options(&bytes, options).unwrap();
    assert_eq!(bin.header.format_version, 3);
    assert_eq!(bin.tasks[0].pulses[0].active.dim(), (1, 1, 2));
}

#[test]
fn v0_defaults_one_sample_per_bin() {
    let bytes = Fixture::new(0, 1, 1)
        .task(vec![FixturePulse::ramp(1, 1, 4, 1)])
        .build();
    let bin = decode(&bytes).unwrap();
    assert!(bin.header.array_geometry.is_none());
    let pulse = &bin.tasks[0].pulses[0];
    assert_eq!(pulse.header.samples_per_time_bin, 1);
    assert_eq!(pulse.header.sequencing, PulseSequencing::DeltaHistogram(0));
    assert_eq!(pulse.shape_triplet(), (1, 1, 4));
    assert_eq!(pulse.squeezed_active().shape(), &[4]);
}

#[test]
fn v1_samples_per_bin_widen_active_axis() {
    let bytes = Fixture::new(1, 1, 2)
        .task(vec![FixturePulse::ramp(1, 2, 2, 3)])
        .build();
    let bin = decode(&bytes).unwrap();
    let pulse = &bin.tasks[0].pulses[0];
    assert_eq!(pulse.num_time_bins(), 6);
    assert_eq!(pulse.bin_times().len(), 6);
    assert_eq!(pulse.bin_ranges().len(), 2);
}

#[test]
fn legacy_32bit_length_needs_option() {
    let bytes = Fixture::new(1, 1, 1)
        .legacy_32bit()
        .task(vec![FixturePulse::ramp(1, 1, 2, 1)])
        .build();
    assert!(decode(&bytes).is_err());

    let options = DecodeOptions {
        legacy_32bit: true,
        ..DecodeOptions::default()
    };
    let bin = decode_with_options(&bytes, options).unwrap();
    assert_eq!(bin.tasks[0].pulses[0].active[[0, 0, 1]], 2.0);
}

#[test]
fn byte_orders_decode_to_same_values() {
    let little = Fixture::new(2, 2, 1)
        .task(vec![FixturePulse::ramp(2, 1, 2, 1)])
        .build();
    let big = Fixture::new(2, 2, 1)
        .big_endian()
        .task(vec![FixturePulse::ramp(2, 1, 2, 1)])
        .build();
    let little = decode(&little).unwrap();
    let big = decode(&big).unwrap();
    assert_eq!(big.header.byte_order, ByteOrder::Big);
    assert_eq!(big.header.byte_order_tag, 0);
    assert_eq!(little.tasks, big.tasks);
}

#[test]
fn zlib_payload_matches_raw() {
    let raw = Fixture::new(2, 2, 2)
        .task(vec![FixturePulse::ramp(2, 2, 5, 1)])
        .build();
    let zlib = Fixture::new(2, 2, 2)
        .task(vec![FixturePulse::ramp(2, 2, 5, 1).zlib()])
        .build();
    let raw = decode(&raw).unwrap();
    let zlib = decode(&zlib).unwrap();
    let raw_pulse = &raw.tasks[0].pulses[0];
    let zlib_pulse = &zlib.tasks[0].pulses[0];
    assert_eq!(zlib_pulse.header.compression, Compression::Zlib);
    assert_eq!(raw_pulse.active, zlib_pulse.active);
    assert_eq!(raw_pulse.passive, zlib_pulse.passive);
}

#[test]
fn task_without_pulses_is_legal() {
    let bytes = Fixture::new(2, 1, 1)
        .task(Vec::new())
        .task(vec![FixturePulse::ramp(1, 1, 1, 1)])
        .build();
    let bin = decode(&bytes).unwrap();
    assert_eq!(bin.tasks.len(), 2);
    assert!(bin.tasks[0].pulses.is_empty());
    assert_eq!(bin.pulse_count(), 1);
    assert_eq!(ranges(&bin)[0].len(), 0);
    assert_eq!(signals(&bin).unwrap()[1].len(), 1);
}

#[test]
fn truncated_payload_reports_stage() {
    let mut bytes = Fixture::new(2, 1, 1)
        .task(vec![
            FixturePulse::ramp(1, 1, 2, 1),
            FixturePulse::ramp(1, 1, 2, 1),
        ])
        .build();
    bytes.truncate(bytes.len() - 4);
    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err, DecodeError::TruncatedInput { .. }));
    assert_eq!(err.stage(), Stage::PulsePayload { task: 0, pulse: 1 });
}

#[test]
fn payload_length_mismatch_is_rejected() {
    let mut pulse = FixturePulse::ramp(1, 1, 2, 1);
    pulse.samples.pop();
    let bytes = Fixture::new(2, 1, 1).task(vec![pulse]).build();
    let err = decode(&bytes).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::SizeMismatch {
            expected: 24,
            actual: 16,
            ..
        }
    ));
}

#[test]
fn parallel_index_matches_sequential_decode() {
    let bytes = Fixture::new(2, 2, 2)
        .task(vec![
            FixturePulse::ramp(2, 2, 3, 1),
            FixturePulse::ramp(2, 2, 3, 1).zlib(),
        ])
        .task(vec![FixturePulse::ramp(2, 2, 1, 2)])
        .build();
    let index = PulseIndex::scan(&bytes, DecodeOptions::default()).unwrap();
    assert_eq!(index.len(), 3);
    let location = index.locate(1, 0).unwrap();
    assert_eq!(location.header.samples_per_time_bin, 2);

    let single = index.decode_pulse(&bytes, location).unwrap();
    assert_eq!(single.active.dim(), (2, 2, 2));

    let parallel = index.decode_parallel(&bytes).unwrap();
    assert_eq!(parallel, decode(&bytes).unwrap());
}

#[test]
fn index_reports_earlier_payload_error_before_later_truncation() {
    let mut short = FixturePulse::ramp(1, 1, 2, 1);
    short.samples.pop();
    let mut bytes = Fixture::new(2, 1, 1)
        .task(vec![short, FixturePulse::ramp(1, 1, 2, 1)])
        .build();
    // Drops the second payload and the tail of the second pulse header.
    bytes.truncate(bytes.len() - 40);

    let sequential = decode(&bytes).unwrap_err();
    assert!(matches!(sequential, DecodeError::SizeMismatch { .. }));
    assert_eq!(sequential.stage(), Stage::PulsePayload { task: 0, pulse: 0 });

    let indexed = PulseIndex::scan(&bytes, DecodeOptions::default())
        .and_then(|index| index.decode_parallel(&bytes))
        .unwrap_err();
    assert_eq!(indexed.stage(), sequential.stage());
    assert_eq!(indexed.offset(), sequential.offset());
    assert_eq!(indexed.to_string(), sequential.to_string());
}

#[test]
fn parallel_decode_reports_first_bad_payload() {
    let pulses = (0..4)
        .map(|k| {
            let mut pulse = FixturePulse::ramp(1, 1, 2, 1);
            if k > 0 {
                pulse.samples.pop();
            }
            pulse
        })
        .collect();
    let bytes = Fixture::new(2, 1, 1).task(pulses).build();

    let sequential = decode(&bytes).unwrap_err();
    let index = PulseIndex::scan(&bytes, DecodeOptions::default()).unwrap();
    let parallel = index.decode_parallel(&bytes).unwrap_err();
    assert_eq!(parallel.stage(), Stage::PulsePayload { task: 0, pulse: 1 });
    assert_eq!(parallel.to_string(), sequential.to_string());
}
