#![allow(dead_code)]

use std::io::Write;

use flate2::Compression as ZlibLevel;
use flate2::write::ZlibEncoder;

/// Builds synthetic bin captures for integration tests.
pub struct Fixture {
    pub version: u8,
    pub big_endian: bool,
    pub x: u32,
    pub y: u32,
    pub legacy_32bit: bool,
    pub tasks: Vec<FixtureTask>,
}

pub struct FixtureTask {
    pub pulses: Vec<FixturePulse>,
}

pub struct FixturePulse {
    pub time_gate_start: f64,
    pub time_gate_stop: f64,
    pub bins: u32,
    pub samples_per_bin: u32,
    pub zlib: bool,
    /// Per pixel `[passive, active...]`, x-major then y.
    pub samples: Vec<f64>,
}

impl FixturePulse {
    /// Pixel `p` gets passive `p` and active samples `p * 10 + k + 1`.
    pub fn ramp(x: u32, y: u32, bins: u32, samples_per_bin: u32) -> Self {
        let channels = bins * samples_per_bin + 1;
        let mut samples = Vec::new();
        for pixel in 0..x * y {
            samples.push(f64::from(pixel));
            for k in 0..channels - 1 {
                samples.push(f64::from(pixel * 10 + k + 1));
            }
        }
        Self {
            time_gate_start: 1e-6,
            time_gate_stop: 3e-6,
            bins,
            samples_per_bin,
            zlib: false,
            samples,
        }
    }

    pub fn zlib(mut self) -> Self {
        self.zlib = true;
        self
    }
}

impl Fixture {
    pub fn new(version: u8, x: u32, y: u32) -> Self {
        Self {
            version,
            big_endian: false,
            x,
            y,
            legacy_32bit: false,
            tasks: Vec::new(),
        }
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    pub fn legacy_32bit(mut self) -> Self {
        self.legacy_32bit = true;
        self
    }

    pub fn task(mut self, pulses: Vec<FixturePulse>) -> Self {
        self.tasks.push(FixtureTask { pulses });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut w = Writer {
            out: Vec::new(),
            big: self.big_endian,
        };
        w.raw(b"DIRSIGPROTO");
        w.raw(&[self.version, if self.big_endian { 0 } else { 1 }]);
        w.text("20130209T134501", 15);
        w.text("4.7.0", 32);
        w.text("fixture scene", 256);
        w.f64s(&[43.0, -77.5, 150.0]);
        w.text("static", 16);
        w.text("static", 16);
        w.u32(self.x);
        w.u32(self.y);
        w.f64s(&[1e-5, 1e-5]);
        if self.version > 0 {
            w.f64s(&[0.0, 0.0, 0.0, 0.0]);
        }
        w.u32(self.tasks.len() as u32);
        if self.version > 1 {
            w.u16(1);
        }

        for task in &self.tasks {
            w.text("fixture task", 64);
            w.text("20130209T134501", 15);
            w.text("20130209T134502", 15);
            w.f64s(&[1.0, 1000.0, 1e-8, 1e-3, 1.064, 0.001]);
            w.u32(task.pulses.len() as u32);
            for (index, pulse) in task.pulses.iter().enumerate() {
                self.write_pulse(&mut w, index as u32, pulse);
            }
        }
        w.out
    }

    fn write_pulse(&self, w: &mut Writer, index: u32, pulse: &FixturePulse) {
        let identity: Vec<f64> = (0..16).map(|i| if i % 5 == 0 { 1.0 } else { 0.0 }).collect();
        let mut payload = Vec::new();
        for value in &pulse.samples {
            payload.extend_from_slice(&if self.big_endian {
                value.to_be_bytes()
            } else {
                value.to_le_bytes()
            });
        }
        if pulse.zlib {
            let mut encoder = ZlibEncoder::new(Vec::new(), ZlibLevel::default());
            encoder.write_all(&payload).unwrap();
            payload = encoder.finish().unwrap();
        }

        w.f64s(&[
            f64::from(index) * 1e-3,
            pulse.time_gate_start,
            pulse.time_gate_stop,
        ]);
        w.u32(pulse.bins);
        if self.version > 0 {
            w.u32(pulse.samples_per_bin);
        }
        w.f64s(&[0.0, 0.0, 1000.0]);
        if self.version > 1 {
            w.f64s(&[0.0; 3]);
            w.f64s(&identity);
            w.f64s(&[0.0; 3]);
            w.f64s(&identity);
            w.f64s(&identity);
            w.f64s(&[0.0; 3]);
            w.f64s(&identity);
        } else {
            w.raw(b"XYZ");
            w.f64s(&[0.0; 3]);
            for _ in 0..2 {
                w.f64s(&[0.0; 3]);
                w.raw(b"XYZ");
                w.f64s(&[0.0; 3]);
            }
        }
        w.u32(5);
        w.raw(&[u8::from(pulse.zlib)]);
        if self.version > 1 {
            w.u32(index);
        } else {
            w.raw(&[0]);
        }
        if self.version < 2 && self.legacy_32bit {
            w.u32(payload.len() as u32);
        } else {
            w.u64(payload.len() as u64);
        }
        if self.version > 1 {
            w.f64s(&identity);
            w.f64s(&identity);
        }
        w.raw(&payload);
    }
}

struct Writer {
    out: Vec<u8>,
    big: bool,
}

impl Writer {
    fn raw(&mut self, bytes: &[u8]) {
        self.out.extend_from_slice(bytes);
    }

    fn text(&mut self, value: &str, len: usize) {
        let mut field = value.as_bytes().to_vec();
        field.resize(len, 0);
        self.raw(&field);
    }

    fn u16(&mut self, value: u16) {
        let bytes = if self.big {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.raw(&bytes);
    }

    fn u32(&mut self, value: u32) {
        let bytes = if self.big {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.raw(&bytes);
    }

    fn u64(&mut self, value: u64) {
        let bytes = if self.big {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.raw(&bytes);
    }

    fn f64s(&mut self, values: &[f64]) {
        for value in values {
            let bytes = if self.big {
                value.to_be_bytes()
            } else {
                value.to_le_bytes()
            };
            self.raw(&bytes);
        }
    }
}
