use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use lidarbin_core::{
    BinFile, DecodeOptions, FileSummary, InputInfo, MountGeometry, Pulse, PulseIndex,
    PulseSummary, decode_files_parallel, map_file, read_bin_file,
};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("LIDARBIN_BUILD_COMMIT"),
    " ",
    env!("LIDARBIN_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "lidarbin")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Decoder for DIRSIG waveform lidar bin captures.",
    long_about = None,
    after_help = "Examples:\n  lidarbin inspect capture.bin\n  lidarbin inspect capture.bin --task 0 --pulse 3\n  lidarbin summary 'runs/*.bin' --pretty"
)]
struct Cli {
    /// Log decode progress to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Copy)]
struct DecodeArgs {
    /// Read version 0/1 payload lengths as u32 (32-bit simulator builds)
    #[arg(long)]
    legacy_32bit: bool,

    /// Decode format versions newer than 2 with the version 2 layout
    #[arg(long)]
    accept_newer: bool,
}

impl DecodeArgs {
    fn options(self) -> DecodeOptions {
        DecodeOptions {
            legacy_32bit: self.legacy_32bit,
            accept_newer_versions: self.accept_newer,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode one capture and print its headers, or a single pulse.
    Inspect {
        /// Path (or single-match glob) to a .bin capture
        input: PathBuf,

        /// Task to inspect (0-based)
        #[arg(long, requires = "pulse")]
        task: Option<usize>,

        /// Pulse within the task (0-based)
        #[arg(long, requires = "task")]
        pulse: Option<usize>,

        /// List pulse locations without decoding payloads
        #[arg(long, conflicts_with_all = ["task", "pulse"])]
        index: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output
        #[arg(long, requires = "json")]
        pretty: bool,

        #[command(flatten)]
        decode: DecodeArgs,
    },
    /// Decode many captures in parallel and print a JSON summary.
    Summary {
        /// Capture paths or glob patterns
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output path (JSON); stdout when omitted
        #[arg(short = 'o', long)]
        report: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        #[command(flatten)]
        decode: DecodeArgs,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Inspect {
            input,
            task,
            pulse,
            index,
            json,
            pretty,
            decode,
        } => cmd_inspect(&input, task.zip(pulse), index, json, pretty, decode.options()),
        Commands::Summary {
            inputs,
            report,
            pretty,
            decode,
        } => cmd_summary(&inputs, report, pretty, decode.options()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "lidarbin_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

/// Summaries of several captures plus run metadata.
#[derive(Debug, Serialize)]
struct SummaryReport {
    generated_at: String,
    files: Vec<FileSummary>,
}

fn cmd_inspect(
    input: &Path,
    selected: Option<(usize, usize)>,
    index: bool,
    json: bool,
    pretty: bool,
    options: DecodeOptions,
) -> Result<(), CliError> {
    let resolved = resolve_single_input(input)?;
    validate_input_file(&resolved)?;

    if index {
        let map = map_file(&resolved)
            .with_context(|| format!("Failed to read input file: {}", resolved.display()))?;
        let index = PulseIndex::scan(&map, options)
            .with_context(|| format!("Failed to index capture: {}", resolved.display()))?;
        print_index(&index);
        return Ok(());
    }

    let bin = read_bin_file(&resolved, options)
        .with_context(|| format!("Failed to decode capture: {}", resolved.display()))?;
    debug!(path = %resolved.display(), pulses = bin.pulse_count(), "decoded capture");

    if let Some((task, pulse)) = selected {
        let found = bin
            .task(task)
            .and_then(|t| t.pulse(pulse))
            .ok_or_else(|| {
                CliError::new(
                    format!("no pulse {pulse} in task {task}"),
                    Some(format!("the capture has {} task(s)", bin.tasks.len())),
                )
            })?;
        if json {
            let summary = PulseSummary::from_pulse(pulse, found);
            print!("{}", to_json(&summary, pretty)?);
        } else {
            print_pulse(task, pulse, found);
        }
        return Ok(());
    }

    if json {
        let summary = FileSummary::from_bin_file(&bin, input_info(&resolved)?);
        print!("{}", to_json(&summary, pretty)?);
    } else {
        print_bin_file(&resolved, &bin);
    }
    Ok(())
}

fn cmd_summary(
    inputs: &[PathBuf],
    report: Option<PathBuf>,
    pretty: bool,
    options: DecodeOptions,
) -> Result<(), CliError> {
    let mut paths = Vec::new();
    for input in inputs {
        paths.extend(resolve_inputs(input)?);
    }
    for path in &paths {
        validate_input_file(path)?;
    }

    let results = decode_files_parallel(&paths, options);
    let mut files = Vec::with_capacity(paths.len());
    for (path, result) in paths.iter().zip(results) {
        let bin = result.map_err(|err| {
            CliError::new(
                format!("failed to decode {}: {err}", path.display()),
                Some("check --legacy-32bit / --accept-newer for older or newer captures".to_string()),
            )
        })?;
        files.push(FileSummary::from_bin_file(&bin, input_info(path)?));
    }

    let generated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("Failed to format timestamp")?;
    let json = to_json(
        &SummaryReport {
            generated_at,
            files,
        },
        pretty,
    )?;

    match report {
        Some(report) => {
            if let Some(parent) = report.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory: {}", parent.display())
                    })?;
                }
            }
            fs::write(&report, json)
                .with_context(|| format!("Failed to write report: {}", report.display()))?;
            eprintln!("OK: summary written -> {}", report.display());
        }
        None => print!("{}", json),
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("JSON serialization failed").map_err(Into::into)
}

fn input_info(path: &Path) -> Result<InputInfo, CliError> {
    let meta = fs::metadata(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    Ok(InputInfo {
        path: path.display().to_string(),
        bytes: meta.len(),
    })
}

fn print_bin_file(path: &Path, bin: &BinFile) {
    let header = &bin.header;
    println!("file: {}", path.display());
    println!(
        "format version {} ({} endian), DIRSIG {}",
        header.format_version,
        header.byte_order.as_str(),
        header.dirsig_version
    );
    println!("created: {}", header.creation_date_time);
    if !header.simulation_description.is_empty() {
        println!("description: {}", header.simulation_description);
    }
    println!(
        "array: {} x {} pixels, pitch {} x {} m",
        header.x_pixel_count, header.y_pixel_count, header.x_pixel_pitch, header.y_pixel_pitch
    );
    println!("tasks: {}", bin.tasks.len());
    for (index, task) in bin.tasks.iter().enumerate() {
        println!(
            "  task {index}: '{}' {} -> {}, {} pulse(s), PRF {} Hz",
            task.header.description,
            task.header.start_date_time,
            task.header.stop_date_time,
            task.pulses.len(),
            task.header.pulse_repetition_frequency
        );
    }
}

fn print_pulse(task: usize, index: usize, pulse: &Pulse) {
    let header = &pulse.header;
    let (x, y, bins) = pulse.shape_triplet();
    println!("task {task} pulse {index}");
    println!("  time: {} s", header.pulse_time);
    println!(
        "  gate: {} .. {} s, {} bin(s) x {} sample(s)",
        header.time_gate_start,
        header.time_gate_stop,
        header.time_gate_bin_count,
        header.samples_per_time_bin
    );
    println!(
        "  mount: {}",
        match header.mount {
            MountGeometry::Legacy { .. } => "legacy offsets",
            MountGeometry::Affine { .. } => "affine",
        }
    );
    println!(
        "  payload: {} byte(s) stored, {:?}",
        header.pulse_data_bytes, header.compression
    );
    println!("  active: {x} x {y} x {bins}");
    let stats = pulse.stats();
    if let (Some(min), Some(max)) = (stats.active_min, stats.active_max) {
        println!("  active range: {min} .. {max} (sum {})", stats.active_sum);
    }
    println!("  passive sum: {}", stats.passive_sum);
    let ranges = pulse.bin_ranges();
    if let (Some(first), Some(last)) = (ranges.first(), ranges.last()) {
        println!("  range: {first:.3} .. {last:.3} m");
    }
}

fn print_index(index: &PulseIndex) {
    println!("pulses: {}", index.len());
    for location in &index.pulses {
        println!(
            "  task {} pulse {}: header @{} payload {}..{} ({:?})",
            location.task,
            location.pulse,
            location.header_offset,
            location.payload.start,
            location.payload.end,
            location.header.compression
        );
    }
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("pass a DIRSIG .bin capture".to_string()),
        ));
    }
    if !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("pass a DIRSIG .bin capture".to_string()),
        ));
    }
    Ok(())
}

fn resolve_single_input(input: &Path) -> Result<PathBuf, CliError> {
    let mut matches = resolve_inputs(input)?;
    if matches.len() > 1 {
        let pattern = input.to_string_lossy();
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let more = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple files match pattern '{}' ({} matches); matches: {listed}{more}",
                pattern,
                matches.len()
            ),
            Some("pass a single capture, or use `lidarbin summary` for many".to_string()),
        ));
    }
    Ok(matches.remove(0))
}

/// Expand a glob pattern into sorted file matches; plain paths pass through.
fn resolve_inputs(input: &Path) -> Result<Vec<PathBuf>, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern".to_string()),
        ));
    }
    matches.sort();
    Ok(matches)
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
