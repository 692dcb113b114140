use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sacnrx_core::config::{ConfigFileError, ListenerConfig, OutputConfig};
use sacnrx_core::replay::memory_sink_for;
use sacnrx_core::source::UdpSource;
use sacnrx_core::{
    DEFAULT_GENERATED_AT, Listener, ListenerError, Receiver, ReplayError, ReplayOptions, Report,
    RouterOptions, SourceError, UniverseRouter, replay_pcap_file,
};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

mod logging;

use logging::LogLevel;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("SACNRX_BUILD_COMMIT"),
    ", ",
    env!("SACNRX_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "sacnrx")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "sACN (E1.31) receiver: drive lights from DMX universes, live or from a capture.",
    long_about = None,
    after_help = "Examples:\n  sacnrx listen --config show.json --duration-ms 60000 -o report.json\n  sacnrx replay capture.pcapng --config show.json --stdout --pretty\n  sacnrx validate show.json"
)]
struct Cli {
    /// Log verbosity on stderr (RUST_LOG takes precedence)
    #[arg(long, value_enum, global = true, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Receive sACN on the network and drive in-memory outputs.
    Listen {
        /// Listener configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Stop after this many milliseconds (runs until killed otherwise)
        #[arg(long)]
        duration_ms: Option<u64>,

        /// Sleep between idle polls
        #[arg(long, default_value_t = 5)]
        poll_ms: u64,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Replay a capture file through the receivers and report their final state.
    #[command(
        after_help = "Examples:\n  sacnrx replay capture.pcapng --config show.json -o report.json\n  sacnrx replay capture.pcap --config show.json --stdout --tail-ms 3000"
    )]
    Replay {
        /// Path to a .pcap or .pcapng file
        input: PathBuf,

        /// Listener configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Sleep so datagrams are delivered at capture pace
        #[arg(long)]
        realtime: bool,

        /// Virtual time to run after the last datagram
        #[arg(long, default_value_t = 0)]
        tail_ms: u64,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Check a configuration file without opening a socket.
    Validate {
        /// Listener configuration (JSON)
        config: PathBuf,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output report path (JSON)
    #[arg(short = 'o', long)]
    report: Option<PathBuf>,

    /// Write JSON report to stdout
    #[arg(long, conflicts_with = "report")]
    stdout: bool,

    /// Pretty-print JSON output
    #[arg(long, conflicts_with = "compact")]
    pretty: bool,

    /// Compact JSON output (default)
    #[arg(long)]
    compact: bool,

    /// Suppress non-error output
    #[arg(long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_level);

    let result = match cli.command {
        Commands::Listen {
            config,
            duration_ms,
            poll_ms,
            output,
        } => cmd_listen(&config, duration_ms, poll_ms, &output),
        Commands::Replay {
            input,
            config,
            realtime,
            tail_ms,
            output,
        } => cmd_replay(&input, &config, realtime, tail_ms, &output),
        Commands::Validate { config } => cmd_validate(&config),
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

impl From<ConfigFileError> for CliError {
    fn from(err: ConfigFileError) -> Self {
        let hint = match err {
            ConfigFileError::Read { .. } => "check the --config path",
            ConfigFileError::Parse(_) | ConfigFileError::ParseFile { .. } => {
                "the configuration must be a JSON object; see `receivers` in the docs"
            }
        };
        CliError::new(err.to_string(), Some(hint.to_string()))
    }
}

impl From<ListenerError> for CliError {
    fn from(err: ListenerError) -> Self {
        let hint = match &err {
            ListenerError::Source(SourceError::Bind { .. }) => {
                Some("another process may own the port; set \"port\" or \"bind_address\"")
            }
            ListenerError::Source(SourceError::Join { .. }) => {
                Some("set \"multicast_interface\" to the address of the lighting network")
            }
            ListenerError::Config(_) => Some("run `sacnrx validate` on the configuration"),
            _ => None,
        };
        CliError::new(err.to_string(), hint.map(str::to_string))
    }
}

impl From<ReplayError> for CliError {
    fn from(err: ReplayError) -> Self {
        match err {
            ReplayError::NoReceivers => no_receivers(),
            ReplayError::Listener(err) => err.into(),
            ReplayError::Source(err) => CliError::new(
                format!("capture replay failed: {err}"),
                Some("use a readable .pcap or .pcapng file".to_string()),
            ),
        }
    }
}

fn no_receivers() -> CliError {
    CliError::new(
        "no receivers configured",
        Some("add at least one entry under \"receivers\"".to_string()),
    )
}

fn cmd_listen(
    config_path: &Path,
    duration_ms: Option<u64>,
    poll_ms: u64,
    output: &OutputArgs,
) -> Result<(), CliError> {
    require_output(output)?;
    let config = ListenerConfig::load(config_path)?;
    if config.receivers.is_empty() {
        return Err(no_receivers());
    }
    let mut listener = Listener::new(
        UdpSource::new(config.udp_source_config()),
        config.listener_options(),
    );
    for (index, entry) in config.receivers.iter().enumerate() {
        listener
            .create_receiver(entry.receiver.clone(), memory_sink_for(entry))
            .map_err(|err| with_receiver(index, entry, err.into()))?;
    }
    if !output.quiet {
        eprintln!(
            "listening on port {} with {} receiver(s)",
            config.port,
            listener.receiver_count()
        );
    }

    let deadline = duration_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
    let idle = Duration::from_millis(poll_ms);
    loop {
        let summary = listener.tick()?;
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            break;
        }
        if summary.datagrams == 0 {
            thread::sleep(idle);
        }
    }
    info!(datagrams = listener.stats().datagrams, "listen finished");

    let report = Report::new(None, listener.stats().clone(), listener.snapshots());
    emit_report(report, output, None)
}

fn cmd_replay(
    input: &Path,
    config_path: &Path,
    realtime: bool,
    tail_ms: u64,
    output: &OutputArgs,
) -> Result<(), CliError> {
    validate_input_file(input)?;
    require_output(output)?;
    let config = ListenerConfig::load(config_path)?;
    let options = ReplayOptions {
        realtime,
        tail: Duration::from_millis(tail_ms),
    };
    let report = replay_pcap_file(input, &config, options)?;
    emit_report(report, output, Some(input))
}

fn cmd_validate(config_path: &Path) -> Result<(), CliError> {
    let config = ListenerConfig::load(config_path)?;
    if config.receivers.is_empty() {
        return Err(no_receivers());
    }
    let mut router = UniverseRouter::new(RouterOptions {
        allow_overlapping_ranges: config.allow_overlapping_ranges,
        ..RouterOptions::default()
    });
    for (index, entry) in config.receivers.iter().enumerate() {
        Receiver::new(entry.receiver.clone(), memory_sink_for(entry))
            .and_then(|receiver| router.register(receiver))
            .map_err(|err| {
                with_receiver(
                    index,
                    entry,
                    CliError::new(
                        err.to_string(),
                        Some("fix the receiver entry and run validate again".to_string()),
                    ),
                )
            })?;
    }
    eprintln!(
        "OK: {} receiver(s) on {} universe(s)",
        router.len(),
        router.universes().count()
    );
    Ok(())
}

fn with_receiver(index: usize, entry: &OutputConfig, err: CliError) -> CliError {
    let label = if entry.receiver.name.is_empty() {
        format!("receiver {index}")
    } else {
        format!("receiver {index} ('{}')", entry.receiver.name)
    };
    CliError::new(format!("{label}: {}", err.message), err.hint)
}

fn emit_report(mut report: Report, output: &OutputArgs, input: Option<&Path>) -> Result<(), CliError> {
    report.generated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| DEFAULT_GENERATED_AT.to_string());
    let json = serialize_report(&report, output.pretty, output.compact)?;

    if output.stdout {
        println!("{}", json);
        return Ok(());
    }
    let Some(path) = output.report.as_ref() else {
        return Ok(());
    };
    if let Some(input) = input {
        ensure_distinct_paths(input, path)?;
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    fs::write(path, json).with_context(|| format!("Failed to write report: {}", path.display()))?;
    if !output.quiet {
        eprintln!("OK: report written -> {}", path.display());
    }
    Ok(())
}

fn serialize_report(report: &Report, pretty: bool, compact: bool) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(report)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(report)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn require_output(output: &OutputArgs) -> Result<(), CliError> {
    if !output.stdout && output.report.is_none() {
        return Err(CliError::new(
            "missing output path",
            Some("use -o/--report or --stdout".to_string()),
        ));
    }
    Ok(())
}

fn ensure_distinct_paths(input: &Path, report: &Path) -> Result<(), CliError> {
    let input_abs = fs::canonicalize(input)
        .with_context(|| format!("Failed to resolve input path: {}", input.display()))?;
    let parent = match report.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Ok(report_dir) = fs::canonicalize(parent) else {
        return Ok(());
    };
    let Some(file_name) = report.file_name() else {
        return Err(CliError::new(
            format!("invalid report path: {}", report.display()),
            None,
        ));
    };
    if report_dir.join(file_name) == input_abs {
        return Err(CliError::new(
            format!("report path must differ from input: {}", report.display()),
            Some("choose a different output path".to_string()),
        ));
    }
    Ok(())
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    if !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "pcap" && ext != "pcapng" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .pcap or .pcapng file".to_string()),
        ));
    }
    Ok(())
}
