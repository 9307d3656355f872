//! Proximity Adaptor CLI
//!
//! Runs the evdev proximity adaptor and prints every published state change.

use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use proximity_adaptor::{
    buffer::{BufferError, RingBuffer, RingBufferReader},
    collector::{
        discover_devices, list_input_devices, load_capture, save_capture, Collector,
        CollectorConfig, SourcedEvent,
    },
    config::Config,
    datatypes::TimedState,
    registry::{AdaptorContext, AdaptorRegistry, BoxedInterpreter},
    stats::{load_persisted, AdaptorStats, SharedStats},
    InputDevAdaptor, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "proximity-adaptor")]
#[command(version = VERSION)]
#[command(about = "Publishes proximity sensor state changes from evdev input", long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read live input devices and print state changes
    Start {
        /// Device node to read (repeatable); skips discovery
        #[arg(long = "device")]
        devices: Vec<PathBuf>,

        /// Substring of the device name to discover
        #[arg(long = "match")]
        device_match: Option<String>,

        /// Change buffer capacity
        #[arg(long)]
        capacity: Option<usize>,

        /// Print changes as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Record raw input events to a capture file until Ctrl+C
    Record {
        /// Capture file to write
        output: PathBuf,

        /// Device node to read (repeatable); skips discovery
        #[arg(long = "device")]
        devices: Vec<PathBuf>,

        /// Substring of the device name to discover
        #[arg(long = "match")]
        device_match: Option<String>,
    },

    /// Run a recorded capture (JSON lines) through the adaptor
    Replay {
        /// Capture file
        file: PathBuf,

        /// Print changes as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// List input devices
    Devices,

    /// List registered adaptors
    Adaptors,

    /// Show configuration and cumulative statistics
    Status,

    /// Show configuration
    Config {
        /// Write the current configuration (defaults if none) to the config file
        #[arg(long)]
        init: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Start {
            devices,
            device_match,
            capacity,
            json,
        } => cmd_start(devices, device_match, capacity, json),
        Commands::Record {
            output,
            devices,
            device_match,
        } => cmd_record(&output, devices, device_match),
        Commands::Replay { file, json } => cmd_replay(&file, json),
        Commands::Devices => cmd_devices(),
        Commands::Adaptors => cmd_adaptors(),
        Commands::Status => cmd_status(),
        Commands::Config { init } => cmd_config(init),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        tracing::warn!("Could not load config, using defaults: {}", e);
        Config::default()
    })
}

/// Build the configured interpreter, or exit if the id is not registered.
fn build_interpreter(config: &Config, buffer: &Arc<RingBuffer<TimedState>>) -> BoxedInterpreter {
    let registry = AdaptorRegistry::with_defaults();
    let context = AdaptorContext {
        buffer: Arc::clone(buffer),
        codes: config.codes.clone(),
    };

    match registry.create(&config.adaptor, &context) {
        Some(interpreter) => interpreter,
        None => {
            tracing::error!(
                "Unknown adaptor '{}' (registered: {})",
                config.adaptor,
                registry.ids().join(", ")
            );
            std::process::exit(1);
        }
    }
}

/// Configured device nodes, or those discovered by name. Exits if none.
fn resolve_devices(config: &Config) -> Vec<PathBuf> {
    let device_paths = if config.device_paths.is_empty() {
        discover_devices(&config.device_match)
    } else {
        config.device_paths.clone()
    };
    if device_paths.is_empty() {
        tracing::error!(
            "No input device matching '{}' found; pass --device to choose one",
            config.device_match
        );
        std::process::exit(1);
    }
    device_paths
}

fn apply_device_args(config: &mut Config, devices: Vec<PathBuf>, device_match: Option<String>) {
    if !devices.is_empty() {
        config.device_paths = devices;
    }
    if let Some(device_match) = device_match {
        config.device_match = device_match;
    }
}

fn print_change(change: &TimedState, json: bool) {
    if json {
        match serde_json::to_string(change) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!("Could not serialize change: {}", e),
        }
    } else {
        println!("[{:>14}us] {}", change.timestamp, change.proximity());
    }
}

/// Print everything the reader has available.
fn print_available(reader: &mut RingBufferReader<TimedState>, json: bool) {
    loop {
        match reader.try_read() {
            Ok(change) => print_change(&change, json),
            Err(BufferError::Lagged { missed }) => {
                tracing::warn!(missed, "Change reader fell behind");
            }
            Err(BufferError::Empty) => return,
        }
    }
}

fn cmd_start(
    devices: Vec<PathBuf>,
    device_match: Option<String>,
    capacity: Option<usize>,
    json: bool,
) {
    let mut config = load_config();
    apply_device_args(&mut config, devices, device_match);
    if let Some(capacity) = capacity {
        config.buffer_capacity = capacity;
    }
    let device_paths = resolve_devices(&config);

    if let Err(e) = config.ensure_directories() {
        tracing::warn!("Could not create data directory: {}", e);
    }

    let stats: SharedStats = Arc::new(AdaptorStats::with_persistence(config.stats_path()));
    let buffer = RingBuffer::shared(config.buffer_capacity);
    let mut reader = buffer.subscribe();
    let mut adaptor = InputDevAdaptor::new(build_interpreter(&config, &buffer), stats.clone());

    let mut collector = Collector::new(CollectorConfig::for_devices(device_paths));
    if let Err(e) = collector.start() {
        tracing::error!("Error starting collector: {}", e);
        std::process::exit(1);
    }

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    // Consumer side: one independent reader printing changes as they land.
    let printer = {
        let running = running.clone();
        thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                match reader.read_timeout(Duration::from_millis(100)) {
                    Ok(change) => print_change(&change, json),
                    Err(BufferError::Lagged { missed }) => {
                        tracing::warn!(missed, "Change reader fell behind");
                    }
                    Err(BufferError::Empty) => {}
                }
            }
            print_available(&mut reader, json);
        })
    };

    tracing::info!(adaptor = %config.adaptor, "Press Ctrl+C to stop");
    adaptor.run(collector.receiver(), &running);

    running.store(false, Ordering::SeqCst);
    collector.stop();
    if printer.join().is_err() {
        tracing::error!("Change printer panicked");
    }
    stats.record_published(buffer.written());

    if collector.dropped() > 0 {
        tracing::warn!(dropped = collector.dropped(), "Records dropped on a full channel");
    }
    if let Err(e) = stats.save() {
        tracing::warn!("Could not save stats: {}", e);
    }

    eprintln!();
    eprintln!("{}", stats.summary());
}

fn cmd_record(output: &Path, devices: Vec<PathBuf>, device_match: Option<String>) {
    let mut config = load_config();
    apply_device_args(&mut config, devices, device_match);
    let device_paths = resolve_devices(&config);

    let mut collector = Collector::new(CollectorConfig::for_devices(device_paths));
    if let Err(e) = collector.start() {
        tracing::error!("Error starting collector: {}", e);
        std::process::exit(1);
    }

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());
    tracing::info!(output = %output.display(), "Recording, press Ctrl+C to stop");

    let mut records: Vec<SourcedEvent> = Vec::new();
    while running.load(Ordering::SeqCst) {
        match collector.receiver().recv_timeout(Duration::from_millis(100)) {
            Ok(record) => records.push(record),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    collector.stop();
    records.extend(collector.receiver().try_iter());

    if let Err(e) = save_capture(output, &records) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
    eprintln!("Recorded {} events to {}", records.len(), output.display());
}

fn cmd_replay(file: &Path, json: bool) {
    let config = load_config();
    let records = match load_capture(file) {
        Ok(records) => records,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let stats: SharedStats = Arc::new(AdaptorStats::new());
    let buffer = RingBuffer::shared(config.buffer_capacity);
    let mut reader = buffer.subscribe();
    let mut adaptor = InputDevAdaptor::new(build_interpreter(&config, &buffer), stats.clone());

    // Print between records so a small buffer never laps the reader.
    for record in &records {
        adaptor.dispatch(record);
        print_available(&mut reader, json);
    }
    stats.record_published(buffer.written());

    eprintln!();
    eprintln!("{}", stats.summary());
}

fn cmd_devices() {
    let config = load_config();
    let devices = list_input_devices();
    if devices.is_empty() {
        println!("No input devices found.");
        return;
    }

    let wanted = config.device_match.to_lowercase();
    for device in devices {
        let marker = if device.name.to_lowercase().contains(&wanted) {
            "*"
        } else {
            " "
        };
        println!("{marker} {}  {}", device.path.display(), device.name);
    }
}

fn cmd_adaptors() {
    for id in AdaptorRegistry::with_defaults().ids() {
        println!("{id}");
    }
}

fn cmd_status() {
    let config = load_config();

    println!("Proximity Adaptor Status");
    println!("========================");
    println!();
    println!("Configuration:");
    println!("  Adaptor: {}", config.adaptor);
    if config.device_paths.is_empty() {
        println!("  Devices: discover by name '{}'", config.device_match);
        for path in discover_devices(&config.device_match) {
            println!("    {}", path.display());
        }
    } else {
        println!("  Devices:");
        for path in &config.device_paths {
            println!("    {}", path.display());
        }
    }
    println!("  Buffer capacity: {}", config.buffer_capacity);
    println!("  Proximity fields:");
    for field in config.codes.fields() {
        println!("    type {} code {}", field.type_, field.code);
    }
    println!();

    let stats_path = config.stats_path();
    match load_persisted(&stats_path) {
        Ok(stats) => {
            println!("Cumulative Statistics:");
            println!("  Raw events: {}", stats.raw_events);
            println!("  Sync markers: {}", stats.sync_markers);
            println!("  Kernel drops: {}", stats.kernel_drops);
            println!("  Published changes: {}", stats.published_changes);
            println!("  Last updated: {}", stats.last_updated.format("%Y-%m-%d %H:%M:%S"));
        }
        Err(_) => println!("No previous session data found."),
    }
}

fn cmd_config(init: bool) {
    let config = load_config();

    if init {
        if let Err(e) = config.save() {
            tracing::error!("Could not write config: {}", e);
            std::process::exit(1);
        }
        println!("Wrote {}", Config::config_path().display());
    }

    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }
}
