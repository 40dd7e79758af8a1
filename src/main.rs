// Trace Native Host - Main Entry Point
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Native messaging host for browser trace events. stdout carries frames,
// all logging goes to stderr.
// Usage:
//   trace-native-host [caller-origin]                  # Message loop (browser launch)
//   trace-native-host generate-manifest [--origin ..]  # Write <exe>.json manifest
//   trace-native-host register                         # Make manifest discoverable
//   trace-native-host install                          # generate-manifest + register
//   trace-native-host resolve <source> [context]       # Show effective threshold
//   trace-native-host status                           # Show loaded settings

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use trace_native_host::{
    config, manifest, paths,
    level::TraceLevel,
    message::TraceMessage,
    policy::{self, Settings},
    session::Session,
    sink::{FileSink, LogSink, TraceSink},
};

#[derive(Parser)]
#[command(name = "trace-native-host")]
#[command(author = "Joseph Stone")]
#[command(version)]
#[command(about = "Native messaging host that filters and records browser trace events")]
struct Cli {
    /// Settings file (default: AppSettings.json beside the executable)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Append accepted messages to this file instead of the log
    #[arg(long, global = true)]
    trace_file: Option<PathBuf>,

    /// Origin of the calling extension, supplied by the browser
    caller_origin: Option<String>,

    /// Native window handle of the caller, supplied by the browser on Windows
    #[arg(long, hide = true)]
    parent_window: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct ManifestArgs {
    /// Native messaging host name
    #[arg(long, default_value = manifest::DEFAULT_HOST_NAME)]
    name: String,

    /// Allowed extension origin (repeatable)
    #[arg(long = "origin", default_value = manifest::DEFAULT_ORIGIN)]
    origins: Vec<String>,

    /// Manifest path (default: executable path with .json extension)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl ManifestArgs {
    fn output(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(paths::default_manifest_path)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write the native messaging manifest
    GenerateManifest(ManifestArgs),

    /// Register an existing manifest with the browser
    Register {
        /// Native messaging host name
        #[arg(long, default_value = manifest::DEFAULT_HOST_NAME)]
        name: String,

        /// Manifest to register (default: executable path with .json extension)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// Generate the manifest, then register it
    Install(ManifestArgs),

    /// Show the effective trace level for a source and context
    Resolve {
        source: String,

        context: Option<String>,

        /// Also report whether a message at this level would pass
        #[arg(short, long)]
        level: Option<String>,
    },

    /// Show the loaded settings
    Status,
}

fn main() -> Result<()> {
    // Initialize logging (safe if already init). env_logger writes to stderr.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(paths::default_config_path);
    let settings = config::load(&config_path);

    match &cli.command {
        None => serve(&cli, settings.as_ref()),

        Some(Commands::GenerateManifest(args)) => {
            let output = args.output();
            let manifest = manifest::generate(&args.name, args.origins.clone(), &output)?;
            println!("{}", serde_json::to_string_pretty(&manifest)?);
            println!("Manifest written to {}", output.display());
            Ok(())
        }

        Some(Commands::Register { name, manifest: manifest_path }) => {
            let manifest_path = manifest_path.clone().unwrap_or_else(paths::default_manifest_path);
            let location = manifest::register(name, &manifest_path)?;
            println!("Registered {} at {}", name, location);
            Ok(())
        }

        Some(Commands::Install(args)) => {
            let output = args.output();
            let location = manifest::install(&args.name, args.origins.clone(), &output)?;
            println!("Manifest: {}", output.display());
            println!("Registered {} at {}", args.name, location);
            Ok(())
        }

        Some(Commands::Resolve { source, context, level }) => {
            let threshold = policy::resolve_level(settings.as_ref(), Some(source.as_str()), context.as_deref());
            let mut report = serde_json::json!({
                "source": source,
                "context": context,
                "threshold": threshold,
            });
            if let Some(raw) = level {
                let level = TraceLevel::parse_lenient(raw).level();
                let mut sample = TraceMessage::trace("sample").with_source(source).with_level(level);
                sample.context = context.clone();
                report["level"] = serde_json::json!(level);
                report["passes"] = serde_json::json!(policy::should_process(&sample, settings.as_ref()));
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }

        Some(Commands::Status) => {
            println!("Trace Native Host v{}", env!("CARGO_PKG_VERSION"));
            println!("Executable: {}", paths::exe_path().display());
            println!("Config: {}", config_path.display());
            println!();
            match &settings {
                Some(settings) => println!("{}", serde_json::to_string_pretty(settings)?),
                None => println!(
                    "No settings configured; every source resolves to {}",
                    policy::UNCONFIGURED_LEVEL
                ),
            }
            Ok(())
        }
    }
}

/// Run the native messaging loop on stdin/stdout until the peer disconnects
fn serve(cli: &Cli, settings: Option<&Settings>) -> Result<()> {
    if let Some(origin) = &cli.caller_origin {
        log::info!("Launched by {}", origin);
    }
    if let Some(hwnd) = &cli.parent_window {
        log::debug!("Parent window {}", hwnd);
    }

    let sink: Box<dyn TraceSink> = match &cli.trace_file {
        Some(path) => Box::new(
            FileSink::open(path).with_context(|| format!("Failed to open trace file {:?}", path))?,
        ),
        None => Box::new(LogSink),
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut session = Session::new(stdin.lock(), stdout.lock(), sink, settings);
    session.run().context("Native messaging stream failed")?;
    Ok(())
}
