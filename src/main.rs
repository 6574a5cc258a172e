use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use tabherd::config::RelayConfig;
use tabherd::{rest, AppContext};

#[derive(Parser)]
#[command(
    name = "tabherd",
    about = "Tab control relay — command mailbox for polling tab agents",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// REST server port
    #[arg(long, env = "TABHERD_PORT")]
    port: Option<u16>,

    /// Bind address (default: 0.0.0.0 — agents poll from other machines)
    #[arg(long, env = "TABHERD_BIND")]
    bind_address: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TABHERD_LOG")]
    log: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "TABHERD_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,

    /// Log format: "pretty" (default) or "json"
    #[arg(long, env = "TABHERD_LOG_FORMAT")]
    log_format: Option<String>,

    /// Optional TOML config file. Flags and env vars win over file values.
    #[arg(long, env = "TABHERD_CONFIG")]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the relay server (default when no subcommand given).
    ///
    /// Runs tabherd in the foreground. Examples:
    ///   tabherd serve
    ///   tabherd
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    match args.command {
        Some(Command::Serve) | None => run_server(args).await,
    }
}

async fn run_server(args: Args) -> Result<()> {
    let file = args
        .config
        .as_deref()
        .map(RelayConfig::load_file)
        .unwrap_or_default();
    let config = RelayConfig::new(args.port, args.bind_address, args.log, args.log_format, file);

    let _guard = setup_logging(&config.log, args.log_file.as_deref(), &config.log_format);

    info!(version = env!("CARGO_PKG_VERSION"), "tabherd starting");
    info!(
        bind = %config.bind_address,
        port = config.port,
        "config loaded"
    );

    let ctx = AppContext::new(config);
    rest::start_rest_server(ctx).await
}

/// Initialize the tracing subscriber.
///
/// Returns a `WorkerGuard` that must stay alive for the process lifetime when
/// a log file is configured.
///
/// `log_format` may be `"pretty"` (default, human-readable compact format) or
/// `"json"` (structured JSON for log aggregators).
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("tabherd.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt().json().with_env_filter(log_level).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        None
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}
