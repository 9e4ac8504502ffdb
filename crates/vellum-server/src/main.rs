//! Vellum server entry point.

use std::path::PathBuf;

use anyhow::Context;
use tracing::{error, info};
use vellum_config::{ConfigLoader, VellumConfig, ENV_PREFIX};
use vellum_server::{bootstrap, ShutdownSignal};

const DEFAULT_CONFIG: &str = "vellum.toml";

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config = args.next().map(PathBuf::from);
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("vellum-server {}", vellum_server::VERSION);
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self { config }
    }
}

fn print_help() {
    println!(
        r"Vellum Server - scoped record services over HTTP

USAGE:
    vellum-server [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON).
                           Defaults to ./vellum.toml when present.
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    VELLUM__SERVER__HTTP_ADDR             Bind address (default: 0.0.0.0:8080)
    VELLUM__POOL__WORKER_THREADS          Runtime worker threads (default: 32)
    VELLUM__POOL__MAX_IN_FLIGHT           Concurrent call cap (default: 160)
    VELLUM__SCOPE__PRIVILEGED_IDENTITY    Identity that sees every record
    VELLUM__IDENTITY__MODE                local or remote
    VELLUM__IDENTITY__ENDPOINT            Remote identity service URL
    VELLUM__STORE__SEED_PATH              JSON file loaded into the store
    VELLUM__TELEMETRY__LOGGING__LEVEL     Log filter directive
    VELLUM__TELEMETRY__METRICS__ENABLED   Record Prometheus metrics

A .env file in the working directory is read before the environment.
"
    );
}

fn load_config(args: &Args) -> anyhow::Result<VellumConfig> {
    let loader = match &args.config {
        Some(path) => ConfigLoader::new()
            .with_file(path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        None => ConfigLoader::new().with_optional_file(DEFAULT_CONFIG)?,
    };
    let config = loader
        .with_dotenv()?
        .with_env_prefix(ENV_PREFIX)
        .load()
        .context("invalid configuration")?;
    Ok(config)
}

async fn serve(config: VellumConfig) -> anyhow::Result<()> {
    vellum_telemetry::init_telemetry(
        &bootstrap::log_config(&config.telemetry.logging),
        &bootstrap::metrics_config(&config.telemetry.metrics),
    )
    .context("cannot initialize telemetry")?;

    info!(
        version = vellum_server::VERSION,
        addr = %config.server.http_addr,
        identity = ?config.identity.mode,
        max_in_flight = config.pool.max_in_flight,
        "starting vellum server"
    );

    let server = bootstrap::build(&config).context("cannot build server")?;
    server
        .run_with_shutdown(ShutdownSignal::with_os_signals())
        .await?;
    Ok(())
}

fn main() {
    let args = Args::parse();

    // Logging is configured from the file, so load failures go to stderr.
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.pool.worker_threads)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(config)) {
        error!("Server error: {e:#}");
        eprintln!("Server error: {e:#}");
        std::process::exit(1);
    }
}
