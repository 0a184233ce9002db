use clap::Parser;
use modelreg_core::{ConfigLayer, CoreError, Registry, RegistryConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "modelreg-server", version, about = "modelreg HTTP service")]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8321)]
    port: u16,

    /// Registry root directory (overrides MODELREG_ROOT and the config file).
    #[arg(long)]
    root: Option<PathBuf>,

    /// TOML config file with `root`, `backend` and `strict_verify` keys.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> Result<RegistryConfig, CoreError> {
    let file = match &cli.config {
        Some(path) => ConfigLayer::load(path)?,
        None => ConfigLayer::default(),
    };
    let flags = ConfigLayer {
        root: cli.root.as_ref().map(|p| p.to_string_lossy().into_owned()),
        ..ConfigLayer::default()
    };
    file.merge(ConfigLayer::from_env()).merge(flags).finish()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let registry = match load_config(&cli).and_then(Registry::new) {
        Ok(r) => r,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let addr = format!("{}:{}", cli.host, cli.port);
    info!("starting modelreg-server on {addr}");
    info!(
        "registry root: {} (strict_verify={})",
        registry.root().display(),
        registry.config().strict_verify
    );

    let registry = Arc::new(registry);
    match modelreg_server::run_server(&registry, &addr) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
