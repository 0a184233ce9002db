mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::promote::PromoteArgs;
use commands::register::RegisterArgs;
use commands::CommandError;
use modelreg_core::{ConfigLayer, CoreError, Registry, RegistryConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "modelreg",
    version,
    about = "Versioned, integrity-checked model artifact registry"
)]
struct Cli {
    /// Registry root directory (overrides MODELREG_ROOT and the config file).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// TOML config file with `root`, `backend` and `strict_verify` keys.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List models registered for a task.
    List {
        #[arg(long)]
        task: String,
    },
    /// List the versions of a model.
    Versions {
        #[arg(long)]
        task: String,
        #[arg(long)]
        model: String,
    },
    /// List the aliases of a model and the versions they point at.
    Aliases {
        #[arg(long)]
        task: String,
        #[arg(long)]
        model: String,
    },
    /// Show the promotion audit log of a model.
    History {
        #[arg(long)]
        task: String,
        #[arg(long)]
        model: String,
    },
    /// Resolve a model reference to a local package path.
    Resolve {
        #[arg(long)]
        task: String,
        /// Model reference (model@alias_or_version).
        #[arg(long = "ref")]
        model_ref: String,
        /// Skip the explicit integrity check (strict mode still applies).
        #[arg(long, default_value_t = false)]
        no_verify: bool,
    },
    /// Show model metadata (model_meta.json).
    Show {
        #[arg(long)]
        task: String,
        /// Model reference (model@alias_or_version).
        #[arg(long = "ref")]
        model_ref: String,
        /// Verify package integrity before showing.
        #[arg(long, default_value_t = false)]
        verify: bool,
        /// Print the metadata document exactly as stored.
        #[arg(long, default_value_t = false)]
        raw: bool,
    },
    /// Register a model package into the registry.
    Register {
        #[arg(long)]
        task: String,
        #[arg(long)]
        model: String,
        /// Version string (immutable).
        #[arg(long)]
        version: String,
        /// Directory containing the package artifacts.
        #[arg(long)]
        artifacts: PathBuf,
        /// Alias to set after registering. Use '' to skip.
        #[arg(long, default_value = "latest")]
        set_alias: String,
        #[arg(long)]
        actor: Option<String>,
        #[arg(long, default_value = "cli register")]
        reason: String,
        /// JSON file with metadata to merge.
        #[arg(long)]
        metadata_json: Option<PathBuf>,
        /// Inline JSON object merged over --metadata-json.
        #[arg(long)]
        metadata_inline: Option<String>,
    },
    /// Point an alias at an existing version.
    Promote {
        #[arg(long)]
        task: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        version: String,
        /// Alias name (e.g. production).
        #[arg(long)]
        alias: String,
        #[arg(long)]
        actor: Option<String>,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Verify the integrity of a registered package.
    Verify {
        #[arg(long)]
        task: String,
        /// Model reference (model@alias_or_version).
        #[arg(long = "ref")]
        model_ref: String,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

/// Config file, then environment, then `--root`.
fn load_config(cli: &Cli) -> Result<RegistryConfig, CoreError> {
    let file = match &cli.config {
        Some(path) => ConfigLayer::load(path)?,
        None => ConfigLayer::default(),
    };
    let flags = ConfigLayer {
        root: cli
            .root
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
        ..ConfigLayer::default()
    };
    file.merge(ConfigLayer::from_env()).merge(flags).finish()
}

fn dispatch(cli: Cli) -> Result<u8, CommandError> {
    match cli.command {
        Commands::Completions { shell } => return commands::completions::run::<Cli>(shell),
        Commands::ManPages { ref dir } => return commands::man_pages::run::<Cli>(dir),
        _ => {}
    }

    let registry = Registry::new(load_config(&cli)?)?;
    let json = cli.json;

    match cli.command {
        Commands::List { task } => commands::list::run(&registry, &task, json),
        Commands::Versions { task, model } => {
            commands::versions::run(&registry, &task, &model, json)
        }
        Commands::Aliases { task, model } => {
            commands::aliases::run(&registry, &task, &model, json)
        }
        Commands::History { task, model } => {
            commands::history::run(&registry, &task, &model, json)
        }
        Commands::Resolve {
            task,
            model_ref,
            no_verify,
        } => commands::resolve::run(&registry, &task, &model_ref, !no_verify, json),
        Commands::Show {
            task,
            model_ref,
            verify,
            raw,
        } => commands::show::run(&registry, &task, &model_ref, verify, raw, json),
        Commands::Register {
            task,
            model,
            version,
            artifacts,
            set_alias,
            actor,
            reason,
            metadata_json,
            metadata_inline,
        } => commands::register::run(
            &registry,
            &RegisterArgs {
                task: &task,
                model: &model,
                version: &version,
                artifacts: &artifacts,
                set_alias: &set_alias,
                actor: actor.as_deref(),
                reason: Some(&reason),
                metadata_json: metadata_json.as_deref(),
                metadata_inline: metadata_inline.as_deref(),
            },
            json,
        ),
        Commands::Promote {
            task,
            model,
            version,
            alias,
            actor,
            reason,
        } => commands::promote::run(
            &registry,
            &PromoteArgs {
                task: &task,
                model: &model,
                version: &version,
                alias: &alias,
                actor: actor.as_deref(),
                reason: reason.as_deref(),
            },
            json,
        ),
        Commands::Verify { task, model_ref } => {
            commands::verify::run(&registry, &task, &model_ref, json)
        }
        Commands::Completions { .. } | Commands::ManPages { .. } => {
            Ok(commands::EXIT_SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("MODELREG_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    match dispatch(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            let code = e.exit_code();
            if code == commands::EXIT_REGISTRY_ERROR {
                eprintln!("registry error: {e}");
            } else {
                eprintln!("error: {e}");
            }
            ExitCode::from(code)
        }
    }
}
