mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_ARCHIVE_ERROR, EXIT_FAILURE};
use packfix_core::{install_signal_handler, shutdown_requested, Engine, EngineConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "packfix",
    version,
    about = "Validate and repair resource pack manifests"
)]
struct Cli {
    /// Path to a config file (default: ~/.config/packfix/config.toml).
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
    /// Show pack name, version and uuid, repairing in memory if needed.
    Inspect {
        /// Pack archive (.mcpack or .zip).
        archive: PathBuf,
    },
    /// Check the pack manifest and list every problem found.
    Validate {
        /// Pack archive (.mcpack or .zip).
        archive: PathBuf,
    },
    /// Write a copy of the pack with a corrected manifest.
    Fix {
        /// Pack archive (.mcpack or .zip).
        archive: PathBuf,
        /// Output path (default: <name>_fixed.<ext> next to the input).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite the output file if it exists.
        #[arg(long, default_value_t = false)]
        force: bool,
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
            tracing_subscriber::EnvFilter::try_from_env("PACKFIX_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    install_signal_handler();

    let json_output = cli.json;
    let result = match cli.command {
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
        Commands::Inspect { archive } => load_engine(cli.config.as_deref())
            .and_then(|engine| commands::inspect::run(&engine, &archive, json_output)),
        Commands::Validate { archive } => load_engine(cli.config.as_deref())
            .and_then(|engine| commands::validate::run(&engine, &archive, json_output)),
        Commands::Fix {
            archive,
            output,
            force,
        } => load_engine(cli.config.as_deref()).and_then(|engine| {
            commands::fix::run(&engine, &archive, output.as_deref(), force, json_output)
        }),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("archive error:") || msg.starts_with("I/O error:") {
                EXIT_ARCHIVE_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

fn load_engine(config_path: Option<&Path>) -> Result<Engine, String> {
    let config = match config_path {
        Some(path) => EngineConfig::load(path),
        None => EngineConfig::load_default(),
    }
    .map_err(|e| format!("failed to load config: {e}"))?;
    Ok(Engine::new(config).with_abort_hook(shutdown_requested))
}
