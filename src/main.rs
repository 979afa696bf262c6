//! focusfield - focus / break interval timer
//!
//! Alternates between a focus session and a break:
//! - 30 minutes of focus and 5 minutes of break by default
//! - A countdown of ticks over the last five seconds
//! - A chime when the timer switches, played late after host sleep if missed

use anyhow::Result;
use clap::{CommandFactory, Parser};

use focusfield::cli::{open_store, shell, Cli, Commands, ConfigArgs, Display};
use focusfield::{DurationStore, Mode};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    match cli.command {
        Some(Commands::Run(args)) => {
            shell::run(args).await?;
        }
        Some(Commands::Config(args)) => {
            run_config(args)?;
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

/// Shows or edits the saved durations.
fn run_config(args: ConfigArgs) -> Result<()> {
    let backend = open_store(args.store)?;
    let path = backend.path().to_path_buf();
    let mut store = DurationStore::load(Box::new(backend));

    if let Some(text) = &args.focus {
        store.edit(Mode::Focus, text);
    }
    if let Some(text) = &args.break_minutes {
        store.edit(Mode::Break, text);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&store.settings())?);
    } else {
        Display::show_config(&store.settings(), &path);
    }
    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
