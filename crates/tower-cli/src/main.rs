//! Tower CLI - command-line access to a Tower/AWX automation controller
//!
//! This is the main entry point for the `tower` binary. Every command that
//! talks to the controller logs its session out before exiting.

mod cli;
mod error;
mod handlers;
mod logging;
mod output;

use cli::{Cli, Commands};
use colored::control;
use error::Result;
use logging::LoggingConfig;
use output::OutputWriter;
use std::process;
use tracing::instrument;

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    // Set up colored output
    control::set_override(cli.use_color());

    // Initialize logging
    if let Err(e) = init_logging(&cli) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli) {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("{}", error::format_error(&e, control::SHOULD_COLORIZE.should_colorize()));

            if e.should_show_help() {
                eprintln!("\nFor more information, try '--help'");
            }

            process::exit(e.exit_code());
        }
    }
}

/// Main application logic
#[instrument(skip(cli), fields(command = ?cli.command))]
fn run(cli: Cli) -> Result<()> {
    let use_color = cli.use_color();
    let mut output = OutputWriter::new(cli.output, use_color, cli.quiet);

    tracing::info!(
        command = ?cli.command,
        verbosity = cli.verbosity_level(),
        "Executing command"
    );

    match cli.command {
        Commands::Completions(args) => handlers::handle_completions(args),
        Commands::Config => handlers::handle_config(&cli.connection, use_color, &mut output),
        command => {
            let mut client = handlers::connect(&cli.connection, use_color)?;
            let result = match command {
                Commands::Ping => handlers::handle_ping(&mut client, &mut output),
                Commands::Request(args) => handlers::handle_request(args, &mut client, &mut output),
                Commands::List(args) => handlers::handle_list(args, &mut client, &mut output),
                Commands::Lookup(args) => handlers::handle_lookup(args, &mut client, &mut output),
                Commands::Config | Commands::Completions(_) => unreachable!("handled above"),
            };
            client.logout();
            result
        }
    }
}

/// Initialize the logging system
fn init_logging(cli: &Cli) -> Result<()> {
    let mut logging_config = LoggingConfig::from_verbosity(cli.verbosity_level());
    logging_config.merge_with_env();

    // Quiet mode only logs errors
    if cli.quiet {
        logging_config.level = "error".to_string();
        logging_config.console = false;
    }

    logging::init_logging(logging_config)
}
