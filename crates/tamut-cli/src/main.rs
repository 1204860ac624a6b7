//! tamut: mutation testing for timed-automaton components
//!
//! ## Usage
//!
//! ```bash
//! tamut operators                                # List mutation operators
//! tamut mutate model.yaml --out mutants/         # Write mutants for the model checker
//! tamut run model.yaml --strategies strategies/  # Compute verdicts and the mutation score
//! tamut check-strategy case.strategy             # Validate a strategy file
//! ```

use clap::Parser;
use std::process::ExitCode;
use tamut_cli::{handlers, logging, Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    logging::init(config.verbosity);
    console::set_colors_enabled_stderr(config.color.should_color());

    let config_path = cli.config.as_deref();
    match &cli.command {
        Commands::Mutate(args) => handlers::run_mutate(&config, config_path, args),
        Commands::Run(args) => handlers::run_plan(&config, config_path, args),
        Commands::CheckStrategy(args) => handlers::run_check_strategy(&config, args),
        Commands::Operators => {
            handlers::run_operators();
            Ok(())
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let color: ColorChoice = cli.color.into();
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(color)
}
