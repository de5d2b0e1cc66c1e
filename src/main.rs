use colored::Colorize;
use smp::commands::{self, Cli};
use smp::error::SmpError;
use smp::utils::init_logger;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_cli();

    if let Err(err) = init_logger(cli.log_level.as_deref(), cli.log_file.clone()) {
        eprintln!("{} {:#}", "Invalid log configuration:".yellow(), err);
    }

    match commands::execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            if let Some(hint) = err.downcast_ref::<SmpError>().and_then(SmpError::hint) {
                eprintln!("  {}", hint.dimmed());
            }
            ExitCode::from(1)
        }
    }
}
