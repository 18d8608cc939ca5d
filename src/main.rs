use anyhow::Result;

use court_booking::cli::Command;
use court_booking::{handle_init_db, handle_serve, handle_sweep, interpret};

fn main() {
    setup_logging();
    parse_and_execute().unwrap_or_else(|e| {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    });
}

fn setup_logging() {
    sensible_env_logger::init!();
}

fn parse_and_execute() -> Result<()> {
    let command = interpret();
    execute_command(&command)
}

fn execute_command(command: &Command) -> Result<()> {
    match command {
        Command::Serve { port } => handle_serve(*port),
        Command::Sweep => handle_sweep(),
        Command::InitDb => handle_init_db(),
    }
}
