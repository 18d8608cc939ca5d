use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "court booking allocation and settlement service")]
pub struct Cli {
    /// Command
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Start the booking API server
    Serve {
        /// Port number (optional, defaults to 3000)
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
    /// Run one weather sweep over upcoming outdoor bookings and exit
    Sweep,
    /// Create the database schema if it does not exist yet
    InitDb,
}
