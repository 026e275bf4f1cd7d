use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "studyabroad")]
#[command(about = "Ask the Study Abroad Assistant about universities, visas and costs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Backend address, overriding the configuration
    #[arg(long)]
    pub api_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an account and log in
    Signup {
        email: String,

        /// Read from standard input when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Log in and store the session credential
    Login {
        email: String,

        /// Read from standard input when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Forget the stored session credential
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Ask a single question
    Ask {
        question: String,

        /// Restrict the answer to one destination country
        #[arg(short, long)]
        country: Option<String>,
    },

    /// Start the interactive chat
    Chat {
        /// Destination country for every question
        #[arg(short, long)]
        country: Option<String>,
    },

    /// Show previous questions and answers
    History {
        #[arg(short, long)]
        limit: Option<u32>,

        #[arg(short, long, default_value_t = 0)]
        offset: u32,
    },

    /// Delete one stored exchange
    DeleteHistory { id: i64 },

    /// List supported destination countries
    Countries,

    /// Check backend health
    Health,
}

impl Cli {
    pub fn command_or_default(&mut self) -> Commands {
        self.command.take().unwrap_or(Commands::Chat { country: None })
    }
}
