use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "diary-cli")]
#[command(about = "Password-gated personal diary")]
pub struct Cli {
    /// Use a seeded in-memory diary and the password "dev"
    #[arg(long, global = true)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Enter the diary password
    Unlock,
    /// Show whether the diary is unlocked, locked out or waiting for a password
    Status,
    /// List entries, newest first
    List {
        /// Load every entry instead of paging
        #[arg(long)]
        all: bool,
        /// Number of pages to load
        #[arg(long, default_value_t = 1, conflicts_with = "all")]
        pages: usize,
    },
    /// Print the full text of an entry
    Show { id: String },
    /// Write a new entry
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
    },
    /// Delete an entry
    Delete { id: String },
    /// Lock the diary again
    Logout,
    /// Print config path and create default file if missing
    ConfigPath,
}
