//! CLI module for the SWAPI dataloader
//!
//! Provides subcommands:
//! - `load`: resolve keys through one request scope backed by a fixture file

pub mod load;

use clap::{Parser, Subcommand};

/// SWAPI Dataloader - batched, deduplicated entity loading
#[derive(Parser)]
#[command(name = "swapi-dataloader")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load entities by URL through a single request scope
    Load(load::LoadArgs),
}
