use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sieve", about = "Sieve filter-language tools", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Entity schema (TOML)
    #[arg(long, short = 's', global = true, env = "SIEVE_SCHEMA")]
    pub schema: Option<PathBuf>,

    /// Runtime configuration (TOML)
    #[arg(long, short = 'c', global = true, env = "SIEVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse query text and show the constraint tree
    Parse {
        /// Rich query text
        text: String,
    },

    /// Parse query text and print it back in canonical form
    Print {
        /// Rich query text
        text: String,
    },

    /// Encode query text as flat KEY=VALUE fields
    Encode {
        /// Rich query text
        text: String,

        /// Fail instead of falling back to `q` for non-simple constraints
        #[arg(long)]
        simple: bool,
    },

    /// Decode flat KEY=VALUE fields into a query
    Decode {
        /// Fields, e.g. `name=bob _limit=20`
        #[arg(required = true)]
        pairs: Vec<String>,
    },

    /// Compile a query against an entity
    Compile {
        /// Root entity
        entity: String,

        /// Rich query text
        #[arg(conflicts_with = "flat")]
        text: Option<String>,

        /// Flat KEY=VALUE fields instead of query text
        #[arg(long = "flat", short = 'F', num_args = 1..)]
        flat: Vec<String>,
    },

    /// Print an entity's metadata
    Describe {
        /// Entity name
        entity: String,
    },

    /// Interactive shell compiling each line against an entity
    Shell {
        /// Root entity
        entity: String,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}
