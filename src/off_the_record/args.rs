use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "otr")]
#[command(about = "Declare record attributes from a schema and exercise them", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Compact JSON output
    #[arg(short, long, global = true)]
    pub compact: bool,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the model's permit list as JSON
    Permits {
        /// Path to the model schema
        schema: PathBuf,
    },

    /// Mass-assign a params file and print the resulting attributes
    Assign {
        /// Path to the model schema
        schema: PathBuf,

        /// Path to a JSON object of params, bare or under the model's param key
        params: PathBuf,

        /// Authorize only these keys (comma separated)
        #[arg(long, value_delimiter = ',', conflicts_with = "permit_all")]
        permit: Option<Vec<String>>,

        /// Authorize every key
        #[arg(long)]
        permit_all: bool,
    },

    /// List attributes with their type tags and defaults
    #[command(alias = "desc")]
    Describe {
        /// Path to the model schema
        schema: PathBuf,
    },
}
