//! CLI command definitions and parsing
use crate::prompt::OutputContract;
use crate::retrieval::RetrievalStrategy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "foodcheck",
    version,
    about = "Grounded weekly food log assessment",
    long_about = "foodcheck scores a free-text weekly food log against a fixed corpus of nutrition \
                  guidelines. Relevant guideline documents are selected, placed in the prompt as the \
                  only permitted evidence, and the model's reply is validated so every cited source \
                  is one that was actually supplied."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/foodcheck/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Profile to apply on top of the config file
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the food log comes from: argument, file, or stdin when neither is given
#[derive(Args, Debug, Clone)]
pub struct LogInput {
    /// Food log text
    pub food_log: Option<String>,

    /// Read the food log from a file
    #[arg(short, long, value_name = "FILE", conflicts_with = "food_log")]
    pub file: Option<PathBuf>,
}

/// Overrides for relevance selection
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Selection strategy (lexical or embedding)
    #[arg(short, long)]
    pub strategy: Option<RetrievalStrategy>,

    /// Maximum number of guideline chunks to use
    #[arg(short = 'n', long)]
    pub max_chunks: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a food log and print the grounded assessment
    Analyze {
        #[command(flatten)]
        input: LogInput,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Output contract (grounded or legacy)
        #[arg(long)]
        contract: Option<OutputContract>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show which guideline chunks a food log selects, without calling the model
    Retrieve {
        #[command(flatten)]
        input: LogInput,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the assembled prompt without calling the model
    Prompt {
        #[command(flatten)]
        input: LogInput,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Output contract (grounded or legacy)
        #[arg(long)]
        contract: Option<OutputContract>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Validate a saved model response
    Check {
        /// File holding the raw model reply
        response: PathBuf,

        /// Source ids that were supplied in the prompt (comma separated)
        #[arg(long = "allow", value_delimiter = ',')]
        allowed: Vec<String>,

        /// Output contract (grounded or legacy)
        #[arg(long)]
        contract: Option<OutputContract>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List the guideline corpus with authority labels
    Corpus {
        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Print the default configuration file path
    Path,
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze_overrides() {
        let cli = Cli::try_parse_from([
            "foodcheck",
            "analyze",
            "oats and berries",
            "--strategy",
            "embedding",
            "-n",
            "2",
            "--contract",
            "legacy",
        ])
        .unwrap();

        match cli.command {
            Commands::Analyze {
                input,
                selection,
                contract,
                json,
            } => {
                assert_eq!(input.food_log.as_deref(), Some("oats and berries"));
                assert_eq!(selection.strategy, Some(RetrievalStrategy::Embedding));
                assert_eq!(selection.max_chunks, Some(2));
                assert_eq!(contract, Some(OutputContract::Legacy));
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_check_allow_list() {
        let cli = Cli::try_parse_from([
            "foodcheck",
            "check",
            "reply.json",
            "--allow",
            "a.txt,b.txt",
        ])
        .unwrap();

        match cli.command {
            Commands::Check { allowed, .. } => assert_eq!(allowed, vec!["a.txt", "b.txt"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_text_and_file_conflict() {
        let result = Cli::try_parse_from(["foodcheck", "retrieve", "eggs", "--file", "log.txt"]);
        assert!(result.is_err());
    }
}
