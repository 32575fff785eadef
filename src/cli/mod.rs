//! CLI argument definitions for issueflow.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// issueflow - Hierarchy graphs from issue-tracker records.
///
/// Start with `iflow config show` to check credentials, then `iflow graph`.
#[derive(Parser, Debug)]
#[command(name = "iflow")]
#[command(author, version, about = "Build hierarchy graphs and statistics from issue-tracker records", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Path to config.kdl (defaults to ~/.config/issueflow/config.kdl).
    /// Can also be set via IFLOW_CONFIG environment variable.
    #[arg(long = "config", global = true, env = "IFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Record selection shared by `graph` and `stats`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Filter expression (JQL), used verbatim
    #[arg(short = 'f', long)]
    pub filter: Option<String>,

    /// Project key to include in a generated filter (repeatable)
    #[arg(short = 'p', long = "project")]
    pub projects: Vec<String>,

    /// Issue type to include in a generated filter (repeatable)
    #[arg(short = 't', long = "issue-type")]
    pub issue_types: Vec<String>,

    /// Read issue records from a JSON file instead of the tracker
    #[arg(long = "from-file", conflicts_with_all = ["projects", "issue_types"])]
    pub from_file: Option<PathBuf>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch records and build the hierarchy graph
    ///
    /// Nodes are issues plus one node per project; links run parent to
    /// child, and parentless issues hang off their project.
    Graph {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Summary statistics for the hierarchy graph
    Stats {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Fetch one raw page of issue records
    Issues {
        /// Index of the first record
        #[arg(long, default_value_t = 0)]
        start_at: usize,

        /// Records to return
        #[arg(long, default_value_t = 50)]
        max_results: usize,

        /// Filter expression (JQL)
        #[arg(short = 'f', long)]
        filter: Option<String>,
    },

    /// List projects visible to the configured account
    Projects,

    /// List issue types with hierarchy levels
    IssueTypes,

    /// Show the filter expression a fetch would use
    Filter {
        /// Project key (repeatable); discovered when omitted
        #[arg(short = 'p', long = "project")]
        projects: Vec<String>,

        /// Issue type (repeatable); discovered when omitted
        #[arg(short = 't', long = "issue-type")]
        issue_types: Vec<String>,
    },

    /// Classify an issue-type name into a hierarchy category
    Classify {
        /// Issue type name (e.g., "Epic", "User Story")
        type_name: String,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Show version and build information
    Version,

    /// Run the HTTP API server
    #[cfg(feature = "server")]
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1", env = "HOST")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value_t = 3001, env = "PORT")]
        port: u16,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration and where each value came from
    Show,

    /// Write a config.kdl file
    Init {
        /// Tracker base URL (https)
        #[arg(long)]
        base_url: Option<String>,

        /// Account email
        #[arg(long)]
        email: Option<String>,

        /// API token
        #[arg(long)]
        api_token: Option<String>,

        /// Default filter expression
        #[arg(long)]
        filter: Option<String>,

        /// Story points custom field id
        #[arg(long)]
        story_points_field: Option<String>,

        /// Records per search page
        #[arg(long)]
        page_size: Option<usize>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
