//! issueflow CLI - Hierarchy graphs from issue-tracker records.

use clap::Parser;
use issueflow::cli::{Cli, Commands, ConfigCommands, SelectionArgs};
use issueflow::commands::{self, CommandResult, QueryOptions};
use issueflow::config::{self, FileConfig, TrackerConfig};
use issueflow::tracker::JiraClient;
use std::path::Path;
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter directives.
const LOG_ENV: &str = "IFLOW_LOG";

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    init_tracing();

    let result = run_command(cli.command, cli.config.as_deref(), human);

    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// Install a stderr subscriber so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_command(
    command: Commands,
    config_path: Option<&Path>,
    human: bool,
) -> Result<(), issueflow::Error> {
    match command {
        Commands::Graph { selection } => {
            let graph = match &selection.from_file {
                Some(path) => commands::graph_from_file(path, selection.filter.as_deref())?,
                None => {
                    let config = tracker_config(config_path)?;
                    let client = JiraClient::new(&config);
                    commands::graph(&client, &config, &query_options(selection))?
                }
            };
            output(&graph, human);
        }

        Commands::Stats { selection } => {
            let summary = match &selection.from_file {
                Some(path) => issueflow::models::stats::aggregate(&commands::graph_from_file(
                    path,
                    selection.filter.as_deref(),
                )?),
                None => {
                    let config = tracker_config(config_path)?;
                    let client = JiraClient::new(&config);
                    commands::stats(&client, &config, &query_options(selection))?
                }
            };
            output(&summary, human);
        }

        Commands::Issues {
            start_at,
            max_results,
            filter,
        } => {
            let config = tracker_config(config_path)?;
            let client = JiraClient::new(&config);
            let page =
                commands::issues_page(&client, &config, start_at, max_results, filter.as_deref())?;
            output(&page, human);
        }

        Commands::Projects => {
            let config = tracker_config(config_path)?;
            let client = JiraClient::new(&config);
            output(&commands::projects(&client, &config)?, human);
        }

        Commands::IssueTypes => {
            let config = tracker_config(config_path)?;
            let client = JiraClient::new(&config);
            output(&commands::issue_types(&client, &config)?, human);
        }

        Commands::Filter {
            projects,
            issue_types,
        } => {
            let config = tracker_config(config_path)?;
            let client = JiraClient::new(&config);
            let projects = Some(projects).filter(|p| !p.is_empty());
            let issue_types = Some(issue_types).filter(|t| !t.is_empty());
            let generated = commands::filter(
                &client,
                &config,
                projects.as_deref(),
                issue_types.as_deref(),
            );
            output(&generated, human);
        }

        Commands::Classify { type_name } => {
            output(&commands::classify(&type_name), human);
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let resolved = config::resolve_config(config_path)?;
                output(&commands::config_show(&resolved), human);
            }
            ConfigCommands::Init {
                base_url,
                email,
                api_token,
                filter,
                story_points_field,
                page_size,
                force,
            } => {
                let path = config_path
                    .map(Path::to_path_buf)
                    .or_else(config::default_config_path)
                    .ok_or_else(|| {
                        issueflow::Error::Config(
                            "Could not determine config directory (use --config)".to_string(),
                        )
                    })?;
                let file = FileConfig {
                    base_url,
                    email,
                    api_token,
                    filter,
                    story_points_field,
                    page_size,
                    timeout_secs: None,
                };
                output(&commands::config_init(&path, &file, force)?, human);
            }
        },

        Commands::Version => {
            output(&commands::version(), human);
        }

        #[cfg(feature = "server")]
        Commands::Serve { host, port } => {
            let config = tracker_config(config_path)?;
            run_server(config, &host, port)?;
        }
    }

    Ok(())
}

/// Resolve and validate configuration for commands that talk to the tracker.
fn tracker_config(config_path: Option<&Path>) -> Result<TrackerConfig, issueflow::Error> {
    config::resolve_config(config_path)?.validate()
}

fn query_options(selection: SelectionArgs) -> QueryOptions {
    QueryOptions::from_args(selection.filter, selection.projects, selection.issue_types)
}

/// Print output in JSON or human-readable format.
fn output<T: CommandResult>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Run the HTTP API server until interrupted.
#[cfg(feature = "server")]
fn run_server(config: TrackerConfig, host: &str, port: u16) -> Result<(), issueflow::Error> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| issueflow::Error::Other(format!("Failed to create runtime: {}", e)))?
        .block_on(async {
            issueflow::server::start_server(config, host, port)
                .await
                .map_err(|e| issueflow::Error::Other(format!("Server error: {}", e)))
        })
}
