use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{ensure, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde_json::Value;

use crate::config::Config;
use crate::context::ToolContext;
use crate::providers::github::IssueFilter;
use crate::providers::sf311::{CaseFilters, DEFAULT_REOPEN_WINDOW_DAYS};
use crate::registry::ToolRegistry;

#[derive(Parser)]
#[command(name = "agentlens")]
#[command(author, version, about = "Repository health and SF 311 analytics tools", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    config: Config,

    /// Output file path (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze GitHub repositories
    Github {
        #[command(subcommand)]
        command: GithubCommand,
    },
    /// Analyze SF 311 service requests
    Sf311 {
        #[command(subcommand)]
        command: Sf311Command,
    },
    /// List or invoke registered agent tools
    Tools {
        #[command(subcommand)]
        command: ToolsCommand,
    },
}

#[derive(Subcommand)]
enum GithubCommand {
    /// Portfolio summary for an owner
    Portfolio {
        #[arg(short = 'O', long)]
        owner: String,
    },
    /// Health score for one repository
    Health {
        #[arg(short = 'O', long)]
        owner: String,

        #[arg(short, long)]
        repo: String,
    },
    /// Repositories with a given issue kind
    Issues {
        #[arg(short = 'O', long)]
        owner: String,

        #[arg(short, long, value_enum, default_value_t = IssueFilter::All)]
        kind: IssueFilter,
    },
    /// Classify every repository and count issues by severity
    Audit {
        #[arg(short = 'O', long)]
        owner: String,
    },
    /// Health scores for several repositories
    Batch {
        #[arg(short = 'O', long)]
        owner: String,

        #[arg(required = true)]
        repos: Vec<String>,
    },
}

#[derive(Subcommand)]
enum Sf311Command {
    /// Days-to-close statistics for closed cases
    CycleTimes {
        /// Service name prefix (e.g. "Encamp")
        #[arg(short, long)]
        service_name: Option<String>,

        /// Exact analysis neighborhood
        #[arg(short, long)]
        neighborhood: Option<String>,

        /// Lookback in days (1-365)
        #[arg(short, long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=365))]
        days: u32,
    },
    /// Cases reopened at the same address and subtype after closure
    Resubmissions {
        /// Service name prefix (e.g. "Street and Sidewalk")
        #[arg(short, long)]
        service_name: Option<String>,

        /// Supervisor district number
        #[arg(long)]
        district: Option<String>,

        /// Lookback in days (1-365)
        #[arg(short, long, default_value_t = 90, value_parser = clap::value_parser!(u32).range(1..=365))]
        days: u32,

        /// Reopen window in days, at most the lookback
        #[arg(short, long, default_value_t = DEFAULT_REOPEN_WINDOW_DAYS, value_parser = clap::value_parser!(u32).range(1..=365))]
        window: u32,
    },
}

#[derive(Subcommand)]
enum ToolsCommand {
    /// List registered tools
    List,
    /// Invoke a tool with a JSON input object
    Call {
        name: String,

        #[arg(short, long, default_value = "{}")]
        input: String,
    },
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let ctx = Arc::new(ToolContext::from_config(&self.config)?);

        let value = match &self.command {
            Commands::Github { command } => Self::run_github(&ctx, command).await?,
            Commands::Sf311 { command } => Self::run_sf311(&ctx, command).await?,
            Commands::Tools { command } => Self::run_tools(&ctx, command).await?,
        };

        self.write_output(&value)
    }

    async fn run_github(ctx: &ToolContext, command: &GithubCommand) -> Result<Value> {
        let value = match command {
            GithubCommand::Portfolio { owner } => {
                serde_json::to_value(ctx.github.portfolio(owner).await?)?
            }
            GithubCommand::Health { owner, repo } => {
                serde_json::to_value(ctx.github.repository_health(owner, repo).await?)?
            }
            GithubCommand::Issues { owner, kind } => {
                serde_json::to_value(ctx.github.find_issues(owner, *kind).await?)?
            }
            GithubCommand::Audit { owner } => {
                serde_json::to_value(ctx.github.auto_classify(owner).await?)?
            }
            GithubCommand::Batch { owner, repos } => {
                serde_json::to_value(ctx.github.batch_health(owner, repos).await)?
            }
        };
        Ok(value)
    }

    async fn run_sf311(ctx: &ToolContext, command: &Sf311Command) -> Result<Value> {
        let value = match command {
            Sf311Command::CycleTimes {
                service_name,
                neighborhood,
                days,
            } => {
                let filters = CaseFilters {
                    service_name_prefix: service_name.clone(),
                    neighborhood: neighborhood.clone(),
                    supervisor_district: None,
                };
                serde_json::to_value(ctx.sf311.cycle_times(&filters, *days).await?)?
            }
            Sf311Command::Resubmissions {
                service_name,
                district,
                days,
                window,
            } => {
                ensure!(
                    window <= days,
                    "--window ({window}) must not exceed --days ({days})"
                );
                let filters = CaseFilters {
                    service_name_prefix: service_name.clone(),
                    neighborhood: None,
                    supervisor_district: district.clone(),
                };
                serde_json::to_value(ctx.sf311.resubmissions(&filters, *days, *window).await?)?
            }
        };
        Ok(value)
    }

    async fn run_tools(ctx: &Arc<ToolContext>, command: &ToolsCommand) -> Result<Value> {
        let registry = ToolRegistry::with_default_tools();

        match command {
            ToolsCommand::List => Ok(serde_json::to_value(registry.descriptors())?),
            ToolsCommand::Call { name, input } => {
                let input: Value = serde_json::from_str(input)?;
                Ok(registry.call(ctx, name, input).await?)
            }
        }
    }

    fn write_output(&self, value: &Value) -> Result<()> {
        let json_output = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Output written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }
}
