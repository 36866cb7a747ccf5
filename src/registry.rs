//! Named tools a hosted agent can invoke.
//!
//! Each entry pairs a typed input check, an async handler and a typed output
//! check. Tools are registered explicitly at startup.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ToolContext;
use crate::error::{LensError, Result};
use crate::providers::github::IssueFilter;
use crate::providers::sf311::{CaseFilters, DEFAULT_REOPEN_WINDOW_DAYS};

const MAX_LOOKBACK_DAYS: u32 = 365;
const MAX_BATCH_REPOSITORIES: usize = 50;

pub trait ToolInput {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

type Validator = Box<dyn Fn(&Value) -> Result<()> + Send + Sync>;
type Handler = Box<dyn Fn(Arc<ToolContext>, Value) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    validate_input: Validator,
    handler: Handler,
    validate_output: Validator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<&'static str, Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<I, O, F, Fut>(&mut self, name: &'static str, description: &'static str, run: F)
    where
        I: DeserializeOwned + ToolInput + Send + 'static,
        O: Serialize + DeserializeOwned + Send + 'static,
        F: Fn(Arc<ToolContext>, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        let validate_input: Validator = Box::new(|value: &Value| {
            serde_json::from_value::<I>(value.clone())
                .map_err(|e| LensError::Validation(e.to_string()))?
                .validate()
        });

        let handler: Handler = Box::new(
            move |ctx: Arc<ToolContext>, value: Value| -> BoxFuture<'static, Result<Value>> {
                let pending = serde_json::from_value::<I>(value).map(|input| run(ctx, input));
                Box::pin(async move {
                    let output = pending
                        .map_err(|e| LensError::Validation(e.to_string()))?
                        .await?;
                    Ok(serde_json::to_value(output)?)
                })
            },
        );

        let validate_output: Validator = Box::new(|value: &Value| {
            serde_json::from_value::<O>(value.clone())
                .map(|_| ())
                .map_err(|e| LensError::Api(format!("Tool produced malformed output: {e}")))
        });

        self.tools.insert(
            name,
            Tool {
                name,
                description,
                validate_input,
                handler,
                validate_output,
            },
        );
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| ToolDescriptor {
                name: tool.name.to_string(),
                description: tool.description.to_string(),
            })
            .collect()
    }

    pub async fn call(&self, ctx: &Arc<ToolContext>, name: &str, input: Value) -> Result<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| LensError::UnknownTool(name.to_string()))?;

        (tool.validate_input)(&input)?;
        info!("Invoking tool: {name}");

        let output = (tool.handler)(Arc::clone(ctx), input).await?;
        (tool.validate_output)(&output)?;
        debug!("Tool {name} completed");

        Ok(output)
    }

    /// Registry with every built-in tool.
    pub fn with_default_tools() -> Self {
        let mut registry = Self::new();

        registry.register(
            "analyze_portfolio",
            "Summarize a GitHub owner's repositories: counts, languages, license and README coverage, insights",
            |ctx: Arc<ToolContext>, input: OwnerInput| async move {
                ctx.github.portfolio(&input.owner).await
            },
        );
        registry.register(
            "repository_health",
            "Score one repository from 0 to 100 and list its issues, strengths and recommendations",
            |ctx: Arc<ToolContext>, input: RepositoryInput| async move {
                ctx.github.repository_health(&input.owner, &input.repo).await
            },
        );
        registry.register(
            "find_repository_issues",
            "List repositories with a given issue: missing-license, missing-readme, weak-description, stale or all",
            |ctx: Arc<ToolContext>, input: IssueQueryInput| async move {
                ctx.github.find_issues(&input.owner, input.kind).await
            },
        );
        registry.register(
            "auto_classify_repositories",
            "Classify every repository of an owner and count issues by severity",
            |ctx: Arc<ToolContext>, input: OwnerInput| async move {
                ctx.github.auto_classify(&input.owner).await
            },
        );
        registry.register(
            "batch_repository_health",
            "Health-check several repositories; failed lookups are reported alongside the results",
            |ctx: Arc<ToolContext>, input: BatchInput| async move {
                Ok::<_, LensError>(ctx.github.batch_health(&input.owner, &input.repos).await)
            },
        );
        registry.register(
            "sf311_cycle_times",
            "Average, median, min and max days to close SF 311 cases",
            |ctx: Arc<ToolContext>, input: CycleTimeInput| async move {
                let filters = CaseFilters {
                    service_name_prefix: input.service_name_filter,
                    neighborhood: input.neighborhood,
                    supervisor_district: None,
                };
                ctx.sf311.cycle_times(&filters, input.days_back).await
            },
        );
        registry.register(
            "sf311_resubmissions",
            "Detect SF 311 cases reopened at the same address and subtype soon after closure",
            |ctx: Arc<ToolContext>, input: ResubmissionInput| async move {
                let filters = CaseFilters {
                    service_name_prefix: input.service_name_filter,
                    neighborhood: None,
                    supervisor_district: input.supervisor_district,
                };
                ctx.sf311
                    .resubmissions(&filters, input.days_back, input.reopen_window_days)
                    .await
            },
        );

        registry
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LensError::Validation(format!("'{field}' must not be empty")));
    }
    Ok(())
}

fn require_days(field: &str, value: u32, max: u32) -> Result<()> {
    if value == 0 || value > max {
        return Err(LensError::Validation(format!(
            "'{field}' must be between 1 and {max}, got {value}"
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OwnerInput {
    pub owner: String,
}

impl ToolInput for OwnerInput {
    fn validate(&self) -> Result<()> {
        require_non_empty("owner", &self.owner)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryInput {
    pub owner: String,
    pub repo: String,
}

impl ToolInput for RepositoryInput {
    fn validate(&self) -> Result<()> {
        require_non_empty("owner", &self.owner)?;
        require_non_empty("repo", &self.repo)
    }
}

fn default_issue_filter() -> IssueFilter {
    IssueFilter::All
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueQueryInput {
    pub owner: String,
    #[serde(default = "default_issue_filter")]
    pub kind: IssueFilter,
}

impl ToolInput for IssueQueryInput {
    fn validate(&self) -> Result<()> {
        require_non_empty("owner", &self.owner)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchInput {
    pub owner: String,
    pub repos: Vec<String>,
}

impl ToolInput for BatchInput {
    fn validate(&self) -> Result<()> {
        require_non_empty("owner", &self.owner)?;
        if self.repos.is_empty() || self.repos.len() > MAX_BATCH_REPOSITORIES {
            return Err(LensError::Validation(format!(
                "'repos' must list between 1 and {MAX_BATCH_REPOSITORIES} repositories"
            )));
        }
        self.repos
            .iter()
            .try_for_each(|repo| require_non_empty("repos", repo))
    }
}

fn default_cycle_days() -> u32 {
    30
}

fn default_resubmission_days() -> u32 {
    90
}

fn default_reopen_window() -> u32 {
    DEFAULT_REOPEN_WINDOW_DAYS
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CycleTimeInput {
    #[serde(default)]
    pub service_name_filter: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default = "default_cycle_days")]
    pub days_back: u32,
}

impl ToolInput for CycleTimeInput {
    fn validate(&self) -> Result<()> {
        require_days("days_back", self.days_back, MAX_LOOKBACK_DAYS)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResubmissionInput {
    #[serde(default)]
    pub service_name_filter: Option<String>,
    #[serde(default)]
    pub supervisor_district: Option<String>,
    #[serde(default = "default_resubmission_days")]
    pub days_back: u32,
    #[serde(default = "default_reopen_window")]
    pub reopen_window_days: u32,
}

impl ToolInput for ResubmissionInput {
    fn validate(&self) -> Result<()> {
        require_days("days_back", self.days_back, MAX_LOOKBACK_DAYS)?;
        require_days("reopen_window_days", self.reopen_window_days, self.days_back)
    }
}
