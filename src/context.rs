use log::info;

use crate::config::Config;
use crate::error::Result;
use crate::providers::github::GitHubProvider;
use crate::providers::sf311::Sf311Provider;

/// Collaborators handed to every tool invocation.
///
/// Built once at startup from the resolved configuration; dropping it
/// releases the HTTP connection pools.
pub struct ToolContext {
    pub github: GitHubProvider,
    pub sf311: Sf311Provider,
}

impl ToolContext {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let github = GitHubProvider::new(
            &config.github_api_url,
            config.github_token(),
            config.probe_settings(),
        )?;
        let sf311 = Sf311Provider::new(
            &config.sf311_api_url,
            config.socrata_app_token(),
            config.case_limit,
        )?;

        info!(
            "Tool context ready (GitHub: {}, SF 311: {})",
            config.github_api_url, config.sf311_api_url
        );

        Ok(Self { github, sf311 })
    }
}
