use std::time::Duration;

use clap::Args;

use crate::auth::Token;
use crate::error::{LensError, Result};
use crate::providers::github::ProbeSettings;

/// Connection and pacing settings, from flags or the environment.
#[derive(Args, Clone)]
pub struct Config {
    /// GitHub API token (optional, raises rate limits and exposes private repositories)
    #[arg(long, env = "GITHUB_TOKEN", global = true, hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub REST API base URL
    #[arg(
        long,
        env = "GITHUB_API_URL",
        global = true,
        default_value = "https://api.github.com"
    )]
    pub github_api_url: String,

    /// DataSF (Socrata) base URL
    #[arg(
        long,
        env = "SF311_API_URL",
        global = true,
        default_value = "https://data.sfgov.org"
    )]
    pub sf311_api_url: String,

    /// Socrata application token (optional)
    #[arg(long, env = "SOCRATA_APP_TOKEN", global = true, hide_env_values = true)]
    pub socrata_app_token: Option<String>,

    /// Delay before each README probe, in milliseconds
    #[arg(long, global = true, default_value_t = 100)]
    pub probe_delay_ms: u64,

    /// Number of README probes in flight at once
    #[arg(long, global = true, default_value_t = 1)]
    pub probe_concurrency: usize,

    /// Maximum number of SF 311 rows fetched per query
    #[arg(long, global = true, default_value_t = 5000)]
    pub case_limit: usize,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.probe_concurrency == 0 {
            return Err(LensError::Config(
                "probe concurrency must be at least 1".to_string(),
            ));
        }
        if self.case_limit == 0 {
            return Err(LensError::Config("case limit must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            delay: Duration::from_millis(self.probe_delay_ms),
            concurrency: self.probe_concurrency,
        }
    }

    pub fn github_token(&self) -> Option<Token> {
        Token::from_optional(self.github_token.as_deref())
    }

    pub fn socrata_app_token(&self) -> Option<Token> {
        Token::from_optional(self.socrata_app_token.as_deref())
    }
}
