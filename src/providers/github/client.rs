use chrono::{DateTime, Utc};
use log::{debug, info};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::auth::Token;
use crate::error::{LensError, Result};
use crate::models::RepositoryRecord;

const PER_PAGE: usize = 100;

#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: Url,
    token: Option<Token>,
}

#[derive(Debug, Deserialize)]
pub struct GitHubLicenseDto {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GitHubRepositoryDto {
    pub name: String,
    pub description: Option<String>,
    pub private: bool,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    pub language: Option<String>,
    pub license: Option<GitHubLicenseDto>,
}

impl GitHubRepositoryDto {
    /// Convert into a record once the README probe result is known.
    pub fn into_record(self, has_readme: bool) -> RepositoryRecord {
        RepositoryRecord {
            name: self.name,
            description: self.description,
            has_license: self.license.is_some(),
            license_name: self.license.and_then(|l| l.name),
            has_readme,
            is_private: self.private,
            updated_at: self.updated_at,
            star_count: self.stargazers_count,
            fork_count: self.forks_count,
            language: self.language,
        }
    }
}

impl GitHubClient {
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent("AgentLens/0.1.0")
            .build()
            .map_err(|e| LensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let api_url = Url::parse(base_url)
            .map_err(|e| LensError::Config(format!("Invalid GitHub API URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    /// Helper to build authenticated requests
    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    /// Join path segments onto the API base, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| LensError::Config(format!("Cannot use {} as a base URL", self.api_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Fetch a page of an owner's repositories
    pub async fn fetch_repository_page(
        &self,
        owner: &str,
        page: u32,
    ) -> Result<Vec<GitHubRepositoryDto>> {
        let url = self.endpoint(&["users", owner, "repos"])?;
        let request = self
            .client
            .get(url)
            .query(&[("per_page", PER_PAGE.to_string()), ("page", page.to_string())])
            .query(&[("sort", "updated")]);
        let response = self.auth_request(request).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(LensError::NotFound(format!("GitHub owner '{owner}'"))),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(LensError::Api(format!(
                    "Failed to list repositories for '{owner}': {status} - {body}"
                )))
            }
            _ => Ok(response.json::<Vec<GitHubRepositoryDto>>().await?),
        }
    }

    /// Fetch every repository of an owner, page by page
    pub async fn list_repositories(&self, owner: &str) -> Result<Vec<GitHubRepositoryDto>> {
        let mut all_repositories = Vec::new();
        let mut page = 1;

        loop {
            let repositories = self.fetch_repository_page(owner, page).await?;
            let fetched_count = repositories.len();
            all_repositories.extend(repositories);

            info!(
                "Page {page}: fetched {fetched_count} repositories (total: {})",
                all_repositories.len()
            );

            if fetched_count < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(all_repositories)
    }

    /// Fetch a single repository
    pub async fn get_repository(&self, owner: &str, repo: &str) -> Result<GitHubRepositoryDto> {
        let url = self.endpoint(&["repos", owner, repo])?;
        let response = self.auth_request(self.client.get(url)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(LensError::NotFound(format!(
                "GitHub repository '{owner}/{repo}'"
            ))),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(LensError::Api(format!(
                    "Failed to fetch repository '{owner}/{repo}': {status} - {body}"
                )))
            }
            _ => Ok(response.json::<GitHubRepositoryDto>().await?),
        }
    }

    /// Probe for a README. Every failure, not-found or otherwise, reads as absent.
    pub async fn has_readme(&self, owner: &str, repo: &str) -> bool {
        let Ok(url) = self.endpoint(&["repos", owner, repo, "readme"]) else {
            return false;
        };

        match self.auth_request(self.client.get(url)).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!("README probe for {owner}/{repo} returned {}", response.status());
                false
            }
            Err(e) => {
                debug!("README probe for {owner}/{repo} failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn repo_json(name: &str, license: bool) -> serde_json::Value {
        let license = if license {
            serde_json::json!({"key": "mit", "name": "MIT License"})
        } else {
            serde_json::Value::Null
        };
        serde_json::json!({
            "name": name,
            "description": "Command line tool",
            "private": false,
            "updated_at": "2024-09-30T12:00:00Z",
            "stargazers_count": 12,
            "forks_count": 2,
            "language": "Rust",
            "license": license,
        })
    }

    #[test]
    fn test_dto_into_record_carries_license_name() {
        let dto: GitHubRepositoryDto = serde_json::from_value(repo_json("tool", true)).unwrap();

        let record = dto.into_record(false);

        assert!(record.has_license);
        assert_eq!(record.license_name.as_deref(), Some("MIT License"));
        assert!(!record.has_readme);
        assert_eq!(record.star_count, 12);
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = GitHubClient::new("https://api.github.com", None).unwrap();

        let url = client.endpoint(&["repos", "octo cat", "readme"]).unwrap();

        assert_eq!(url.as_str(), "https://api.github.com/repos/octo%20cat/readme");
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let result = GitHubClient::new("not a url", None);

        assert!(matches!(result, Err(LensError::Config(_))));
    }

    #[tokio::test]
    async fn test_list_repositories_stops_on_short_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/users/octo/repos")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!([repo_json("one", true), repo_json("two", false)]).to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let client = GitHubClient::new(&server.url(), Some(Token::from("ghp_test"))).unwrap();
        let repositories = client.list_repositories("octo").await.unwrap();

        mock.assert_async().await;
        assert_eq!(repositories.len(), 2);
        assert_eq!(repositories[1].name, "two");
    }

    #[tokio::test]
    async fn test_list_repositories_failure_is_propagated() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/octo/repos")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = GitHubClient::new(&server.url(), None).unwrap();
        let result = client.list_repositories("octo").await;

        assert!(matches!(result, Err(LensError::Api(message)) if message.contains("boom")));
    }

    #[tokio::test]
    async fn test_get_repository_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/octo/missing")
            .with_status(404)
            .create_async()
            .await;

        let client = GitHubClient::new(&server.url(), None).unwrap();
        let result = client.get_repository("octo", "missing").await;

        assert!(matches!(result, Err(LensError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_has_readme_maps_every_failure_to_false() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/octo/present/readme")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        server
            .mock("GET", "/repos/octo/absent/readme")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/octo/flaky/readme")
            .with_status(502)
            .create_async()
            .await;

        let client = GitHubClient::new(&server.url(), None).unwrap();

        assert!(client.has_readme("octo", "present").await);
        assert!(!client.has_readme("octo", "absent").await);
        assert!(!client.has_readme("octo", "flaky").await);
    }

    #[tokio::test]
    async fn test_has_readme_transport_error_is_false() {
        let client = GitHubClient::new("http://127.0.0.1:1", None).unwrap();

        assert!(!client.has_readme("octo", "anything").await);
    }
}
