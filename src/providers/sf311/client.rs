use chrono::{DateTime, NaiveDateTime, Utc};
use log::info;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use url::Url;

use super::filters::CaseFilters;
use crate::auth::Token;
use crate::error::{LensError, Result};
use crate::models::CaseRecord;

/// SF 311 Cases dataset on DataSF.
const DATASET_ID: &str = "vw6y-z8j6";
const SOQL_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S";

/// Parameters pushed down into the SoQL query.
#[derive(Debug, Clone)]
pub struct CaseQuery {
    pub filters: CaseFilters,
    pub since: DateTime<Utc>,
    pub closed_only: bool,
    pub order: &'static str,
    pub limit: usize,
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl CaseQuery {
    pub fn where_clause(&self) -> String {
        let mut clauses = vec![format!(
            "requested_datetime >= {}",
            quote(&self.since.format(SOQL_TIMESTAMP).to_string())
        )];

        if self.closed_only {
            clauses.push("status_description = 'Closed'".to_string());
            clauses.push("closed_date IS NOT NULL".to_string());
        }
        if let Some(prefix) = &self.filters.service_name_prefix {
            clauses.push(format!("starts_with(service_name, {})", quote(prefix)));
        }
        if let Some(neighborhood) = &self.filters.neighborhood {
            clauses.push(format!("analysis_neighborhood = {}", quote(neighborhood)));
        }
        if let Some(district) = &self.filters.supervisor_district {
            clauses.push(format!("supervisor_district = {}", quote(district)));
        }

        clauses.join(" AND ")
    }
}

/// DataSF serves floating timestamps without an offset; they are read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| {
            parse_timestamp(&raw)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
        })
        .transpose()
}

#[derive(Debug, Deserialize)]
pub struct SocrataCaseDto {
    pub service_request_id: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub requested_datetime: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub closed_date: Option<DateTime<Utc>>,
    pub status_description: Option<String>,
    pub service_name: Option<String>,
    pub service_subtype: Option<String>,
    pub address: Option<String>,
    pub analysis_neighborhood: Option<String>,
    pub supervisor_district: Option<String>,
}

impl From<SocrataCaseDto> for CaseRecord {
    fn from(dto: SocrataCaseDto) -> Self {
        Self {
            id: dto.service_request_id,
            requested_at: dto.requested_datetime,
            closed_at: dto.closed_date,
            address: dto.address.unwrap_or_default(),
            category: dto.service_name.unwrap_or_default(),
            subtype: dto.service_subtype.unwrap_or_default(),
            status: dto.status_description.unwrap_or_default(),
            neighborhood: dto.analysis_neighborhood,
            supervisor_district: dto.supervisor_district,
        }
    }
}

#[derive(Clone)]
pub struct SocrataClient {
    client: Client,
    api_url: Url,
    app_token: Option<Token>,
}

impl SocrataClient {
    pub fn new(base_url: &str, app_token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent("AgentLens/0.1.0")
            .build()
            .map_err(|e| LensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let api_url = Url::parse(base_url)
            .map_err(|e| LensError::Config(format!("Invalid Socrata URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            app_token,
        })
    }

    fn dataset_url(&self) -> Result<Url> {
        self.api_url
            .join(&format!("resource/{DATASET_ID}.json"))
            .map_err(|e| LensError::Config(format!("Invalid dataset URL: {e}")))
    }

    pub async fn fetch_cases(&self, query: &CaseQuery) -> Result<Vec<CaseRecord>> {
        let where_clause = query.where_clause();
        info!("Fetching up to {} SF 311 cases where {where_clause}", query.limit);

        let mut request = self.client.get(self.dataset_url()?).query(&[
            ("$where", where_clause),
            ("$order", query.order.to_string()),
            ("$limit", query.limit.to_string()),
        ]);
        if let Some(token) = &self.app_token {
            request = request.header("X-App-Token", token.as_str());
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LensError::Api(format!(
                "Failed to fetch SF 311 cases: {status} - {body}"
            )));
        }

        let rows = response.json::<Vec<SocrataCaseDto>>().await?;
        info!("Fetched {} SF 311 cases", rows.len());

        Ok(rows.into_iter().map(CaseRecord::from).collect())
    }
}
