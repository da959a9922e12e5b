//! LeetCode catalog client.
//!
//! The problem list comes from the public REST endpoint
//! (`/api/problems/all/`), statements from the GraphQL endpoint.
//! Paid-only problems are skipped.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::{Difficulty, ProblemCatalog, ProblemSummary};
use crate::error::CatalogError;

/// LeetCode site root.
pub const LEETCODE_BASE_URL: &str = "https://leetcode.com";

/// Browser-like user agent; the list endpoint rejects bare clients.
pub const CATALOG_USER_AGENT: &str = "Mozilla/5.0";

/// Default number of problems kept per difficulty level.
pub const DEFAULT_PER_DIFFICULTY_LIMIT: usize = 100;

/// Placeholder stored when a problem has no statement.
pub const NO_STATEMENT_PLACEHOLDER: &str = "No statement available";

/// Placeholder stored when the statement could not be fetched.
pub const STATEMENT_ERROR_PLACEHOLDER: &str = "Failed to load statement";

const STATEMENT_QUERY: &str =
    "query questionContent($titleSlug: String!) { question(titleSlug: $titleSlug) { content } }";

/// Client for the LeetCode public API.
pub struct LeetCodeClient {
    http_client: Client,
    base_url: String,
    per_difficulty_limit: usize,
}

impl LeetCodeClient {
    /// Create a client against leetcode.com.
    pub fn new() -> Result<Self, CatalogError> {
        Self::with_base_url(LEETCODE_BASE_URL)
    }

    /// Create a client against another host, e.g. a mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, CatalogError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(CATALOG_USER_AGENT)
            .build()
            .map_err(|e| CatalogError::HttpError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            per_difficulty_limit: DEFAULT_PER_DIFFICULTY_LIMIT,
        })
    }

    pub fn with_per_difficulty_limit(mut self, limit: usize) -> Self {
        self.per_difficulty_limit = limit;
        self
    }

    pub fn per_difficulty_limit(&self) -> usize {
        self.per_difficulty_limit
    }

    /// Fetch and parse the problem list, surfacing errors.
    pub async fn try_fetch_problem_list(&self) -> Result<Vec<ProblemSummary>, CatalogError> {
        let url = format!("{}/api/problems/all/", self.base_url);
        debug!(url = %url, "Fetching problem list");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::HttpError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::HttpError(e.to_string()))?;

        parse_problem_list(&body, self.per_difficulty_limit)
    }

    /// Fetch a statement, surfacing errors. `Ok(None)` means the problem
    /// exists but has no content.
    pub async fn try_fetch_statement(&self, slug: &str) -> Result<Option<String>, CatalogError> {
        let url = format!("{}/graphql", self.base_url);
        let query = GraphQlRequest {
            query: STATEMENT_QUERY,
            variables: StatementVariables { title_slug: slug },
        };

        let response = self
            .http_client
            .post(&url)
            .json(&query)
            .send()
            .await
            .map_err(|e| CatalogError::HttpError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
            });
        }

        let body: StatementResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(e.to_string()))?;

        let question = body
            .data
            .and_then(|data| data.question)
            .ok_or_else(|| CatalogError::ParseError(format!("no question for slug '{}'", slug)))?;

        Ok(question.content.filter(|content| !content.is_empty()))
    }
}

#[async_trait]
impl ProblemCatalog for LeetCodeClient {
    async fn fetch_problem_list(&self) -> Vec<ProblemSummary> {
        match self.try_fetch_problem_list().await {
            Ok(problems) => {
                info!(count = problems.len(), "Fetched problem list");
                problems
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch problem list");
                Vec::new()
            }
        }
    }

    async fn fetch_statement(&self, slug: &str) -> String {
        match self.try_fetch_statement(slug).await {
            Ok(Some(content)) => content,
            Ok(None) => NO_STATEMENT_PLACEHOLDER.to_string(),
            Err(e) => {
                warn!(slug = %slug, error = %e, "Failed to fetch statement");
                STATEMENT_ERROR_PLACEHOLDER.to_string()
            }
        }
    }
}

/// Parse the list endpoint body.
///
/// Keeps at most `per_difficulty_limit` free problems per level, stops
/// scanning once every level is full, and returns easy, medium, hard in
/// that order. Unknown levels are skipped.
pub fn parse_problem_list(
    body: &str,
    per_difficulty_limit: usize,
) -> Result<Vec<ProblemSummary>, CatalogError> {
    let list: ProblemListResponse = serde_json::from_str(body)?;

    let mut easy = Vec::new();
    let mut medium = Vec::new();
    let mut hard = Vec::new();

    for pair in list.stat_status_pairs {
        if easy.len() >= per_difficulty_limit
            && medium.len() >= per_difficulty_limit
            && hard.len() >= per_difficulty_limit
        {
            break;
        }
        if pair.paid_only {
            continue;
        }

        let Some(difficulty) = Difficulty::from_level(pair.difficulty.level) else {
            continue;
        };
        let bucket = match difficulty {
            Difficulty::Easy => &mut easy,
            Difficulty::Medium => &mut medium,
            Difficulty::Hard => &mut hard,
        };
        if bucket.len() < per_difficulty_limit {
            bucket.push(ProblemSummary {
                title: pair.stat.question_title,
                slug: pair.stat.question_title_slug,
                difficulty,
            });
        }
    }

    easy.extend(medium);
    easy.extend(hard);
    Ok(easy)
}

#[derive(Debug, Deserialize)]
struct ProblemListResponse {
    stat_status_pairs: Vec<StatStatusPair>,
}

#[derive(Debug, Deserialize)]
struct StatStatusPair {
    stat: ProblemStat,
    difficulty: LevelInfo,
    #[serde(default)]
    paid_only: bool,
}

#[derive(Debug, Deserialize)]
struct ProblemStat {
    #[serde(rename = "question__title")]
    question_title: String,
    #[serde(rename = "question__title_slug")]
    question_title_slug: String,
}

#[derive(Debug, Deserialize)]
struct LevelInfo {
    level: u8,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: StatementVariables<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatementVariables<'a> {
    title_slug: &'a str,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    data: Option<StatementData>,
}

#[derive(Debug, Deserialize)]
struct StatementData {
    question: Option<Question>,
}

#[derive(Debug, Deserialize)]
struct Question {
    content: Option<String>,
}
