//! Catalog ingestion into the challenges table.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::catalog::ProblemCatalog;
use crate::generation::{Sleeper, TokioSleeper};
use crate::storage::{Database, NewChallenge};

use super::config::DEFAULT_CATALOG_REQUEST_DELAY_MS;

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Problems returned by the catalog.
    pub fetched: usize,
    pub stored: usize,
    pub failed: usize,
}

/// Copies catalog problems and their statements into storage.
pub struct CatalogIngestor {
    catalog: Arc<dyn ProblemCatalog>,
    request_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl CatalogIngestor {
    pub fn new(catalog: Arc<dyn ProblemCatalog>) -> Self {
        Self {
            catalog,
            request_delay: Duration::from_millis(DEFAULT_CATALOG_REQUEST_DELAY_MS),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Pause after each problem, to stay under the catalog's rate limit.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Fetch the problem list and store every problem with its statement.
    ///
    /// A failed insert is logged and skipped.
    pub async fn run(&self, db: &mut Database) -> IngestSummary {
        let problems = self.catalog.fetch_problem_list().await;
        let mut summary = IngestSummary {
            fetched: problems.len(),
            ..IngestSummary::default()
        };

        if problems.is_empty() {
            warn!("Catalog returned no problems");
            return summary;
        }

        let total = problems.len();
        for (index, problem) in problems.into_iter().enumerate() {
            info!(
                index = index + 1,
                total,
                title = %problem.title,
                "Ingesting problem"
            );

            let statement = self.catalog.fetch_statement(&problem.slug).await;
            let challenge = NewChallenge {
                title: problem.title,
                statement,
                difficulty: problem.difficulty,
            };

            match db.save_challenge(&challenge).await {
                Ok(()) => summary.stored += 1,
                Err(e) => {
                    warn!(title = %challenge.title, error = %e, "Failed to store challenge");
                    summary.failed += 1;
                }
            }

            self.sleeper.sleep(self.request_delay).await;
        }

        info!(
            fetched = summary.fetched,
            stored = summary.stored,
            failed = summary.failed,
            "Catalog ingestion finished"
        );
        summary
    }
}
