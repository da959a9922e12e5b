//! Batch driver: every stored challenge against every stored model.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::generation::{build_baseline_prompt, GenerationOrchestrator, Sleeper, TokioSleeper};
use crate::storage::{Database, GenerationResult, DEFAULT_SELECT_LIMIT};

/// Completion report of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    /// (challenge, model) pairs processed.
    pub pairs: usize,
    pub succeeded: usize,
    pub generation_failures: usize,
    pub persistence_failures: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchSummary {
    pub fn failures(&self) -> usize {
        self.generation_failures + self.persistence_failures
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Drives the orchestrator over challenges x models and stores accepted code.
pub struct BatchDriver {
    orchestrator: GenerationOrchestrator,
    challenge_limit: u64,
    model_limit: u64,
    pair_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl BatchDriver {
    pub fn new(orchestrator: GenerationOrchestrator) -> Self {
        Self {
            orchestrator,
            challenge_limit: DEFAULT_SELECT_LIMIT,
            model_limit: DEFAULT_SELECT_LIMIT,
            pair_delay: Duration::ZERO,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_challenge_limit(mut self, limit: u64) -> Self {
        self.challenge_limit = limit;
        self
    }

    pub fn with_model_limit(mut self, limit: u64) -> Self {
        self.model_limit = limit;
        self
    }

    /// Fixed pause between consecutive pairs.
    pub fn with_pair_delay(mut self, delay: Duration) -> Self {
        self.pair_delay = delay;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Process every (challenge, model) pair in order.
    ///
    /// Only loading the inputs can fail; per-pair failures are counted in
    /// the summary.
    pub async fn run(&self, db: &mut Database) -> Result<BatchSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let challenges = db
            .load_challenges(self.challenge_limit)
            .await
            .context("Failed to load challenges")?;
        let models = db
            .load_models(self.model_limit)
            .await
            .context("Failed to load models")?;

        info!(
            %run_id,
            challenges = challenges.len(),
            models = models.len(),
            "Starting baseline generation batch"
        );

        let mut summary = BatchSummary {
            run_id,
            pairs: 0,
            succeeded: 0,
            generation_failures: 0,
            persistence_failures: 0,
            started_at,
            finished_at: started_at,
        };

        for challenge in &challenges {
            let prompt = build_baseline_prompt(&challenge.statement);

            for model in &models {
                if summary.pairs > 0 {
                    self.sleeper.sleep(self.pair_delay).await;
                }
                summary.pairs += 1;

                info!(
                    %run_id,
                    challenge_id = challenge.id,
                    model = %model.name,
                    "Processing pair"
                );

                let generated = match self.orchestrator.generate(&model.name, &prompt).await {
                    Ok(generated) => generated,
                    Err(e) => {
                        error!(
                            %run_id,
                            challenge_id = challenge.id,
                            model = %model.name,
                            error = %e,
                            "Generation failed after retries"
                        );
                        summary.generation_failures += 1;
                        continue;
                    }
                };

                let result = GenerationResult::baseline(challenge.id, model.id, generated.code);
                match db.save_generation_result(&result).await {
                    Ok(()) => summary.succeeded += 1,
                    Err(e) => {
                        warn!(
                            %run_id,
                            challenge_id = challenge.id,
                            model_id = model.id,
                            error = %e,
                            "Failed to store generation result"
                        );
                        summary.persistence_failures += 1;
                    }
                }
            }
        }

        summary.finished_at = Utc::now();
        info!(
            %run_id,
            pairs = summary.pairs,
            succeeded = summary.succeeded,
            generation_failures = summary.generation_failures,
            persistence_failures = summary.persistence_failures,
            "Batch finished"
        );
        Ok(summary)
    }
}
