//! End-to-end pipeline tests on SQLite with stub backends.

use async_trait::async_trait;
use baseline_forge::catalog::{Difficulty, ProblemCatalog, ProblemSummary};
use baseline_forge::generation::{GenerationOrchestrator, Sleeper};
use baseline_forge::llm::{
    BackendKind, BackendSet, GenerationRequest, GenerationResponse, LlmProvider, ProviderRouter,
    Usage,
};
use baseline_forge::pipeline::{BatchDriver, CatalogIngestor};
use baseline_forge::storage::{
    Database, GenerationKind, NewChallenge, SelectQuery, SqlValue, GENERATION_RESULTS_TABLE,
};
use baseline_forge::LlmError;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const ANSWER: &str = "Here you go:\n```python\nclass Solution:\n    def twoSum(self, nums, target):\n        seen = {}\n        for i, n in enumerate(nums):\n            if target - n in seen:\n                return [seen[target - n], i]\n            seen[n] = i\n```\n";

/// Answers every request with the same text and records the prompts.
struct StubBackend {
    answer: String,
    prompts: Mutex<Vec<String>>,
}

impl StubBackend {
    fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmProvider for StubBackend {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let prompt = request
            .messages
            .first()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().expect("lock poisoned").push(prompt);
        Ok(GenerationResponse::single(
            request.model,
            self.answer.clone(),
            Usage::new(100, 50),
        ))
    }
}

struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

struct OneProblemCatalog;

#[async_trait]
impl ProblemCatalog for OneProblemCatalog {
    async fn fetch_problem_list(&self) -> Vec<ProblemSummary> {
        vec![ProblemSummary {
            title: "Two Sum".to_string(),
            slug: "two-sum".to_string(),
            difficulty: Difficulty::Easy,
        }]
    }

    async fn fetch_statement(&self, _slug: &str) -> String {
        "<p>Given an array of integers <code>nums</code>...</p>".to_string()
    }
}

fn orchestrator(backend: Arc<StubBackend>) -> GenerationOrchestrator {
    GenerationOrchestrator::new(
        ProviderRouter::new(),
        BackendSet::new().with_backend(BackendKind::Chat, backend),
    )
    .with_sleeper(Arc::new(NoSleep))
}

#[tokio::test]
async fn test_one_challenge_one_model_stores_one_result() {
    let mut db = Database::new("sqlite::memory:").expect("url");
    db.initialize_schema(false).await.expect("schema");
    db.save_challenge(&NewChallenge {
        title: "Two Sum".to_string(),
        statement: "Return indices of the two numbers adding up to target.".to_string(),
        difficulty: Difficulty::Easy,
    })
    .await
    .expect("challenge");
    db.save_model("GPT").await.expect("model");

    let backend = Arc::new(StubBackend::new(ANSWER));
    let summary = BatchDriver::new(orchestrator(backend.clone()))
        .run(&mut db)
        .await
        .expect("batch");

    assert_eq!(summary.pairs, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failures(), 0);

    let challenge = &db.load_challenges(1).await.expect("challenges")[0];
    let model = &db.load_models(1).await.expect("models")[0];

    let rows = db
        .select(&SelectQuery::new(GENERATION_RESULTS_TABLE))
        .await
        .expect("rows");
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row["challenge_id"], SqlValue::Integer(challenge.id));
    assert_eq!(row["model_id"], SqlValue::Integer(model.id));
    assert_eq!(row["kind"].as_str(), Some(GenerationKind::Baseline.as_str()));

    let code = row["source_code"].as_str().expect("source code");
    assert!(code.starts_with("class Solution:"));
    assert!(code.ends_with("seen[n] = i"));
    assert!(!code.contains("```"));
    assert!(!row["created_at"].is_null());

    let prompts = backend.prompts.lock().expect("lock poisoned");
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].ends_with("CHALLENGE: Return indices of the two numbers adding up to target."));

    db.close().await.expect("close");
}

#[tokio::test]
async fn test_invalid_answers_store_nothing() {
    let mut db = Database::new("sqlite::memory:").expect("url");
    db.initialize_schema(true).await.expect("schema");
    db.save_challenge(&NewChallenge {
        title: "Two Sum".to_string(),
        statement: "statement".to_string(),
        difficulty: Difficulty::Easy,
    })
    .await
    .expect("challenge");

    let backend = Arc::new(StubBackend::new("Sorry, I can't help with that."));
    let mut backends = BackendSet::new().with_backend(BackendKind::Chat, backend.clone());
    backends = backends.with_backend(BackendKind::TextGeneration, backend.clone());
    let orchestrator = GenerationOrchestrator::new(ProviderRouter::new(), backends)
        .with_sleeper(Arc::new(NoSleep));

    let summary = BatchDriver::new(orchestrator)
        .run(&mut db)
        .await
        .expect("batch");

    assert_eq!(summary.pairs, 4);
    assert_eq!(summary.generation_failures, 4);
    assert_eq!(backend.prompts.lock().expect("lock poisoned").len(), 20);
    assert!(db
        .load_generation_results(None, 300)
        .await
        .expect("results")
        .is_empty());
}

#[tokio::test]
async fn test_ingest_then_generate_on_file_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("forge.db").display());

    let mut db = Database::new(&url).expect("url");
    db.initialize_schema(true).await.expect("schema");

    let ingest = CatalogIngestor::new(Arc::new(OneProblemCatalog))
        .with_sleeper(Arc::new(NoSleep))
        .run(&mut db)
        .await;
    assert_eq!(ingest.stored, 1);
    db.close().await.expect("close");

    // A fresh gateway on the same file sees the ingested data.
    let mut db = Database::new(&url).expect("url");
    let backend = Arc::new(StubBackend::new(ANSWER));
    let summary = BatchDriver::new(orchestrator(backend))
        .with_model_limit(2)
        .run(&mut db)
        .await
        .expect("batch");

    // Seeded order is Gemini, deepseek; no Gemini backend is configured.
    assert_eq!(summary.pairs, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.generation_failures, 1);

    let results = db.load_generation_results(None, 300).await.expect("results");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].model_id, 2);
    db.close().await.expect("close");
}
