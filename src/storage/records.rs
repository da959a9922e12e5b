//! Typed records and helpers on top of the generic gateway.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use super::database::{Database, DatabaseError, Record, SelectQuery, SqlValue};
use super::schema::{
    create_statements, CHALLENGES_TABLE, GENERATION_RESULTS_TABLE, MODELS_TABLE, SEED_MODEL_NAMES,
};
use crate::catalog::Difficulty;

/// A stored programming challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: i64,
    pub title: String,
    /// Catalog markup, stored verbatim.
    pub statement: String,
    pub difficulty: Difficulty,
}

/// A challenge that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChallenge {
    pub title: String,
    pub statement: String,
    pub difficulty: Difficulty,
}

/// A logical model name such as `GPT` or `LLAMA`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: i64,
    pub name: String,
}

/// Kind of a stored generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    /// Plain prompt, no refinement.
    Baseline,
}

impl GenerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationKind::Baseline => "baseline",
        }
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GenerationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baseline" => Ok(GenerationKind::Baseline),
            other => Err(format!("unknown generation kind '{}'", other)),
        }
    }
}

/// Accepted code for one (challenge, model) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub challenge_id: i64,
    pub model_id: i64,
    pub kind: GenerationKind,
    pub source_code: String,
}

impl GenerationResult {
    pub fn baseline(challenge_id: i64, model_id: i64, source_code: impl Into<String>) -> Self {
        Self {
            challenge_id,
            model_id,
            kind: GenerationKind::Baseline,
            source_code: source_code.into(),
        }
    }
}

fn required_i64(record: &Record, column: &str) -> Result<i64, DatabaseError> {
    record
        .get(column)
        .and_then(SqlValue::as_i64)
        .ok_or_else(|| DatabaseError::InvalidRecord(format!("missing integer column '{}'", column)))
}

fn required_text(record: &Record, column: &str) -> Result<String, DatabaseError> {
    record
        .get(column)
        .and_then(SqlValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| DatabaseError::InvalidRecord(format!("missing text column '{}'", column)))
}

impl TryFrom<&Record> for Challenge {
    type Error = DatabaseError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        let difficulty = required_text(record, "difficulty")?
            .parse()
            .map_err(DatabaseError::InvalidRecord)?;
        Ok(Self {
            id: required_i64(record, "id")?,
            title: required_text(record, "title")?,
            statement: required_text(record, "statement")?,
            difficulty,
        })
    }
}

impl TryFrom<&Record> for ModelDescriptor {
    type Error = DatabaseError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        Ok(Self {
            id: required_i64(record, "id")?,
            name: required_text(record, "name")?,
        })
    }
}

impl TryFrom<&Record> for GenerationResult {
    type Error = DatabaseError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        Ok(Self {
            challenge_id: required_i64(record, "challenge_id")?,
            model_id: required_i64(record, "model_id")?,
            kind: required_text(record, "kind")?
                .parse()
                .map_err(DatabaseError::InvalidRecord)?,
            source_code: required_text(record, "source_code")?,
        })
    }
}

impl Database {
    // =========================================================================
    // Schema
    // =========================================================================

    /// Create the tables if missing and optionally seed the model names.
    ///
    /// Returns the number of model names inserted.
    pub async fn initialize_schema(&mut self, seed_models: bool) -> Result<usize, DatabaseError> {
        for statement in create_statements(self.backend()) {
            self.execute_raw(statement).await?;
        }
        info!(backend = %self.backend(), "Schema ready");

        if !seed_models {
            return Ok(0);
        }

        let mut seeded = 0;
        for name in SEED_MODEL_NAMES {
            let existing = self
                .select(
                    &SelectQuery::new(MODELS_TABLE)
                        .columns(["id"])
                        .filter("name", name)
                        .limit(1),
                )
                .await?;
            if existing.is_empty() {
                self.save_model(name).await?;
                seeded += 1;
            }
        }
        info!(seeded, "Model names seeded");
        Ok(seeded)
    }

    // =========================================================================
    // Challenges
    // =========================================================================

    pub async fn save_challenge(&mut self, challenge: &NewChallenge) -> Result<(), DatabaseError> {
        let mut record = Record::new();
        record.insert("title".to_string(), challenge.title.as_str().into());
        record.insert("statement".to_string(), challenge.statement.as_str().into());
        record.insert("difficulty".to_string(), challenge.difficulty.as_str().into());
        self.insert(CHALLENGES_TABLE, &record).await?;
        Ok(())
    }

    /// Load up to `limit` challenges.
    pub async fn load_challenges(&mut self, limit: u64) -> Result<Vec<Challenge>, DatabaseError> {
        let query = SelectQuery::new(CHALLENGES_TABLE)
            .columns(["id", "title", "statement", "difficulty"])
            .limit(limit);
        self.select(&query)
            .await?
            .iter()
            .map(Challenge::try_from)
            .collect()
    }

    // =========================================================================
    // Models
    // =========================================================================

    pub async fn save_model(&mut self, name: &str) -> Result<(), DatabaseError> {
        let mut record = Record::new();
        record.insert("name".to_string(), name.into());
        self.insert(MODELS_TABLE, &record).await?;
        Ok(())
    }

    /// Load up to `limit` model descriptors.
    pub async fn load_models(&mut self, limit: u64) -> Result<Vec<ModelDescriptor>, DatabaseError> {
        let query = SelectQuery::new(MODELS_TABLE)
            .columns(["id", "name"])
            .limit(limit);
        self.select(&query)
            .await?
            .iter()
            .map(ModelDescriptor::try_from)
            .collect()
    }

    // =========================================================================
    // Generation results
    // =========================================================================

    pub async fn save_generation_result(
        &mut self,
        result: &GenerationResult,
    ) -> Result<(), DatabaseError> {
        let mut record = Record::new();
        record.insert("challenge_id".to_string(), result.challenge_id.into());
        record.insert("model_id".to_string(), result.model_id.into());
        record.insert("kind".to_string(), result.kind.as_str().into());
        record.insert("source_code".to_string(), result.source_code.as_str().into());
        self.insert(GENERATION_RESULTS_TABLE, &record).await?;
        Ok(())
    }

    /// Load up to `limit` generation results, optionally for one challenge.
    pub async fn load_generation_results(
        &mut self,
        challenge_id: Option<i64>,
        limit: u64,
    ) -> Result<Vec<GenerationResult>, DatabaseError> {
        let mut query = SelectQuery::new(GENERATION_RESULTS_TABLE)
            .columns(["challenge_id", "model_id", "kind", "source_code"])
            .limit(limit);
        if let Some(id) = challenge_id {
            query = query.filter("challenge_id", id);
        }
        self.select(&query)
            .await?
            .iter()
            .map(GenerationResult::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fresh_db() -> Database {
        let mut db = Database::new("sqlite::memory:").expect("url");
        db.initialize_schema(false).await.expect("schema");
        db
    }

    #[tokio::test]
    async fn test_initialize_schema_seeds_once() {
        let mut db = Database::new("sqlite::memory:").expect("url");
        assert_eq!(db.initialize_schema(true).await.expect("schema"), 4);
        assert_eq!(db.initialize_schema(true).await.expect("schema"), 0);

        let models = db.load_models(300).await.expect("models");
        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, SEED_MODEL_NAMES.to_vec());
    }

    #[tokio::test]
    async fn test_challenge_round_trip() {
        let mut db = fresh_db().await;
        let challenge = NewChallenge {
            title: "Two Sum".to_string(),
            statement: "<p>Given an array</p>".to_string(),
            difficulty: Difficulty::Easy,
        };
        db.save_challenge(&challenge).await.expect("save");

        let loaded = db.load_challenges(300).await.expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, 1);
        assert_eq!(loaded[0].title, "Two Sum");
        assert_eq!(loaded[0].statement, "<p>Given an array</p>");
        assert_eq!(loaded[0].difficulty, Difficulty::Easy);
    }

    #[tokio::test]
    async fn test_load_respects_limit() {
        let mut db = fresh_db().await;
        for name in ["a", "b", "c"] {
            db.save_model(name).await.expect("save");
        }
        assert_eq!(db.load_models(2).await.expect("load").len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_model_name_is_rejected() {
        let mut db = fresh_db().await;
        db.save_model("GPT").await.expect("first insert");
        assert!(matches!(
            db.save_model("GPT").await,
            Err(DatabaseError::QueryFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_generation_results_filter_by_challenge() {
        let mut db = fresh_db().await;
        for title in ["Two Sum", "Add Two Numbers"] {
            db.save_challenge(&NewChallenge {
                title: title.to_string(),
                statement: "statement".to_string(),
                difficulty: Difficulty::Medium,
            })
            .await
            .expect("challenge");
        }
        db.save_model("GPT").await.expect("model");

        db.save_generation_result(&GenerationResult::baseline(1, 1, "x = 1"))
            .await
            .expect("save");
        db.save_generation_result(&GenerationResult::baseline(2, 1, "y = 2"))
            .await
            .expect("save");

        let for_two = db.load_generation_results(Some(2), 300).await.expect("load");
        assert_eq!(for_two, vec![GenerationResult::baseline(2, 1, "y = 2")]);
        assert_eq!(db.load_generation_results(None, 300).await.expect("load").len(), 2);
    }

    #[tokio::test]
    async fn test_generation_result_requires_existing_pair() {
        let mut db = fresh_db().await;
        assert!(matches!(
            db.save_generation_result(&GenerationResult::baseline(1, 1, "x = 1"))
                .await,
            Err(DatabaseError::QueryFailed(_))
        ));
        assert!(db
            .load_generation_results(None, 300)
            .await
            .expect("load")
            .is_empty());
    }

    #[test]
    fn test_record_conversion_errors() {
        let mut record = Record::new();
        record.insert("id".to_string(), SqlValue::Text("one".to_string()));
        record.insert("name".to_string(), SqlValue::Text("GPT".to_string()));
        assert!(matches!(
            ModelDescriptor::try_from(&record),
            Err(DatabaseError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_generation_kind_storage_form() {
        assert_eq!(GenerationKind::Baseline.as_str(), "baseline");
        assert_eq!("baseline".parse::<GenerationKind>(), Ok(GenerationKind::Baseline));
        assert!("refined".parse::<GenerationKind>().is_err());
    }
}
