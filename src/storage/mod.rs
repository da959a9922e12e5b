//! Relational persistence.
//!
//! The storage layer consists of:
//! - **Database**: gateway owning one `sqlx` connection (SQLite, MySQL or
//!   PostgreSQL), with generic `insert`/`select` over named tables
//! - **Schema**: table names and dialect-specific DDL
//! - **Records**: typed challenges, models and generation results
//!
//! # Usage
//!
//! ```rust,ignore
//! use baseline_forge::storage::{Database, GenerationResult};
//!
//! let mut db = Database::new("sqlite://forge.db")?;
//! db.initialize_schema(true).await?;
//!
//! let challenges = db.load_challenges(1).await?;
//! let models = db.load_models(4).await?;
//! db.save_generation_result(&GenerationResult::baseline(challenges[0].id, models[0].id, code))
//!     .await?;
//! db.close().await?;
//! ```

pub mod database;
pub mod records;
pub mod schema;

pub use database::{
    insert_sql, validate_identifier, Database, DatabaseError, DbBackend, Record, SelectQuery,
    SqlValue, DEFAULT_SELECT_LIMIT,
};
pub use records::{Challenge, GenerationKind, GenerationResult, ModelDescriptor, NewChallenge};
pub use schema::{
    create_statements, CHALLENGES_TABLE, GENERATION_RESULTS_TABLE, MODELS_TABLE, SEED_MODEL_NAMES,
};
