//! Table names and dialect-specific DDL.

use super::database::DbBackend;

/// Challenges ingested from the catalog.
pub const CHALLENGES_TABLE: &str = "challenges";

/// Logical model names.
pub const MODELS_TABLE: &str = "models";

/// Accepted generations.
pub const GENERATION_RESULTS_TABLE: &str = "generation_results";

/// Model names seeded by `init-db --seed-models`, one per routing family.
pub const SEED_MODEL_NAMES: [&str; 4] = ["Gemini", "deepseek", "GPT", "LLAMA"];

const SQLITE_SCHEMA: [&str; 3] = [
    r#"
CREATE TABLE IF NOT EXISTS challenges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    statement TEXT NOT NULL,
    difficulty TEXT NOT NULL
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS models (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS generation_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    challenge_id INTEGER NOT NULL REFERENCES challenges(id),
    model_id INTEGER NOT NULL REFERENCES models(id),
    kind TEXT NOT NULL,
    source_code TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#,
];

const MYSQL_SCHEMA: [&str; 3] = [
    r#"
CREATE TABLE IF NOT EXISTS challenges (
    id BIGINT AUTO_INCREMENT PRIMARY KEY,
    title VARCHAR(255) NOT NULL,
    statement LONGTEXT NOT NULL,
    difficulty VARCHAR(16) NOT NULL
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS models (
    id BIGINT AUTO_INCREMENT PRIMARY KEY,
    name VARCHAR(255) NOT NULL UNIQUE
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS generation_results (
    id BIGINT AUTO_INCREMENT PRIMARY KEY,
    challenge_id BIGINT NOT NULL,
    model_id BIGINT NOT NULL,
    kind VARCHAR(32) NOT NULL,
    source_code LONGTEXT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (challenge_id) REFERENCES challenges(id),
    FOREIGN KEY (model_id) REFERENCES models(id)
)
"#,
];

const POSTGRES_SCHEMA: [&str; 3] = [
    r#"
CREATE TABLE IF NOT EXISTS challenges (
    id BIGSERIAL PRIMARY KEY,
    title TEXT NOT NULL,
    statement TEXT NOT NULL,
    difficulty VARCHAR(16) NOT NULL
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS models (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(255) NOT NULL UNIQUE
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS generation_results (
    id BIGSERIAL PRIMARY KEY,
    challenge_id BIGINT NOT NULL REFERENCES challenges(id),
    model_id BIGINT NOT NULL REFERENCES models(id),
    kind VARCHAR(32) NOT NULL,
    source_code TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#,
];

/// `CREATE TABLE IF NOT EXISTS` statements for `backend`, in dependency order.
pub fn create_statements(backend: DbBackend) -> &'static [&'static str] {
    match backend {
        DbBackend::Sqlite => &SQLITE_SCHEMA,
        DbBackend::MySql => &MYSQL_SCHEMA,
        DbBackend::Postgres => &POSTGRES_SCHEMA,
    }
}
