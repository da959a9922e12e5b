//! Ingestion and batch generation pipelines.
//!
//! # Pipeline Flow
//!
//! 1. **Ingestion**: free catalog problems and their statements are stored
//!    as challenges ([`CatalogIngestor`])
//! 2. **Generation**: every challenge is paired with every stored model name,
//!    the orchestrator produces validated code for the pair, and accepted
//!    code is stored as a baseline generation result ([`BatchDriver`])
//!
//! Everything runs sequentially on the caller's task. Failures of a single
//! problem or pair are logged and counted, never fatal.
//!
//! # Example
//!
//! ```rust,ignore
//! use baseline_forge::pipeline::{BatchDriver, PipelineConfig};
//!
//! let config = PipelineConfig::from_env()?;
//! let driver = BatchDriver::new(orchestrator)
//!     .with_challenge_limit(1)
//!     .with_pair_delay(config.pair_delay);
//! let summary = driver.run(&mut db).await?;
//! println!("{} of {} pairs stored", summary.succeeded, summary.pairs);
//! ```

pub mod batch;
pub mod config;
pub mod ingest;

pub use batch::{BatchDriver, BatchSummary};
pub use config::{PipelineConfig, DEFAULT_CATALOG_REQUEST_DELAY_MS};
pub use ingest::{CatalogIngestor, IngestSummary};
