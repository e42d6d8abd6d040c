//! # Vitalis
//!
//! Health-data query orchestration and normalization: bounded, anchor-aligned
//! queries against a local health store, turned into one vendor-neutral
//! record schema.
//!
//! ## Features
//!
//! - **Anchor alignment**: Statistics windows derive from a deterministic boundary
//! - **Workout scoping**: Two-phase queries restricted to a workout's bounds
//! - **Normalization**: Sleep scoring, workout metrics, canonical-unit resolution
//! - **Unified schema**: One tagged record type with a checked `dataType` discriminant
//! - **Delivery**: Fire-and-forget webhook posting of normalized records
//!
//! ## Modules
//!
//! - [`store`]: Health-store collaborator and raw data model
//! - [`query`]: Query orchestrator and anchor alignment
//! - [`normalize`]: Per-domain transforms
//! - [`schema`]: Normalized records and wire encoding
//! - [`connection`]: Facade sequencing fetch, normalize and deliver
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vitalis::config::Config;
//! use vitalis::schema::DataType;
//! use vitalis::store::MemoryStore;
//! use vitalis::{Connection, FetchRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::load("snapshot.json").await?;
//!
//!     let connection = Connection::builder(Config::load_default())
//!         .store(Arc::new(store))
//!         .build()?;
//!
//!     // Last 24 hours of sleep, normalized
//!     let records = connection
//!         .fetch_normalized(&FetchRequest::new(DataType::Sleep))
//!         .await?;
//!
//!     println!("Found {} sleep sessions", records.len());
//!     connection.close();
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod query;
pub mod schema;
pub mod store;
pub mod webhook;

// Re-export top-level types for convenience
pub use connection::{Connection, ConnectionBuilder, FetchRequest, Posted};

pub use error::{PipelineError, PipelineResult};

pub use config::{Config, ConfigError, LoggingConfig};

pub use logging::{LogChannel, Logger};

pub use normalize::{NormalizeError, Normalizer, SleepOptions};

pub use query::{Fetched, QueryError, QueryFilter, QueryOrchestrator};

pub use schema::{DataType, NormalizedRecord, RecordPayload, SchemaError};

pub use store::{HealthStore, MemoryStore, ResultEnvelope, StoreError, TimeRange};

pub use webhook::{WebhookClient, WebhookError};
