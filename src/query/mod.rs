//! Query Orchestration
//!
//! Turns caller requests into bounded store queries:
//!
//! - **Request**: Sample and statistics request builders, caller filters
//! - **Anchor**: Anchor alignment and window boundaries
//! - **Orchestrator**: Workout scoping, predicates, transient-error absorption
//!
//! # Example
//!
//! ```rust,ignore
//! use vitalis::query::{QueryOrchestrator, StatisticsRequest};
//! use vitalis::store::{SampleType, StatisticsInterval, StatisticsOptions, TimeRange};
//!
//! let orchestrator = QueryOrchestrator::new(Some(store));
//!
//! // Hourly step totals for the last day, windows aligned to the top of the hour
//! let request = StatisticsRequest::new(
//!     SampleType::StepCount,
//!     TimeRange::last_days(1),
//!     StatisticsOptions::cumulative_sum(),
//! )
//! .interval(StatisticsInterval::Hours(1))
//! .anchor(chrono::Utc::now());
//!
//! let fetched = orchestrator.fetch_statistics(&request).await?;
//! ```

pub mod anchor;
mod error;
mod orchestrator;
mod request;

pub use anchor::{align_anchor, parse_offset, start_of_week, AnchorBoundary};
pub use error::{QueryError, QueryResult};
pub use orchestrator::{Fetched, QueryOrchestrator, DEFAULT_ROUTE_PAGE_SIZE};
pub use request::{QueryFilter, SampleRequest, StatisticsRequest};
