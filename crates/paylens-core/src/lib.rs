//! # Paylens Core
//!
//! The data aggregation and filtering pipeline behind the paylens dashboard.
//!
//! ## Overview
//!
//! One analysis is one synchronous pass over a single store table:
//!
//! - **Schema normalization**: column names are trimmed and lowercased once,
//!   right after the fetch
//! - **Slice filtering**: optional equality constraints on year, quarter
//!   and state
//! - **Aggregation views**: grouped sums, rankings, correlation, summary,
//!   period trend, yearly breakdown, distribution and histogram
//! - **Response envelope** with metadata and structured errors
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`aggregate`] | Grouping-key resolution and every derived view |
//! | [`analysis`] | Full fetch → filter → aggregate cycle |
//! | [`case_study`] | The five fixed scenarios and their table bindings |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Pipeline and validation errors |
//! | [`filter`] | Slice filter and filter options |
//! | [`geography`] | State identifiers to map names and centroids |
//! | [`normalize`] | Normalized tables |
//! | [`overview`] | Home-page totals, state map and leaderboard |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paylens_core::{run_analysis, AnalysisRequest, CaseStudy, FilterSpec, Store};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::open_default()?;
//!     let request = AnalysisRequest::for_case(CaseStudy::MarketExpansion)
//!         .with_filter(FilterSpec::all().with_year(2023).with_state("karnataka"));
//!     let analysis = run_analysis(&store, &request)?;
//!
//!     for group in &analysis.aggregation.top {
//!         println!("{}: {:.0}", group.group, group.amount);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / User     │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Schema          │────▶│ Store (DuckDB,   │
//! │ Normalizer      │     │ read-only)       │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Slice Filter    │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Aggregation     │
//! │ Views           │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Pipeline operations return [`PipelineError`]; an empty slice is a value,
//! never an error:
//!
//! ```rust
//! use paylens_core::PipelineError;
//!
//! fn describe(error: &PipelineError) -> &'static str {
//!     match error {
//!         PipelineError::StoreUnavailable(_) => "store down",
//!         PipelineError::UnknownTable(_) | PipelineError::MissingColumn { .. } => {
//!             "schema mismatch"
//!         }
//!         _ => "bad input",
//!     }
//! }
//! ```

pub mod aggregate;
pub mod analysis;
pub mod case_study;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod geography;
pub mod normalize;
pub mod overview;
mod timestamp;
mod value;

// Aggregation views
pub use aggregate::{
    aggregate, aggregate_with, AggregateOptions, AggregationResult, CorrelationMatrix,
    GroupDistribution, GroupedSum, GroupingKey, HistogramBin, MetricSpec, MetricSummary,
    PeriodPoint, Preview, YearGroupAmount,
};

// Analysis cycle
pub use analysis::{analyze_table, run_analysis, Analysis, AnalysisRequest};

// Case studies
pub use case_study::{CaseStudy, TableBinding};

// Envelope types
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};

// Error types
pub use error::{PipelineError, ValidationError};

// Filtering
pub use filter::{filter, FilterOptions, FilterSpec, FilteredView};

// Normalization
pub use normalize::{load_table, normalize, NormalizedTable};

// Overview
pub use overview::{load_overview, Overview, OverviewTotals, StateMapEntry, TopState};

pub use timestamp::UtcDateTime;

// Store (re-exported from paylens-warehouse)
pub use paylens_warehouse::{
    ColumnKind, SqlColumn, Store, StoreConfig, StoreTable, WarehouseError,
};
