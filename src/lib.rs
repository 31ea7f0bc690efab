//! Card Dwell - card movement timelines and list dwell times for a board
//!
//! Card Dwell turns a board's raw action log into a report of how cards moved
//! between lists through a deterministic pipeline: action normalization →
//! per-card timelines → dwell-time computation → display rows and CSV export.
//!
//! ## Modules
//!
//! - **Pipeline**: [`normalizer`], [`timeline`], [`dwell`], [`formatter`], orchestrated by [`pipeline`]
//! - **Host boundary**: [`host`] capabilities injected by the hosting board, and the [`filter`] panel glue

pub mod clock;
pub mod config;
pub mod dwell;
pub mod error;
pub mod filter;
pub mod formatter;
pub mod host;
pub mod normalizer;
pub mod pipeline;
pub mod schema;
pub mod timeline;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ReportConfig;
pub use error::ReportError;
pub use pipeline::{actions_to_report, build_report, ActivityFilter, ActivityReporter};

// Host exports
pub use host::{ActionQuery, DateWindow, HostClient, LocalHost, Member};

pub use types::{ActivityRecord, DisplayRow, ExportFile, Report};

/// Card Dwell version
pub const DWELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name used in exported metadata
pub const PRODUCER_NAME: &str = "card-dwell";
