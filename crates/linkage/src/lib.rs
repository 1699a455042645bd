//! `refmerge-linkage`: multi-stage record linkage for reference tables.
//!
//! Pure engine crate: receives pre-loaded tables, returns merged tables and
//! match statistics. CSV helpers work on strings; no filesystem access.

pub mod cascade;
pub mod config;
pub mod csv_table;
pub mod dedup;
pub mod error;
pub mod fuzzy;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod summary;

pub use config::LinkConfig;
pub use error::LinkageError;
pub use model::{LinkInput, LinkResult, MatchOutcome, Record, Table, Value};
pub use pipeline::{run, Pipeline};
pub use progress::{LogReporter, NoopReporter, ProgressEvent, ProgressReporter};
