//! Listing ingestion pipeline
//!
//! parse → transform → validate → geocode-merge → region-filter → stage,
//! then promote staging to production on confirmation.

pub mod geocode_merge;
pub mod parser;
pub mod promotion;
pub mod region;
pub mod staging;
pub mod transform;
pub mod validate;

use std::time::Duration;
use thiserror::Error;

pub use parser::{parse_upload, RawRow};
pub use promotion::{PromotionError, PromotionPipeline, PromotionProgress, PromotionReport, PromotionStep};
pub use staging::{StagingPipeline, StagingReport, UploadedFile};
pub use region::apply_region_filter;
pub use transform::RowTransformer;
pub use validate::{validate_batch, ValidationOutcome, Violation};

/// Failure of one staging attempt
#[derive(Debug, Error)]
pub enum IngestError {
    /// Upload is not well-formed tabular text
    #[error("File unreadable: {0}")]
    Parse(String),

    /// Blocking schema violations (coordinate warnings excluded)
    #[error("{} validation error(s)", .0.len())]
    Validation(Vec<Violation>),

    /// Staging table write failed
    #[error("Staging write failed: {0}")]
    Persistence(#[from] rmap_common::Error),

    /// Staging write exceeded the per-batch timeout
    #[error("Staging timed out after {0:?}")]
    Timeout(Duration),
}
