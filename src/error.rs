//! Error taxonomy for the decline analysis pipeline.
//!
//! Fit and segmentation failures are local to one well/segment: batch
//! callers report them per well and keep going. Storage conflicts are
//! distinct from generic write failures so callers can render "already
//! exists" instead of a catch-all error.

use thiserror::Error;

/// Errors produced by the fitting/segmentation pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Fewer than the minimum valid samples remain after trimming/filtering.
    #[error("insufficient data: {found} valid samples after trimming, need at least {needed}")]
    InsufficientData { found: usize, needed: usize },

    /// Cut-date anchor search found no sample at/after the requested date.
    #[error("no production sample at/after cut date {cut_date} for well {well}")]
    NoAnchorInRange { well: String, cut_date: String },

    /// The regression system had no unique solution (e.g. all-identical samples).
    #[error("degenerate fit: regression denominator is not finite or zero")]
    DegenerateFit,

    /// A manual edit produced a value the model cannot represent.
    #[error("invalid curve parameter {field}: {reason}")]
    InvalidCurveParameters { field: String, reason: String },

    /// The series is empty or its parallel arrays disagree in length.
    #[error("malformed production series for well {well}: {reason}")]
    MalformedSeries { well: String, reason: String },

    /// A boundary date string could not be parsed.
    #[error("unparseable date {value:?}: {reason}")]
    BadDate { value: String, reason: String },
}

/// Errors produced by the curve/production store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A save targeted a (name, well, fluid) triple already owned by a
    /// different curve id.
    #[error("curve with same name, well, and fluid type already exists (id {existing_id})")]
    DuplicateCurveKey { existing_id: String },

    /// Delete or lookup referenced an id that is not stored.
    #[error("curve not found: {id}")]
    CurveNotFound { id: String },

    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
