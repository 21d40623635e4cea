//! Decline Analysis Engine
//!
//! Implements the numerical pipeline that turns a monthly production series
//! into an exponential decline model and forward projections.
//!
//! ## Pipeline
//!
//! raw monthly series → peak anchor → clean segment → exponential fit →
//! editable curve → extrapolation / aggregation
//!
//! ## Architecture
//! - `peak`: decline start detection (trailing-window max, cut-date modes)
//! - `segment`: slice + trailing trim + invalid-sample filtering
//! - `fitter`: weighted log-linear exponential regression (qo, dea, R²)
//! - `session`: per-well editing state (recompute, manual override, reset)
//! - `extrapolation`: monthly projection, project deltas, fleet aggregation
//! - `migration`: batch cut-date import of historical curves

pub mod extrapolation;
pub mod fitter;
pub mod migration;
pub mod peak;
pub mod segment;
pub mod session;

// Re-export public types
pub use extrapolation::{
    ExtrapolationEngine, ExtrapolationResult, FleetProjection, ProductionRollup, ProjectAnalysis,
    ProjectAnalysisQuery, SkippedWell, WellDelta, WellProjection,
};
pub use fitter::ExponentialFitter;
pub use migration::{CurveMigrator, MigrationRecord, MigrationReport, MigrationStatus, WellMigration};
pub use peak::{PeakLocator, PeakWindow};
pub use segment::SegmentExtractor;
pub use session::{ActiveFit, AnalysisSession};
