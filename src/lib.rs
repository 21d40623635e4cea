//! DECLINA: Decline Curve Analysis
//!
//! Exponential decline fitting, segmentation and extrapolation for monthly
//! oil, gas and water production series.
//!
//! ## Architecture
//!
//! - **Exponential Fitter**: log-linear regression recovering `qo` and `dea`
//! - **Peak Locator**: trailing-window and cut-date anchor selection
//! - **Segment Extractor**: peak-to-limit slicing with trailing trim
//! - **Analysis Session**: per-fluid editable curve state for one well
//! - **Extrapolation Engine**: forward projection and project-level aggregation
//! - **Curve Migration**: parallel batch rebuild of baseline curves

// Decline analysis modules
pub mod config;
pub mod engine;
pub mod error;
pub mod storage;
pub mod types;

// Re-export analysis configuration
pub use config::AnalysisConfig;

// Re-export commonly used types
pub use types::{
    AnchorKind, AnchorSelection, CurveField, CurveRecord, DeclineCurve, DeclineSegment,
    FitSummary, FluidType, ProductionSeries,
};

// Re-export the fitting pipeline
pub use engine::{
    ActiveFit, AnalysisSession, ExponentialFitter, PeakLocator, PeakWindow, SegmentExtractor,
};

// Re-export extrapolation and aggregation
pub use engine::{
    ExtrapolationEngine, ExtrapolationResult, FleetProjection, ProductionRollup, ProjectAnalysis,
    ProjectAnalysisQuery, WellDelta,
};

// Re-export batch migration
pub use engine::{CurveMigrator, MigrationRecord, MigrationReport, MigrationStatus};

// Re-export errors
pub use error::{AnalysisError, StorageError};

// Re-export storage
pub use storage::{CurveStore, MemoryProductionSource, ProductionSource, ProductionStore};
