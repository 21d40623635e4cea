//! Bulk Curve Migration
//!
//! Rebuilds baseline oil decline curves for a whole field from historical
//! cut-date records. Each record drives the cut-date anchor mode, the
//! segment extractor and the exponential fitter, and lands as one persisted
//! curve per well named "Curva Base Oil". Wells are independent, so the
//! batch runs in parallel and one well's failure never aborts the rest.
//!
//! ## Usage
//!
//! ```ignore
//! let migrator = CurveMigrator::new(1);
//! let report = migrator.run(&records, &production, &curves);
//! println!("{} migrated, {} skipped, {} failed",
//!          report.migrated, report.skipped, report.failed);
//! ```

use crate::config;
use crate::engine::{ExponentialFitter, PeakLocator, SegmentExtractor};
use crate::error::AnalysisError;
use crate::storage::{CurveStore, ProductionSource};
use crate::types::{parse_boundary_date, same_calendar_day, DeclineCurve, FluidType};
use chrono::{NaiveDate, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Curves produced by migration all share this name; re-running the batch
/// therefore overwrites rather than accumulates.
const MIGRATED_CURVE_NAME: &str = "Curva Base Oil";

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

// ============================================================================
// Batch Input / Output Shapes
// ============================================================================

/// One historical cut-date entry, as exported by the field review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecord {
    pub well: String,
    pub cut_date: String,
    pub injection_date: Option<String>,
    pub event_date: Option<String>,
    pub system_date: Option<String>,
}

/// Outcome for one well of the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MigrationStatus {
    Migrated {
        curve_id: String,
        qo: f64,
        dea: f64,
        start_date: String,
        event_type: String,
    },
    /// Input was unusable (no series, nothing at/after the cut date).
    Skipped { reason: String },
    /// The pipeline ran but could not produce or persist a curve.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellMigration {
    pub well: String,
    pub status: MigrationStatus,
}

/// Per-well outcomes in input order, plus the tallies the operator reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub outcomes: Vec<WellMigration>,
    pub migrated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl MigrationReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

// ============================================================================
// Migrator
// ============================================================================

/// Runs the anchor → segment → fit → persist pipeline over a record batch.
#[derive(Debug, Clone, Copy)]
pub struct CurveMigrator {
    locator: PeakLocator,
    extractor: SegmentExtractor,
    fitter: ExponentialFitter,
    user_id: i64,
}

impl CurveMigrator {
    pub fn new(user_id: i64) -> Self {
        Self {
            locator: PeakLocator::from_config(),
            extractor: SegmentExtractor::from_config(),
            fitter: ExponentialFitter::from_config(),
            user_id,
        }
    }

    /// Migrates every record, in parallel, one outcome per input record.
    /// Failures stay local to their well.
    pub fn run(
        &self,
        records: &[MigrationRecord],
        production: &dyn ProductionSource,
        curves: &CurveStore,
    ) -> MigrationReport {
        info!(records = records.len(), "Starting curve migration batch");

        let outcomes: Vec<WellMigration> = records
            .par_iter()
            .map(|record| WellMigration {
                well: record.well.clone(),
                status: self.migrate_well(record, production, curves),
            })
            .collect();

        let mut report = MigrationReport {
            outcomes,
            migrated: 0,
            skipped: 0,
            failed: 0,
        };
        for outcome in &report.outcomes {
            match outcome.status {
                MigrationStatus::Migrated { .. } => report.migrated += 1,
                MigrationStatus::Skipped { .. } => report.skipped += 1,
                MigrationStatus::Failed { .. } => report.failed += 1,
            }
        }

        info!(
            migrated = report.migrated,
            skipped = report.skipped,
            failed = report.failed,
            "Curve migration batch complete"
        );
        report
    }

    fn migrate_well(
        &self,
        record: &MigrationRecord,
        production: &dyn ProductionSource,
        curves: &CurveStore,
    ) -> MigrationStatus {
        let status = self
            .run_pipeline(record, production, curves)
            .unwrap_or_else(|reason| MigrationStatus::Failed { reason });
        match &status {
            MigrationStatus::Skipped { reason } => {
                debug!(well = %record.well, reason = %reason, "Well skipped")
            }
            MigrationStatus::Failed { reason } => {
                warn!(well = %record.well, reason = %reason, "Well migration failed")
            }
            MigrationStatus::Migrated { .. } => {}
        }
        status
    }

    fn run_pipeline(
        &self,
        record: &MigrationRecord,
        production: &dyn ProductionSource,
        curves: &CurveStore,
    ) -> Result<MigrationStatus, String> {
        if record.well.trim().is_empty() || record.cut_date.trim().is_empty() {
            return Ok(MigrationStatus::Skipped {
                reason: "missing well or cut date".to_string(),
            });
        }

        let series = match production
            .series_for_well(&record.well)
            .map_err(|e| e.to_string())?
        {
            Some(s) => s,
            None => {
                return Ok(MigrationStatus::Skipped {
                    reason: "no production series".to_string(),
                })
            }
        };

        let cut = parse_boundary_date(&record.cut_date).map_err(|e| e.to_string())?;
        let injection = parse_optional(&record.injection_date).map_err(|e| e.to_string())?;
        let event = parse_optional(&record.event_date).map_err(|e| e.to_string())?;
        let system = parse_optional(&record.system_date).map_err(|e| e.to_string())?;

        let anchor = match self
            .locator
            .cut_date_anchor(&series, FluidType::Oil, cut, injection)
        {
            Ok(index) => index,
            Err(e @ AnalysisError::NoAnchorInRange { .. }) => {
                return Ok(MigrationStatus::Skipped {
                    reason: e.to_string(),
                })
            }
            Err(e) => return Err(e.to_string()),
        };

        let segment = self
            .extractor
            .extract(series.values_for(FluidType::Oil), anchor, None)
            .map_err(|e| e.to_string())?;
        let fit = self.fitter.fit(&segment.values).map_err(|e| e.to_string())?;

        let event_type = classify_event(cut, event, injection, system);
        let comment = format!(
            "Fecha Inicio seleccionada por {}\nFecha de corte: {}",
            event_type,
            cut.format("%d/%m/%Y")
        );

        let curve = DeclineCurve {
            name: MIGRATED_CURVE_NAME.to_string(),
            well: record.well.clone(),
            fluid_type: FluidType::Oil,
            qo: round2(fit.qo),
            dea: round4(fit.dea),
            start_date: series.month[anchor].clone(),
            extrapolation_months: config::get().extrapolation.default_months,
            comment: Some(comment),
        };
        let saved = curve.to_record(self.user_id, Utc::now());
        curves.upsert(&saved).map_err(|e| e.to_string())?;

        info!(
            well = %record.well,
            curve_id = %saved.id,
            qo = saved.qo,
            dea = saved.dea,
            start_date = %saved.start_date,
            event = event_type,
            "Curve migrated"
        );
        Ok(MigrationStatus::Migrated {
            curve_id: saved.id,
            qo: saved.qo,
            dea: saved.dea,
            start_date: saved.start_date,
            event_type: event_type.to_string(),
        })
    }
}

fn parse_optional(value: &Option<String>) -> Result<Option<NaiveDate>, AnalysisError> {
    value.as_deref().map(parse_boundary_date).transpose()
}

/// Names the field event that coincides with the cut date. Precedence
/// follows the review workflow: intervention, then injection, then
/// extraction system change.
fn classify_event(
    cut: NaiveDate,
    event: Option<NaiveDate>,
    injection: Option<NaiveDate>,
    system: Option<NaiveDate>,
) -> &'static str {
    let coincides = |d: Option<NaiveDate>| d.map_or(false, |d| same_calendar_day(cut, d));
    if coincides(event) {
        "Intervención"
    } else if coincides(injection) {
        "Inyección"
    } else if coincides(system) {
        "Sistema de Extracción"
    } else {
        "Desconocido"
    }
}

// ============================================================================
// Tests
// ============================================================================
