//! Extrapolation & Aggregation Engine
//!
//! Evaluates saved decline curves forward in time and rolls the results up
//! across a project's wells:
//!
//! - **Window projection**: monthly decline volumes over a `[from, to]`
//!   window, always evaluated from the curve's own start month (curves are
//!   never restarted at the window boundary)
//! - **Project analysis**: actual vs extrapolated volume per well, with the
//!   delta the reserves review works from
//! - **Fleet projection**: aggregate forward volumes over the next N months,
//!   each well continuing from its own known state
//! - **Production roll-up**: month-by-month actuals summed across wells
//!
//! Wells without a usable curve are skipped and reported, never zero-filled:
//! absence of a curve means "no opinion", not "no decline".

use std::collections::BTreeMap;

use crate::error::StorageError;
use crate::storage::{CurveStore, ProductionSource};
use crate::types::{months_between, parse_boundary_date, FluidType};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// Report Shapes
// ============================================================================

/// Monthly decline volumes over one query window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrapolationResult {
    pub per_month: Vec<f64>,
    pub total: f64,
}

/// Parameters of one project analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAnalysisQuery {
    pub project: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub fluid: FluidType,
}

/// Actual vs extrapolated volume for one well, rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellDelta {
    pub well: String,
    pub produced: f64,
    pub extrapolated: f64,
    pub delta: f64,
}

/// A well left out of an aggregate, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedWell {
    pub well: String,
    pub reason: String,
}

impl SkippedWell {
    fn new(well: String, reason: impl Into<String>) -> Self {
        Self {
            well,
            reason: reason.into(),
        }
    }
}

/// Actual-vs-extrapolated report for one project and fluid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAnalysis {
    pub project: String,
    pub fluid: FluidType,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Latest month with production data across the project's wells,
    /// reported as a default for follow-up queries.
    pub last_production_date: Option<NaiveDate>,
    pub rows: Vec<WellDelta>,
    pub total_produced: f64,
    pub total_extrapolated: f64,
    pub total_delta: f64,
    pub skipped: Vec<SkippedWell>,
}

/// One well's contribution to a fleet projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellProjection {
    pub well: String,
    pub curve_id: String,
    pub per_month: Vec<f64>,
}

/// Combined forward volumes for a project over the next N months.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetProjection {
    pub project: String,
    pub fluid: FluidType,
    /// Element-wise sum of every well's projection.
    pub per_month: Vec<f64>,
    pub wells: Vec<WellProjection>,
    pub last_production_month: Option<NaiveDate>,
    pub skipped: Vec<SkippedWell>,
}

/// Month-by-month actual production summed across a project's wells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionRollup {
    pub project: String,
    /// Sorted `YYYY-MM` labels; the value vectors are parallel to it.
    pub month: Vec<String>,
    pub oil: Vec<f64>,
    pub gas: Vec<f64>,
    pub water: Vec<f64>,
    /// Number of wells that contributed.
    pub wells: usize,
}

// ============================================================================
// Engine
// ============================================================================

/// Decline curve evaluation and project-level aggregation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtrapolationEngine;

impl ExtrapolationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Monthly volumes `qo * e^(-dea * (monthsFromStart + i))` over
    /// `[from, to]` inclusive. A window starting before the curve clamps to
    /// the curve's own start month; an inverted window yields no months.
    pub fn monthly_projection(
        &self,
        qo: f64,
        dea: f64,
        start_date: NaiveDate,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ExtrapolationResult {
        let months_from_start = months_between(start_date, from).max(0);
        let months_in_period = months_between(from, to) + 1;

        let mut per_month = Vec::new();
        let mut total = 0.0;
        if months_in_period > 0 {
            per_month.reserve(months_in_period as usize);
            for i in 0..months_in_period {
                let q = qo * (-dea * (months_from_start + i) as f64).exp();
                per_month.push(q);
                total += q;
            }
        }

        ExtrapolationResult { per_month, total }
    }

    /// Total extrapolated volume over `[from, to]`.
    pub fn total_for_period(
        &self,
        qo: f64,
        dea: f64,
        start_date: NaiveDate,
        from: NaiveDate,
        to: NaiveDate,
    ) -> f64 {
        self.monthly_projection(qo, dea, start_date, from, to).total
    }

    /// Actual vs extrapolated volume for every well in a project.
    ///
    /// Wells lacking a series or a saved curve for the fluid are reported
    /// under `skipped`; storage failures abort the whole request.
    pub fn project_analysis(
        &self,
        production: &dyn ProductionSource,
        curves: &CurveStore,
        query: &ProjectAnalysisQuery,
    ) -> Result<ProjectAnalysis, StorageError> {
        let mut rows = Vec::new();
        let mut skipped = Vec::new();
        let mut last_production_date: Option<NaiveDate> = None;

        for well in production.wells_in_project(&query.project)? {
            let series = match production.series_for_well(&well)? {
                Some(s) => s,
                None => {
                    skipped.push(SkippedWell::new(well, "no production series"));
                    continue;
                }
            };

            match series.last_month() {
                Ok(Some(last)) => {
                    last_production_date = Some(last_production_date.map_or(last, |d| d.max(last)));
                }
                Ok(None) => {}
                Err(e) => {
                    skipped.push(SkippedWell::new(well, e.to_string()));
                    continue;
                }
            }

            let record = match curves.latest_for(&well, query.fluid)? {
                Some(r) => r,
                None => {
                    skipped.push(SkippedWell::new(
                        well,
                        format!("no saved curve for {}", query.fluid),
                    ));
                    continue;
                }
            };
            let start = match parse_boundary_date(&record.start_date) {
                Ok(d) => d,
                Err(e) => {
                    skipped.push(SkippedWell::new(well, e.to_string()));
                    continue;
                }
            };
            let produced = match series.produced_in_range(query.fluid, query.from, query.to) {
                Ok(v) => v,
                Err(e) => {
                    skipped.push(SkippedWell::new(well, e.to_string()));
                    continue;
                }
            };

            let extrapolated =
                self.total_for_period(record.qo, record.dea, start, query.from, query.to);
            rows.push(WellDelta {
                well,
                produced: round2(produced),
                extrapolated: round2(extrapolated),
                delta: round2(extrapolated - produced),
            });
        }

        debug!(
            project = %query.project,
            fluid = %query.fluid,
            wells = rows.len(),
            skipped = skipped.len(),
            "Project analysis complete"
        );

        Ok(ProjectAnalysis {
            project: query.project.clone(),
            fluid: query.fluid,
            from: query.from,
            to: query.to,
            last_production_date,
            total_produced: round2(rows.iter().map(|r| r.produced).sum()),
            total_extrapolated: round2(rows.iter().map(|r| r.extrapolated).sum()),
            total_delta: round2(rows.iter().map(|r| r.delta).sum()),
            rows,
            skipped,
        })
    }

    /// Aggregate forward volumes over the next `horizon_months` beyond the
    /// project's latest production month. Each well's curve continues from
    /// its own months-since-start rather than restarting.
    pub fn fleet_projection(
        &self,
        production: &dyn ProductionSource,
        curves: &CurveStore,
        project: &str,
        fluid: FluidType,
        horizon_months: u32,
    ) -> Result<FleetProjection, StorageError> {
        let mut eligible: Vec<String> = Vec::new();
        let mut skipped = Vec::new();
        let mut last_production_month: Option<NaiveDate> = None;

        for well in production.wells_in_project(project)? {
            let series = match production.series_for_well(&well)? {
                Some(s) => s,
                None => {
                    skipped.push(SkippedWell::new(well, "no production series"));
                    continue;
                }
            };
            match series.last_month() {
                Ok(last) => {
                    if let Some(d) = last {
                        last_production_month =
                            Some(last_production_month.map_or(d, |m| m.max(d)));
                    }
                    eligible.push(well);
                }
                Err(e) => skipped.push(SkippedWell::new(well, e.to_string())),
            }
        }

        let horizon = horizon_months as usize;
        let mut per_month = vec![0.0; horizon];
        let mut wells = Vec::new();

        for well in eligible {
            let record = match curves.latest_for(&well, fluid)? {
                Some(r) => r,
                None => {
                    skipped.push(SkippedWell::new(
                        well,
                        format!("no saved curve for {}", fluid),
                    ));
                    continue;
                }
            };
            let start = match parse_boundary_date(&record.start_date) {
                Ok(d) => d,
                Err(e) => {
                    skipped.push(SkippedWell::new(well, e.to_string()));
                    continue;
                }
            };

            let since = last_production_month
                .map_or(0, |last| months_between(start, last).max(0));
            let projection: Vec<f64> = (0..horizon)
                .map(|i| record.qo * (-record.dea * (since + i as i64) as f64).exp())
                .collect();
            for (slot, q) in per_month.iter_mut().zip(&projection) {
                *slot += q;
            }
            wells.push(WellProjection {
                well,
                curve_id: record.id,
                per_month: projection,
            });
        }

        debug!(
            project = %project,
            fluid = %fluid,
            wells = wells.len(),
            skipped = skipped.len(),
            horizon = horizon,
            "Fleet projection complete"
        );

        Ok(FleetProjection {
            project: project.to_string(),
            fluid,
            per_month,
            wells,
            last_production_month,
            skipped,
        })
    }

    /// Month-by-month actuals summed across a project's wells, for the
    /// combined production chart. Missing samples count as zero; wells with
    /// unreadable month labels are left out with a warning.
    pub fn project_production_rollup(
        &self,
        production: &dyn ProductionSource,
        project: &str,
    ) -> Result<ProductionRollup, StorageError> {
        let mut by_month: BTreeMap<(i32, u32), [f64; 3]> = BTreeMap::new();
        let mut contributing = 0usize;

        for well in production.wells_in_project(project)? {
            let series = match production.series_for_well(&well)? {
                Some(s) => s,
                None => {
                    warn!(well = %well, "No production series for roll-up");
                    continue;
                }
            };
            let dates = match series.month_dates() {
                Ok(d) => d,
                Err(e) => {
                    warn!(well = %well, error = %e, "Unreadable months, well left out of roll-up");
                    continue;
                }
            };

            for (i, date) in dates.iter().enumerate() {
                let entry = by_month.entry((date.year(), date.month())).or_insert([0.0; 3]);
                for (slot, fluid) in entry.iter_mut().zip(FluidType::ALL) {
                    *slot += series.values_for(fluid).get(i).copied().flatten().unwrap_or(0.0);
                }
            }
            contributing += 1;
        }

        let mut rollup = ProductionRollup {
            project: project.to_string(),
            month: Vec::with_capacity(by_month.len()),
            oil: Vec::with_capacity(by_month.len()),
            gas: Vec::with_capacity(by_month.len()),
            water: Vec::with_capacity(by_month.len()),
            wells: contributing,
        };
        for ((year, month), sums) in by_month {
            rollup.month.push(format!("{:04}-{:02}", year, month));
            rollup.oil.push(sums[0]);
            rollup.gas.push(sums[1]);
            rollup.water.push(sums[2]);
        }
        Ok(rollup)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryProductionSource;
    use crate::types::{DeclineCurve, ProductionSeries};
    use chrono::Utc;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn series(well: &str, months: &[&str], oil: &[Option<f64>]) -> ProductionSeries {
        ProductionSeries {
            well: well.to_string(),
            month: months.iter().map(|m| m.to_string()).collect(),
            efec_oil_prod: oil.to_vec(),
            efec_gas_prod: vec![None; oil.len()],
            efec_water_prod: vec![None; oil.len()],
        }
    }

    fn save_curve(store: &CurveStore, well: &str, qo: f64, dea: f64, start: &str) {
        let record = DeclineCurve {
            name: format!("Seg. {}", well),
            well: well.to_string(),
            fluid_type: FluidType::Oil,
            qo,
            dea,
            start_date: start.to_string(),
            extrapolation_months: 12,
            comment: None,
        }
        .to_record(1, Utc::now());
        store.upsert(&record).unwrap();
    }

    #[test]
    fn test_monthly_projection_window_arithmetic() {
        let engine = ExtrapolationEngine::new();
        let result =
            engine.monthly_projection(100.0, 0.05, date(2020, 1), date(2020, 1), date(2020, 12));

        assert_eq!(result.per_month.len(), 12);
        assert_eq!(result.per_month[0], 100.0, "window at curve start begins at qo");

        let expected: f64 = (0..12).map(|t| 100.0 * (-0.05 * t as f64).exp()).sum();
        assert!((result.total - expected).abs() < 1e-9);
    }

    #[test]
    fn test_window_before_start_clamps_to_curve_origin() {
        let engine = ExtrapolationEngine::new();
        let early =
            engine.monthly_projection(100.0, 0.05, date(2020, 1), date(2019, 6), date(2019, 8));
        assert_eq!(early.per_month[0], 100.0, "pre-start window must not grow the curve");
    }

    #[test]
    fn test_inverted_window_is_empty() {
        let engine = ExtrapolationEngine::new();
        let result =
            engine.monthly_projection(100.0, 0.05, date(2020, 1), date(2020, 6), date(2020, 3));
        assert!(result.per_month.is_empty());
        assert_eq!(result.total, 0.0);
    }

    #[test]
    fn test_total_strictly_decreases_as_window_slides_later() {
        let engine = ExtrapolationEngine::new();
        let start = date(2020, 1);
        let mut previous = f64::INFINITY;
        for offset in 0..4u32 {
            let from = date(2020, 1 + offset);
            let to = date(2020, 6 + offset);
            let total = engine.total_for_period(100.0, 0.05, start, from, to);
            assert!(
                total < previous,
                "decline must shrink later windows: {} !< {}",
                total,
                previous
            );
            previous = total;
        }
    }

    #[test]
    fn test_project_analysis_rows_and_skips() {
        let engine = ExtrapolationEngine::new();
        let mut production = MemoryProductionSource::new();
        let curves = CurveStore::open_temp().unwrap();

        let months = ["2020-01", "2020-02", "2020-03", "2020-04", "2020-05", "2020-06"];
        production.insert(
            "Campo Norte",
            series("PZ-1", &months, &[Some(10.0), Some(20.0), Some(30.0), Some(40.0), Some(50.0), Some(60.0)]),
        );
        production.insert(
            "Campo Norte",
            series("PZ-2", &months[..4], &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
        );
        save_curve(&curves, "PZ-1", 100.0, 0.1, "2020-01");

        let report = engine
            .project_analysis(
                &production,
                &curves,
                &ProjectAnalysisQuery {
                    project: "Campo Norte".to_string(),
                    from: date(2020, 2),
                    to: date(2020, 4),
                    fluid: FluidType::Oil,
                },
            )
            .unwrap();

        assert_eq!(report.rows.len(), 1);
        let row = &report.rows[0];
        assert_eq!(row.produced, 90.0);
        let expected: f64 = (1..=3).map(|t| 100.0 * (-0.1 * t as f64).exp()).sum();
        assert_eq!(row.extrapolated, round2(expected));
        assert_eq!(row.delta, round2(row.extrapolated - 90.0));
        assert_eq!(report.total_produced, 90.0);

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].well, "PZ-2");
        assert!(report.skipped[0].reason.contains("no saved curve"));

        // PZ-2's shorter series must not shadow the project-wide last month.
        assert_eq!(report.last_production_date, Some(date(2020, 6)));
    }

    #[test]
    fn test_fleet_projection_is_additive_across_wells() {
        let engine = ExtrapolationEngine::new();
        let mut production = MemoryProductionSource::new();
        let curves = CurveStore::open_temp().unwrap();

        let months: Vec<String> = (1..=12).map(|m| format!("2020-{:02}", m)).collect();
        let labels: Vec<&str> = months.iter().map(|s| s.as_str()).collect();
        production.insert("P", series("W1", &labels, &vec![Some(1.0); 12]));
        production.insert("P", series("W2", &labels[2..], &vec![Some(1.0); 10]));
        save_curve(&curves, "W1", 100.0, 0.05, "2020-01");
        save_curve(&curves, "W2", 50.0, 0.1, "2020-03");

        let fleet = engine
            .fleet_projection(&production, &curves, "P", FluidType::Oil, 6)
            .unwrap();

        assert_eq!(fleet.last_production_month, Some(date(2020, 12)));
        assert_eq!(fleet.wells.len(), 2);
        assert_eq!(fleet.per_month.len(), 6);
        for i in 0..6 {
            let summed = fleet.wells[0].per_month[i] + fleet.wells[1].per_month[i];
            assert!(
                (fleet.per_month[i] - summed).abs() < 1e-12,
                "aggregate month {} diverges from per-well sum",
                i
            );
        }

        // W1 continues from 11 months after its start.
        let expected_first = 100.0 * (-0.05_f64 * 11.0).exp();
        assert!((fleet.wells[0].per_month[0] - expected_first).abs() < 1e-9);
    }

    #[test]
    fn test_fleet_projection_skips_wells_without_curve() {
        let engine = ExtrapolationEngine::new();
        let mut production = MemoryProductionSource::new();
        let curves = CurveStore::open_temp().unwrap();

        production.insert("P", series("W1", &["2020-01"], &[Some(1.0)]));
        production.insert("P", series("W2", &["2020-01"], &[Some(1.0)]));
        save_curve(&curves, "W1", 100.0, 0.05, "2020-01");

        let fleet = engine
            .fleet_projection(&production, &curves, "P", FluidType::Oil, 3)
            .unwrap();
        assert_eq!(fleet.wells.len(), 1);
        assert_eq!(fleet.skipped.len(), 1);
        assert_eq!(fleet.skipped[0].well, "W2");
    }

    #[test]
    fn test_rollup_groups_months_and_sums_wells() {
        let engine = ExtrapolationEngine::new();
        let mut production = MemoryProductionSource::new();

        production.insert(
            "P",
            ProductionSeries {
                well: "W1".to_string(),
                month: vec!["2020-01".to_string(), "2020-02".to_string()],
                efec_oil_prod: vec![Some(10.0), Some(20.0)],
                efec_gas_prod: vec![None, None],
                efec_water_prod: vec![Some(1.0), Some(2.0)],
            },
        );
        production.insert(
            "P",
            series("W2", &["2020-02", "2020-03"], &[Some(5.0), None]),
        );

        let rollup = engine.project_production_rollup(&production, "P").unwrap();
        assert_eq!(rollup.month, vec!["2020-01", "2020-02", "2020-03"]);
        assert_eq!(rollup.oil, vec![10.0, 25.0, 0.0]);
        assert_eq!(rollup.water, vec![1.0, 2.0, 0.0]);
        assert_eq!(rollup.gas, vec![0.0, 0.0, 0.0]);
        assert_eq!(rollup.wells, 2);
    }
}
