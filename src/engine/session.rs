//! Analysis Session - Per-Well Editable Curve Workspace
//!
//! Holds the ephemeral editing state for one well: the loaded production
//! series plus, per fluid, the active anchor pair and the editable decline
//! curve derived from it. Nothing here touches storage; the session hands
//! out a [`CurveRecord`]-ready curve and the caller persists on explicit
//! save.
//!
//! ## Architecture
//!
//! - `AnalysisSession`: owns the series and one workspace per fluid
//! - `ActiveFit`: the live curve, its fitted segment, and the last
//!   regression output (dropped once manual edits make it stale)
//! - Anchor changes re-run the Peak → Segment → Fitter pipeline; manual
//!   field edits are authoritative and never trigger a refit
//!
//! ## Usage
//!
//! ```ignore
//! let mut session = AnalysisSession::new(series)?;
//!
//! // Chart load: seed a peak from the trailing window and fit.
//! session.seed_default_peak(FluidType::Oil)?;
//!
//! // User clicks: re-anchor and refit.
//! session.select_peak(FluidType::Oil, 14)?;
//! session.select_limit(FluidType::Oil, 38)?;
//!
//! // Manual override; the curve keeps this value until the next click.
//! session.set_field(FluidType::Oil, CurveField::Qo, "118.4")?;
//!
//! // Explicit save (persistence is the caller's job).
//! let record = session.editable_curve(FluidType::Oil)
//!     .map(|c| c.to_record(user_id, Utc::now()));
//! ```

use std::collections::HashMap;

use crate::config;
use crate::engine::fitter::ExponentialFitter;
use crate::engine::peak::{PeakLocator, PeakWindow};
use crate::engine::segment::SegmentExtractor;
use crate::error::AnalysisError;
use crate::types::{
    months_between, parse_boundary_date, same_calendar_month, AnchorSelection, CurveField,
    CurveRecord, DeclineCurve, DeclineSegment, FitSummary, FluidType, ProductionSeries,
};
use tracing::{debug, info};

/// Name given to the single live editable segment per fluid.
pub const DEFAULT_CURVE_NAME: &str = "Seg. 1";

// ============================================================================
// Active Fit
// ============================================================================

/// The live editable curve for one fluid, with the segment it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveFit {
    pub curve: DeclineCurve,
    /// Segment the curve was last derived from; empty after a reset whose
    /// start date has no usable anchor in the series.
    pub segment: DeclineSegment,
    /// Last regression output. `None` once a manual qo/dea edit or a reset
    /// from a saved record makes it stale.
    pub fit: Option<FitSummary>,
}

#[derive(Debug, Clone, Default)]
struct FluidWorkspace {
    anchors: AnchorSelection,
    active: Option<ActiveFit>,
}

// ============================================================================
// Analysis Session
// ============================================================================

/// Editing state for one well's production history.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    series: ProductionSeries,
    fitter: ExponentialFitter,
    locator: PeakLocator,
    extractor: SegmentExtractor,
    workspaces: HashMap<FluidType, FluidWorkspace>,
}

impl AnalysisSession {
    /// Open a session over a validated series, with engines tuned from the
    /// global analysis configuration.
    pub fn new(series: ProductionSeries) -> Result<Self, AnalysisError> {
        series.validate()?;
        Ok(Self {
            series,
            fitter: ExponentialFitter::from_config(),
            locator: PeakLocator::from_config(),
            extractor: SegmentExtractor::from_config(),
            workspaces: HashMap::new(),
        })
    }

    pub fn series(&self) -> &ProductionSeries {
        &self.series
    }

    pub fn well(&self) -> &str {
        &self.series.well
    }

    /// Current anchor pair for a fluid (empty when nothing is selected).
    pub fn anchors(&self, fluid: FluidType) -> AnchorSelection {
        self.workspaces
            .get(&fluid)
            .map(|ws| ws.anchors)
            .unwrap_or_default()
    }

    pub fn active(&self, fluid: FluidType) -> Option<&ActiveFit> {
        self.workspaces.get(&fluid).and_then(|ws| ws.active.as_ref())
    }

    pub fn editable_curve(&self, fluid: FluidType) -> Option<&DeclineCurve> {
        self.active(fluid).map(|a| &a.curve)
    }

    // ========================================================================
    // Anchor Selection
    // ========================================================================

    /// Seed the peak from the trailing window and fit, as on chart load.
    ///
    /// Returns `Ok(None)` without touching the workspace when the fluid has
    /// no usable sample at all.
    pub fn seed_default_peak(
        &mut self,
        fluid: FluidType,
    ) -> Result<Option<PeakWindow>, AnalysisError> {
        let window = match self.locator.trailing_window_peak(self.series.values_for(fluid)) {
            Some(w) => w,
            None => {
                debug!(well = %self.series.well, fluid = %fluid, "No usable sample for automatic peak");
                return Ok(None);
            }
        };
        self.workspace_mut(fluid).anchors = AnchorSelection::from_peak(window.peak_index);
        self.recompute(fluid)?;
        Ok(Some(window))
    }

    /// Designate a new decline start and refit. Any prior limit is dropped.
    pub fn select_peak(
        &mut self,
        fluid: FluidType,
        index: usize,
    ) -> Result<&ActiveFit, AnalysisError> {
        self.check_index("peak", index)?;
        self.workspace_mut(fluid).anchors.select_peak(index);
        self.recompute(fluid)
    }

    /// Designate the segment end (inclusive) and refit.
    pub fn select_limit(
        &mut self,
        fluid: FluidType,
        index: usize,
    ) -> Result<&ActiveFit, AnalysisError> {
        self.check_index("limit", index)?;
        self.workspace_mut(fluid).anchors.select_limit(index)?;
        self.recompute(fluid)
    }

    /// Abandon the in-progress selection and curve for a fluid.
    pub fn clear_selection(&mut self, fluid: FluidType) {
        let ws = self.workspace_mut(fluid);
        ws.anchors.clear();
        ws.active = None;
    }

    // ========================================================================
    // Fit Pipeline
    // ========================================================================

    /// Re-run Peak → Segment → Fitter from the current anchors, replacing
    /// the active curve's fitted fields. Name, comment, and the
    /// extrapolation window survive the refit; a failed refit clears the
    /// active curve because it described the previous anchors.
    pub fn recompute(&mut self, fluid: FluidType) -> Result<&ActiveFit, AnalysisError> {
        let anchors = self.anchors(fluid);
        let peak = anchors
            .peak()
            .ok_or_else(|| AnalysisError::InvalidCurveParameters {
                field: "peak".to_string(),
                reason: "no peak selected".to_string(),
            })?;

        let (segment, fit) = match self.run_pipeline(fluid, peak, anchors.limit()) {
            Ok(out) => out,
            Err(e) => {
                self.workspace_mut(fluid).active = None;
                return Err(e);
            }
        };

        let well = self.series.well.clone();
        let start_date = self.series.month[peak].clone();
        let default_months = config::get().extrapolation.default_months;

        debug!(
            well = %well,
            fluid = %fluid,
            peak,
            qo = fit.qo,
            dea = fit.dea,
            r_squared = fit.r_squared,
            "Decline curve recomputed"
        );

        let ws = self.workspace_mut(fluid);
        let (name, extrapolation_months, comment) = match ws.active.take() {
            Some(prev) => (prev.curve.name, prev.curve.extrapolation_months, prev.curve.comment),
            None => (DEFAULT_CURVE_NAME.to_string(), default_months, None),
        };

        let curve = DeclineCurve {
            name,
            well,
            fluid_type: fluid,
            qo: fit.qo,
            dea: fit.dea,
            start_date,
            extrapolation_months,
            comment,
        };
        Ok(ws.active.insert(ActiveFit {
            curve,
            segment,
            fit: Some(fit),
        }))
    }

    /// Apply one manual field override to the active curve. Qo/dea edits
    /// drop the stored regression output, since it no longer describes the
    /// curve; no refit happens until the next anchor change.
    pub fn set_field(
        &mut self,
        fluid: FluidType,
        field: CurveField,
        raw: &str,
    ) -> Result<(), AnalysisError> {
        let ws = self.workspace_mut(fluid);
        let active = ws
            .active
            .as_mut()
            .ok_or_else(|| AnalysisError::InvalidCurveParameters {
                field: "curve".to_string(),
                reason: "no active curve to edit".to_string(),
            })?;
        active.curve.set_field(field, raw)?;
        if matches!(field, CurveField::Qo | CurveField::Dea) {
            active.fit = None;
        }
        debug!(fluid = %fluid, field = ?field, "Manual curve edit applied");
        Ok(())
    }

    /// Replace the editable curve with a previously saved record, clearing
    /// any ad hoc point selection. The anchor is re-derived by matching the
    /// record's start date against the series months (calendar month
    /// compare); a start date outside the series leaves the anchors empty
    /// and the segment blank.
    pub fn reset_to_saved(
        &mut self,
        fluid: FluidType,
        saved: &CurveRecord,
    ) -> Result<&ActiveFit, AnalysisError> {
        if saved.well != self.series.well || saved.fluid_type != fluid {
            return Err(AnalysisError::InvalidCurveParameters {
                field: "saved_curve".to_string(),
                reason: format!(
                    "record is for {}/{}, session is {}/{}",
                    saved.well, saved.fluid_type, self.series.well, fluid
                ),
            });
        }

        let saved_start = parse_boundary_date(&saved.start_date)?;
        let anchor = self
            .series
            .month_dates()?
            .iter()
            .position(|&m| same_calendar_month(m, saved_start));

        let segment = anchor
            .and_then(|peak| {
                self.extractor
                    .extract(self.series.values_for(fluid), peak, None)
                    .ok()
            })
            .unwrap_or_default();

        let curve = DeclineCurve {
            name: saved.name.clone(),
            well: saved.well.clone(),
            fluid_type: fluid,
            qo: saved.qo,
            dea: saved.dea,
            start_date: saved.start_date.clone(),
            extrapolation_months: config::get().extrapolation.default_months,
            comment: saved.comment.clone(),
        };

        info!(
            well = %saved.well,
            fluid = %fluid,
            curve_id = %saved.id,
            anchored = anchor.is_some(),
            "Editable curve reset from saved record"
        );

        let ws = self.workspace_mut(fluid);
        ws.anchors = match anchor {
            Some(peak) => AnchorSelection::from_peak(peak),
            None => AnchorSelection::new(),
        };
        Ok(ws.active.insert(ActiveFit {
            curve,
            segment,
            fit: None,
        }))
    }

    // ========================================================================
    // Derived Figures
    // ========================================================================

    /// Everything the well has produced to date for a fluid.
    pub fn cumulative_history(&self, fluid: FluidType) -> f64 {
        self.series.cumulative_for(fluid)
    }

    /// Estimated ultimate recovery: produced-to-date plus the active
    /// curve's continuation over its extrapolation window beyond the last
    /// recorded month. `None` without an active curve or production data.
    pub fn estimated_ultimate_recovery(
        &self,
        fluid: FluidType,
    ) -> Result<Option<f64>, AnalysisError> {
        let active = match self.active(fluid) {
            Some(a) => a,
            None => return Ok(None),
        };
        let last = match self.series.last_month()? {
            Some(d) => d,
            None => return Ok(None),
        };
        let start = parse_boundary_date(&active.curve.start_date)?;
        let months_since_start = months_between(start, last).max(0);

        let mut remaining = 0.0;
        for i in 1..=i64::from(active.curve.extrapolation_months) {
            remaining +=
                active.curve.qo * (-active.curve.dea * (months_since_start + i) as f64).exp();
        }
        Ok(Some(self.series.cumulative_for(fluid) + remaining))
    }

    /// R² of the current (possibly hand-edited) curve against its segment,
    /// for display next to the editable parameters.
    pub fn active_r_squared(&self, fluid: FluidType) -> Option<f64> {
        self.active(fluid)
            .filter(|a| !a.segment.is_empty())
            .map(|a| self.fitter.r_squared_for(a.curve.qo, a.curve.dea, &a.segment.values))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn workspace_mut(&mut self, fluid: FluidType) -> &mut FluidWorkspace {
        self.workspaces.entry(fluid).or_default()
    }

    fn check_index(&self, field: &str, index: usize) -> Result<(), AnalysisError> {
        if index >= self.series.len() {
            return Err(AnalysisError::InvalidCurveParameters {
                field: field.to_string(),
                reason: format!(
                    "index {} out of range ({} samples)",
                    index,
                    self.series.len()
                ),
            });
        }
        Ok(())
    }

    fn run_pipeline(
        &self,
        fluid: FluidType,
        peak: usize,
        limit: Option<usize>,
    ) -> Result<(DeclineSegment, FitSummary), AnalysisError> {
        let segment = self
            .extractor
            .extract(self.series.values_for(fluid), peak, limit)?;
        let fit = self.fitter.fit(&segment.values)?;
        Ok((segment, fit))
    }
}

// ============================================================================
// Tests
// ============================================================================
