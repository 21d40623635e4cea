//! Decline Start Detection
//!
//! Locates the candidate "peak" anchor a decline segment starts from.
//! Two modes:
//!
//! - **Trailing window** (interactive default): the maximum over the most
//!   recent fixed-size window seeds the anchor before any user choice.
//! - **Cut date** (historical migration): when the cut date coincides with
//!   the injection date on the same calendar day, the well was intervened
//!   and true decline starts at the production peak at/after the cut
//!   ("peak method"); otherwise decline starts at the first sample at/after
//!   the cut ("next-point method").
//!
//! Range membership is month-granular; only the cut-vs-injection
//! coincidence check compares full calendar days.

use crate::config;
use crate::error::AnalysisError;
use crate::types::{months_between, same_calendar_day, FluidType, ProductionSeries};
use chrono::NaiveDate;
use tracing::debug;

/// Result of a trailing-window scan: the peak plus the span of series
/// indices the chart should accept interactions on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakWindow {
    /// Global series index of the window maximum.
    pub peak_index: usize,
    /// First index inside the scanned window.
    pub left_edge: usize,
    /// Last index ahead of the trailing-trim region (selections past this
    /// point would be trimmed away before fitting).
    pub right_edge: usize,
}

/// Anchor point locator over one production column.
#[derive(Debug, Clone, Copy)]
pub struct PeakLocator {
    window_months: usize,
    trailing_trim: usize,
}

impl PeakLocator {
    pub fn new(window_months: usize, trailing_trim: usize) -> Self {
        Self {
            window_months,
            trailing_trim,
        }
    }

    /// Locator tuned from the global analysis configuration.
    pub fn from_config() -> Self {
        let cfg = config::get();
        Self::new(cfg.peak.window_months, cfg.segment.trailing_trim_months)
    }

    /// Find the maximum over the trailing window (the whole series when
    /// shorter). Missing samples are not candidates; ties resolve to the
    /// earliest index. Returns `None` when no usable sample exists.
    pub fn trailing_window_peak(&self, values: &[Option<f64>]) -> Option<PeakWindow> {
        if values.is_empty() {
            return None;
        }

        let left_edge = values.len().saturating_sub(self.window_months);
        let mut peak: Option<(usize, f64)> = None;
        for (index, value) in values.iter().enumerate().skip(left_edge) {
            if let Some(v) = value {
                if v.is_finite() && peak.map_or(true, |(_, best)| *v > best) {
                    peak = Some((index, *v));
                }
            }
        }

        peak.map(|(peak_index, value)| {
            debug!(peak_index, value, left_edge, "Trailing-window peak located");
            PeakWindow {
                peak_index,
                left_edge,
                right_edge: values.len().saturating_sub(self.trailing_trim + 1),
            }
        })
    }

    /// Locate the decline start for a historical cut date.
    ///
    /// Fails with `NoAnchorInRange` when the series has no sample at/after
    /// the cut date (or only missing samples there in peak method); batch
    /// callers treat this as a per-well skip.
    pub fn cut_date_anchor(
        &self,
        series: &ProductionSeries,
        fluid: FluidType,
        cut_date: NaiveDate,
        injection_date: Option<NaiveDate>,
    ) -> Result<usize, AnalysisError> {
        let dates = series.month_dates()?;
        let first_in_range = dates
            .iter()
            .position(|&month| months_between(cut_date, month) >= 0)
            .ok_or_else(|| AnalysisError::NoAnchorInRange {
                well: series.well.clone(),
                cut_date: cut_date.to_string(),
            })?;

        let use_peak_method =
            injection_date.map_or(false, |injection| same_calendar_day(cut_date, injection));

        if !use_peak_method {
            debug!(
                well = %series.well,
                index = first_in_range,
                "Cut-date anchor via next-point method"
            );
            return Ok(first_in_range);
        }

        // Intervention: scan the whole in-range tail for the production peak.
        let values = series.values_for(fluid);
        let mut peak: Option<(usize, f64)> = None;
        for (index, value) in values.iter().enumerate().skip(first_in_range) {
            if let Some(v) = value {
                if v.is_finite() && peak.map_or(true, |(_, best)| *v > best) {
                    peak = Some((index, *v));
                }
            }
        }

        match peak {
            Some((index, value)) => {
                debug!(
                    well = %series.well,
                    index,
                    value,
                    "Cut-date anchor via peak method"
                );
                Ok(index)
            }
            None => Err(AnalysisError::NoAnchorInRange {
                well: series.well.clone(),
                cut_date: cut_date.to_string(),
            }),
        }
    }
}
