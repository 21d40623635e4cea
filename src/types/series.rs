//! Production series types and monthly date arithmetic.
//!
//! All production data is monthly-resolution. Date comparisons therefore go
//! through [`months_between`] / [`same_calendar_month`], which look only at
//! (year, month) components, never at timestamps. The single exception is
//! [`same_calendar_day`], used to distinguish the two cut-date anchoring
//! methods during historical migration.

use crate::error::AnalysisError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// ============================================================================
// Fluid Type
// ============================================================================

/// Produced fluid a series column or curve refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FluidType {
    Oil,
    Gas,
    Water,
}

impl FluidType {
    /// Lowercase wire/storage name, matching the persisted `fluid_type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            FluidType::Oil => "oil",
            FluidType::Gas => "gas",
            FluidType::Water => "water",
        }
    }

    pub const ALL: [FluidType; 3] = [FluidType::Oil, FluidType::Gas, FluidType::Water];
}

impl std::fmt::Display for FluidType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FluidType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oil" => Ok(FluidType::Oil),
            "gas" => Ok(FluidType::Gas),
            "water" => Ok(FluidType::Water),
            other => Err(AnalysisError::InvalidCurveParameters {
                field: "fluid_type".to_string(),
                reason: format!("unknown fluid {:?}", other),
            }),
        }
    }
}

// ============================================================================
// Date Helpers
// ============================================================================

/// Parse a boundary date string.
///
/// Accepts `YYYY-MM` (monthly series labels), `YYYY-MM-DD`, and full ISO
/// datetimes (anything after a `T` or space is dropped). `YYYY-MM` maps to
/// the first day of the month.
pub fn parse_boundary_date(value: &str) -> Result<NaiveDate, AnalysisError> {
    let date_part = value
        .split(['T', ' '])
        .next()
        .unwrap_or(value)
        .trim();

    let bad = |reason: &str| AnalysisError::BadDate {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let mut parts = date_part.split('-');
    let year: i32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| bad("missing year"))?;
    let month: u32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| bad("missing month"))?;
    let day: u32 = match parts.next() {
        Some(p) => p.parse().map_err(|_| bad("unparseable day"))?,
        None => 1,
    };

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| bad("no such calendar date"))
}

/// Whole months from `from` to `to`, computed from (year, month) components
/// only. Negative when `to` precedes `from`.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let years = i64::from(to.year()) - i64::from(from.year());
    let months = i64::from(to.month()) - i64::from(from.month());
    years * 12 + months
}

/// True when both dates fall in the same calendar month (day ignored).
pub fn same_calendar_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// True when both dates are the same calendar day.
pub fn same_calendar_day(a: NaiveDate, b: NaiveDate) -> bool {
    a == b
}

// ============================================================================
// Production Series
// ============================================================================

/// One well's monthly production history as parallel arrays.
///
/// This mirrors the storage/API payload shape: `month[i]` labels the sample,
/// and the three `efec_*_prod[i]` columns carry per-fluid volumes. Missing
/// report months arrive as `null` and stay `None` here; the segment
/// extractor filters them out while preserving source indices.
///
/// Invariant: months strictly increasing, one per calendar month. Gap repair
/// is out of scope; callers guarantee contiguity or accept degraded fits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionSeries {
    pub well: String,
    pub month: Vec<String>,
    pub efec_oil_prod: Vec<Option<f64>>,
    pub efec_gas_prod: Vec<Option<f64>>,
    pub efec_water_prod: Vec<Option<f64>>,
}

impl ProductionSeries {
    /// Number of monthly samples.
    pub fn len(&self) -> usize {
        self.month.len()
    }

    pub fn is_empty(&self) -> bool {
        self.month.is_empty()
    }

    /// Production column for one fluid.
    pub fn values_for(&self, fluid: FluidType) -> &[Option<f64>] {
        match fluid {
            FluidType::Oil => &self.efec_oil_prod,
            FluidType::Gas => &self.efec_gas_prod,
            FluidType::Water => &self.efec_water_prod,
        }
    }

    /// Check the parallel-array shape and month ordering.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let n = self.month.len();
        if self.efec_oil_prod.len() != n
            || self.efec_gas_prod.len() != n
            || self.efec_water_prod.len() != n
        {
            return Err(AnalysisError::MalformedSeries {
                well: self.well.clone(),
                reason: format!(
                    "parallel arrays disagree: {} months, {}/{}/{} oil/gas/water values",
                    n,
                    self.efec_oil_prod.len(),
                    self.efec_gas_prod.len(),
                    self.efec_water_prod.len()
                ),
            });
        }

        let dates = self.month_dates()?;
        for pair in dates.windows(2) {
            if months_between(pair[0], pair[1]) <= 0 {
                return Err(AnalysisError::MalformedSeries {
                    well: self.well.clone(),
                    reason: format!("months not strictly increasing near {}", pair[1]),
                });
            }
        }
        Ok(())
    }

    /// Parse one month label.
    pub fn month_date(&self, index: usize) -> Result<NaiveDate, AnalysisError> {
        let label = self.month.get(index).ok_or_else(|| AnalysisError::MalformedSeries {
            well: self.well.clone(),
            reason: format!("month index {} out of range ({} samples)", index, self.month.len()),
        })?;
        parse_boundary_date(label)
    }

    /// Parse every month label once, for scans that compare many dates.
    pub fn month_dates(&self) -> Result<Vec<NaiveDate>, AnalysisError> {
        self.month.iter().map(|m| parse_boundary_date(m)).collect()
    }

    /// Latest month with any sample, if the series is non-empty.
    pub fn last_month(&self) -> Result<Option<NaiveDate>, AnalysisError> {
        match self.month.last() {
            Some(label) => Ok(Some(parse_boundary_date(label)?)),
            None => Ok(None),
        }
    }

    /// Cumulative reported volume for one fluid over the whole history.
    pub fn cumulative_for(&self, fluid: FluidType) -> f64 {
        self.values_for(fluid).iter().flatten().sum()
    }

    /// Actual reported volume for one fluid across `[from, to]`, compared at
    /// month granularity.
    pub fn produced_in_range(
        &self,
        fluid: FluidType,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<f64, AnalysisError> {
        let dates = self.month_dates()?;
        let mut total = 0.0;
        for (date, value) in dates.iter().zip(self.values_for(fluid)) {
            if months_between(from, *date) >= 0 && months_between(*date, to) >= 0 {
                total += value.unwrap_or(0.0);
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(months: &[&str], oil: &[Option<f64>]) -> ProductionSeries {
        ProductionSeries {
            well: "PZ-1".to_string(),
            month: months.iter().map(|m| m.to_string()).collect(),
            efec_oil_prod: oil.to_vec(),
            efec_gas_prod: vec![None; oil.len()],
            efec_water_prod: vec![None; oil.len()],
        }
    }

    #[test]
    fn test_parse_boundary_date_variants() {
        assert_eq!(
            parse_boundary_date("2020-03").unwrap(),
            NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()
        );
        assert_eq!(
            parse_boundary_date("2020-03-15").unwrap(),
            NaiveDate::from_ymd_opt(2020, 3, 15).unwrap()
        );
        assert_eq!(
            parse_boundary_date("2020-03-15T00:00:00.000Z").unwrap(),
            NaiveDate::from_ymd_opt(2020, 3, 15).unwrap()
        );
        assert!(parse_boundary_date("not-a-date").is_err());
        assert!(parse_boundary_date("2020-13").is_err());
    }

    #[test]
    fn test_months_between_ignores_days() {
        let a = NaiveDate::from_ymd_opt(2021, 1, 31).unwrap();
        let b = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        assert_eq!(months_between(a, b), 2);
        assert_eq!(months_between(b, a), -2);
        assert_eq!(months_between(a, a), 0);
    }

    #[test]
    fn test_months_between_across_years() {
        let a = NaiveDate::from_ymd_opt(2019, 11, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2021, 2, 28).unwrap();
        assert_eq!(months_between(a, b), 15);
    }

    #[test]
    fn test_validate_rejects_ragged_arrays() {
        let mut s = series(&["2020-01", "2020-02"], &[Some(1.0), Some(2.0)]);
        s.efec_gas_prod.pop();
        assert!(matches!(
            s.validate(),
            Err(AnalysisError::MalformedSeries { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unordered_months() {
        let s = series(&["2020-02", "2020-01"], &[Some(1.0), Some(2.0)]);
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_produced_in_range_is_month_granular() {
        let s = series(
            &["2020-01", "2020-02", "2020-03", "2020-04"],
            &[Some(10.0), Some(20.0), None, Some(40.0)],
        );
        let from = NaiveDate::from_ymd_opt(2020, 2, 15).unwrap();
        let to = NaiveDate::from_ymd_opt(2020, 4, 1).unwrap();
        // Feb counts despite `from` landing mid-month; the null March adds 0.
        let total = s.produced_in_range(FluidType::Oil, from, to).unwrap();
        assert!((total - 60.0).abs() < 1e-12, "got {}", total);
    }

    #[test]
    fn test_cumulative_skips_missing_samples() {
        let s = series(&["2020-01", "2020-02"], &[Some(5.0), None]);
        assert_eq!(s.cumulative_for(FluidType::Oil), 5.0);
    }
}
