//! Decline curve types: fitted segment, fit summary, editable curve, and
//! the persisted record shape.

use crate::error::AnalysisError;
use crate::types::series::{parse_boundary_date, FluidType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Segment & Fit Output
// ============================================================================

/// Clean decline segment ready for fitting.
///
/// `values` holds the filtered samples in true production units;
/// `original_indices[i]` is the source-series index of `values[i]`, kept so
/// fitted points can be re-plotted against the full history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclineSegment {
    pub values: Vec<f64>,
    pub original_indices: Vec<usize>,
}

impl DeclineSegment {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Source index of the first fitted sample (the anchor the curve starts at).
    pub fn start_index(&self) -> Option<usize> {
        self.original_indices.first().copied()
    }
}

/// Output of one exponential regression.
///
/// The model is `q(t) = qo * e^(-dea * (t - 1))` over 1-based sample
/// offsets, so `qo` is the modeled value at the segment's first sample and
/// `dea` the positive monthly decline rate (negative when production grows).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub qo: f64,
    pub dea: f64,
    /// Coefficient of determination against the original (pre-substitution)
    /// samples, floored at 0; defined as 1 for a zero-variance segment.
    pub r_squared: f64,
    /// Two-sided p-value of the log-space slope (Student's t).
    pub slope_p_value: f64,
    pub sample_count: usize,
}

// ============================================================================
// Editable Curve
// ============================================================================

/// Fields of the editable curve that accept manual overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveField {
    Name,
    Qo,
    Dea,
    StartDate,
    ExtrapolationMonths,
    Comment,
}

/// The in-session editable decline curve for one well/fluid.
///
/// Nothing here touches storage: edits are authoritative in memory until an
/// explicit save turns the curve into a [`CurveRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclineCurve {
    pub name: String,
    pub well: String,
    pub fluid_type: FluidType,
    pub qo: f64,
    pub dea: f64,
    /// Kept as the series' own date string; parsed only when arithmetic
    /// needs it. Manual edits never reinterpret it.
    pub start_date: String,
    pub extrapolation_months: u32,
    pub comment: Option<String>,
}

impl DeclineCurve {
    /// Apply one manual override. Numeric fields are parsed from the raw
    /// string; `start_date` is stored as given. No re-fit happens here.
    pub fn set_field(&mut self, field: CurveField, raw: &str) -> Result<(), AnalysisError> {
        match field {
            CurveField::Name => {
                if raw.trim().is_empty() {
                    return Err(AnalysisError::InvalidCurveParameters {
                        field: "name".to_string(),
                        reason: "curve name cannot be empty".to_string(),
                    });
                }
                self.name = raw.trim().to_string();
            }
            CurveField::Qo => {
                let qo = parse_finite("qo", raw)?;
                if qo <= 0.0 {
                    return Err(AnalysisError::InvalidCurveParameters {
                        field: "qo".to_string(),
                        reason: format!("must be positive, got {}", qo),
                    });
                }
                self.qo = qo;
            }
            // Negative dea (growing production) is a legal model state.
            CurveField::Dea => self.dea = parse_finite("dea", raw)?,
            CurveField::StartDate => {
                parse_boundary_date(raw)?;
                self.start_date = raw.to_string();
            }
            CurveField::ExtrapolationMonths => {
                let months: u32 = raw.trim().parse().map_err(|_| {
                    AnalysisError::InvalidCurveParameters {
                        field: "extrapolation_months".to_string(),
                        reason: format!("not a non-negative integer: {:?}", raw),
                    }
                })?;
                self.extrapolation_months = months;
            }
            CurveField::Comment => {
                self.comment = if raw.is_empty() {
                    None
                } else {
                    Some(raw.to_string())
                };
            }
        }
        Ok(())
    }

    /// Freeze the editable curve into the persisted record shape.
    pub fn to_record(&self, user_id: i64, created_at: DateTime<Utc>) -> CurveRecord {
        CurveRecord {
            id: CurveRecord::composite_id(&self.name, &self.well, self.fluid_type),
            name: self.name.clone(),
            qo: self.qo,
            dea: self.dea,
            start_date: self.start_date.clone(),
            well: self.well.clone(),
            user_id,
            fluid_type: self.fluid_type,
            comment: self.comment.clone(),
            created_at,
        }
    }
}

fn parse_finite(field: &str, raw: &str) -> Result<f64, AnalysisError> {
    let value: f64 = raw.trim().parse().map_err(|_| AnalysisError::InvalidCurveParameters {
        field: field.to_string(),
        reason: format!("not a number: {:?}", raw),
    })?;
    if !value.is_finite() {
        return Err(AnalysisError::InvalidCurveParameters {
            field: field.to_string(),
            reason: format!("must be finite, got {}", value),
        });
    }
    Ok(value)
}

// ============================================================================
// Persisted Record
// ============================================================================

/// Persisted curve row as exchanged with storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveRecord {
    /// Uniqueness key, derived as `name + well + fluid_type`.
    pub id: String,
    pub name: String,
    pub qo: f64,
    pub dea: f64,
    pub start_date: String,
    pub well: String,
    pub user_id: i64,
    pub fluid_type: FluidType,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CurveRecord {
    /// Derive the record id from the uniqueness triple.
    pub fn composite_id(name: &str, well: &str, fluid: FluidType) -> String {
        format!("{}{}{}", name, well, fluid.as_str())
    }

    /// The `(name, well, fluid_type)` uniqueness triple.
    pub fn key_triple(&self) -> (&str, &str, FluidType) {
        (&self.name, &self.well, self.fluid_type)
    }
}
