//! Anchor point selection for the editable decline segment.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};

/// Role a selected series index plays in the decline segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorKind {
    /// Decline start (the fitted curve's first sample).
    Peak,
    /// Decline segment end (inclusive).
    Limit,
}

/// The single active peak/limit pair for one editable segment.
///
/// Only one pair is live at a time: selecting a new peak discards the
/// previous pair entirely, matching the one-segment editing flow. A limit
/// may only exist at or after the active peak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorSelection {
    peak: Option<usize>,
    limit: Option<usize>,
}

impl AnchorSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection seeded from an automatic peak (no limit).
    pub fn from_peak(index: usize) -> Self {
        Self {
            peak: Some(index),
            limit: None,
        }
    }

    pub fn peak(&self) -> Option<usize> {
        self.peak
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn is_empty(&self) -> bool {
        self.peak.is_none() && self.limit.is_none()
    }

    /// Designate a new decline start, clearing any prior peak and limit.
    pub fn select_peak(&mut self, index: usize) {
        self.peak = Some(index);
        self.limit = None;
    }

    /// Designate the segment end. Requires an active peak at or before it.
    pub fn select_limit(&mut self, index: usize) -> Result<(), AnalysisError> {
        match self.peak {
            None => Err(AnalysisError::InvalidCurveParameters {
                field: "limit".to_string(),
                reason: "cannot set a limit point before a peak is selected".to_string(),
            }),
            Some(peak) if index < peak => Err(AnalysisError::InvalidCurveParameters {
                field: "limit".to_string(),
                reason: format!("limit index {} precedes peak index {}", index, peak),
            }),
            Some(_) => {
                self.limit = Some(index);
                Ok(())
            }
        }
    }

    /// Drop both anchors (abandon the in-progress segment).
    pub fn clear(&mut self) {
        self.peak = None;
        self.limit = None;
    }
}
