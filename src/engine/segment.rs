//! Decline Segment Extraction
//!
//! Slices the fit sample out of a production column: peak through limit
//! (inclusive) or through the end of the series, minus a trailing trim of
//! months considered unreliable (partial reporting). Missing and non-finite
//! samples are dropped while their source indices are preserved so chart
//! overlays stay aligned with the raw series.

use crate::config;
use crate::error::AnalysisError;
use crate::types::DeclineSegment;
use tracing::debug;

/// Segment slicer with the trailing-trim and minimum-size policy applied.
#[derive(Debug, Clone, Copy)]
pub struct SegmentExtractor {
    trailing_trim: usize,
    min_samples: usize,
}

impl SegmentExtractor {
    pub fn new(trailing_trim: usize, min_samples: usize) -> Self {
        Self {
            trailing_trim,
            min_samples,
        }
    }

    /// Extractor tuned from the global analysis configuration.
    pub fn from_config() -> Self {
        let cfg = config::get();
        Self::new(cfg.segment.trailing_trim_months, cfg.fit.min_segment_samples)
    }

    /// Slice `peak..=limit` (or to the end), trim the trailing months, and
    /// keep only finite samples.
    ///
    /// The trim always leaves at least one sample of the raw slice; the
    /// minimum-size check then decides whether a fit is possible at all.
    pub fn extract(
        &self,
        values: &[Option<f64>],
        peak: usize,
        limit: Option<usize>,
    ) -> Result<DeclineSegment, AnalysisError> {
        if peak >= values.len() {
            return Err(AnalysisError::InvalidCurveParameters {
                field: "peak".to_string(),
                reason: format!(
                    "peak index {} out of range ({} samples)",
                    peak,
                    values.len()
                ),
            });
        }
        if let Some(limit) = limit {
            if limit < peak {
                return Err(AnalysisError::InvalidCurveParameters {
                    field: "limit".to_string(),
                    reason: format!("limit index {} precedes peak index {}", limit, peak),
                });
            }
        }

        let end = match limit {
            Some(limit) => (limit + 1).min(values.len()),
            None => values.len(),
        };
        let raw = &values[peak..end];
        let kept = raw.len().saturating_sub(self.trailing_trim).max(1);

        let mut segment = DeclineSegment::default();
        for (offset, value) in raw.iter().take(kept).enumerate() {
            if let Some(v) = value {
                if v.is_finite() {
                    segment.values.push(*v);
                    segment.original_indices.push(peak + offset);
                }
            }
        }

        debug!(
            peak,
            limit,
            raw_len = raw.len(),
            kept,
            valid = segment.len(),
            "Extracted decline segment"
        );

        if segment.len() < self.min_samples {
            return Err(AnalysisError::InsufficientData {
                found: segment.len(),
                needed: self.min_samples,
            });
        }
        Ok(segment)
    }
}
