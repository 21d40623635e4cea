//! Exponential Decline Regression
//!
//! Fits `q(t) = qo * e^(-dea * (t-1))` to a clean decline segment via
//! y-weighted log-linear least squares. Weighting each residual by its
//! sample value keeps near-zero substituted samples from dragging the fit
//! (an unweighted log fit would treat `ln(epsilon)` as a massive outlier).
//!
//! The R² reported is computed against the original samples, before any
//! epsilon substitution, so goodness-of-fit reflects the data actually
//! observed. Slope significance comes from a Student's t test (statrs).

use crate::config;
use crate::error::AnalysisError;
use crate::types::FitSummary;
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::debug;

/// Stateless exponential regression over one decline segment.
///
/// Samples are indexed `t = 1, 2, 3, …` from the segment start. Zero and
/// non-finite samples are replaced by `epsilon` before the log transform
/// (the segment extractor has already removed missing samples, so this is
/// a fitting policy rather than a gap filter).
#[derive(Debug, Clone, Copy)]
pub struct ExponentialFitter {
    epsilon: f64,
    min_samples: usize,
}

impl ExponentialFitter {
    pub fn new(epsilon: f64, min_samples: usize) -> Self {
        Self {
            epsilon,
            min_samples,
        }
    }

    /// Fitter tuned from the global analysis configuration.
    pub fn from_config() -> Self {
        let fit = &config::get().fit;
        Self::new(fit.zero_substitution_epsilon, fit.min_segment_samples)
    }

    /// The configured zero-substitution epsilon.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Fit one segment, returning the decline model and fit diagnostics.
    ///
    /// `dea` is the positive monthly decline rate (the log-space slope with
    /// its sign inverted); a growing segment yields a negative `dea`, which
    /// is preserved rather than clamped.
    pub fn fit(&self, samples: &[f64]) -> Result<FitSummary, AnalysisError> {
        let n = samples.len();
        if n < self.min_samples {
            return Err(AnalysisError::InsufficientData {
                found: n,
                needed: self.min_samples,
            });
        }

        // Zero/invalid samples would make ln(y) undefined.
        let refined: Vec<f64> = samples
            .iter()
            .map(|&v| if v.is_finite() && v > 0.0 { v } else { self.epsilon })
            .collect();

        // Weighted normal equations: minimize Σ y·(ln y - (ln a + b·x))²
        // over x = 1..n.
        let mut sum_y = 0.0;
        let mut sum_xy = 0.0;
        let mut sum_x2y = 0.0;
        let mut sum_ylny = 0.0;
        let mut sum_xylny = 0.0;

        for (i, &y) in refined.iter().enumerate() {
            let x = (i + 1) as f64;
            let ln_y = y.ln();
            sum_y += y;
            sum_xy += x * y;
            sum_x2y += x * x * y;
            sum_ylny += y * ln_y;
            sum_xylny += x * y * ln_y;
        }

        let denominator = sum_y * sum_x2y - sum_xy * sum_xy;
        if !denominator.is_finite() || denominator == 0.0 {
            return Err(AnalysisError::DegenerateFit);
        }

        let ln_a = (sum_x2y * sum_ylny - sum_xy * sum_xylny) / denominator;
        let b = (sum_y * sum_xylny - sum_xy * sum_ylny) / denominator;

        // Shift the model origin onto the first sample: q(1) = qo.
        let qo = (ln_a + b).exp();
        let dea = -b;
        if !qo.is_finite() || !dea.is_finite() {
            return Err(AnalysisError::DegenerateFit);
        }

        let r_squared = Self::r_squared_against(samples, ln_a, b);
        let slope_p_value = Self::slope_p_value(&refined);

        debug!(
            samples = n,
            qo = qo,
            dea = dea,
            r_squared = r_squared,
            "Fitted exponential decline"
        );

        Ok(FitSummary {
            qo,
            dea,
            r_squared,
            slope_p_value,
            sample_count: n,
        })
    }

    /// Score arbitrary curve parameters against a segment without refitting,
    /// for display next to manually edited values.
    pub fn r_squared_for(&self, qo: f64, dea: f64, samples: &[f64]) -> f64 {
        if samples.is_empty() || qo <= 0.0 {
            return 0.0;
        }
        Self::r_squared_against(samples, qo.ln() + dea, -dea)
    }

    /// R² of the fitted model against the original (pre-substitution)
    /// samples. Floored at 0; a zero-variance segment scores 1.
    fn r_squared_against(samples: &[f64], ln_a: f64, b: f64) -> f64 {
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;

        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        for (i, &y) in samples.iter().enumerate() {
            let x = (i + 1) as f64;
            let predicted = (ln_a + b * x).exp();
            ss_res += (y - predicted) * (y - predicted);
            ss_tot += (y - mean) * (y - mean);
        }

        if ss_tot == 0.0 {
            1.0
        } else {
            (1.0 - ss_res / ss_tot).max(0.0)
        }
    }

    /// Two-sided p-value for "the log-space trend is nonzero", from the
    /// Pearson correlation between sample index and ln(sample).
    fn slope_p_value(refined: &[f64]) -> f64 {
        let x: Vec<f64> = (1..=refined.len()).map(|i| i as f64).collect();
        let ln_y: Vec<f64> = refined.iter().map(|y| y.ln()).collect();
        let r = Self::pearson(&x, &ln_y);
        Self::p_value_for_r(r, refined.len())
    }

    /// Pearson correlation coefficient.
    fn pearson(x: &[f64], y: &[f64]) -> f64 {
        let n = x.len() as f64;
        let sum_x: f64 = x.iter().sum();
        let sum_y: f64 = y.iter().sum();
        let sum_xy: f64 = x.iter().zip(y.iter()).map(|(a, b)| a * b).sum();
        let sum_x2: f64 = x.iter().map(|a| a * a).sum();
        let sum_y2: f64 = y.iter().map(|a| a * a).sum();

        let numerator = n * sum_xy - sum_x * sum_y;
        let denominator = ((n * sum_x2 - sum_x.powi(2)) * (n * sum_y2 - sum_y.powi(2))).sqrt();

        if denominator == 0.0 {
            0.0
        } else {
            numerator / denominator
        }
    }

    /// Two-tailed p-value from Student's t with n-2 degrees of freedom.
    fn p_value_for_r(r: f64, n: usize) -> f64 {
        if n < 3 {
            return 1.0;
        }
        if r.abs() >= 0.9999 {
            return 0.0;
        }

        let df = (n - 2) as f64;
        let t_stat = r * df.sqrt() / (1.0 - r * r).sqrt();

        match StudentsT::new(0.0, 1.0, df) {
            Ok(t_dist) => 2.0 * (1.0 - t_dist.cdf(t_stat.abs())),
            Err(_) => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitter() -> ExponentialFitter {
        ExponentialFitter::new(0.0001, 3)
    }

    /// Synthetic decline with known parameters.
    fn decline_series(qo: f64, dea: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| qo * (-dea * i as f64).exp()).collect()
    }

    #[test]
    fn test_recovers_known_parameters() {
        let samples = decline_series(100.0, 0.05, 24);
        let fit = fitter().fit(&samples).unwrap();

        assert!(
            (fit.qo - 100.0).abs() / 100.0 < 1e-3,
            "qo should recover 100, got {}",
            fit.qo
        );
        assert!(
            (fit.dea - 0.05).abs() / 0.05 < 1e-3,
            "dea should recover 0.05, got {}",
            fit.dea
        );
        assert!(fit.r_squared > 0.999, "exact data should fit, r²={}", fit.r_squared);
        assert!(fit.slope_p_value < 0.05, "clear decline should be significant");
    }

    #[test]
    fn test_epsilon_substitution_near_inert() {
        // One dead month inside an otherwise clean decline.
        let mut with_zero = decline_series(100.0, 0.05, 20);
        with_zero[10] = 0.0;

        // Same data with that sample omitted entirely (indices of the
        // remaining samples unchanged).
        let substituted = fitter().fit(&with_zero).unwrap();
        let (qo_omitted, dea_omitted) = fit_without(&with_zero, 10);

        assert!(
            (substituted.qo - qo_omitted).abs() / qo_omitted < 0.01,
            "qo drift from epsilon substitution too large: {} vs {}",
            substituted.qo,
            qo_omitted
        );
        assert!(
            (substituted.dea - dea_omitted).abs() < 1e-3,
            "dea drift from epsilon substitution too large: {} vs {}",
            substituted.dea,
            dea_omitted
        );
    }

    /// Reference fit that drops one sample instead of substituting it.
    fn fit_without(samples: &[f64], skip: usize) -> (f64, f64) {
        let mut sum_y = 0.0;
        let mut sum_xy = 0.0;
        let mut sum_x2y = 0.0;
        let mut sum_ylny = 0.0;
        let mut sum_xylny = 0.0;
        for (i, &y) in samples.iter().enumerate() {
            if i == skip {
                continue;
            }
            let x = (i + 1) as f64;
            sum_y += y;
            sum_xy += x * y;
            sum_x2y += x * x * y;
            sum_ylny += y * y.ln();
            sum_xylny += x * y * y.ln();
        }
        let denom = sum_y * sum_x2y - sum_xy * sum_xy;
        let ln_a = (sum_x2y * sum_ylny - sum_xy * sum_xylny) / denom;
        let b = (sum_y * sum_xylny - sum_xy * sum_ylny) / denom;
        ((ln_a + b).exp(), -b)
    }

    #[test]
    fn test_too_few_samples_rejected() {
        let result = fitter().fit(&[100.0, 95.0]);
        assert!(matches!(
            result,
            Err(AnalysisError::InsufficientData { found: 2, needed: 3 })
        ));
    }

    #[test]
    fn test_growth_yields_negative_dea() {
        let samples: Vec<f64> = (0..12).map(|i| 50.0 * (0.03 * i as f64).exp()).collect();
        let fit = fitter().fit(&samples).unwrap();
        assert!(
            fit.dea < 0.0,
            "growing production must keep its negative decline rate, got {}",
            fit.dea
        );
        assert!((fit.dea + 0.03).abs() < 1e-3);
    }

    #[test]
    fn test_constant_series_fits_flat() {
        let fit = fitter().fit(&[5.0, 5.0, 5.0, 5.0]).unwrap();
        assert!((fit.qo - 5.0).abs() < 1e-9);
        assert!(fit.dea.abs() < 1e-12, "flat series has zero decline");
        assert_eq!(fit.r_squared, 1.0, "zero-variance segment scores 1");
    }

    #[test]
    fn test_r_squared_stays_in_unit_interval() {
        // Alternating values are about as non-exponential as data gets.
        let samples = vec![1.0, 100.0, 1.0, 100.0, 1.0, 100.0];
        let fit = fitter().fit(&samples).unwrap();
        assert!(
            (0.0..=1.0).contains(&fit.r_squared),
            "r² must be floored into [0, 1], got {}",
            fit.r_squared
        );
    }

    #[test]
    fn test_noisy_decline_still_close() {
        use rand::SeedableRng;
        use rand_distr::{Distribution, Normal};

        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let samples: Vec<f64> = (0..48)
            .map(|i| (200.0 * (-0.04 * i as f64).exp() + noise.sample(&mut rng)).max(0.1))
            .collect();

        let fit = fitter().fit(&samples).unwrap();
        assert!(
            (fit.dea - 0.04).abs() < 0.01,
            "noisy decline rate should stay close, got {}",
            fit.dea
        );
        assert!(fit.r_squared > 0.9);
    }
}
