//! Utilization workload profiles
//!
//! A workload is written `"baseline,d1@u1,d2@u2,..."`: the headline
//! utilization percentage followed by periods covering `d` percent of the
//! elapsed time at `u` percent utilization. It weights CO2 values taken
//! from a catalog curve sampled by utilization.

use crate::error::{QuoteError, Result};
use serde::{Deserialize, Serialize};

/// Utilization assumed when no workload is given
pub const DEFAULT_BASELINE: f64 = 5.0;

/// Tolerance on the sum of period shares
const SHARE_TOLERANCE: f64 = 0.01;

/// One slice of the elapsed time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkloadPeriod {
    /// Share of the elapsed time, in percent
    pub duration: f64,
    /// Utilization during this slice, in percent
    pub utilization: f64,
}

/// Parsed utilization profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    pub baseline: f64,
    pub periods: Vec<WorkloadPeriod>,
}

impl Workload {
    /// Full utilization: every CO2 lookup degenerates to the flat value
    pub const FULL: Workload = Workload {
        baseline: 100.0,
        periods: Vec::new(),
    };

    /// Single period at [`DEFAULT_BASELINE`] covering all of the time
    pub fn default_profile() -> Self {
        Self::flat(DEFAULT_BASELINE)
    }

    fn flat(baseline: f64) -> Self {
        Self {
            baseline,
            periods: vec![WorkloadPeriod {
                duration: 100.0,
                utilization: baseline,
            }],
        }
    }

    /// Parse a workload string; `None` or blank input yields the default profile
    pub fn parse(input: Option<&str>) -> Result<Self> {
        let raw = match input.map(str::trim) {
            None | Some("") => return Ok(Self::default_profile()),
            Some(raw) => raw,
        };

        let mut parts = raw.split(',').map(str::trim);
        let baseline = parse_percent(raw, parts.next().unwrap_or_default(), "baseline")?;

        let mut periods = Vec::new();
        for part in parts {
            let (duration, utilization) = part.split_once('@').ok_or_else(|| invalid(
                raw,
                format!("period '{}' is not of the form duration@utilization", part),
            ))?;
            periods.push(WorkloadPeriod {
                duration: parse_percent(raw, duration, "duration")?,
                utilization: parse_percent(raw, utilization, "utilization")?,
            });
        }

        if periods.is_empty() {
            if baseline >= 100.0 {
                return Ok(Self::FULL);
            }
            return Ok(Self::flat(baseline));
        }

        let total: f64 = periods.iter().map(|p| p.duration).sum();
        if (total - 100.0).abs() > SHARE_TOLERANCE {
            return Err(invalid(
                raw,
                format!("period durations sum to {}, expected 100", total),
            ));
        }

        Ok(Self { baseline, periods })
    }

    pub fn is_full(&self) -> bool {
        self.baseline >= 100.0
    }

    /// Baseline rounded to the nearest multiple of `step`, used as a query key
    pub fn rounded_baseline(&self, step: f64) -> f64 {
        if step <= 0.0 {
            return self.baseline;
        }
        ((self.baseline / step).round() * step).clamp(0.0, 100.0)
    }

    /// Weight a flat CO2 value `v100` (at 100% utilization) with this profile.
    ///
    /// `curve` holds comma-separated samples taken every `100/n` percent from
    /// 0%; `v100` closes the curve at 100%.
    pub fn interpolate(&self, v100: f64, curve: Option<&str>) -> f64 {
        if self.is_full() {
            return v100;
        }
        let samples = match curve.and_then(parse_curve) {
            Some(samples) => samples,
            None => return v100,
        };

        let step = 100.0 / samples.len() as f64;
        self.periods
            .iter()
            .map(|p| value_at(&samples, step, v100, p.utilization) * p.duration / 100.0)
            .sum()
    }
}

impl Default for Workload {
    fn default() -> Self {
        Self::default_profile()
    }
}

fn value_at(samples: &[f64], step: f64, v100: f64, utilization: f64) -> f64 {
    let position = utilization.max(0.0) / step;
    let index = position.floor() as usize;
    if index >= samples.len() {
        return v100;
    }
    let lower = samples[index];
    let upper = samples.get(index + 1).copied().unwrap_or(v100);
    lower + (upper - lower) * (position - index as f64)
}

fn parse_curve(curve: &str) -> Option<Vec<f64>> {
    let samples: Option<Vec<f64>> = curve
        .split(',')
        .map(|s| s.trim().parse::<f64>().ok())
        .collect();
    match samples {
        Some(s) if !s.is_empty() => Some(s),
        _ => {
            tracing::debug!(curve = %curve, "Ignoring malformed CO2 curve");
            None
        }
    }
}

fn parse_percent(raw: &str, value: &str, field: &str) -> Result<f64> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| invalid(raw, format!("{} '{}' is not a number", field, value)))?;
    if !(0.0..=100.0).contains(&parsed) {
        return Err(invalid(
            raw,
            format!("{} {} is outside 0..=100", field, parsed),
        ));
    }
    Ok(parsed)
}

fn invalid(raw: &str, reason: String) -> QuoteError {
    QuoteError::InvalidWorkload {
        input: raw.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURVE: &str = "10,20,30,40,50,60,70,80,90,100";

    #[test]
    fn test_parse_baseline_only_matches_default() {
        let parsed = Workload::parse(Some("5")).unwrap();
        assert_eq!(parsed, Workload::default_profile());
        assert_eq!(parsed.periods.len(), 1);
        assert_eq!(parsed.periods[0].duration, 100.0);
        assert_eq!(parsed.periods[0].utilization, 5.0);
    }

    #[test]
    fn test_parse_absent_is_default() {
        assert_eq!(Workload::parse(None).unwrap(), Workload::default_profile());
        assert_eq!(Workload::parse(Some("  ")).unwrap(), Workload::default_profile());
    }

    #[test]
    fn test_parse_full() {
        let parsed = Workload::parse(Some("100")).unwrap();
        assert!(parsed.is_full());
        assert_eq!(parsed, Workload::FULL);
    }

    #[test]
    fn test_parse_periods() {
        let parsed = Workload::parse(Some("50,30@80,70@20")).unwrap();
        assert_eq!(parsed.baseline, 50.0);
        assert_eq!(
            parsed.periods,
            vec![
                WorkloadPeriod { duration: 30.0, utilization: 80.0 },
                WorkloadPeriod { duration: 70.0, utilization: 20.0 },
            ]
        );
    }

    #[test]
    fn test_parse_rejects_bad_shares() {
        let err = Workload::parse(Some("50,30@80,60@20")).unwrap_err();
        assert_eq!(err.code(), "invalid-workload");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Workload::parse(Some("abc")).is_err());
        assert!(Workload::parse(Some("50,30-80")).is_err());
        assert!(Workload::parse(Some("150")).is_err());
    }

    #[test]
    fn test_rounded_baseline() {
        let w = Workload::parse(Some("37")).unwrap();
        assert_eq!(w.rounded_baseline(5.0), 35.0);
        let w = Workload::parse(Some("38")).unwrap();
        assert_eq!(w.rounded_baseline(5.0), 40.0);
    }

    #[test]
    fn test_interpolate_without_curve_is_flat() {
        let w = Workload::parse(Some("20")).unwrap();
        assert_eq!(w.interpolate(42.0, None), 42.0);
    }

    #[test]
    fn test_interpolate_full_ignores_curve() {
        assert_eq!(Workload::FULL.interpolate(42.0, Some(CURVE)), 42.0);
    }

    #[test]
    fn test_interpolate_on_sample() {
        // 20% utilization lands exactly on the third sample
        let w = Workload::parse(Some("20")).unwrap();
        assert!((w.interpolate(200.0, Some(CURVE)) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpolate_between_samples() {
        let w = Workload::parse(Some("25")).unwrap();
        assert!((w.interpolate(200.0, Some(CURVE)) - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpolate_past_last_sample_uses_flat_value() {
        // 95% sits between the last sample (90% -> 100) and v100 (200)
        let w = Workload::parse(Some("50,100@95")).unwrap();
        assert!((w.interpolate(200.0, Some(CURVE)) - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpolate_weights_periods() {
        let w = Workload::parse(Some("50,50@0,50@90")).unwrap();
        // 0.5 * 10 + 0.5 * 100
        assert!((w.interpolate(200.0, Some(CURVE)) - 55.0).abs() < 1e-9);
    }
}
