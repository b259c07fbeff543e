// File: reducer.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, ReduceError};
use crate::timing::{ClassSeries, SignalSeries};

/// What `derive` does with a record whose rounded total is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroTotalPolicy {
    /// Fail with `ReduceError::Division` naming the trial.
    #[default]
    Reject,
    /// Use a signal of 1.0 for that trial. Rounding never lifts the first
    /// byte above the total, so both stages were below resolution.
    Saturate,
}

impl FromStr for ZeroTotalPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(ZeroTotalPolicy::Reject),
            "saturate" => Ok(ZeroTotalPolicy::Saturate),
            other => Err(ConfigError::ZeroTotalPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for ZeroTotalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroTotalPolicy::Reject => write!(f, "reject"),
            ZeroTotalPolicy::Saturate => write!(f, "saturate"),
        }
    }
}

/// Maps each record to `time_to_first_byte / total`, keeping trial order.
pub fn derive(series: &ClassSeries, policy: ZeroTotalPolicy) -> Result<SignalSeries, ReduceError> {
    let values = series
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| {
            if record.total > 0.0 {
                Ok(record.time_to_first_byte / record.total)
            } else {
                match policy {
                    ZeroTotalPolicy::Reject => Err(ReduceError::Division { trial: index + 1 }),
                    ZeroTotalPolicy::Saturate => Ok(1.0),
                }
            }
        })
        .collect::<Result<Vec<f64>, ReduceError>>()?;

    Ok(SignalSeries::new(series.class(), values))
}

pub fn summarize(signals: &SignalSeries) -> Result<f64, ReduceError> {
    mean(signals.values())
}

fn mean(values: &[f64]) -> Result<f64, ReduceError> {
    if values.is_empty() {
        return Err(ReduceError::EmptySeries);
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl ClassSummary {
    fn variance(&self) -> f64 {
        self.std_dev * self.std_dev
    }
}

pub fn describe(signals: &SignalSeries) -> Result<ClassSummary, ReduceError> {
    let values = signals.values();
    let mean = mean(values)?;
    let count = values.len();

    let std_dev = if count < 2 {
        0.0
    } else {
        let sum_sq = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
        (sum_sq / (count - 1) as f64).sqrt()
    };

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok(ClassSummary {
        count,
        mean,
        std_dev,
        min,
        max,
    })
}

/// Two-sample comparison of the valid and invalid signal series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub valid: ClassSummary,
    pub invalid: ClassSummary,
    /// valid mean minus invalid mean
    pub difference: f64,
    pub welch_t: f64,
    pub threshold: f64,
    /// Both classes are constant, so `welch_t` is undefined and left at 0.
    /// The verdict then rests on the difference alone.
    pub zero_variance: bool,
    pub leak_suspected: bool,
}

impl Comparison {
    pub fn welch_label(&self) -> String {
        if self.zero_variance {
            "n/a (no variance)".to_string()
        } else {
            format!("{:.2}", self.welch_t)
        }
    }
}

pub fn compare(
    valid: &SignalSeries,
    invalid: &SignalSeries,
    threshold: f64,
) -> Result<Comparison, ReduceError> {
    if valid.len() != invalid.len() {
        return Err(ReduceError::LengthMismatch {
            valid: valid.len(),
            invalid: invalid.len(),
        });
    }

    let valid = describe(valid)?;
    let invalid = describe(invalid)?;
    let difference = valid.mean - invalid.mean;

    let (welch_t, zero_variance) = match welch_statistic(&valid, &invalid) {
        WelchT::Undersampled => (0.0, false),
        WelchT::ZeroVariance => (0.0, true),
        WelchT::Value(t) => (t, false),
    };
    let leak_suspected = if zero_variance {
        difference.abs() > MIN_SEPARATION
    } else {
        welch_t.abs() > threshold
    };

    Ok(Comparison {
        difference,
        welch_t,
        threshold,
        zero_variance,
        leak_suspected,
        valid,
        invalid,
    })
}

const MIN_SEPARATION: f64 = 1e-12;

enum WelchT {
    Undersampled,
    ZeroVariance,
    Value(f64),
}

fn welch_statistic(a: &ClassSummary, b: &ClassSummary) -> WelchT {
    if a.count < 2 || b.count < 2 {
        return WelchT::Undersampled;
    }

    let stderr = (a.variance() / a.count as f64 + b.variance() / b.count as f64).sqrt();
    if stderr < MIN_SEPARATION {
        return WelchT::ZeroVariance;
    }

    WelchT::Value((a.mean - b.mean) / stderr)
}

/// Log lines for the end of a run, means rounded to `precision`.
pub fn summary_lines(comparison: &Comparison, precision: u32) -> Vec<String> {
    let p = precision as usize;
    vec![
        format!(
            "Valid login response average: {:.p$} (sd {:.p$}, n={})",
            comparison.valid.mean, comparison.valid.std_dev, comparison.valid.count
        ),
        format!(
            "Invalid login response average: {:.p$} (sd {:.p$}, n={})",
            comparison.invalid.mean, comparison.invalid.std_dev, comparison.invalid.count
        ),
        format!(
            "Difference: {:.p$}, Welch t = {} (threshold {:.2}): {}",
            comparison.difference,
            comparison.welch_label(),
            comparison.threshold,
            if comparison.leak_suspected {
                "timing difference detected, usernames may be enumerable"
            } else {
                "no significant timing difference"
            }
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::{Class, TimingRecord};
    use rstest::rstest;

    fn record(ttfb: f64, total: f64) -> TimingRecord {
        TimingRecord {
            dns_lookup: 0.0,
            tcp_connect: 0.0,
            app_connect: 0.0,
            time_to_first_byte: ttfb,
            total,
        }
    }

    fn series(class: Class, pairs: &[(f64, f64)]) -> ClassSeries {
        let mut series = ClassSeries::new(class);
        for (ttfb, total) in pairs {
            series.push(record(*ttfb, *total));
        }
        series
    }

    #[test]
    fn test_derive_ratio_per_record() {
        let input = series(Class::Valid, &[(0.08, 0.1), (0.05, 0.1), (0.2, 0.4)]);
        let signals = derive(&input, ZeroTotalPolicy::Reject).unwrap();
        assert_eq!(signals.class(), Class::Valid);
        assert_eq!(signals.len(), 3);
        assert!((signals.values()[0] - 0.8).abs() < 1e-12);
        assert!((signals.values()[1] - 0.5).abs() < 1e-12);
        assert!((signals.values()[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_derive_zero_total_rejected() {
        let input = series(Class::Invalid, &[(0.01, 0.02), (0.0, 0.0), (0.01, 0.02)]);
        let result = derive(&input, ZeroTotalPolicy::Reject);
        assert_eq!(result, Err(ReduceError::Division { trial: 2 }));
    }

    #[test]
    fn test_derive_zero_total_saturates() {
        let input = series(Class::Invalid, &[(0.01, 0.02), (0.0, 0.0), (0.01, 0.02)]);
        let signals = derive(&input, ZeroTotalPolicy::Saturate).unwrap();
        assert_eq!(signals.len(), input.len());
        assert_eq!(signals.values()[1], 1.0);
        assert!((signals.values()[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_summarize_mean() {
        let signals = SignalSeries::new(Class::Valid, vec![0.2, 0.4, 0.6]);
        assert!((summarize(&signals).unwrap() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_summarize_single_value() {
        let signals = SignalSeries::new(Class::Valid, vec![0.37]);
        assert_eq!(summarize(&signals).unwrap(), 0.37);
    }

    #[test]
    fn test_summarize_empty() {
        let signals = SignalSeries::new(Class::Valid, vec![]);
        assert_eq!(summarize(&signals), Err(ReduceError::EmptySeries));
    }

    #[test]
    fn test_describe() {
        let signals = SignalSeries::new(Class::Valid, vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let summary = describe(&signals).unwrap();
        assert_eq!(summary.count, 8);
        assert!((summary.mean - 5.0).abs() < 1e-12);
        assert!((summary.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 9.0);
    }

    #[test]
    fn test_describe_single_sample_has_zero_spread() {
        let summary = describe(&SignalSeries::new(Class::Invalid, vec![0.3])).unwrap();
        assert_eq!(summary.std_dev, 0.0);
        assert_eq!(summary.min, 0.3);
        assert_eq!(summary.max, 0.3);
    }

    #[test]
    fn test_compare_detects_separated_classes() {
        let valid = SignalSeries::new(Class::Valid, vec![0.80, 0.82, 0.79, 0.81, 0.80]);
        let invalid = SignalSeries::new(Class::Invalid, vec![0.20, 0.22, 0.19, 0.21, 0.20]);
        let comparison = compare(&valid, &invalid, 4.5).unwrap();
        assert!((comparison.difference - 0.6).abs() < 1e-9);
        assert!(comparison.welch_t > 4.5);
        assert!(comparison.leak_suspected);
    }

    #[test]
    fn test_compare_overlapping_classes() {
        let valid = SignalSeries::new(Class::Valid, vec![0.5, 0.6, 0.4, 0.5]);
        let invalid = SignalSeries::new(Class::Invalid, vec![0.6, 0.4, 0.5, 0.5]);
        let comparison = compare(&valid, &invalid, 4.5).unwrap();
        assert!(comparison.welch_t.abs() < 1e-9);
        assert!(!comparison.leak_suspected);
    }

    #[test]
    fn test_compare_constant_separated_series_is_leak() {
        let valid = SignalSeries::new(Class::Valid, vec![0.8; 5]);
        let invalid = SignalSeries::new(Class::Invalid, vec![0.2; 5]);
        let comparison = compare(&valid, &invalid, 4.5).unwrap();
        assert_eq!(comparison.welch_t, 0.0);
        assert!(comparison.welch_t.is_finite());
        assert!(comparison.zero_variance);
        assert!(comparison.leak_suspected);
        assert!(summary_lines(&comparison, 3)[2].contains("Welch t = n/a"));
    }

    #[test]
    fn test_compare_identical_constant_series_is_not_leak() {
        let valid = SignalSeries::new(Class::Valid, vec![0.5; 4]);
        let invalid = SignalSeries::new(Class::Invalid, vec![0.5; 4]);
        let comparison = compare(&valid, &invalid, 4.5).unwrap();
        assert!(comparison.zero_variance);
        assert!(!comparison.leak_suspected);
    }

    #[test]
    fn test_compare_single_sample_gives_no_verdict() {
        let valid = SignalSeries::new(Class::Valid, vec![0.8]);
        let invalid = SignalSeries::new(Class::Invalid, vec![0.2]);
        let comparison = compare(&valid, &invalid, 4.5).unwrap();
        assert!(!comparison.zero_variance);
        assert!(!comparison.leak_suspected);
    }

    #[test]
    fn test_compare_length_mismatch() {
        let valid = SignalSeries::new(Class::Valid, vec![0.5, 0.6]);
        let invalid = SignalSeries::new(Class::Invalid, vec![0.5]);
        assert_eq!(
            compare(&valid, &invalid, 4.5),
            Err(ReduceError::LengthMismatch { valid: 2, invalid: 1 })
        );
    }

    #[test]
    fn test_summary_lines_use_precision() {
        let valid = SignalSeries::new(Class::Valid, vec![0.8; 3]);
        let invalid = SignalSeries::new(Class::Invalid, vec![0.2; 3]);
        let comparison = compare(&valid, &invalid, 4.5).unwrap();

        let lines = summary_lines(&comparison, 3);
        assert!(lines[0].starts_with("Valid login response average: 0.800"));
        assert!(lines[1].starts_with("Invalid login response average: 0.200"));
        assert!(lines[2].contains("Difference: 0.600"));

        let lines = summary_lines(&comparison, 1);
        assert!(lines[0].starts_with("Valid login response average: 0.8 "));
    }

    #[rstest]
    #[case("reject", ZeroTotalPolicy::Reject)]
    #[case("Saturate", ZeroTotalPolicy::Saturate)]
    fn test_policy_from_str(#[case] input: &str, #[case] expected: ZeroTotalPolicy) {
        assert_eq!(input.parse::<ZeroTotalPolicy>().unwrap(), expected);
    }

    #[test]
    fn test_policy_from_str_unknown() {
        assert!("drop".parse::<ZeroTotalPolicy>().is_err());
    }
}
