use std::path::PathBuf;

use chrono::NaiveDate;

use crate::error::ConfigError;

pub const DEFAULT_RECORDS: usize = 1000;
pub const DEFAULT_LEARNERS: u32 = 50;
pub const DEFAULT_RESOURCES: u32 = 5;
pub const DEFAULT_START: NaiveDate = date(2024, 1, 1);
pub const DEFAULT_END: NaiveDate = date(2024, 2, 29);
pub const DEFAULT_OUTPUT: &str = "data/prompt_telemetry_synthetic.csv";
pub const DEFAULT_ENGAGEMENT_SKEW: f64 = 0.6;
/// Relative weights for rubric scores 1 through 5.
pub const DEFAULT_SCORE_WEIGHTS: [f64; 5] = [5.0, 12.0, 28.0, 35.0, 20.0];
pub const DEFAULT_LEARNING_GAIN: f64 = 0.3;
pub const DEFAULT_RECOMMENDATION_AFFINITY: f64 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    pub records: usize,
    pub learners: u32,
    pub resources: u32,
    /// First day of the window, from 00:00:00 UTC.
    pub start: NaiveDate,
    /// Last day of the window, through 23:59:59 UTC.
    pub end: NaiveDate,
    /// `None` draws a seed from entropy.
    pub seed: Option<u64>,
    pub output: PathBuf,
    pub sort_by_time: bool,
    /// Zipf-style exponent over learner and resource pools; `0.0` is uniform.
    pub engagement_skew: f64,
    pub score_weights: [f64; 5],
    /// Chance, scaled by progress through the window, that a dimension score
    /// below the maximum is raised by one.
    pub learning_gain: f64,
    /// Chance that the recommended resource is the one pinned to the weakness.
    pub recommendation_affinity: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            records: DEFAULT_RECORDS,
            learners: DEFAULT_LEARNERS,
            resources: DEFAULT_RESOURCES,
            start: DEFAULT_START,
            end: DEFAULT_END,
            seed: None,
            output: PathBuf::from(DEFAULT_OUTPUT),
            sort_by_time: true,
            engagement_skew: DEFAULT_ENGAGEMENT_SKEW,
            score_weights: DEFAULT_SCORE_WEIGHTS,
            learning_gain: DEFAULT_LEARNING_GAIN,
            recommendation_affinity: DEFAULT_RECOMMENDATION_AFFINITY,
        }
    }
}

impl SynthConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.records == 0 {
            return Err(ConfigError::InvalidRecordCount);
        }
        if self.learners == 0 {
            return Err(ConfigError::EmptyPool("learner"));
        }
        if self.resources == 0 {
            return Err(ConfigError::EmptyPool("resource"));
        }
        if self.end < self.start {
            return Err(ConfigError::InvertedDateRange {
                start: self.start,
                end: self.end,
            });
        }
        if !self.engagement_skew.is_finite() || self.engagement_skew < 0.0 {
            return Err(invalid(
                "engagement_skew",
                format!("{} is not a finite non-negative number", self.engagement_skew),
            ));
        }
        probability("learning_gain", self.learning_gain)?;
        probability("recommendation_affinity", self.recommendation_affinity)?;

        if self
            .score_weights
            .iter()
            .any(|weight| !weight.is_finite() || *weight < 0.0)
        {
            return Err(invalid(
                "score_weights",
                "weights must be finite and non-negative".to_string(),
            ));
        }
        let total: f64 = self.score_weights.iter().sum();
        if !total.is_finite() {
            return Err(invalid(
                "score_weights",
                format!("weights sum to {total}, which is not finite"),
            ));
        }
        if total <= 0.0 {
            return Err(invalid(
                "score_weights",
                "at least one weight must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Converts a loose list of weights (as parsed from the command line).
pub fn score_weights(values: &[f64]) -> Result<[f64; 5], ConfigError> {
    <[f64; 5]>::try_from(values).map_err(|_| {
        invalid(
            "score_weights",
            format!("expected 5 weights for scores 1-5, got {}", values.len()),
        )
    })
}

/// Fails at compile time on an impossible date.
const fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid calendar date"),
    }
}

fn probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(name, format!("{value} is outside 0..=1")))
    }
}

fn invalid(name: &'static str, reason: String) -> ConfigError {
    ConfigError::InvalidParameter { name, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SynthConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.start.to_string(), "2024-01-01");
        assert_eq!(config.end.to_string(), "2024-02-29");
    }

    #[test]
    fn rejects_weights_whose_sum_overflows() {
        let config = SynthConfig {
            score_weights: [1e308; 5],
            ..SynthConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter {
                name: "score_weights",
                ..
            })
        ));
    }

    #[test]
    fn rejects_zero_records() {
        let config = SynthConfig {
            records: 0,
            ..SynthConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRecordCount)
        ));
    }

    #[test]
    fn rejects_empty_pools() {
        let config = SynthConfig {
            resources: 0,
            ..SynthConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyPool("resource"))
        ));
    }

    #[test]
    fn rejects_inverted_range_but_allows_single_day() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let single = SynthConfig {
            start: day,
            end: day,
            ..SynthConfig::default()
        };
        assert!(single.validate().is_ok());

        let inverted = SynthConfig {
            start: day,
            end: day.pred_opt().unwrap(),
            ..SynthConfig::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(ConfigError::InvertedDateRange { .. })
        ));
    }

    #[test]
    fn rejects_bad_distribution_parameters() {
        let negative_skew = SynthConfig {
            engagement_skew: -0.5,
            ..SynthConfig::default()
        };
        assert!(negative_skew.validate().is_err());

        let zero_weights = SynthConfig {
            score_weights: [0.0; 5],
            ..SynthConfig::default()
        };
        assert!(zero_weights.validate().is_err());

        let affinity = SynthConfig {
            recommendation_affinity: 1.5,
            ..SynthConfig::default()
        };
        assert!(matches!(
            affinity.validate(),
            Err(ConfigError::InvalidParameter {
                name: "recommendation_affinity",
                ..
            })
        ));
    }

    #[test]
    fn score_weights_require_five_values() {
        assert_eq!(
            score_weights(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(),
            [1.0, 2.0, 3.0, 4.0, 5.0]
        );
        assert!(score_weights(&[1.0, 2.0]).is_err());
    }
}
