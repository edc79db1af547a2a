use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

/// Rubric dimension a learner scored lowest on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Weakness {
    Clarity,
    Context,
    Constraints,
    EvaluationInstructions,
}

impl Weakness {
    pub const ALL: [Weakness; 4] = [
        Weakness::Clarity,
        Weakness::Context,
        Weakness::Constraints,
        Weakness::EvaluationInstructions,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Weakness::Clarity => "clarity",
            Weakness::Context => "context",
            Weakness::Constraints => "constraints",
            Weakness::EvaluationInstructions => "evaluation-instructions",
        }
    }

    pub fn ordinal(self) -> usize {
        match self {
            Weakness::Clarity => 0,
            Weakness::Context => 1,
            Weakness::Constraints => 2,
            Weakness::EvaluationInstructions => 3,
        }
    }

    /// Short coaching line shown next to a recommendation.
    pub fn tip(self) -> &'static str {
        match self {
            Weakness::Clarity => "State the task and audience in the first sentence.",
            Weakness::Context => "Ground the prompt in the source material you want used.",
            Weakness::Constraints => "Spell out length, format and scope limits.",
            Weakness::EvaluationInstructions => {
                "Tell the model how its answer will be judged."
            }
        }
    }
}

impl fmt::Display for Weakness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid identifier '{0}'")]
pub struct ParseIdError(String);

macro_rules! pool_id {
    ($name:ident, $prefix:literal, $width:literal) => {
        /// One-based position in a synthetic pool.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{:0", $width, "}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                value
                    .strip_prefix($prefix)
                    .and_then(|digits| digits.parse::<u32>().ok())
                    .filter(|index| *index > 0)
                    .map($name)
                    .ok_or_else(|| ParseIdError(value.to_string()))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

pool_id!(LearnerId, "L-", 3);
pool_id!(ResourceId, "micro-tutor-", 2);

/// RFC 3339 in UTC with whole seconds, e.g. `2024-01-05T13:04:11Z`.
mod utc_seconds {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Column order of this struct is the column order of the CSV file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    #[serde(with = "utc_seconds")]
    pub timestamp_utc: DateTime<Utc>,
    pub learner_id: LearnerId,
    pub resource_id: ResourceId,
    pub evaluation_score: u8,
    pub primary_weakness: Weakness,
    pub recommended_resource_id: ResourceId,
}

impl InteractionRecord {
    pub const COLUMNS: [&'static str; 6] = [
        "timestamp_utc",
        "learner_id",
        "resource_id",
        "evaluation_score",
        "primary_weakness",
        "recommended_resource_id",
    ];

    /// Checks the value domains the typed fields cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&self.evaluation_score) {
            return Err(format!(
                "evaluation_score {} outside {MIN_SCORE}..={MAX_SCORE}",
                self.evaluation_score
            ));
        }
        if self.learner_id.0 == 0 || self.resource_id.0 == 0 || self.recommended_resource_id.0 == 0 {
            return Err("pool identifiers are one-based".to_string());
        }
        Ok(())
    }
}

/// Headline numbers shown at the top of the dashboard.
#[derive(Debug, Clone)]
pub struct TelemetrySummary {
    pub events: usize,
    pub learners: usize,
    pub resources: usize,
    pub avg_score: f64,
}

#[derive(Debug, Clone)]
pub struct LearnerSummary {
    pub learner_id: LearnerId,
    pub events: usize,
    pub resources: usize,
    pub avg_score: f64,
}

#[derive(Debug, Clone)]
pub struct WeaknessSummary {
    pub weakness: Weakness,
    pub count: usize,
    pub avg_score: f64,
}

#[derive(Debug, Clone)]
pub struct ScoreTrend {
    pub week_start: NaiveDate,
    pub events: usize,
    pub avg_score: f64,
    pub learner_count: usize,
}

#[derive(Debug, Clone)]
pub struct ResourceEngagement {
    pub resource_id: ResourceId,
    pub events: usize,
}
