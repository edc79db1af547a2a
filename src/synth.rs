use chrono::{DateTime, Duration, NaiveTime, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::SynthConfig;
use crate::error::{ConfigError, TelemetryError};
use crate::models::{InteractionRecord, LearnerId, ResourceId, Weakness, MAX_SCORE, MIN_SCORE};
use crate::store;

/// Draws interaction records from fixed learner and resource pools.
#[derive(Debug)]
pub struct Synthesizer {
    learners: Vec<LearnerId>,
    resources: Vec<ResourceId>,
    learner_weights: WeightedIndex<f64>,
    resource_weights: WeightedIndex<f64>,
    score_weights: WeightedIndex<f64>,
    window_start: DateTime<Utc>,
    window_seconds: i64,
    learning_gain: f64,
    recommendation_affinity: f64,
    sort_by_time: bool,
    records: usize,
}

impl Synthesizer {
    pub fn new(config: &SynthConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let learners: Vec<LearnerId> = (1..=config.learners).map(LearnerId).collect();
        let resources: Vec<ResourceId> = (1..=config.resources).map(ResourceId).collect();

        let window_start = config.start.and_time(NaiveTime::MIN).and_utc();
        let window_end = config.end.and_time(NaiveTime::MIN).and_utc() + Duration::days(1)
            - Duration::seconds(1);

        Ok(Self {
            learner_weights: engagement_weights(learners.len(), config.engagement_skew)?,
            resource_weights: engagement_weights(resources.len(), config.engagement_skew)?,
            score_weights: WeightedIndex::new(config.score_weights).map_err(|err| {
                ConfigError::InvalidParameter {
                    name: "score_weights",
                    reason: err.to_string(),
                }
            })?,
            learners,
            resources,
            window_start,
            window_seconds: (window_end - window_start).num_seconds(),
            learning_gain: config.learning_gain,
            recommendation_affinity: config.recommendation_affinity,
            sort_by_time: config.sort_by_time,
            records: config.records,
        })
    }

    pub fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.window_start,
            self.window_start + Duration::seconds(self.window_seconds),
        )
    }

    /// The resource every record with this weakness leans toward.
    pub fn pinned_resource(&self, weakness: Weakness) -> ResourceId {
        self.resources[weakness.ordinal() % self.resources.len()]
    }

    pub fn record<R: Rng + ?Sized>(&self, rng: &mut R) -> InteractionRecord {
        let learner_id = self.learners[self.learner_weights.sample(rng)];
        let resource_id = self.resources[self.resource_weights.sample(rng)];

        let offset = rng.gen_range(0..=self.window_seconds);
        let timestamp_utc = self.window_start + Duration::seconds(offset);
        let progress = offset as f64 / self.window_seconds.max(1) as f64;

        let mut dimensions = [0u8; 4];
        for score in dimensions.iter_mut() {
            *score = MIN_SCORE + self.score_weights.sample(rng) as u8;
            if *score < MAX_SCORE && rng.gen_bool(self.learning_gain * progress) {
                *score += 1;
            }
        }

        let total: u8 = dimensions.iter().sum();
        let evaluation_score = (total + 2) / dimensions.len() as u8;
        let primary_weakness = lowest_dimension(&dimensions, rng);

        let recommended_resource_id = if rng.gen_bool(self.recommendation_affinity) {
            self.pinned_resource(primary_weakness)
        } else {
            self.resources[rng.gen_range(0..self.resources.len())]
        };

        InteractionRecord {
            timestamp_utc,
            learner_id,
            resource_id,
            evaluation_score,
            primary_weakness,
            recommended_resource_id,
        }
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<InteractionRecord> {
        let mut records: Vec<InteractionRecord> =
            (0..self.records).map(|_| self.record(rng)).collect();
        if self.sort_by_time {
            records.sort_by_key(|record| record.timestamp_utc);
        }
        records
    }
}

/// Validates `config`, generates every record and writes the output file.
/// Returns the records that were written.
pub fn synthesize_to_file(config: &SynthConfig) -> Result<Vec<InteractionRecord>, TelemetryError> {
    let synthesizer = Synthesizer::new(config)?;
    let seed = config.seed.unwrap_or_else(rand::random);
    if config.seed.is_none() {
        info!(seed, "no seed configured, drew one from entropy");
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let records = synthesizer.generate(&mut rng);
    let (start, end) = synthesizer.window();
    debug!(
        records = records.len(),
        %start,
        %end,
        "generated telemetry records"
    );

    store::write_records(&config.output, &records)?;
    info!(
        seed,
        records = records.len(),
        path = %config.output.display(),
        "telemetry written"
    );
    Ok(records)
}

fn engagement_weights(len: usize, skew: f64) -> Result<WeightedIndex<f64>, ConfigError> {
    WeightedIndex::new((0..len).map(|rank| 1.0 / ((rank + 1) as f64).powf(skew))).map_err(|err| {
        ConfigError::InvalidParameter {
            name: "engagement_skew",
            reason: err.to_string(),
        }
    })
}

fn lowest_dimension<R: Rng + ?Sized>(dimensions: &[u8; 4], rng: &mut R) -> Weakness {
    let lowest = dimensions.iter().copied().min().unwrap_or(MIN_SCORE);
    let tied: Vec<Weakness> = Weakness::ALL
        .into_iter()
        .filter(|weakness| dimensions[weakness.ordinal()] == lowest)
        .collect();
    match tied.len() {
        0 | 1 => tied.first().copied().unwrap_or(Weakness::Clarity),
        count => tied[rng.gen_range(0..count)],
    }
}
