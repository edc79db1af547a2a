use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{
    InteractionRecord, LearnerId, LearnerSummary, ResourceEngagement, ScoreTrend,
    TelemetrySummary, Weakness, WeaknessSummary,
};

pub fn summarize(records: &[InteractionRecord]) -> TelemetrySummary {
    let learners: HashSet<LearnerId> = records.iter().map(|record| record.learner_id).collect();
    let resources: HashSet<_> = records.iter().map(|record| record.resource_id).collect();
    let total_score: u32 = records
        .iter()
        .map(|record| record.evaluation_score as u32)
        .sum();

    TelemetrySummary {
        events: records.len(),
        learners: learners.len(),
        resources: resources.len(),
        avg_score: mean(total_score, records.len()),
    }
}

pub fn summarize_learners(records: &[InteractionRecord]) -> Vec<LearnerSummary> {
    let mut map: HashMap<LearnerId, (usize, u32, HashSet<_>)> = HashMap::new();

    for record in records {
        let entry = map
            .entry(record.learner_id)
            .or_insert_with(|| (0, 0, HashSet::new()));
        entry.0 += 1;
        entry.1 += record.evaluation_score as u32;
        entry.2.insert(record.resource_id);
    }

    let mut summaries: Vec<LearnerSummary> = map
        .into_iter()
        .map(|(learner_id, (events, total_score, resources))| LearnerSummary {
            learner_id,
            events,
            resources: resources.len(),
            avg_score: mean(total_score, events),
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.events
            .cmp(&a.events)
            .then_with(|| a.learner_id.cmp(&b.learner_id))
    });
    summaries
}

pub fn summarize_weaknesses(records: &[InteractionRecord]) -> Vec<WeaknessSummary> {
    let mut totals = [(0usize, 0u32); 4];
    for record in records {
        let entry = &mut totals[record.primary_weakness.ordinal()];
        entry.0 += 1;
        entry.1 += record.evaluation_score as u32;
    }

    let mut summaries: Vec<WeaknessSummary> = Weakness::ALL
        .into_iter()
        .map(|weakness| {
            let (count, total_score) = totals[weakness.ordinal()];
            WeaknessSummary {
                weakness,
                count,
                avg_score: mean(total_score, count),
            }
        })
        .collect();

    // Stable sort keeps label order among equal counts.
    summaries.sort_by(|a, b| b.count.cmp(&a.count));
    summaries
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub fn weekly_trend(records: &[InteractionRecord]) -> Vec<ScoreTrend> {
    let mut weeks: BTreeMap<NaiveDate, (usize, u32, HashSet<LearnerId>)> = BTreeMap::new();

    for record in records {
        let entry = weeks
            .entry(week_start(record.timestamp_utc.date_naive()))
            .or_insert_with(|| (0, 0, HashSet::new()));
        entry.0 += 1;
        entry.1 += record.evaluation_score as u32;
        entry.2.insert(record.learner_id);
    }

    weeks
        .into_iter()
        .map(|(week_start, (events, total_score, learners))| ScoreTrend {
            week_start,
            events,
            avg_score: mean(total_score, events),
            learner_count: learners.len(),
        })
        .collect()
}

pub fn resource_engagement(records: &[InteractionRecord]) -> Vec<ResourceEngagement> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.resource_id).or_insert(0usize) += 1;
    }

    let mut engagement: Vec<ResourceEngagement> = counts
        .into_iter()
        .map(|(resource_id, events)| ResourceEngagement {
            resource_id,
            events,
        })
        .collect();
    engagement.sort_by(|a, b| b.events.cmp(&a.events));
    engagement
}

/// Coaching lines for the most frequent weakness in `records`.
pub fn recommendations(records: &[InteractionRecord]) -> Vec<String> {
    let Some(top) = summarize_weaknesses(records)
        .into_iter()
        .find(|summary| summary.count > 0)
    else {
        return vec!["No data available for recommendations.".to_string()];
    };

    let mut resource_counts = BTreeMap::new();
    for record in records
        .iter()
        .filter(|record| record.primary_weakness == top.weakness)
    {
        *resource_counts
            .entry(record.recommended_resource_id)
            .or_insert(0usize) += 1;
    }
    // Ties go to the lowest resource id, like a mode over sorted values.
    let resource = resource_counts
        .into_iter()
        .fold(None, |best: Option<(_, usize)>, (resource, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((resource, count)),
        })
        .map(|(resource, _)| resource.to_string())
        .unwrap_or_else(|| "general-review".to_string());

    vec![
        format!("Primary weakness: **{}**", top.weakness),
        format!("Recommended action: review **{resource}** to improve in this area."),
        format!("Tip: {}", top.weakness.tip()),
    ]
}

pub fn build_report(source: &str, learner: Option<LearnerId>, records: &[InteractionRecord]) -> String {
    let scoped: Vec<InteractionRecord> = match learner {
        Some(learner_id) => records
            .iter()
            .filter(|record| record.learner_id == learner_id)
            .cloned()
            .collect(),
        None => records.to_vec(),
    };
    let learner_label = learner
        .map(|learner_id| learner_id.to_string())
        .unwrap_or_else(|| "all learners".to_string());

    let mut output = String::new();
    let _ = writeln!(output, "# Prompt Telemetry Report");
    let _ = writeln!(
        output,
        "Generated for {} from {} ({} events)",
        learner_label,
        source,
        scoped.len()
    );

    let summary = summarize(&scoped);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Total interactions: {}", summary.events);
    let _ = writeln!(output, "- Unique learners: {}", summary.learners);
    let _ = writeln!(output, "- Resources accessed: {}", summary.resources);
    let _ = writeln!(output, "- Average evaluation score: {:.2}", summary.avg_score);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommendations");
    for line in recommendations(&scoped) {
        let _ = writeln!(output, "- {line}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weakness Mix");
    if scoped.is_empty() {
        let _ = writeln!(output, "No events recorded.");
    } else {
        for summary in summarize_weaknesses(&scoped) {
            let _ = writeln!(
                output,
                "- {}: {} events (avg score {:.1})",
                summary.weakness, summary.count, summary.avg_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Score Trend");
    let trend = weekly_trend(&scoped);
    if trend.is_empty() {
        let _ = writeln!(output, "No events recorded.");
    } else {
        for week in trend {
            let _ = writeln!(
                output,
                "- week of {}: {} events from {} learners, avg score {:.2}",
                week.week_start, week.events, week.learner_count, week.avg_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Resource Engagement");
    let engagement = resource_engagement(&scoped);
    if engagement.is_empty() {
        let _ = writeln!(output, "No events recorded.");
    } else {
        for resource in engagement {
            let _ = writeln!(output, "- {}: {} events", resource.resource_id, resource.events);
        }
    }

    if learner.is_none() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Most Active Learners");
        let learners = summarize_learners(&scoped);
        if learners.is_empty() {
            let _ = writeln!(output, "No events recorded.");
        } else {
            for summary in learners.iter().take(10) {
                let _ = writeln!(
                    output,
                    "- {}: {} events across {} resources (avg score {:.2})",
                    summary.learner_id, summary.events, summary.resources, summary.avg_score
                );
            }
        }
    }

    output
}

fn mean(total: u32, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceId;
    use chrono::{TimeZone, Utc};

    fn event(
        day: u32,
        learner: u32,
        resource: u32,
        score: u8,
        weakness: Weakness,
        recommended: u32,
    ) -> InteractionRecord {
        InteractionRecord {
            timestamp_utc: Utc.with_ymd_and_hms(2024, 1, day, 9, 30, 0).unwrap(),
            learner_id: LearnerId(learner),
            resource_id: ResourceId(resource),
            evaluation_score: score,
            primary_weakness: weakness,
            recommended_resource_id: ResourceId(recommended),
        }
    }

    fn sample() -> Vec<InteractionRecord> {
        vec![
            event(1, 1, 1, 4, Weakness::Clarity, 1),
            event(2, 1, 2, 3, Weakness::Clarity, 1),
            event(3, 2, 2, 2, Weakness::Context, 2),
            event(9, 1, 2, 5, Weakness::Clarity, 3),
            event(10, 3, 4, 3, Weakness::Constraints, 3),
        ]
    }

    #[test]
    fn learner_summary_counts_events_resources_and_mean() {
        let summaries = summarize_learners(&sample());
        assert_eq!(summaries.len(), 3);
        let first = &summaries[0];
        assert_eq!(first.learner_id, LearnerId(1));
        assert_eq!(first.events, 3);
        assert_eq!(first.resources, 2);
        assert!((first.avg_score - 4.0).abs() < 1e-9);
        // Single-event learners fall back to id order.
        assert_eq!(summaries[1].learner_id, LearnerId(2));
        assert_eq!(summaries[2].learner_id, LearnerId(3));
    }

    #[test]
    fn weakness_summary_lists_every_label() {
        let summaries = summarize_weaknesses(&sample());
        assert_eq!(summaries.len(), Weakness::ALL.len());
        assert_eq!(summaries[0].weakness, Weakness::Clarity);
        assert_eq!(summaries[0].count, 3);
        let missing = summaries
            .iter()
            .find(|s| s.weakness == Weakness::EvaluationInstructions)
            .unwrap();
        assert_eq!(missing.count, 0);
        assert_eq!(missing.avg_score, 0.0);
    }

    #[test]
    fn weeks_start_on_monday() {
        // 2024-01-01 was a Monday.
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(week_start(monday), monday);
        assert_eq!(week_start(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()), monday);
        assert_eq!(
            week_start(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap()),
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
        );
    }

    #[test]
    fn weekly_trend_groups_by_week_in_order() {
        let trend = weekly_trend(&sample());
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].events, 3);
        assert_eq!(trend[0].learner_count, 2);
        assert!((trend[0].avg_score - 3.0).abs() < 1e-9);
        assert_eq!(trend[1].week_start, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(trend[1].learner_count, 2);
    }

    #[test]
    fn engagement_is_ordered_by_events() {
        let engagement = resource_engagement(&sample());
        assert_eq!(engagement[0].resource_id, ResourceId(2));
        assert_eq!(engagement[0].events, 3);
        assert_eq!(engagement.len(), 3);
    }

    #[test]
    fn recommends_modal_resource_for_top_weakness() {
        let recs = recommendations(&sample());
        assert_eq!(recs.len(), 3);
        assert!(recs[0].contains("clarity"));
        assert!(recs[1].contains("micro-tutor-01"));
        assert!(recs[2].starts_with("Tip: "));
    }

    #[test]
    fn recommendations_handle_empty_input() {
        assert_eq!(
            recommendations(&[]),
            vec!["No data available for recommendations.".to_string()]
        );
    }

    #[test]
    fn report_can_be_scoped_to_one_learner() {
        let report = build_report("telemetry.csv", Some(LearnerId(2)), &sample());
        assert!(report.contains("Generated for L-002 from telemetry.csv (1 events)"));
        assert!(report.contains("- context: 1 events (avg score 2.0)"));
        assert!(!report.contains("## Most Active Learners"));
    }

    #[test]
    fn report_covers_all_sections() {
        let report = build_report("telemetry.csv", None, &sample());
        for heading in [
            "## Recommendations",
            "## Weakness Mix",
            "## Weekly Score Trend",
            "## Resource Engagement",
            "## Most Active Learners",
        ] {
            assert!(report.contains(heading), "missing {heading}");
        }
        assert!(report.contains("- L-001: 3 events across 2 resources (avg score 4.00)"));
    }

    #[test]
    fn summary_counts_headline_numbers() {
        let summary = summarize(&sample());
        assert_eq!(summary.events, 5);
        assert_eq!(summary.learners, 3);
        assert_eq!(summary.resources, 3);
        assert!((summary.avg_score - 3.4).abs() < 1e-9);

        let empty = summarize(&[]);
        assert_eq!(empty.events, 0);
        assert_eq!(empty.avg_score, 0.0);
    }

    #[test]
    fn full_report_opens_with_overall_summary() {
        let report = build_report("telemetry.csv", None, &sample());
        let summary = report.find("## Summary").unwrap();
        assert!(summary < report.find("## Recommendations").unwrap());
        assert!(report.contains("- Total interactions: 5"));
        assert!(report.contains("- Unique learners: 3"));
        assert!(report.contains("- Resources accessed: 3"));
        assert!(report.contains("- Average evaluation score: 3.40"));
    }

    #[test]
    fn scoped_report_summarizes_the_learner() {
        let report = build_report("telemetry.csv", Some(LearnerId(1)), &sample());
        assert!(report.contains("## Summary"));
        assert!(report.contains("- Total interactions: 3"));
        assert!(report.contains("- Unique learners: 1"));
        assert!(report.contains("- Resources accessed: 2"));
        assert!(report.contains("- Average evaluation score: 4.00"));
    }

    #[test]
    fn empty_report_says_so() {
        let report = build_report("telemetry.csv", Some(LearnerId(99)), &sample());
        assert!(report.contains("No data available for recommendations."));
        assert!(report.contains("No events recorded."));
    }
}
