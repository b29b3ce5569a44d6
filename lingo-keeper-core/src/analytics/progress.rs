//! Learning progress reports
//!
//! Summaries over the attempt history for the progress screen: overall
//! totals, per-level coverage, and an accuracy-over-time series.

use super::level::{AttemptLevel, StoryLevelMap};
use crate::types::{percent, JlptLevel, LevelStats, QuizAttempt};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Time window for [`progress_graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPeriod {
    #[default]
    Week,
    Month,
    Year,
}

impl ProgressPeriod {
    pub fn days(&self) -> i64 {
        match self {
            ProgressPeriod::Week => 7,
            ProgressPeriod::Month => 30,
            ProgressPeriod::Year => 365,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressPeriod::Week => "week",
            ProgressPeriod::Month => "month",
            ProgressPeriod::Year => "year",
        }
    }
}

impl std::str::FromStr for ProgressPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "week" => Ok(ProgressPeriod::Week),
            "month" => Ok(ProgressPeriod::Month),
            "year" => Ok(ProgressPeriod::Year),
            other => Err(format!("unknown period: {}", other)),
        }
    }
}

/// Per-level coverage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LevelProgress {
    /// Attempts answered at this level
    pub completed: u32,
    /// Quizzes in the catalog at this level
    pub total: u32,
    /// Percent correct, one decimal
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningProgress {
    pub total_quizzes: u32,
    pub correct_count: u32,
    /// Percent correct, one decimal
    pub accuracy_rate: f64,
    pub level_progress: BTreeMap<JlptLevel, LevelProgress>,
    /// Most recent answer, if any
    pub last_updated: Option<DateTime<Utc>>,
    pub completed_stories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressDataPoint {
    pub date: NaiveDate,
    pub level: JlptLevel,
    /// Percent correct that day, one decimal
    pub accuracy_rate: f64,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressGraph {
    pub period: ProgressPeriod,
    pub data_points: Vec<ProgressDataPoint>,
    /// Levels with at least one data point, easiest first
    pub levels: Vec<JlptLevel>,
}

/// Level an attempt counts toward for reporting. Unmapped stories count as
/// the easiest level; unparsed attempts are left out.
fn report_level(levels: &StoryLevelMap, attempt: &QuizAttempt) -> Option<JlptLevel> {
    match levels.attempt_level(attempt) {
        AttemptLevel::Mapped(level) => Some(level),
        AttemptLevel::Unmapped(_) => Some(JlptLevel::easiest()),
        AttemptLevel::Unparsed => None,
    }
}

fn one_decimal(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = correct as f64 / total as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

pub fn learning_progress(
    attempts: &[QuizAttempt],
    levels: &StoryLevelMap,
    quizzes_by_level: &BTreeMap<JlptLevel, u32>,
    completed_stories: Vec<String>,
) -> LearningProgress {
    let mut stats: BTreeMap<JlptLevel, LevelStats> = JlptLevel::ALL
        .iter()
        .map(|l| (*l, LevelStats::default()))
        .collect();

    let mut overall = LevelStats::default();
    for attempt in attempts {
        overall.record(attempt.is_correct);
        if let Some(level) = report_level(levels, attempt) {
            stats.entry(level).or_default().record(attempt.is_correct);
        }
    }

    let level_progress = stats
        .iter()
        .map(|(level, s)| {
            (
                *level,
                LevelProgress {
                    completed: s.total,
                    total: quizzes_by_level.get(level).copied().unwrap_or(0),
                    accuracy: one_decimal(s.correct, s.total),
                },
            )
        })
        .collect();

    let progress = LearningProgress {
        total_quizzes: overall.total,
        correct_count: overall.correct,
        accuracy_rate: one_decimal(overall.correct, overall.total),
        level_progress,
        last_updated: attempts.iter().map(|a| a.answered_at).max(),
        completed_stories,
    };

    tracing::info!(
        total_quizzes = progress.total_quizzes,
        correct_count = progress.correct_count,
        accuracy_rate = progress.accuracy_rate,
        completed_stories = progress.completed_stories.len(),
        "Learning progress calculated"
    );

    progress
}

/// Daily accuracy per level over the last `period`, ending at `now`.
pub fn progress_graph(
    attempts: &[QuizAttempt],
    levels: &StoryLevelMap,
    period: ProgressPeriod,
    now: DateTime<Utc>,
) -> ProgressGraph {
    let since = now - Duration::days(period.days());

    let mut buckets: BTreeMap<(NaiveDate, JlptLevel), LevelStats> = BTreeMap::new();
    for attempt in attempts {
        if attempt.answered_at < since || attempt.answered_at > now {
            continue;
        }
        if let Some(level) = report_level(levels, attempt) {
            buckets
                .entry((attempt.answered_at.date_naive(), level))
                .or_default()
                .record(attempt.is_correct);
        }
    }

    let data_points: Vec<ProgressDataPoint> = buckets
        .into_iter()
        .map(|((date, level), s)| ProgressDataPoint {
            date,
            level,
            accuracy_rate: one_decimal(s.correct, s.total),
            attempts: s.total,
        })
        .collect();

    let mut with_data: Vec<JlptLevel> = data_points.iter().map(|p| p.level).collect();
    with_data.sort();
    with_data.dedup();

    tracing::debug!(
        period = period.as_str(),
        data_points = data_points.len(),
        "Progress graph generated"
    );

    ProgressGraph {
        period,
        data_points,
        levels: with_data,
    }
}

/// Rounded percent correct over one story's attempts; 0 when none.
pub fn story_quiz_accuracy(attempts: &[QuizAttempt], story_id: &str) -> u8 {
    let mut stats = LevelStats::default();
    for attempt in attempts
        .iter()
        .filter(|a| a.resolved_story_id() == Some(story_id))
    {
        stats.record(attempt.is_correct);
    }
    percent(stats.correct as u64, stats.total as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(quiz_id: &str, correct: bool, when: DateTime<Utc>) -> QuizAttempt {
        let mut a = QuizAttempt::new(quiz_id, None, correct);
        a.answered_at = when;
        a
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_learning_progress_totals() {
        let attempts = vec![
            at("quiz-1-1", true, now()),
            at("quiz-1-2", true, now()),
            at("quiz-5-1", false, now()),
        ];
        let quiz_counts: BTreeMap<JlptLevel, u32> =
            [(JlptLevel::N5, 6), (JlptLevel::N3, 3)].into_iter().collect();

        let progress = learning_progress(
            &attempts,
            &StoryLevelMap::builtin(),
            &quiz_counts,
            vec!["1".to_string()],
        );

        assert_eq!(progress.total_quizzes, 3);
        assert_eq!(progress.correct_count, 2);
        assert_eq!(progress.accuracy_rate, 66.7);
        assert_eq!(
            progress.level_progress[&JlptLevel::N5],
            LevelProgress {
                completed: 2,
                total: 6,
                accuracy: 100.0
            }
        );
        assert_eq!(progress.level_progress[&JlptLevel::N3].accuracy, 0.0);
        assert_eq!(progress.level_progress[&JlptLevel::N1].total, 0);
        assert_eq!(progress.last_updated, Some(now()));
    }

    #[test]
    fn test_learning_progress_empty() {
        let progress =
            learning_progress(&[], &StoryLevelMap::builtin(), &BTreeMap::new(), Vec::new());
        assert_eq!(progress.total_quizzes, 0);
        assert_eq!(progress.accuracy_rate, 0.0);
        assert!(progress.last_updated.is_none());
        assert_eq!(progress.level_progress.len(), 5);
    }

    #[test]
    fn test_progress_graph_groups_by_day_and_level() {
        let day = Duration::days(1);
        let attempts = vec![
            at("quiz-1-1", true, now() - day),
            at("quiz-1-2", false, now() - day),
            at("quiz-1-3", true, now() - day),
            at("quiz-4-1", true, now() - day),
            at("quiz-1-1", true, now()),
            // outside the week
            at("quiz-1-1", false, now() - Duration::days(8)),
        ];

        let graph = progress_graph(
            &attempts,
            &StoryLevelMap::builtin(),
            ProgressPeriod::Week,
            now(),
        );

        assert_eq!(graph.data_points.len(), 3);
        let first = &graph.data_points[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 6, 14).unwrap());
        assert_eq!(first.level, JlptLevel::N5);
        assert_eq!(first.accuracy_rate, 66.7);
        assert_eq!(first.attempts, 3);
        assert_eq!(graph.data_points[1].level, JlptLevel::N4);
        assert_eq!(graph.levels, vec![JlptLevel::N5, JlptLevel::N4]);
    }

    #[test]
    fn test_progress_graph_period_window() {
        let attempts = vec![at("quiz-1-1", true, now() - Duration::days(20))];
        let levels = StoryLevelMap::builtin();

        assert!(progress_graph(&attempts, &levels, ProgressPeriod::Week, now())
            .data_points
            .is_empty());
        assert_eq!(
            progress_graph(&attempts, &levels, ProgressPeriod::Month, now())
                .data_points
                .len(),
            1
        );
    }

    #[test]
    fn test_story_quiz_accuracy() {
        let attempts = vec![
            at("quiz-2-1", true, now()),
            at("quiz-2-2", false, now()),
            at("quiz-2-3", true, now()),
            at("quiz-3-1", false, now()),
        ];
        assert_eq!(story_quiz_accuracy(&attempts, "2"), 67);
        assert_eq!(story_quiz_accuracy(&attempts, "3"), 0);
        assert_eq!(story_quiz_accuracy(&attempts, "9"), 0);
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("month".parse::<ProgressPeriod>().unwrap(), ProgressPeriod::Month);
        assert!("decade".parse::<ProgressPeriod>().is_err());
        assert_eq!(ProgressPeriod::Year.days(), 365);
    }
}
