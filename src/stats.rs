use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{StudySession, Topic, TopicStatus};
use crate::scheduler::{is_due, last_confidence};

/// Longest activity window, about ten years.
pub const MAX_ACTIVITY_DAYS: u32 = 3650;

pub const DEFAULT_DAILY_GOAL_SECS: u64 = 120 * 60;
pub const MAX_DAILY_GOAL_MINUTES: u32 = 24 * 60;

// Month and year goals scale the daily goal by fixed day counts
const MONTH_GOAL_DAYS: u64 = 30;
const YEAR_GOAL_DAYS: u64 = 365;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    pub total_topics: usize,
    pub reviewed_topics: usize,
    pub total_reviews: usize,
    pub due_now: usize,
    pub upcoming: usize,
    pub total_time_secs: u64,
    pub avg_confidence: f64,
    pub by_status: StatusCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub new: usize,
    pub to_study: usize,
    pub studying: usize,
    pub studied: usize,
}

impl StatusCounts {
    fn bump(&mut self, status: TopicStatus) {
        match status {
            TopicStatus::New => self.new += 1,
            TopicStatus::ToStudy => self.to_study += 1,
            TopicStatus::Studying => self.studying += 1,
            TopicStatus::Studied => self.studied += 1,
        }
    }
}

pub fn summarize(topics: &[Topic], now: DateTime<Utc>) -> Stats {
    let mut stats = Stats {
        total_topics: topics.len(),
        ..Stats::default()
    };

    let mut confidence_sum = 0u64;
    for topic in topics {
        stats.total_reviews += topic.review_history.len();
        stats.total_time_secs += topic.time_spent;
        stats.by_status.bump(topic.status);

        if is_due(topic, now) {
            stats.due_now += 1;
        } else {
            stats.upcoming += 1;
        }

        if let Some(c) = last_confidence(topic) {
            stats.reviewed_topics += 1;
            confidence_sum += c.value() as u64;
        }
    }

    if stats.reviewed_topics > 0 {
        stats.avg_confidence = confidence_sum as f64 / stats.reviewed_topics as f64;
    }
    stats
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayActivity {
    pub date: NaiveDate,
    pub topics_studied: usize,
    pub reviews: usize,
    pub avg_confidence: f64,
}

/// Per-day activity for the `days` UTC calendar days ending on `today`,
/// oldest first. The window is capped at [`MAX_ACTIVITY_DAYS`] and never
/// reaches before the first representable date.
pub fn daily_activity(topics: &[Topic], today: NaiveDate, days: u32) -> Vec<DayActivity> {
    (0..i64::from(days.min(MAX_ACTIVITY_DAYS)))
        .rev()
        .filter_map(|offset| today.checked_sub_signed(Duration::days(offset)))
        .map(|date| activity_on(topics, date))
        .collect()
}

fn activity_on(topics: &[Topic], date: NaiveDate) -> DayActivity {
    let topics_studied = topics
        .iter()
        .filter(|t| t.last_study_session.is_some_and(|s| s.date_naive() == date))
        .count();

    let mut reviews = 0;
    let mut reviewed_topics = 0;
    let mut confidence_sum = 0u64;
    for topic in topics {
        let mut last_that_day = None;
        for record in topic
            .review_history
            .iter()
            .filter(|r| r.timestamp.date_naive() == date)
        {
            reviews += 1;
            last_that_day = Some(record.confidence);
        }
        if let Some(c) = last_that_day {
            reviewed_topics += 1;
            confidence_sum += c.value() as u64;
        }
    }

    let avg_confidence = if reviewed_topics > 0 {
        confidence_sum as f64 / reviewed_topics as f64
    } else {
        0.0
    };

    DayActivity {
        date,
        topics_studied,
        reviews,
        avg_confidence,
    }
}

/// Study time against the daily goal and its month and year multiples.
/// Percentages stop at 100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GoalProgress {
    pub daily_goal_secs: u64,
    pub monthly_goal_secs: u64,
    pub yearly_goal_secs: u64,
    pub today_secs: u64,
    pub month_secs: u64,
    pub year_secs: u64,
    pub daily_percent: f64,
    pub monthly_percent: f64,
    pub yearly_percent: f64,
}

impl GoalProgress {
    pub fn remaining_today_secs(&self) -> u64 {
        self.daily_goal_secs.saturating_sub(self.today_secs)
    }
}

/// Sums the sessions falling on `today`, in its month and in its year (UTC).
pub fn goal_progress(
    sessions: &[StudySession],
    today: NaiveDate,
    daily_goal_secs: u64,
) -> GoalProgress {
    let mut progress = GoalProgress {
        daily_goal_secs,
        monthly_goal_secs: daily_goal_secs.saturating_mul(MONTH_GOAL_DAYS),
        yearly_goal_secs: daily_goal_secs.saturating_mul(YEAR_GOAL_DAYS),
        ..GoalProgress::default()
    };

    for session in sessions {
        let day = session.studied_at.date_naive();
        if day.year() != today.year() {
            continue;
        }
        progress.year_secs += session.seconds;
        if day.month() == today.month() {
            progress.month_secs += session.seconds;
            if day == today {
                progress.today_secs += session.seconds;
            }
        }
    }

    progress.daily_percent = percent(progress.today_secs, progress.daily_goal_secs);
    progress.monthly_percent = percent(progress.month_secs, progress.monthly_goal_secs);
    progress.yearly_percent = percent(progress.year_secs, progress.yearly_goal_secs);
    progress
}

fn percent(done: u64, goal: u64) -> f64 {
    if goal == 0 {
        return 0.0;
    }
    (done as f64 / goal as f64 * 100.0).min(100.0)
}

pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
