//! Spaced-repetition review scheduling.
//!
//! Every function here is pure: it takes topics by reference plus an explicit
//! `now` and returns new values. Persisting the result is the caller's job,
//! as is serializing concurrent reviews of the same topic.
//!
//! The default curve waits `2^confidence` whole days after a review:
//!
//! | confidence | next review in |
//! |-----------:|---------------:|
//! | 1          | 2 days         |
//! | 2          | 4 days         |
//! | 3          | 8 days         |
//! | 4          | 16 days        |
//! | 5          | 32 days        |
//!
//! This is a coarse exponential backoff, not an ease-factor algorithm such as
//! SM-2. Other curves plug in through [`ReviewPolicy`].

use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::models::{Confidence, ReviewRecord, Topic};

/// Maps a confidence rating to the wait before the next review.
pub trait ReviewPolicy {
    fn interval(&self, confidence: Confidence) -> Duration;
}

/// `2^confidence` days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoublingPolicy;

impl ReviewPolicy for DoublingPolicy {
    fn interval(&self, confidence: Confidence) -> Duration {
        Duration::days(1_i64 << confidence.value())
    }
}

pub const DEFAULT_POLICY: DoublingPolicy = DoublingPolicy;

/// Append a review to `topic` and reschedule it using [`DEFAULT_POLICY`].
pub fn record_review(topic: &Topic, confidence: i64, now: DateTime<Utc>) -> Result<Topic> {
    record_review_with(&DEFAULT_POLICY, topic, confidence, now)
}

/// Append a review to `topic` and reschedule it from `now`.
///
/// The next review date is computed from the submission time, not from the
/// previously scheduled date, so a late review does not inherit the delay.
/// An invalid confidence returns `InvalidConfidence` and `topic` is left as is.
pub fn record_review_with<P: ReviewPolicy + ?Sized>(
    policy: &P,
    topic: &Topic,
    confidence: i64,
    now: DateTime<Utc>,
) -> Result<Topic> {
    let confidence = Confidence::new(confidence)?;

    let mut reviewed = topic.clone();
    reviewed.review_history.push(ReviewRecord {
        timestamp: now,
        confidence,
    });
    reviewed.next_review_date = Some(now + policy.interval(confidence));
    reviewed.updated_at = now;

    Ok(reviewed)
}

/// Never-reviewed topics are always due.
pub fn is_due(topic: &Topic, now: DateTime<Utc>) -> bool {
    if topic.review_history.is_empty() {
        return true;
    }
    topic.next_review_date.is_some_and(|next| next <= now)
}

/// Due topics, most urgent first. Topics without a next review date lead;
/// equal dates keep their input order.
pub fn select_due_topics(topics: &[Topic], now: DateTime<Utc>) -> Vec<&Topic> {
    let mut due: Vec<&Topic> = topics.iter().filter(|t| is_due(t, now)).collect();
    // Option orders None before Some; sort_by_key is stable
    due.sort_by_key(|t| t.next_review_date);
    due
}

pub fn last_confidence(topic: &Topic) -> Option<Confidence> {
    topic.review_history.last().map(|r| r.confidence)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    Weak,
    Moderate,
    Strong,
}

pub fn confidence_band(confidence: Confidence) -> ConfidenceBand {
    match confidence.value() {
        4..=u8::MAX => ConfidenceBand::Strong,
        2..=3 => ConfidenceBand::Moderate,
        _ => ConfidenceBand::Weak,
    }
}
