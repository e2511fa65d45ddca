use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Self-reported recall strength after a review, from 1 (no recall) to 5
/// (perfect recall). Out-of-range values are rejected, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Confidence(u8);

impl Confidence {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(Error::InvalidConfidence(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Confidence {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Confidence> for i64 {
    fn from(c: Confidence) -> Self {
        c.0 as i64
    }
}

// Workflow tag set by the user; the scheduler never derives it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicStatus {
    New,
    ToStudy,
    Studying,
    Studied,
}

impl TopicStatus {
    pub const ALL: [TopicStatus; 4] = [
        TopicStatus::New,
        TopicStatus::ToStudy,
        TopicStatus::Studying,
        TopicStatus::Studied,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TopicStatus::New => "new",
            TopicStatus::ToStudy => "to_study",
            TopicStatus::Studying => "studying",
            TopicStatus::Studied => "studied",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        if let Some(status) = Self::ALL.into_iter().find(|st| st.as_str() == s) {
            return Some(status);
        }
        match s.as_str() {
            "tostudy" | "to-study" | "todo" => Some(TopicStatus::ToStudy),
            "doing" => Some(TopicStatus::Studying),
            "done" => Some(TopicStatus::Studied),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::from_str(s).ok_or_else(|| Error::InvalidStatus(s.to_string()))
    }

    pub fn label(&self) -> &'static str {
        match self {
            TopicStatus::New => "New",
            TopicStatus::ToStudy => "To Study",
            TopicStatus::Studying => "Studying",
            TopicStatus::Studied => "Studied",
        }
    }

    /// Next status in board order, wrapping back to `New`.
    pub fn cycle(&self) -> Self {
        match self {
            TopicStatus::New => TopicStatus::ToStudy,
            TopicStatus::ToStudy => TopicStatus::Studying,
            TopicStatus::Studying => TopicStatus::Studied,
            TopicStatus::Studied => TopicStatus::New,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub timestamp: DateTime<Utc>,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub title: String,
    pub description: String,
    pub summary: String,
    pub status: TopicStatus,
    /// Cumulative study time in seconds.
    pub time_spent: u64,
    pub last_study_session: Option<DateTime<Utc>>,
    /// Append-only, oldest first.
    pub review_history: Vec<ReviewRecord>,
    pub next_review_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Topic {
    /// A fresh topic is due immediately: its next review date is its
    /// creation time and its history is empty.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        status: TopicStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            summary: String::new(),
            status,
            time_spent: 0,
            last_study_session: None,
            review_history: Vec::new(),
            next_review_date: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

/// A block of study time. Sessions outlive their topic so goal progress
/// survives deletes; `topic_id` is cleared instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySession {
    pub topic_id: Option<String>,
    pub studied_at: DateTime<Utc>,
    pub seconds: u64,
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
