use chrono::{DateTime, Datelike, SecondsFormat, TimeZone, Utc};
use rusqlite::{
    params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{Confidence, ReviewRecord, StudySession, Topic, TopicStatus};
use crate::scheduler;
use crate::stats::{self, GoalProgress};

const TOPIC_COLUMNS: &str = "id, title, description, summary, status, time_spent, \
     last_study_session, next_review_date, created_at, updated_at";

const DAILY_GOAL_KEY: &str = "daily_goal_secs";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS topics (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                summary TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'new' CHECK(status IN ('new', 'to_study', 'studying', 'studied')),
                time_spent INTEGER NOT NULL DEFAULT 0 CHECK(time_spent >= 0),
                last_study_session TEXT,
                next_review_date TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Append-only; rowid order is chronological order
            CREATE TABLE IF NOT EXISTS review_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic_id TEXT NOT NULL,
                reviewed_at TEXT NOT NULL,
                confidence INTEGER NOT NULL CHECK(confidence BETWEEN 1 AND 5),
                FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
            );

            -- Kept when the topic goes so goal progress does not shrink
            CREATE TABLE IF NOT EXISTS study_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic_id TEXT,
                studied_at TEXT NOT NULL,
                seconds INTEGER NOT NULL CHECK(seconds >= 0),
                FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_topics_next_review ON topics(next_review_date);
            CREATE INDEX IF NOT EXISTS idx_topics_status ON topics(status);
            CREATE INDEX IF NOT EXISTS idx_review_history_topic ON review_history(topic_id);
            CREATE INDEX IF NOT EXISTS idx_study_sessions_at ON study_sessions(studied_at);
            "#,
        )?;
        debug!("schema ready");
        Ok(())
    }

    // Holds the write lock from the first read; other writers wait on the
    // busy timeout
    fn begin_write(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    // Topic operations
    pub fn add_topic(
        &self,
        title: &str,
        description: &str,
        status: TopicStatus,
        now: DateTime<Utc>,
    ) -> Result<Topic> {
        let topic = Topic::new(title, description, status, now);
        self.insert_topic(&topic)?;
        info!(topic_id = %topic.id, title, "added topic");
        Ok(topic)
    }

    fn insert_topic(&self, topic: &Topic) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO topics (id, title, description, summary, status, time_spent,
                                last_study_session, next_review_date, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                topic.id,
                topic.title,
                topic.description,
                topic.summary,
                topic.status.as_str(),
                to_db_seconds(topic.time_spent)?,
                topic.last_study_session.as_ref().map(format_time),
                topic.next_review_date.as_ref().map(format_time),
                format_time(&topic.created_at),
                format_time(&topic.updated_at),
            ],
        )?;
        for record in &topic.review_history {
            self.insert_review(&topic.id, record)?;
        }
        Ok(())
    }

    pub fn get_topic(&self, id: &str) -> Result<Option<Topic>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM topics WHERE id = ?1", TOPIC_COLUMNS),
                params![id],
                TopicRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => {
                let history = self.load_history(&row.id)?;
                Ok(Some(row.into_topic(history)?))
            }
            None => Ok(None),
        }
    }

    pub fn require_topic(&self, id: &str) -> Result<Topic> {
        self.get_topic(id)?
            .ok_or_else(|| Error::TopicNotFound(id.to_string()))
    }

    /// Accepts a full id or any unique prefix of one.
    pub fn resolve_id(&self, id_or_prefix: &str) -> Result<String> {
        if id_or_prefix.is_empty() {
            return Err(Error::TopicNotFound(String::new()));
        }
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM topics WHERE substr(id, 1, length(?1)) = ?1 LIMIT 2")?;
        let matches = stmt
            .query_map(params![id_or_prefix], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        match matches.as_slice() {
            [] => Err(Error::TopicNotFound(id_or_prefix.to_string())),
            [id] => Ok(id.clone()),
            _ => Err(Error::AmbiguousId(id_or_prefix.to_string())),
        }
    }

    pub fn list_topics(&self, status_filter: Option<TopicStatus>) -> Result<Vec<Topic>> {
        let rows: Vec<TopicRow> = if let Some(status) = status_filter {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {} FROM topics WHERE status = ?1 ORDER BY created_at, rowid",
                TOPIC_COLUMNS
            ))?;
            let rows = stmt.query_map(params![status.as_str()], TopicRow::from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {} FROM topics ORDER BY created_at, rowid",
                TOPIC_COLUMNS
            ))?;
            let rows = stmt.query_map([], TopicRow::from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        rows.into_iter()
            .map(|row| {
                let history = self.load_history(&row.id)?;
                row.into_topic(history)
            })
            .collect()
    }

    pub fn delete_topic(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM topics WHERE id = ?1", params![id])?;
        if rows > 0 {
            info!(topic_id = %id, "deleted topic");
        }
        Ok(rows > 0)
    }

    pub fn update_status(&self, id: &str, status: TopicStatus, now: DateTime<Utc>) -> Result<Topic> {
        let rows = self.conn.execute(
            "UPDATE topics SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), format_time(&now), id],
        )?;
        debug!(topic_id = %id, status = status.as_str(), "updated status");
        self.updated_topic(id, rows)
    }

    pub fn update_summary(&self, id: &str, summary: &str, now: DateTime<Utc>) -> Result<Topic> {
        let rows = self.conn.execute(
            "UPDATE topics SET summary = ?1, updated_at = ?2 WHERE id = ?3",
            params![summary, format_time(&now), id],
        )?;
        self.updated_topic(id, rows)
    }

    pub fn update_description(
        &self,
        id: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<Topic> {
        let rows = self.conn.execute(
            "UPDATE topics SET description = ?1, updated_at = ?2 WHERE id = ?3",
            params![description, format_time(&now), id],
        )?;
        self.updated_topic(id, rows)
    }

    /// Time only ever accumulates; there is no way to subtract. Non-zero
    /// blocks are also logged as a study session for goal tracking.
    pub fn add_time(&self, id: &str, seconds: u64, now: DateTime<Utc>) -> Result<Topic> {
        let stamp = format_time(&now);
        let db_seconds = to_db_seconds(seconds)?;

        let tx = self.begin_write()?;
        let rows = tx.execute(
            r#"
            UPDATE topics
            SET time_spent = time_spent + ?1,
                last_study_session = ?2,
                updated_at = ?2
            WHERE id = ?3
            "#,
            params![db_seconds, stamp, id],
        )?;
        if rows == 0 {
            return Err(Error::TopicNotFound(id.to_string()));
        }
        if seconds > 0 {
            tx.execute(
                "INSERT INTO study_sessions (topic_id, studied_at, seconds) VALUES (?1, ?2, ?3)",
                params![id, stamp, db_seconds],
            )?;
        }
        tx.commit()?;

        debug!(topic_id = %id, seconds, "added study time");
        self.require_topic(id)
    }

    /// Sessions logged at or after `since`, oldest first.
    pub fn study_sessions_since(&self, since: DateTime<Utc>) -> Result<Vec<StudySession>> {
        let mut stmt = self.conn.prepare(
            "SELECT topic_id, studied_at, seconds FROM study_sessions \
             WHERE studied_at >= ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![format_time(&since)], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(topic_id, studied_at, seconds)| {
                Ok(StudySession {
                    topic_id,
                    studied_at: parse_time(&studied_at)?,
                    seconds: seconds.max(0) as u64,
                })
            })
            .collect()
    }

    // Goal settings

    pub fn daily_goal_secs(&self) -> Result<u64> {
        let value: Option<i64> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![DAILY_GOAL_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.map_or(stats::DEFAULT_DAILY_GOAL_SECS, |v| v.max(0) as u64))
    }

    pub fn set_daily_goal(&self, minutes: u32) -> Result<u64> {
        if minutes == 0 || minutes > stats::MAX_DAILY_GOAL_MINUTES {
            return Err(Error::InvalidGoal(minutes));
        }
        let secs = u64::from(minutes) * 60;
        self.conn.execute(
            r#"
            INSERT INTO settings (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![DAILY_GOAL_KEY, to_db_seconds(secs)?],
        )?;
        info!(minutes, "set daily goal");
        Ok(secs)
    }

    pub fn reset_daily_goal(&self) -> Result<u64> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?1", params![DAILY_GOAL_KEY])?;
        info!("reset daily goal");
        Ok(stats::DEFAULT_DAILY_GOAL_SECS)
    }

    /// Progress toward the daily goal for the UTC day, month and year of `now`.
    pub fn goal_progress(&self, now: DateTime<Utc>) -> Result<GoalProgress> {
        let today = now.date_naive();
        let year_start = today
            .with_ordinal(1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Utc.from_utc_datetime(&dt));
        let sessions = match year_start {
            Some(start) => self.study_sessions_since(start)?,
            None => Vec::new(),
        };
        Ok(stats::goal_progress(&sessions, today, self.daily_goal_secs()?))
    }

    fn updated_topic(&self, id: &str, rows: usize) -> Result<Topic> {
        if rows == 0 {
            return Err(Error::TopicNotFound(id.to_string()));
        }
        self.require_topic(id)
    }

    // Review operations

    /// Record a review and persist the rescheduled topic.
    ///
    /// The current topic is re-read and written back inside one write
    /// transaction, so two submissions for the same topic run one after the
    /// other and never drop each other's history row. Only the newly
    /// appended record is inserted.
    pub fn record_review(&self, id: &str, confidence: i64, now: DateTime<Utc>) -> Result<Topic> {
        Confidence::new(confidence)?;

        let tx = self.begin_write()?;
        let current = self.require_topic(id)?;
        let reviewed = scheduler::record_review(&current, confidence, now)?;

        for record in &reviewed.review_history[current.review_history.len()..] {
            self.insert_review(id, record)?;
        }
        tx.execute(
            "UPDATE topics SET next_review_date = ?1, updated_at = ?2 WHERE id = ?3",
            params![
                reviewed.next_review_date.as_ref().map(format_time),
                format_time(&reviewed.updated_at),
                id
            ],
        )?;
        tx.commit()?;

        info!(
            topic_id = %id,
            confidence,
            next_review = ?reviewed.next_review_date,
            "recorded review"
        );
        Ok(reviewed)
    }

    fn insert_review(&self, topic_id: &str, record: &ReviewRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO review_history (topic_id, reviewed_at, confidence) VALUES (?1, ?2, ?3)",
            params![
                topic_id,
                format_time(&record.timestamp),
                i64::from(record.confidence)
            ],
        )?;
        Ok(())
    }

    fn load_history(&self, topic_id: &str) -> Result<Vec<ReviewRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT reviewed_at, confidence FROM review_history WHERE topic_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![topic_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(reviewed_at, confidence)| {
                Ok(ReviewRecord {
                    timestamp: parse_time(&reviewed_at)?,
                    confidence: Confidence::new(confidence)?,
                })
            })
            .collect()
    }

    // Due-list queries are snapshots at `now`
    pub fn due_topics(&self, now: DateTime<Utc>) -> Result<Vec<Topic>> {
        let topics = self.list_topics(None)?;
        Ok(scheduler::select_due_topics(&topics, now)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn next_due_topic(&self, now: DateTime<Utc>) -> Result<Option<Topic>> {
        Ok(self.due_topics(now)?.into_iter().next())
    }
}

// Raw column values; timestamp parsing happens outside the row closure so
// that corrupt values surface as crate errors
struct TopicRow {
    id: String,
    title: String,
    description: String,
    summary: String,
    status: String,
    time_spent: i64,
    last_study_session: Option<String>,
    next_review_date: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TopicRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            summary: row.get(3)?,
            status: row.get(4)?,
            time_spent: row.get(5)?,
            last_study_session: row.get(6)?,
            next_review_date: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_topic(self, review_history: Vec<ReviewRecord>) -> Result<Topic> {
        Ok(Topic {
            status: TopicStatus::parse(&self.status)?,
            time_spent: self.time_spent.max(0) as u64,
            last_study_session: self.last_study_session.as_deref().map(parse_time).transpose()?,
            next_review_date: self.next_review_date.as_deref().map(parse_time).transpose()?,
            created_at: parse_time(&self.created_at)?,
            updated_at: parse_time(&self.updated_at)?,
            id: self.id,
            title: self.title,
            description: self.description,
            summary: self.summary,
            review_history,
        })
    }
}

// Fixed-width RFC 3339 in UTC sorts lexicographically in time order
fn format_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::Timestamp(s.to_string()))
}

fn to_db_seconds(seconds: u64) -> Result<i64> {
    i64::try_from(seconds)
        .map_err(|e| Error::Database(rusqlite::Error::ToSqlConversionFailure(Box::new(e))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn setup_db() -> Database {
        let db = Database::open(":memory:").expect("Failed to create in-memory database");
        db.init().expect("Failed to initialize database");
        db
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap()
    }

    fn add(db: &Database, title: &str) -> Topic {
        db.add_topic(title, "", TopicStatus::New, t0()).unwrap()
    }

    fn history_rows(db: &Database, id: &str) -> i64 {
        db.conn
            .query_row(
                "SELECT COUNT(*) FROM review_history WHERE topic_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .unwrap()
    }

    mod init_tests {
        use super::*;

        #[test]
        fn init_creates_tables() {
            let db = setup_db();
            let topics: i64 = db
                .conn
                .query_row("SELECT COUNT(*) FROM topics", [], |row| row.get(0))
                .expect("topics table should exist");
            assert_eq!(topics, 0);

            let history: i64 = db
                .conn
                .query_row("SELECT COUNT(*) FROM review_history", [], |row| row.get(0))
                .expect("review_history table should exist");
            assert_eq!(history, 0);

            for table in ["study_sessions", "settings"] {
                let count: i64 = db
                    .conn
                    .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get(0)
                    })
                    .expect("table should exist");
                assert_eq!(count, 0);
            }
        }

        #[test]
        fn init_is_idempotent() {
            let db = setup_db();
            add(&db, "Test");

            db.init().expect("Re-init should succeed");

            let topics = db.list_topics(None).unwrap();
            assert_eq!(topics.len(), 1);
        }

        #[test]
        fn schema_rejects_out_of_range_confidence() {
            let db = setup_db();
            let topic = add(&db, "Test");
            let result = db.conn.execute(
                "INSERT INTO review_history (topic_id, reviewed_at, confidence) VALUES (?1, ?2, 9)",
                params![topic.id, format_time(&t0())],
            );
            assert!(result.is_err());
        }
    }

    mod topic_tests {
        use super::*;

        #[test]
        fn add_topic_round_trips() {
            let db = setup_db();
            let added = db
                .add_topic("Lifetimes", "Variance and elision", TopicStatus::ToStudy, t0())
                .unwrap();

            let loaded = db.get_topic(&added.id).unwrap().unwrap();
            assert_eq!(loaded, added);
            assert_eq!(loaded.status, TopicStatus::ToStudy);
            assert_eq!(loaded.next_review_date, Some(t0()));
        }

        #[test]
        fn get_topic_not_found() {
            let db = setup_db();
            assert!(db.get_topic("missing").unwrap().is_none());
            assert!(matches!(
                db.require_topic("missing"),
                Err(Error::TopicNotFound(_))
            ));
        }

        #[test]
        fn list_topics_in_creation_order() {
            let db = setup_db();
            for (i, title) in ["Zebra", "Alpha", "Middle"].into_iter().enumerate() {
                db.add_topic(title, "", TopicStatus::New, t0() + Duration::minutes(i as i64))
                    .unwrap();
            }

            let titles: Vec<String> = db
                .list_topics(None)
                .unwrap()
                .into_iter()
                .map(|t| t.title)
                .collect();
            assert_eq!(titles, vec!["Zebra", "Alpha", "Middle"]);
        }

        #[test]
        fn list_topics_filter_by_status() {
            let db = setup_db();
            db.add_topic("A", "", TopicStatus::Studying, t0()).unwrap();
            db.add_topic("B", "", TopicStatus::New, t0()).unwrap();
            db.add_topic("C", "", TopicStatus::Studying, t0()).unwrap();

            assert_eq!(db.list_topics(Some(TopicStatus::Studying)).unwrap().len(), 2);
            assert_eq!(db.list_topics(Some(TopicStatus::New)).unwrap().len(), 1);
            assert!(db.list_topics(Some(TopicStatus::Studied)).unwrap().is_empty());
        }

        #[test]
        fn delete_topic_success() {
            let db = setup_db();
            let topic = add(&db, "To Delete");

            assert!(db.delete_topic(&topic.id).unwrap());
            assert!(db.get_topic(&topic.id).unwrap().is_none());
        }

        #[test]
        fn delete_topic_not_found() {
            let db = setup_db();
            assert!(!db.delete_topic("missing").unwrap());
        }

        #[test]
        fn delete_topic_cascades_history() {
            let db = setup_db();
            let topic = add(&db, "Test");
            db.record_review(&topic.id, 3, t0()).unwrap();
            assert_eq!(history_rows(&db, &topic.id), 1);

            db.delete_topic(&topic.id).unwrap();
            assert_eq!(history_rows(&db, &topic.id), 0);
        }

        #[test]
        fn update_status_refreshes_updated_at() {
            let db = setup_db();
            let topic = add(&db, "Test");
            let later = t0() + Duration::hours(2);

            let updated = db
                .update_status(&topic.id, TopicStatus::Studied, later)
                .unwrap();
            assert_eq!(updated.status, TopicStatus::Studied);
            assert_eq!(updated.updated_at, later);
            assert_eq!(updated.next_review_date, topic.next_review_date);
        }

        #[test]
        fn update_summary_and_description() {
            let db = setup_db();
            let topic = add(&db, "Test");
            let later = t0() + Duration::hours(1);

            db.update_summary(&topic.id, "Key takeaways", later).unwrap();
            let updated = db
                .update_description(&topic.id, "New description", later)
                .unwrap();
            assert_eq!(updated.summary, "Key takeaways");
            assert_eq!(updated.description, "New description");
            assert_eq!(updated.updated_at, later);
        }

        #[test]
        fn updates_on_missing_topic_fail() {
            let db = setup_db();
            assert!(matches!(
                db.update_status("nope", TopicStatus::New, t0()),
                Err(Error::TopicNotFound(_))
            ));
            assert!(matches!(
                db.update_summary("nope", "x", t0()),
                Err(Error::TopicNotFound(_))
            ));
            assert!(matches!(
                db.add_time("nope", 60, t0()),
                Err(Error::TopicNotFound(_))
            ));
        }
    }

    mod resolve_id_tests {
        use super::*;

        fn insert_with_id(db: &Database, id: &str) {
            let mut topic = Topic::new(id, "", TopicStatus::New, t0());
            topic.id = id.to_string();
            db.insert_topic(&topic).unwrap();
        }

        #[test]
        fn resolves_full_id_and_prefix() {
            let db = setup_db();
            insert_with_id(&db, "abc123");
            insert_with_id(&db, "def456");

            assert_eq!(db.resolve_id("abc123").unwrap(), "abc123");
            assert_eq!(db.resolve_id("de").unwrap(), "def456");
        }

        #[test]
        fn ambiguous_prefix() {
            let db = setup_db();
            insert_with_id(&db, "abc123");
            insert_with_id(&db, "abd456");

            assert!(matches!(db.resolve_id("ab"), Err(Error::AmbiguousId(_))));
        }

        #[test]
        fn unknown_prefix() {
            let db = setup_db();
            insert_with_id(&db, "abc123");
            assert!(matches!(db.resolve_id("zz"), Err(Error::TopicNotFound(_))));
        }

        #[test]
        fn like_wildcards_are_literal() {
            let db = setup_db();
            insert_with_id(&db, "abc123");
            assert!(matches!(db.resolve_id("%"), Err(Error::TopicNotFound(_))));
        }
    }

    mod time_tests {
        use super::*;

        #[test]
        fn add_time_accumulates() {
            let db = setup_db();
            let topic = add(&db, "Test");

            db.add_time(&topic.id, 1500, t0() + Duration::hours(1)).unwrap();
            let later = t0() + Duration::hours(3);
            let updated = db.add_time(&topic.id, 300, later).unwrap();

            assert_eq!(updated.time_spent, 1800);
            assert_eq!(updated.last_study_session, Some(later));
            assert_eq!(updated.updated_at, later);
        }

        #[test]
        fn add_zero_time_still_touches() {
            let db = setup_db();
            let topic = add(&db, "Test");
            let later = t0() + Duration::minutes(5);
            let updated = db.add_time(&topic.id, 0, later).unwrap();
            assert_eq!(updated.time_spent, 0);
            assert_eq!(updated.updated_at, later);
            assert!(db.study_sessions_since(t0()).unwrap().is_empty());
        }

        #[test]
        fn add_time_logs_a_session() {
            let db = setup_db();
            let topic = add(&db, "Test");
            let later = t0() + Duration::hours(1);

            db.add_time(&topic.id, 1500, later).unwrap();

            let sessions = db.study_sessions_since(t0()).unwrap();
            assert_eq!(
                sessions,
                vec![StudySession {
                    topic_id: Some(topic.id.clone()),
                    studied_at: later,
                    seconds: 1500,
                }]
            );
            assert!(db
                .study_sessions_since(later + Duration::seconds(1))
                .unwrap()
                .is_empty());
        }

        #[test]
        fn add_time_on_missing_topic_logs_nothing() {
            let db = setup_db();
            assert!(db.add_time("missing", 600, t0()).is_err());
            assert!(db.study_sessions_since(t0()).unwrap().is_empty());
        }

        #[test]
        fn sessions_survive_topic_delete() {
            let db = setup_db();
            let topic = add(&db, "Test");
            db.add_time(&topic.id, 600, t0()).unwrap();

            db.delete_topic(&topic.id).unwrap();

            let sessions = db.study_sessions_since(t0()).unwrap();
            assert_eq!(sessions.len(), 1);
            assert_eq!(sessions[0].topic_id, None);
            assert_eq!(sessions[0].seconds, 600);
        }
    }

    mod goal_tests {
        use super::*;

        #[test]
        fn default_goal_is_two_hours() {
            let db = setup_db();
            assert_eq!(db.daily_goal_secs().unwrap(), 120 * 60);
        }

        #[test]
        fn set_and_reset_goal() {
            let db = setup_db();
            assert_eq!(db.set_daily_goal(45).unwrap(), 45 * 60);
            assert_eq!(db.daily_goal_secs().unwrap(), 45 * 60);

            db.set_daily_goal(90).unwrap();
            assert_eq!(db.daily_goal_secs().unwrap(), 90 * 60);

            assert_eq!(db.reset_daily_goal().unwrap(), 120 * 60);
            assert_eq!(db.daily_goal_secs().unwrap(), 120 * 60);
        }

        #[test]
        fn out_of_range_goal_rejected() {
            let db = setup_db();
            db.set_daily_goal(30).unwrap();

            assert!(matches!(db.set_daily_goal(0), Err(Error::InvalidGoal(0))));
            assert!(matches!(
                db.set_daily_goal(24 * 60 + 1),
                Err(Error::InvalidGoal(_))
            ));
            assert_eq!(db.daily_goal_secs().unwrap(), 30 * 60);
        }

        #[test]
        fn goal_progress_counts_logged_time() {
            let db = setup_db();
            let topic = add(&db, "Test");
            db.set_daily_goal(60).unwrap();

            // t0 is 2024-05-10
            db.add_time(&topic.id, 30 * 60, t0()).unwrap();
            db.add_time(&topic.id, 15 * 60, t0() - Duration::days(3)).unwrap();
            db.add_time(&topic.id, 10 * 60, t0() - Duration::days(20)).unwrap();
            db.add_time(&topic.id, 60 * 60, t0() - Duration::days(365)).unwrap();

            let progress = db.goal_progress(t0() + Duration::hours(1)).unwrap();
            assert_eq!(progress.daily_goal_secs, 60 * 60);
            assert_eq!(progress.today_secs, 30 * 60);
            assert_eq!(progress.month_secs, 45 * 60);
            assert_eq!(progress.year_secs, 55 * 60);
            assert_eq!(progress.daily_percent, 50.0);
        }
    }

    mod review_tests {
        use super::*;

        #[test]
        fn record_review_persists_schedule() {
            let db = setup_db();
            let topic = add(&db, "Test");

            let returned = db.record_review(&topic.id, 3, t0()).unwrap();
            let loaded = db.get_topic(&topic.id).unwrap().unwrap();

            assert_eq!(loaded, returned);
            assert_eq!(loaded.next_review_date, Some(t0() + Duration::days(8)));
            assert_eq!(loaded.review_history.len(), 1);
            assert_eq!(loaded.review_history[0].confidence.value(), 3);
            assert_eq!(loaded.review_history[0].timestamp, t0());
        }

        #[test]
        fn each_review_inserts_exactly_one_row() {
            let db = setup_db();
            let topic = add(&db, "Test");

            for (i, c) in [1, 4, 2].into_iter().enumerate() {
                db.record_review(&topic.id, c, t0() + Duration::days(i as i64))
                    .unwrap();
                assert_eq!(history_rows(&db, &topic.id), i as i64 + 1);
            }

            let loaded = db.get_topic(&topic.id).unwrap().unwrap();
            let confidences: Vec<u8> = loaded
                .review_history
                .iter()
                .map(|r| r.confidence.value())
                .collect();
            assert_eq!(confidences, vec![1, 4, 2]);
        }

        #[test]
        fn back_to_back_reviews_both_survive() {
            let db = setup_db();
            let topic = add(&db, "Test");

            // Same instant, as with a double submit from the UI
            db.record_review(&topic.id, 2, t0()).unwrap();
            db.record_review(&topic.id, 5, t0()).unwrap();

            let loaded = db.get_topic(&topic.id).unwrap().unwrap();
            assert_eq!(loaded.review_history.len(), 2);
            assert_eq!(loaded.next_review_date, Some(t0() + Duration::days(32)));
        }

        #[test]
        fn invalid_confidence_leaves_topic_untouched() {
            let db = setup_db();
            let topic = add(&db, "Test");
            db.record_review(&topic.id, 2, t0()).unwrap();
            let before = db.get_topic(&topic.id).unwrap().unwrap();

            let result = db.record_review(&topic.id, 7, t0() + Duration::days(1));
            assert!(matches!(result, Err(Error::InvalidConfidence(7))));

            let after = db.get_topic(&topic.id).unwrap().unwrap();
            assert_eq!(after, before);
            assert_eq!(history_rows(&db, &topic.id), 1);
        }

        #[test]
        fn review_transaction_holds_write_lock_from_the_start() {
            let path = std::env::temp_dir()
                .join(format!("studylog-lock-{}.db", uuid::Uuid::new_v4()));
            let db = Database::open(&path).unwrap();
            db.init().unwrap();
            let other = Connection::open(&path).unwrap();
            other.busy_timeout(std::time::Duration::ZERO).unwrap();

            let tx = db.begin_write().unwrap();
            assert!(other.execute_batch("BEGIN IMMEDIATE; COMMIT;").is_err());
            tx.rollback().unwrap();
            assert!(other.execute_batch("BEGIN IMMEDIATE; COMMIT;").is_ok());

            drop(other);
            drop(db);
            let _ = std::fs::remove_file(&path);
        }

        #[test]
        fn review_missing_topic() {
            let db = setup_db();
            assert!(matches!(
                db.record_review("missing", 3, t0()),
                Err(Error::TopicNotFound(_))
            ));
        }

        #[test]
        fn other_topics_unaffected() {
            let db = setup_db();
            let a = add(&db, "A");
            let b = add(&db, "B");

            db.record_review(&a.id, 4, t0()).unwrap();

            let b_loaded = db.get_topic(&b.id).unwrap().unwrap();
            assert_eq!(b_loaded, b);
        }
    }

    mod due_tests {
        use super::*;

        #[test]
        fn new_topics_are_due() {
            let db = setup_db();
            add(&db, "A");
            add(&db, "B");

            assert_eq!(db.due_topics(t0()).unwrap().len(), 2);
        }

        #[test]
        fn reviewed_topic_leaves_due_list_until_date() {
            let db = setup_db();
            let a = add(&db, "A");
            add(&db, "B");

            db.record_review(&a.id, 1, t0()).unwrap();

            let due_now: Vec<String> = db
                .due_topics(t0() + Duration::days(1))
                .unwrap()
                .into_iter()
                .map(|t| t.title)
                .collect();
            assert_eq!(due_now, vec!["B"]);

            let due_later = db.due_topics(t0() + Duration::days(2)).unwrap();
            assert_eq!(due_later.len(), 2);
        }

        #[test]
        fn due_topics_are_ordered_by_next_review() {
            let db = setup_db();
            let a = add(&db, "A");
            let b = add(&db, "B");
            let c = add(&db, "C");

            db.record_review(&a.id, 3, t0()).unwrap(); // +8d
            db.record_review(&b.id, 1, t0()).unwrap(); // +2d
            db.record_review(&c.id, 2, t0()).unwrap(); // +4d

            let titles: Vec<String> = db
                .due_topics(t0() + Duration::days(10))
                .unwrap()
                .into_iter()
                .map(|t| t.title)
                .collect();
            assert_eq!(titles, vec!["B", "C", "A"]);
        }

        #[test]
        fn next_due_topic_is_most_urgent() {
            let db = setup_db();
            assert!(db.next_due_topic(t0()).unwrap().is_none());

            let a = add(&db, "A");
            let b = add(&db, "B");
            db.record_review(&a.id, 1, t0()).unwrap();
            db.record_review(&b.id, 5, t0()).unwrap();

            assert!(db.next_due_topic(t0() + Duration::days(1)).unwrap().is_none());
            let next = db
                .next_due_topic(t0() + Duration::days(40))
                .unwrap()
                .unwrap();
            assert_eq!(next.title, "A");
        }
    }
}
