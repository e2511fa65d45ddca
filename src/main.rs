mod db;
mod error;
mod models;
mod scheduler;
mod stats;
mod tui;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use db::Database;
use error::Result;
use models::{JsonOutput, Topic, TopicStatus};
use stats::GoalProgress;

const DEFAULT_DB_NAME: &str = "studylog.db";
const DB_ENV_VAR: &str = "STUDYLOG_DB";
const LOG_ENV_VAR: &str = "STUDYLOG_LOG";

#[derive(Parser)]
#[command(name = "studylog")]
#[command(about = "Track study topics and review them on a spaced-repetition schedule")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log debug events to stderr
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Manage topics
    #[command(subcommand)]
    Topic(TopicCommands),

    /// Add study time to a topic
    Study {
        /// Topic ID (or unique prefix)
        id: String,

        /// Minutes studied
        #[arg(long, short)]
        minutes: u32,
    },

    /// Record how well you recalled a topic (1-5)
    Review {
        /// Topic ID (or unique prefix)
        id: String,

        /// Confidence: 1 = no recall, 5 = perfect recall
        #[arg(long, short, allow_negative_numbers = true)]
        confidence: i64,
    },

    /// List topics due for review, most urgent first
    Due,

    /// Show the most urgent topic to review
    Next,

    /// Show study statistics
    Stats {
        /// Days of activity to include
        #[arg(
            long,
            short,
            default_value_t = 7,
            value_parser = clap::value_parser!(u32).range(1..=stats::MAX_ACTIVITY_DAYS as i64)
        )]
        days: u32,
    },

    /// Show or change the daily study goal
    Goal {
        /// New daily goal in minutes
        #[arg(
            value_parser = clap::value_parser!(u32).range(1..=stats::MAX_DAILY_GOAL_MINUTES as i64),
            conflicts_with = "reset"
        )]
        minutes: Option<u32>,

        /// Restore the default goal of 120 minutes
        #[arg(long)]
        reset: bool,
    },

    /// Launch interactive terminal UI
    Tui,
}

#[derive(Subcommand)]
enum TopicCommands {
    /// List all topics
    List {
        /// Filter by status (new, to_study, studying, studied)
        #[arg(long, short)]
        status: Option<String>,
    },

    /// Add a new topic
    Add {
        /// Topic title
        title: String,

        /// Topic description
        #[arg(long, short)]
        description: Option<String>,

        /// Initial status
        #[arg(long, short, default_value = "new")]
        status: String,
    },

    /// Show topic details and review history
    Show {
        /// Topic ID (or unique prefix)
        id: String,
    },

    /// Delete a topic
    Delete {
        /// Topic ID (or unique prefix)
        id: String,
    },

    /// Change a topic's status
    Status {
        /// Topic ID (or unique prefix)
        id: String,

        /// New status
        status: String,
    },

    /// Replace a topic's summary
    Summary {
        /// Topic ID (or unique prefix)
        id: String,

        /// Summary text
        text: String,
    },

    /// Replace a topic's description
    Describe {
        /// Topic ID (or unique prefix)
        id: String,

        /// Description text
        text: String,
    },
}

fn get_db_path() -> PathBuf {
    if let Ok(path) = std::env::var(DB_ENV_VAR) {
        return PathBuf::from(path);
    }

    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("studylog");

    std::fs::create_dir_all(&config_dir).ok();
    config_dir.join(DEFAULT_DB_NAME)
}

fn init_tracing(quiet: bool, verbose: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // A second init (only possible in tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let json = cli.json;
    if let Err(e) = run(cli) {
        tracing::debug!(error = ?e, "command failed");
        if json {
            if let Ok(out) = serde_json::to_string(&JsonOutput::<()>::err(e.to_string())) {
                println!("{}", out);
            }
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let db_path = get_db_path();
    let db = Database::open(&db_path)?;
    // Schema creation is idempotent, so every command can rely on it
    db.init()?;
    tracing::debug!(path = %db_path.display(), "opened database");

    let now = Utc::now();

    match cli.command {
        Commands::Init => {
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Database initialized at: {}", db_path.display());
            }
        }

        Commands::Topic(topic_cmd) => match topic_cmd {
            TopicCommands::List { status } => {
                let filter = status.as_deref().map(TopicStatus::parse).transpose()?;
                let topics = db.list_topics(filter)?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&topics))?);
                } else if topics.is_empty() {
                    println!("No topics found.");
                } else {
                    print_topic_table(&topics, now);
                }
            }

            TopicCommands::Add {
                title,
                description,
                status,
            } => {
                let status = TopicStatus::parse(&status)?;
                let topic =
                    db.add_topic(&title, description.as_deref().unwrap_or(""), status, now)?;

                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&topic))?);
                } else {
                    println!("Added topic '{}' with ID: {}", topic.title, topic.id);
                }
            }

            TopicCommands::Show { id } => {
                let topic = db.require_topic(&db.resolve_id(&id)?)?;
                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "topic": topic,
                            "due": scheduler::is_due(&topic, now),
                            "last_confidence": scheduler::last_confidence(&topic),
                        })))?
                    );
                } else {
                    print_topic_detail(&topic, now);
                }
            }

            TopicCommands::Delete { id } => {
                let id = db.resolve_id(&id)?;
                db.delete_topic(&id)?;
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                } else {
                    println!("Topic {} deleted.", id);
                }
            }

            TopicCommands::Status { id, status } => {
                let status = TopicStatus::parse(&status)?;
                let topic = db.update_status(&db.resolve_id(&id)?, status, now)?;
                print_updated(&topic, cli.json, &format!("Status set to {}", status.label()))?;
            }

            TopicCommands::Summary { id, text } => {
                let topic = db.update_summary(&db.resolve_id(&id)?, &text, now)?;
                print_updated(&topic, cli.json, "Summary updated")?;
            }

            TopicCommands::Describe { id, text } => {
                let topic = db.update_description(&db.resolve_id(&id)?, &text, now)?;
                print_updated(&topic, cli.json, "Description updated")?;
            }
        },

        Commands::Study { id, minutes } => {
            let topic = db.add_time(&db.resolve_id(&id)?, minutes as u64 * 60, now)?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&topic))?);
            } else {
                println!(
                    "Logged {} min on '{}' (total {}).",
                    minutes,
                    topic.title,
                    stats::format_duration(topic.time_spent)
                );
            }
        }

        Commands::Review { id, confidence } => {
            let topic = db.record_review(&db.resolve_id(&id)?, confidence, now)?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&topic))?);
            } else {
                println!("Review recorded for '{}'.", topic.title);
                if let Some(next) = &topic.next_review_date {
                    println!("Next review scheduled: {}", format_time(next));
                }
            }
        }

        Commands::Due => {
            let due = db.due_topics(now)?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&due))?);
            } else if due.is_empty() {
                println!("Nothing due. Come back later!");
            } else {
                print_topic_table(&due, now);
            }
        }

        Commands::Next => {
            if let Some(topic) = db.next_due_topic(now)? {
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&topic))?);
                } else {
                    println!("=== Next Topic to Review ===");
                    println!();
                    print_topic_detail(&topic, now);
                    println!();
                    println!("After review, record your confidence with:");
                    println!("  studylog review {} --confidence <1-5>", topic.short_id());
                }
            } else if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("No topics due. Add some topics or come back later!");
            }
        }

        Commands::Stats { days } => {
            let topics = db.list_topics(None)?;
            let summary = stats::summarize(&topics, now);
            let activity = stats::daily_activity(&topics, now.date_naive(), days);
            let goal = db.goal_progress(now)?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "summary": summary,
                        "goal": goal,
                        "activity": activity,
                    })))?
                );
            } else {
                println!("=== Study Statistics ===");
                println!("Total topics: {}", summary.total_topics);
                println!(
                    "  new {} | to study {} | studying {} | studied {}",
                    summary.by_status.new,
                    summary.by_status.to_study,
                    summary.by_status.studying,
                    summary.by_status.studied
                );
                println!("Time studied: {}", stats::format_duration(summary.total_time_secs));
                println!(
                    "Reviews: {} across {} topics",
                    summary.total_reviews, summary.reviewed_topics
                );
                println!("Due now: {}", summary.due_now);
                println!("Upcoming: {}", summary.upcoming);
                println!("Average confidence: {:.2}/5", summary.avg_confidence);
                println!();
                print_goal(&goal);

                if !activity.is_empty() {
                    println!();
                    println!("{:<12} {:>8} {:>8} {:>8}", "DAY", "STUDIED", "REVIEWS", "AVG");
                    for day in &activity {
                        println!(
                            "{:<12} {:>8} {:>8} {:>8.2}",
                            day.date.format("%Y-%m-%d"),
                            day.topics_studied,
                            day.reviews,
                            day.avg_confidence
                        );
                    }
                }
            }
        }

        Commands::Goal { minutes, reset } => {
            if reset {
                db.reset_daily_goal()?;
            } else if let Some(minutes) = minutes {
                db.set_daily_goal(minutes)?;
            }
            let goal = db.goal_progress(now)?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&goal))?);
            } else {
                print_goal(&goal);
            }
        }

        Commands::Tui => {
            tui::run(db)?;
        }
    }

    Ok(())
}

fn print_updated(topic: &Topic, json: bool, message: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(&JsonOutput::ok(topic))?);
    } else {
        println!("{} for '{}'.", message, topic.title);
    }
    Ok(())
}

fn print_goal(goal: &GoalProgress) {
    println!(
        "=== Study Goal ({} a day) ===",
        stats::format_duration(goal.daily_goal_secs)
    );
    println!(
        "Today: {} / {} ({:.0}%), {} to go",
        stats::format_duration(goal.today_secs),
        stats::format_duration(goal.daily_goal_secs),
        goal.daily_percent,
        stats::format_duration(goal.remaining_today_secs())
    );
    println!(
        "Month: {} / {} ({:.1}%)",
        stats::format_duration(goal.month_secs),
        stats::format_duration(goal.monthly_goal_secs),
        goal.monthly_percent
    );
    println!(
        "Year:  {} / {} ({:.1}%)",
        stats::format_duration(goal.year_secs),
        stats::format_duration(goal.yearly_goal_secs),
        goal.yearly_percent
    );
}

fn print_topic_table(topics: &[Topic], now: DateTime<Utc>) {
    println!(
        "{:<9} {:<36} {:<10} {:<5} NEXT REVIEW",
        "ID", "TITLE", "STATUS", "CONF"
    );
    println!("{}", "-".repeat(80));
    for topic in topics {
        let conf = scheduler::last_confidence(topic)
            .map(|c| c.value().to_string())
            .unwrap_or_else(|| "-".to_string());
        let next = topic
            .next_review_date
            .as_ref()
            .map(format_time)
            .unwrap_or_else(|| "-".to_string());
        let marker = if scheduler::is_due(topic, now) { " *" } else { "" };
        println!(
            "{:<9} {:<36} {:<10} {:<5} {}{}",
            topic.short_id(),
            truncate(&topic.title, 34),
            topic.status.label(),
            conf,
            next,
            marker
        );
    }
}

fn print_topic_detail(topic: &Topic, now: DateTime<Utc>) {
    println!("Topic: {}", topic.title);
    println!("ID: {}", topic.id);
    println!("Status: {}", topic.status.label());
    if !topic.description.is_empty() {
        println!("Description: {}", topic.description);
    }
    if !topic.summary.is_empty() {
        println!("Summary: {}", topic.summary);
    }
    println!("Time studied: {}", stats::format_duration(topic.time_spent));
    println!("Created: {}", format_time(&topic.created_at));

    println!();
    println!("--- Reviews ---");
    if topic.review_history.is_empty() {
        println!("Never reviewed.");
    } else {
        for record in &topic.review_history {
            println!(
                "{}  confidence {}",
                format_time(&record.timestamp),
                record.confidence.value()
            );
        }
    }
    match &topic.next_review_date {
        _ if scheduler::is_due(topic, now) => println!("Due now"),
        Some(next) => println!("Next review: {}", format_time(next)),
        None => println!("Not scheduled"),
    }
}

fn format_time(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M").to_string()
}

pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
