mod ui;
mod widgets;

use std::io;
use std::time::Duration;

use chrono::Utc;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::db::Database;
use crate::error::Result;
use crate::models::{Topic, TopicStatus};
use crate::scheduler;
use crate::stats::{self, DayActivity, GoalProgress, Stats};

// One pomodoro
const STUDY_BLOCK_SECS: u64 = 25 * 60;
const ACTIVITY_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Topics,
    TopicDetail,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Topics,
            View::Topics => View::Dashboard,
            View::TopicDetail => View::Topics,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Dashboard => View::Topics,
            View::Topics => View::Dashboard,
            View::TopicDetail => View::Topics,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }

    // Keep the cursor in place across reloads where possible
    fn replace_items(&mut self, items: Vec<T>) {
        self.selected = match (self.selected, items.len()) {
            (_, 0) => None,
            (Some(i), len) => Some(i.min(len - 1)),
            (None, _) => Some(0),
        };
        self.items = items;
    }
}

pub struct App {
    db: Database,
    pub view: View,
    pub topics: StatefulList<Topic>,
    pub selected_topic: Option<Topic>,
    pub stats: Stats,
    pub due_topics: Vec<Topic>,
    pub activity: Vec<DayActivity>,
    pub goal: GoalProgress,
    pub filter_status: Option<TopicStatus>,
    pub filter_input: String,
    pub filter_mode: bool,
    pub message: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(db: Database) -> Result<Self> {
        let mut app = Self {
            db,
            view: View::Dashboard,
            topics: StatefulList::with_items(Vec::new()),
            selected_topic: None,
            stats: Stats::default(),
            due_topics: Vec::new(),
            activity: Vec::new(),
            goal: GoalProgress::default(),
            filter_status: None,
            filter_input: String::new(),
            filter_mode: false,
            message: None,
            should_quit: false,
        };
        app.refresh_data()?;
        Ok(app)
    }

    /// Reload everything from the database. The due list is a snapshot at
    /// the time of the call.
    pub fn refresh_data(&mut self) -> Result<()> {
        let now = Utc::now();
        let all = self.db.list_topics(None)?;

        self.stats = stats::summarize(&all, now);
        self.activity = stats::daily_activity(&all, now.date_naive(), ACTIVITY_DAYS);
        self.goal = self.db.goal_progress(now)?;
        self.due_topics = scheduler::select_due_topics(&all, now)
            .into_iter()
            .cloned()
            .collect();

        let listed = match self.filter_status {
            Some(status) => all.into_iter().filter(|t| t.status == status).collect(),
            None => all,
        };
        self.topics.replace_items(listed);

        if let Some(selected) = &self.selected_topic {
            self.selected_topic = self.db.get_topic(&selected.id)?;
        }
        Ok(())
    }

    fn apply_filter(&mut self) -> Result<()> {
        if self.filter_input.trim().is_empty() {
            self.filter_status = None;
        } else if let Some(status) = TopicStatus::from_str(&self.filter_input) {
            self.filter_status = Some(status);
        } else {
            self.message = Some(format!("Unknown status '{}'", self.filter_input));
            return Ok(());
        }
        self.topics = StatefulList::with_items(Vec::new());
        self.refresh_data()
    }

    fn select_topic(&mut self) {
        if let Some(topic) = self.topics.selected_item() {
            self.selected_topic = Some(topic.clone());
            self.view = View::TopicDetail;
        }
    }

    // Jump from the dashboard straight to the most urgent due topic
    fn open_next_due(&mut self) {
        if let Some(topic) = self.due_topics.first() {
            self.selected_topic = Some(topic.clone());
            self.view = View::TopicDetail;
        }
    }

    fn review_selected(&mut self, confidence: i64) -> Result<()> {
        let Some(topic) = &self.selected_topic else {
            return Ok(());
        };
        let reviewed = self.db.record_review(&topic.id, confidence, Utc::now())?;
        self.message = reviewed.next_review_date.map(|next| {
            format!(
                "Reviewed '{}' ({}), next {}",
                reviewed.title,
                confidence,
                next.format("%b %d")
            )
        });
        self.selected_topic = Some(reviewed);
        self.refresh_data()
    }

    fn cycle_selected_status(&mut self) -> Result<()> {
        let Some(topic) = &self.selected_topic else {
            return Ok(());
        };
        let updated = self
            .db
            .update_status(&topic.id, topic.status.cycle(), Utc::now())?;
        self.message = Some(format!("Status: {}", updated.status.label()));
        self.selected_topic = Some(updated);
        self.refresh_data()
    }

    fn log_study_block(&mut self) -> Result<()> {
        let Some(topic) = &self.selected_topic else {
            return Ok(());
        };
        let updated = self
            .db
            .add_time(&topic.id, STUDY_BLOCK_SECS, Utc::now())?;
        self.message = Some(format!(
            "Logged 25m, total {}",
            stats::format_duration(updated.time_spent)
        ));
        self.selected_topic = Some(updated);
        self.refresh_data()
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        if self.filter_mode {
            match key {
                KeyCode::Esc => {
                    self.filter_mode = false;
                    self.filter_input.clear();
                }
                KeyCode::Enter => {
                    self.filter_mode = false;
                    self.apply_filter()?;
                }
                KeyCode::Backspace => {
                    self.filter_input.pop();
                }
                KeyCode::Char(c) => {
                    self.filter_input.push(c);
                }
                _ => {}
            }
            return Ok(());
        }

        self.message = None;

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.refresh_data()?;
            }

            // Review with confidence 1-5 from the detail view
            KeyCode::Char(c @ '1'..='5') if self.view == View::TopicDetail => {
                let confidence = c.to_digit(10).map(i64::from).unwrap_or_default();
                self.review_selected(confidence)?;
            }
            KeyCode::Char('s') if self.view == View::TopicDetail => {
                self.cycle_selected_status()?;
            }
            KeyCode::Char('t') if self.view == View::TopicDetail => {
                self.log_study_block()?;
            }

            KeyCode::Char('/') if self.view == View::Topics => {
                self.filter_mode = true;
                self.filter_input.clear();
            }

            KeyCode::Esc => match self.view {
                View::TopicDetail => {
                    self.view = View::Topics;
                    self.selected_topic = None;
                }
                View::Topics if self.filter_status.is_some() => {
                    self.filter_status = None;
                    self.filter_input.clear();
                    self.refresh_data()?;
                }
                View::Topics | View::Dashboard => {}
            },

            KeyCode::Char('h') | KeyCode::Left => match self.view {
                View::TopicDetail => {
                    self.view = View::Topics;
                    self.selected_topic = None;
                }
                _ => self.view = self.view.prev(),
            },
            KeyCode::Char('l') | KeyCode::Right => match self.view {
                View::Topics => self.select_topic(),
                _ => self.view = self.view.next(),
            },

            KeyCode::Tab => {
                if modifiers.contains(KeyModifiers::SHIFT) {
                    self.view = self.view.prev();
                } else {
                    self.view = self.view.next();
                }
            }
            KeyCode::BackTab => {
                self.view = self.view.prev();
            }

            KeyCode::Char('j') | KeyCode::Down if self.view == View::Topics => self.topics.next(),
            KeyCode::Char('k') | KeyCode::Up if self.view == View::Topics => {
                self.topics.previous()
            }

            KeyCode::Char('g') if self.view == View::Topics && !self.topics.items.is_empty() => {
                self.topics.selected = Some(0);
            }
            KeyCode::Char('G') if self.view == View::Topics && !self.topics.items.is_empty() => {
                self.topics.selected = Some(self.topics.items.len() - 1);
            }

            KeyCode::Enter if self.view == View::Topics => self.select_topic(),
            KeyCode::Enter if self.view == View::Dashboard => self.open_next_due(),

            _ => {}
        }
        Ok(())
    }
}

pub fn run(db: Database) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = App::new(db).and_then(|mut app| run_app(&mut terminal, &mut app));

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code, key.modifiers)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
