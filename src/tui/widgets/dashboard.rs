use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph},
    Frame,
};

use super::{confidence_dots, format_date};
use crate::stats::format_duration;
use crate::truncate;
use crate::tui::App;

const DUE_LIMIT: usize = 8;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(10), // Stats + due topics row
            Constraint::Length(5),  // Goal gauges
            Constraint::Min(0),     // Recent activity
        ])
        .split(area);

    let top_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[0]);

    draw_stats(f, app, top_chunks[0]);
    draw_due_topics(f, app, top_chunks[1]);
    draw_goal(f, app, chunks[1]);
    draw_activity(f, app, chunks[2]);
}

fn stat_line(label: &str, value: String, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label), Style::default().fg(Color::Gray)),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let stats = &app.stats;

    let text = vec![
        Line::from(vec![
            Span::styled("Topics: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", stats.total_topics),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        stat_line(
            "Status",
            format!(
                "{} new, {} to study, {} studying, {} studied",
                stats.by_status.new,
                stats.by_status.to_study,
                stats.by_status.studying,
                stats.by_status.studied
            ),
            Color::White,
        ),
        stat_line("Reviews", stats.total_reviews.to_string(), Color::White),
        stat_line(
            "Due",
            stats.due_now.to_string(),
            if stats.due_now > 0 {
                Color::Yellow
            } else {
                Color::White
            },
        ),
        stat_line("Upcoming", stats.upcoming.to_string(), Color::White),
        stat_line(
            "Time",
            format_duration(stats.total_time_secs),
            Color::Magenta,
        ),
        stat_line(
            "Avg Confidence",
            format!("{:.1}/5", stats.avg_confidence),
            Color::Cyan,
        ),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Stats ")
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(text).block(block);
    f.render_widget(paragraph, area);
}

fn draw_due_topics(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .due_topics
        .iter()
        .take(DUE_LIMIT)
        .enumerate()
        .map(|(i, topic)| {
            let (dots, dots_style) = confidence_dots(topic);
            let next = if topic.review_history.is_empty() {
                "new".to_string()
            } else {
                topic
                    .next_review_date
                    .as_ref()
                    .map(format_date)
                    .unwrap_or_default()
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!("{}. ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!("{:<26}", truncate(&topic.title, 24)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(dots, dots_style),
                Span::styled(format!(" {}", next), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let title = if app.due_topics.len() > DUE_LIMIT {
        format!(" Due Now ({}, showing {}) ", app.due_topics.len(), DUE_LIMIT)
    } else {
        format!(" Due Now ({}) ", app.due_topics.len())
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Yellow));

    if items.is_empty() {
        let paragraph = Paragraph::new("Nothing due. Nice work!")
            .style(Style::default().fg(Color::Green))
            .block(block);
        f.render_widget(paragraph, area);
    } else {
        let list = List::new(items).block(block);
        f.render_widget(list, area);
    }
}

fn draw_goal(f: &mut Frame, app: &App, area: Rect) {
    let goal = &app.goal;
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            " Daily Goal ({}) ",
            format_duration(goal.daily_goal_secs)
        ))
        .title_style(Style::default().fg(Color::Green));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let gauges = [
        ("Today", goal.today_secs, goal.daily_percent, Color::Green),
        ("Month", goal.month_secs, goal.monthly_percent, Color::Cyan),
        ("Year", goal.year_secs, goal.yearly_percent, Color::Magenta),
    ];
    for ((label, secs, percent, color), row) in gauges.into_iter().zip(rows.iter()) {
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(color).bg(Color::Black))
            .ratio((percent / 100.0).clamp(0.0, 1.0))
            .label(format!("{} {} ({:.0}%)", label, format_duration(secs), percent));
        f.render_widget(gauge, *row);
    }
}

fn draw_activity(f: &mut Frame, app: &App, area: Rect) {
    let max_reviews = app
        .activity
        .iter()
        .map(|d| d.reviews)
        .max()
        .unwrap_or(0)
        .max(1);

    let items: Vec<ListItem> = app
        .activity
        .iter()
        .map(|day| {
            let bar_len = day.reviews * 20 / max_reviews;
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<8}", day.date.format("%a %d")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{:<21}", "█".repeat(bar_len)),
                    Style::default().fg(Color::Green),
                ),
                Span::styled(
                    format!("{:>3} reviews ", day.reviews),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>2} studied ", day.topics_studied),
                    Style::default().fg(Color::Magenta),
                ),
                Span::styled(
                    format!("avg {:.1}", day.avg_confidence),
                    Style::default().fg(Color::Cyan),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Last {} Days ", app.activity.len()))
        .title_style(Style::default().fg(Color::Magenta));

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}
