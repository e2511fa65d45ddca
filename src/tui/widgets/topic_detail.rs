use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::{band_color, confidence_color, confidence_dots};
use crate::models::Topic;
use crate::scheduler::{confidence_band, is_due};
use crate::stats::format_duration;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(topic) = &app.selected_topic else {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Topic Detail ");
        let paragraph = Paragraph::new("No topic selected").block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Description + summary
            Constraint::Length(5), // Schedule
            Constraint::Min(0),    // Review history
        ])
        .split(area);

    draw_header(f, topic, chunks[0]);
    draw_schedule(f, topic, chunks[1]);
    draw_history(f, topic, chunks[2]);
}

fn draw_header(f: &mut Frame, topic: &Topic, area: Rect) {
    let description = if topic.description.is_empty() {
        "No description"
    } else {
        topic.description.as_str()
    };
    let summary = if topic.summary.is_empty() {
        "No summary yet"
    } else {
        topic.summary.as_str()
    };

    let text = vec![
        Line::from(vec![
            Span::styled("Description: ", Style::default().fg(Color::Gray)),
            Span::styled(description, Style::default().fg(Color::White)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Summary: ", Style::default().fg(Color::Gray)),
            Span::styled(summary, Style::default().fg(Color::White)),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", topic.title))
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_schedule(f: &mut Frame, topic: &Topic, area: Rect) {
    let (dots, dots_style) = confidence_dots(topic);

    let (next_text, next_color) = match &topic.next_review_date {
        _ if is_due(topic, Utc::now()) => ("Due now".to_string(), Color::Red),
        Some(next) => (next.format("%b %d, %Y").to_string(), Color::White),
        None => ("Not set".to_string(), Color::DarkGray),
    };

    let text = vec![
        Line::from(vec![
            Span::styled("Status: ", Style::default().fg(Color::Gray)),
            Span::styled(topic.status.label(), Style::default().fg(Color::Cyan)),
            Span::raw("  "),
            Span::styled("Time: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format_duration(topic.time_spent),
                Style::default().fg(Color::Magenta),
            ),
            Span::raw("  "),
            Span::styled("Confidence: ", Style::default().fg(Color::Gray)),
            Span::styled(dots, dots_style),
        ]),
        Line::from(vec![
            Span::styled("Reviews: ", Style::default().fg(Color::Gray)),
            Span::styled(
                topic.review_history.len().to_string(),
                Style::default().fg(Color::White),
            ),
            Span::raw("  "),
            Span::styled("Next: ", Style::default().fg(Color::Gray)),
            Span::styled(next_text, Style::default().fg(next_color)),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Schedule ")
        .title_style(Style::default().fg(confidence_color(topic)));

    let paragraph = Paragraph::new(text).block(block);
    f.render_widget(paragraph, area);
}

fn draw_history(f: &mut Frame, topic: &Topic, area: Rect) {
    // Newest first
    let items: Vec<ListItem> = topic
        .review_history
        .iter()
        .rev()
        .map(|record| {
            let color = band_color(confidence_band(record.confidence));
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<20}", record.timestamp.format("%Y-%m-%d %H:%M")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("confidence {}", record.confidence.value()),
                    Style::default().fg(color),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Review History ({}) ", topic.review_history.len()))
        .title_style(Style::default().fg(Color::Magenta));

    if items.is_empty() {
        let paragraph = Paragraph::new("Never reviewed. Press 1-5 to rate your recall.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
    } else {
        let list = List::new(items).block(block);
        f.render_widget(list, area);
    }
}
