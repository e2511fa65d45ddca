use chrono::Utc;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::{confidence_dots, format_date};
use crate::models::TopicStatus;
use crate::scheduler::is_due;
use crate::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let title = if let Some(status) = &app.filter_status {
        format!(" Topics (status: {}) ", status.label())
    } else {
        " Topics ".to_string()
    };

    let now = Utc::now();
    let items: Vec<ListItem> = app
        .topics
        .items
        .iter()
        .map(|topic| {
            let (dots, dots_style) = confidence_dots(topic);
            let next_review = topic
                .next_review_date
                .as_ref()
                .map(format_date)
                .unwrap_or_else(|| "Not set".to_string());

            let (next_color, next_text) = if is_due(topic, now) {
                (Color::Red, format!("{} !", next_review))
            } else {
                (Color::White, next_review)
            };

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<30}", truncate(&topic.title, 28)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:<10}", topic.status.label()),
                    Style::default().fg(status_color(topic.status)),
                ),
                Span::styled(dots, dots_style),
                Span::raw("  "),
                Span::styled(next_text, Style::default().fg(next_color)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Cyan));

    let header_style = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::BOLD);
    let header = Line::from(vec![
        Span::styled(format!("{:<30}", "Title"), header_style),
        Span::styled(format!("{:<10}", "Status"), header_style),
        Span::styled("Conf   ", header_style),
        Span::styled("Next Review", header_style),
    ]);

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.topics.selected);

    let header_area = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: 1,
    };
    f.render_widget(Paragraph::new(header), header_area);

    let list_area = Rect {
        x: area.x,
        y: area.y + 1,
        width: area.width,
        height: area.height.saturating_sub(1),
    };

    f.render_stateful_widget(list, list_area, &mut state);
}

fn status_color(status: TopicStatus) -> Color {
    match status {
        TopicStatus::New => Color::Blue,
        TopicStatus::ToStudy => Color::Yellow,
        TopicStatus::Studying => Color::Cyan,
        TopicStatus::Studied => Color::Green,
    }
}
