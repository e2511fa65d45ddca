pub mod dashboard;
pub mod topic_detail;
pub mod topics;

use chrono::{DateTime, Utc};
use ratatui::style::{Color, Style};

use crate::models::Topic;
use crate::scheduler::{confidence_band, last_confidence, ConfidenceBand};

pub(crate) fn band_color(band: ConfidenceBand) -> Color {
    match band {
        ConfidenceBand::Strong => Color::Green,
        ConfidenceBand::Moderate => Color::Yellow,
        ConfidenceBand::Weak => Color::Red,
    }
}

pub(crate) fn confidence_color(topic: &Topic) -> Color {
    last_confidence(topic)
        .map(confidence_band)
        .map_or(Color::DarkGray, band_color)
}

/// `●●●○○` for the last confidence, blank dots when never reviewed.
pub(crate) fn confidence_dots(topic: &Topic) -> (String, Style) {
    let filled = last_confidence(topic).map_or(0, |c| c.value() as usize);
    (
        format!("{}{}", "●".repeat(filled), "○".repeat(5 - filled)),
        Style::default().fg(confidence_color(topic)),
    )
}

pub(crate) fn format_date(dt: &DateTime<Utc>) -> String {
    dt.format("%b %d").to_string()
}
