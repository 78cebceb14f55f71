use ratatui::{
    layout::Rect,
    style::Stylize,
    text::{Line, Span},
    widgets::{Block, Paragraph, Wrap},
    Frame,
};
use sms_inbox_core::time::local_timestamp;

use super::error_line;
use crate::app::detail::DetailState;

fn field(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::from(format!("{:<10}", label)).dim(),
        Span::raw(value),
    ])
}

pub fn render(frame: &mut Frame, area: Rect, state: &DetailState) {
    let block = Block::bordered().title(format!(" {} · {} ", state.title(), state.sid));

    let lines = match (&state.message, &state.error) {
        (_, Some(error)) => vec![error_line(error)],
        (None, None) if state.loading => vec![Line::from("Loading message…").dim()],
        (None, None) => vec![Line::from("Message not found").dim()],
        (Some(message), None) => {
            let mut lines = vec![
                field("From", message.from.clone()),
                field("To", message.to.clone()),
                field("Status", message.status_label().to_string()),
                field("Sent", local_timestamp(message.date)),
                field("Direction", message.direction.clone()),
                Line::default(),
            ];
            lines.extend(message.body.lines().map(|l| Line::from(l.to_string())));
            if !state.media.is_empty() {
                lines.push(Line::default());
                lines.push(Line::from("Media").bold());
                lines.extend(
                    state
                        .media
                        .iter()
                        .map(|url| Line::from(url.clone()).underlined()),
                );
            }
            lines
        }
    };

    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(block),
        area,
    );
}
