use chrono::Utc;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, List, ListItem, ListState, Paragraph},
    Frame,
};
use sms_inbox_core::time::from_now;

use super::error_line;
use crate::app::inbox::InboxState;

fn title(inbox: &InboxState) -> String {
    match &inbox.number {
        Some(number) => format!(" Inbox · {} · {} ", number, inbox.filter.label()),
        None => " Inbox · all numbers ".to_string(),
    }
}

pub fn render(frame: &mut Frame, area: Rect, inbox: &InboxState) {
    let block = Block::bordered().title(title(inbox));

    if let Some(error) = &inbox.error {
        frame.render_widget(Paragraph::new(error_line(error)).block(block), area);
        return;
    }
    if inbox.conversations().is_empty() {
        let text = if inbox.loading {
            "Loading conversations…"
        } else {
            "No conversations"
        };
        frame.render_widget(Paragraph::new(text).dim().block(block), area);
        return;
    }

    let now = Utc::now();
    let items: Vec<ListItem> = inbox
        .conversations()
        .iter()
        .map(|c| {
            let heading = Line::from(vec![
                Span::from(c.display_name().to_string()).bold(),
                Span::raw("  "),
                Span::from(from_now(c.latest.date, now)).dim(),
            ]);
            let preview = Line::from(format!("  {}", c.preview())).dim();
            ListItem::new(Text::from(vec![heading, preview]))
        })
        .collect();

    let block = if inbox.loading {
        block.title_bottom(" refreshing… ")
    } else {
        block
    };
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::new().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default().with_selected(Some(inbox.selected));
    frame.render_stateful_widget(list, area, &mut state);
}
