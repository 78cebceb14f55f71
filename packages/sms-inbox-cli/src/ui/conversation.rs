use ratatui::{
    layout::{Alignment, Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Text},
    widgets::{Block, List, ListItem, ListState, Paragraph},
    Frame,
};
use sms_inbox_core::{
    composer::draft_is_valid, message::STATUS_FAILED, time::local_timestamp, Message,
    MAX_BODY_LEN,
};

use super::error_line;
use crate::app::conversation::{ConversationState, Focus};

fn bubble(message: &Message) -> ListItem<'static> {
    let alignment = if message.is_outbound() {
        Alignment::Right
    } else {
        Alignment::Left
    };
    let body = if message.body.is_empty() && message.media_count() > 0 {
        "[media]".to_string()
    } else {
        message.body.clone()
    };
    let meta = format!(
        "{} · {}",
        message.status_label(),
        local_timestamp(message.date)
    );
    let meta = if message.status == STATUS_FAILED {
        Line::from(format!("{} · r to retry", meta)).fg(Color::Red)
    } else {
        Line::from(meta).dim()
    };

    let mut lines: Vec<Line> = body
        .lines()
        .map(|l| Line::from(l.to_string()).alignment(alignment))
        .collect();
    lines.push(meta.alignment(alignment));
    lines.push(Line::default());
    ListItem::new(Text::from(lines))
}

pub fn render(frame: &mut Frame, area: Rect, state: &ConversationState) {
    let [thread_area, composer_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(area);

    let thread = &state.thread;
    let title = format!(" {} ↔ {} ", thread.from(), thread.to());
    let mut block = Block::bordered().title(title);
    if thread.is_loading_older() {
        block = block.title_bottom(" loading older… ");
    } else if thread.has_older() {
        block = block.title_bottom(" ↑ older messages ");
    }

    let visible = thread.visible();
    if let Some(error) = thread.error() {
        frame.render_widget(Paragraph::new(error_line(error)).block(block), thread_area);
    } else if visible.is_empty() {
        let text = if thread.is_loading() {
            "Loading messages…"
        } else {
            "No messages yet"
        };
        frame.render_widget(Paragraph::new(text).dim().block(block), thread_area);
    } else {
        let items: Vec<ListItem> = visible.iter().map(bubble).collect();
        let (selected, highlight) = match state.focus {
            Focus::Thread => (
                state.selected.min(visible.len() - 1),
                Style::new().add_modifier(Modifier::REVERSED),
            ),
            // Follow the newest message while typing.
            Focus::Composer => (visible.len() - 1, Style::new()),
        };
        let list = List::new(items).block(block).highlight_style(highlight);
        let mut list_state = ListState::default().with_selected(Some(selected));
        frame.render_stateful_widget(list, thread_area, &mut list_state);
    }

    render_composer(frame, composer_area, state);
}

fn render_composer(frame: &mut Frame, area: Rect, state: &ConversationState) {
    let draft = state.draft.value();
    let count = draft.trim().chars().count();
    let counter = format!(" {}/{} ", count, MAX_BODY_LEN);
    let mut block = Block::bordered().title_bottom(Line::from(counter).right_aligned());
    if state.focus == Focus::Composer {
        block = block.border_style(Style::new().fg(Color::Cyan));
    }
    if !draft.is_empty() && !draft_is_valid(draft) {
        block = block.border_style(Style::new().fg(Color::Red));
    }

    let content = if draft.is_empty() {
        Paragraph::new(state.composer.hint()).dim()
    } else {
        Paragraph::new(draft.to_string())
    };
    frame.render_widget(content.block(block), area);

    if state.focus == Focus::Composer && state.composer.is_enabled() {
        frame.set_cursor_position(Position::new(
            area.x + 1 + state.draft.cursor_column(),
            area.y + 1,
        ));
    }
}
