use ratatui::{
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Style, Stylize},
    text::Line,
    widgets::{Block, List, ListItem, Paragraph, Wrap},
    Frame,
};
use sms_inbox_core::MAX_BODY_LEN;

use super::error_line;
use crate::app::{
    input::Input,
    new_conversation::NewConversationState,
    send::{SendField, SendState},
};

fn field_block(title: &str, focused: bool) -> Block<'static> {
    let block = Block::bordered().title(format!(" {} ", title));
    if focused {
        block.border_style(Style::new().fg(Color::Cyan))
    } else {
        block
    }
}

fn render_input(frame: &mut Frame, area: Rect, input: &Input, placeholder: &str, block: Block) {
    let paragraph = if input.is_empty() {
        Paragraph::new(placeholder.to_string()).dim()
    } else {
        Paragraph::new(input.value().to_string())
    };
    frame.render_widget(paragraph.block(block), area);
}

fn place_cursor(frame: &mut Frame, area: Rect, input: &Input) {
    frame.set_cursor_position(Position::new(area.x + 1 + input.cursor_column(), area.y + 1));
}

pub fn render(frame: &mut Frame, area: Rect, state: &SendState, numbers_loading: bool) {
    let [from_area, to_area, body_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(5),
        Constraint::Min(0),
    ])
    .areas(area);

    let from = if state.from.is_empty() {
        if numbers_loading {
            "Loading phone numbers…".to_string()
        } else {
            "No phone numbers on this account".to_string()
        }
    } else {
        format!("◂ {} ▸", state.from)
    };
    frame.render_widget(
        Paragraph::new(from).block(field_block("From", state.focus == SendField::From)),
        from_area,
    );

    render_input(
        frame,
        to_area,
        &state.to,
        "+15551234567",
        field_block("To", state.focus == SendField::To),
    );

    let form = state.form();
    let count = state.body.value().chars().count();
    let body_block = field_block("Message", state.focus == SendField::Body)
        .title_bottom(Line::from(format!(" {}/{} ", count, MAX_BODY_LEN)).right_aligned());
    let body = if state.body.is_empty() {
        Paragraph::new(form.hint()).dim()
    } else {
        Paragraph::new(state.body.value().to_string())
    };
    frame.render_widget(body.wrap(Wrap { trim: false }).block(body_block), body_area);

    let status = if state.sending {
        Line::from("Sending…").dim()
    } else if let Some(error) = &state.error {
        error_line(error)
    } else {
        Line::default()
    };
    frame.render_widget(Paragraph::new(status), status_area);

    match state.focus {
        SendField::To => place_cursor(frame, to_area, &state.to),
        SendField::Body => place_cursor(frame, body_area, &state.body),
        SendField::From => {}
    }
}

pub fn render_new_conversation(frame: &mut Frame, area: Rect, state: &NewConversationState) {
    let [account_area, contact_area, list_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    let account = match state.selected_account() {
        Some(account) => format!("◂ {} ▸", account),
        None => "No account numbers yet".to_string(),
    };
    frame.render_widget(
        Paragraph::new(account).block(field_block("Account number", false)),
        account_area,
    );

    let contact_block = match state.recipient() {
        Some(_) if !state.is_valid() => field_block("Contact", true)
            .border_style(Style::new().fg(Color::Red)),
        _ => field_block("Contact", true),
    };
    render_input(frame, contact_area, &state.contact, "Phone number", contact_block);
    place_cursor(frame, contact_area, &state.contact);

    let items: Vec<ListItem> = state
        .suggestions()
        .into_iter()
        .map(|c| ListItem::new(c.to_string()))
        .collect();
    frame.render_widget(
        List::new(items).block(Block::bordered().title(" Contacts ")),
        list_area,
    );
}
