//! Rendering. Every function here is a pure view of [`App`].

mod conversation;
mod detail;
mod inbox;
mod send;

use ratatui::{
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Screen};

pub fn draw(frame: &mut Frame, app: &App) {
    let [header, body, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(frame, header, app);
    match &app.screen {
        Screen::SignIn { checking, message } => {
            render_sign_in(frame, body, app, *checking, message.as_deref())
        }
        Screen::Inbox => inbox::render(frame, body, &app.inbox),
        Screen::Conversation(state) => conversation::render(frame, body, state),
        Screen::NewConversation(state) => send::render_new_conversation(frame, body, state),
        Screen::Send(state) => send::render(frame, body, state, app.numbers_loading),
        Screen::Detail(state) => detail::render(frame, body, state),
    }
    render_footer(frame, footer, &app.screen);

    if let Some(toast) = &app.toast {
        render_toast(frame, body, &toast.title, &toast.message);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let user = app
        .user
        .as_ref()
        .map(|u| u.display_name().to_string())
        .unwrap_or_default();
    let line = Line::from(vec![
        Span::from(" SMS Inbox ").bold().reversed(),
        Span::raw(" "),
        Span::from(user).dim(),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn key_hints(screen: &Screen) -> &'static str {
    match screen {
        Screen::SignIn { .. } => "l open login page · r retry · q quit",
        Screen::Inbox => {
            "↑↓ select · enter open · f/F number · t direction · r refresh · n new · s send · L logout · q quit"
        }
        Screen::Conversation(_) => {
            "tab switch focus · enter send/details · ↑ older · r retry failed · esc back"
        }
        Screen::NewConversation(_) => "tab account · ↑↓ contacts · enter continue · esc back",
        Screen::Send(_) => "tab next field · ←→ sender · enter send · esc back",
        Screen::Detail(_) => "c conversation · r reply · n new · o open media · esc back",
    }
}

fn render_footer(frame: &mut Frame, area: Rect, screen: &Screen) {
    frame.render_widget(Paragraph::new(key_hints(screen)).dim(), area);
}

fn render_sign_in(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    checking: bool,
    message: Option<&str>,
) {
    let mut lines = vec![Line::from("Sign in required".bold()), Line::default()];
    if checking {
        lines.push(Line::from("Checking session…"));
    } else {
        if let Some(message) = message {
            lines.push(Line::from(message.to_string()).fg(Color::Yellow));
            lines.push(Line::default());
        }
        lines.push(Line::from("Log in through your browser:"));
        lines.push(Line::from(app.login_url.clone()).underlined());
        lines.push(Line::default());
        lines.push(Line::from(
            "Then start the client with SMS_INBOX_SESSION set to the session cookie, or press r.",
        ));
    }
    let [centered] = Layout::vertical([Constraint::Length(lines.len() as u16 + 2)])
        .flex(Flex::Center)
        .areas(area);
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::bordered()),
        centered,
    );
}

fn render_toast(frame: &mut Frame, area: Rect, title: &str, message: &str) {
    let width = area.width.min(48);
    let popup = Rect {
        x: area.right().saturating_sub(width),
        y: area.y,
        width,
        height: 4.min(area.height),
    };
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(message.to_string())
            .wrap(Wrap { trim: true })
            .block(
                Block::bordered()
                    .title(title.to_string())
                    .border_style(Style::new().fg(Color::Red)),
            ),
        popup,
    );
}

/// Style for an error line.
pub(crate) fn error_line(message: &str) -> Line<'static> {
    Line::from(message.to_string()).fg(Color::Red)
}
