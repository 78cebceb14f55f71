//! Terminal input and background task results, merged into one channel.

use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use tokio::sync::mpsc;

use crate::task::TaskResult;

/// How often the UI redraws when nothing happens (toast expiry, spinners).
pub const TICK_RATE: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub enum Event {
    Key(KeyEvent),
    Resize,
    Tick,
    Task(TaskResult),
}

pub struct EventLoop {
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventLoop {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Sender used by background tasks to report back.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Read terminal input on a dedicated thread; crossterm polling blocks.
    pub fn start_input(&self) {
        let tx = self.tx.clone();
        std::thread::spawn(move || loop {
            let next = match event::poll(TICK_RATE) {
                Ok(true) => match event::read() {
                    Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                        Some(Event::Key(key))
                    }
                    Ok(CrosstermEvent::Resize(_, _)) => Some(Event::Resize),
                    Ok(_) => None,
                    Err(e) => {
                        tracing::error!("Terminal read failed: {}", e);
                        return;
                    }
                },
                Ok(false) => Some(Event::Tick),
                Err(e) => {
                    tracing::error!("Terminal poll failed: {}", e);
                    return;
                }
            };
            if let Some(event) = next {
                if tx.send(event).is_err() {
                    return;
                }
            }
        });
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
