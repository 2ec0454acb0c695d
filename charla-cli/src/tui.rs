//! Full-screen chat view

use anyhow::Result;
use charla_chat::{ChatView, Conversation};
use charla_core::SessionManager;
use charla_providers::Role;
use crossterm::event::{self, Event as CEvent, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use std::io;
use std::time::Duration;
use tracing::{debug, info};

use crate::input::{classify_key, ChatCommand, Draft, InputAction};

/// How the chat view ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatExit {
    Quit,
    LoggedOut,
}

struct ChatApp {
    draft: Draft,
    scroll_back: u16,
    exit: Option<ChatExit>,
}

impl ChatApp {
    fn new() -> Self {
        Self {
            draft: Draft::new(),
            scroll_back: 0,
            exit: None,
        }
    }

    fn handle(
        &mut self,
        action: InputAction,
        conversation: &Conversation,
        session: &SessionManager,
    ) {
        match action {
            InputAction::Quit => self.exit = Some(ChatExit::Quit),
            InputAction::ClearError => conversation.clear_error(),
            InputAction::Newline => self.draft.newline(),
            InputAction::Insert(ch) => self.draft.insert(ch),
            InputAction::Backspace => self.draft.backspace(),
            InputAction::ScrollUp => self.scroll_back = self.scroll_back.saturating_add(1),
            InputAction::ScrollDown => self.scroll_back = self.scroll_back.saturating_sub(1),
            InputAction::Submit => self.submit(conversation, session),
            InputAction::Ignore => {}
        }
    }

    fn submit(&mut self, conversation: &Conversation, session: &SessionManager) {
        // keep the draft while a reply is pending
        if conversation.is_sending() {
            return;
        }
        let Some(text) = self.draft.take() else {
            return;
        };

        match ChatCommand::parse(text) {
            ChatCommand::Logout => {
                session.logout();
                self.exit = Some(ChatExit::LoggedOut);
            }
            ChatCommand::Quit => self.exit = Some(ChatExit::Quit),
            ChatCommand::Clear => {
                conversation.reset();
                self.scroll_back = 0;
            }
            ChatCommand::Send(text) => {
                self.scroll_back = 0;
                let conversation = conversation.clone();
                tokio::spawn(async move {
                    let outcome = conversation.submit(&text).await;
                    debug!("Submit finished: {:?}", outcome);
                });
            }
        }
    }
}

type ChatTerminal = Terminal<CrosstermBackend<io::Stdout>>;

fn enter_screen() -> Result<ChatTerminal> {
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

/// Best effort; used when setup fails halfway
fn abandon_screen() {
    if let Err(e) = io::stdout().execute(LeaveAlternateScreen) {
        debug!("Failed to leave alternate screen: {}", e);
    }
    if let Err(e) = disable_raw_mode() {
        debug!("Failed to disable raw mode: {}", e);
    }
}

fn or_cleanup<T>(result: Result<T>, cleanup: impl FnOnce()) -> Result<T> {
    if result.is_err() {
        cleanup();
    }
    result
}

/// Run the chat view until the user quits or logs out
pub async fn run_chat(conversation: &Conversation, session: &SessionManager) -> Result<ChatExit> {
    enable_raw_mode()?;
    let mut terminal = or_cleanup(enter_screen(), abandon_screen)?;

    info!("Chat view opened");
    let result = event_loop(&mut terminal, conversation, session).await;
    conversation.close();

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    info!("Chat view closed");
    result
}

async fn event_loop(
    terminal: &mut ChatTerminal,
    conversation: &Conversation,
    session: &SessionManager,
) -> Result<ChatExit> {
    let mut app = ChatApp::new();
    let model = conversation.settings().model.clone();

    loop {
        let view = conversation.view(session);
        terminal.draw(|frame| draw(frame, &view, &app, &model))?;

        if event::poll(Duration::from_millis(60))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle(classify_key(&key), conversation, session);
                }
            }
        }

        if let Some(exit) = app.exit {
            return Ok(exit);
        }

        // let spawned submits make progress between frames
        tokio::task::yield_now().await;
    }
}

fn message_lines(view: &ChatView) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for message in &view.messages {
        let (label, color) = match message.role {
            Role::User => (
                view.username.clone().unwrap_or_else(|| "you".to_string()),
                Color::Cyan,
            ),
            Role::Assistant => ("assistant".to_string(), Color::Green),
        };
        let stamp = message.timestamp.format("%H:%M").to_string();

        lines.push(Line::from(vec![
            Span::styled(
                format!("[{}] ", label),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(stamp, Style::default().fg(Color::DarkGray)),
        ]));
        for text in message.content.split('\n') {
            lines.push(Line::from(text.to_string()));
        }
        lines.push(Line::default());
    }

    if view.is_sending {
        lines.push(Line::from(Span::styled(
            "[assistant] thinking...",
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

fn draw(frame: &mut Frame, view: &ChatView, app: &ChatApp, model: &str) {
    let error_height = if view.error.is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(error_height),
            Constraint::Length(5),
        ])
        .split(frame.area());

    let status = if view.is_sending { "sending" } else { "idle" };
    let status_line = format!(
        "user: {} | model: {} | status: {}",
        view.username.as_deref().unwrap_or("-"),
        model,
        status
    );
    frame.render_widget(
        Paragraph::new(status_line).block(Block::default().borders(Borders::ALL).title("charla")),
        chunks[0],
    );

    // offsets count wrapped rows inside the border, not logical lines
    let history = Paragraph::new(message_lines(view)).wrap(Wrap { trim: false });
    let inner_width = chunks[1].width.saturating_sub(2);
    let visible = chunks[1].height.saturating_sub(2);
    let total = u16::try_from(history.line_count(inner_width)).unwrap_or(u16::MAX);
    let offset = total.saturating_sub(visible).saturating_sub(app.scroll_back);
    frame.render_widget(
        history
            .block(Block::default().borders(Borders::ALL).title("messages"))
            .scroll((offset, 0)),
        chunks[1],
    );

    if let Some(error) = &view.error {
        frame.render_widget(
            Paragraph::new(error.clone())
                .style(Style::default().fg(Color::Red))
                .block(Block::default().borders(Borders::ALL).title("error (Ctrl+D to dismiss)")),
            chunks[2],
        );
    }

    let input_area = chunks[3];
    frame.render_widget(
        Paragraph::new(app.draft.as_str().to_string())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("message (Enter send, Shift+Enter newline, /logout /clear /quit)"),
            )
            .wrap(Wrap { trim: false }),
        input_area,
    );
    let (col, row) = app.draft.cursor();
    frame.set_cursor_position((
        input_area.x.saturating_add(1).saturating_add(col),
        input_area.y.saturating_add(1).saturating_add(row),
    ));
}
