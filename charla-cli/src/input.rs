//! Draft editing and key handling for the chat view

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What a key press means to the chat view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Submit,
    Newline,
    Insert(char),
    Backspace,
    ClearError,
    ScrollUp,
    ScrollDown,
    Quit,
    Ignore,
}

/// Map a key press to an action.
///
/// Plain Enter submits. Enter with Shift or Alt inserts a newline into the
/// draft instead (terminals that cannot report Shift+Enter send Alt+Enter).
pub fn classify_key(key: &KeyEvent) -> InputAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => InputAction::Quit,
        KeyCode::Char('d') if ctrl => InputAction::ClearError,
        KeyCode::Char('j') if ctrl => InputAction::Newline,
        KeyCode::Esc => InputAction::Quit,
        KeyCode::Enter
            if key
                .modifiers
                .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            InputAction::Newline
        }
        KeyCode::Enter => InputAction::Submit,
        KeyCode::Backspace => InputAction::Backspace,
        KeyCode::Up | KeyCode::PageUp => InputAction::ScrollUp,
        KeyCode::Down | KeyCode::PageDown => InputAction::ScrollDown,
        KeyCode::Char(_) if ctrl => InputAction::Ignore,
        KeyCode::Char(ch) => InputAction::Insert(ch),
        _ => InputAction::Ignore,
    }
}

/// Slash commands understood by the chat view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Logout,
    Clear,
    Quit,
    Send(String),
}

impl ChatCommand {
    pub fn parse(text: String) -> Self {
        match text.trim() {
            "/logout" => ChatCommand::Logout,
            "/clear" => ChatCommand::Clear,
            "/quit" | "/exit" => ChatCommand::Quit,
            _ => ChatCommand::Send(text),
        }
    }
}

/// The message being typed
#[derive(Debug, Default, Clone)]
pub struct Draft {
    text: String,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn insert(&mut self, ch: char) {
        self.text.push(ch);
    }

    pub fn newline(&mut self) {
        self.text.push('\n');
    }

    pub fn backspace(&mut self) {
        self.text.pop();
    }

    /// Take the draft for sending. Blank drafts are kept and yield `None`.
    pub fn take(&mut self) -> Option<String> {
        if self.text.trim().is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.text))
    }

    /// Cursor offset (column, row) inside the draft box
    pub fn cursor(&self) -> (u16, u16) {
        let row = self.text.matches('\n').count();
        let col = self
            .text
            .rsplit('\n')
            .next()
            .map(|line| line.chars().count())
            .unwrap_or(0);
        (
            u16::try_from(col).unwrap_or(u16::MAX),
            u16::try_from(row).unwrap_or(u16::MAX),
        )
    }
}
