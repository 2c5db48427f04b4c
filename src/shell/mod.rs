//! Interactive shell for lyric generation.
//!
//! The shell owns all mutable UI state:
//! - The prompt, max-tokens and mode inputs
//! - The currently displayed generation
//! - The session history
//! - Which view is open (main form, history list, save dialog) and any error modal
//!
//! Rendering and the terminal event loop live in [`tui`]; everything here is
//! plain state so it can be driven directly from tests.

pub mod history;
pub mod tui;

pub use history::HistoryLog;
pub use tui::run_tui;

use crate::completion::{
    CompletionClient, GenerationRequest, Mode, RequestError, MAX_PROMPT_CHARS, MAX_TOKENS,
    MIN_TOKENS,
};
use crate::config::FormDefaults;
use anyhow::{Context, Result};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

/// Digits the max-tokens field accepts ("500" is the widest valid value).
const MAX_TOKENS_DIGITS: usize = 3;
/// File name offered by the save dialog.
const DEFAULT_SAVE_NAME: &str = "lyrics.txt";
/// Extension appended when the chosen path has none.
const DEFAULT_EXTENSION: &str = "txt";

/// Which form field receives keystrokes in the main view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Prompt,
    MaxTokens,
    Mode,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Prompt => Focus::MaxTokens,
            Focus::MaxTokens => Focus::Mode,
            Focus::Mode => Focus::Prompt,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Prompt => Focus::Mode,
            Focus::MaxTokens => Focus::Prompt,
            Focus::Mode => Focus::MaxTokens,
        }
    }
}

/// The screen currently shown.
#[derive(Debug, Clone)]
pub enum View {
    Main,
    History { scroll: usize },
    Save { path: Input },
}

/// What a submission ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The remote call succeeded; display and history were updated.
    Generated,
    /// Local validation refused the input; no network call was made.
    Rejected,
    /// The remote call failed; display and history are unchanged.
    Failed,
}

/// What the event loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Submit,
    Quit,
}

/// All UI state plus the client it drives.
pub struct Shell {
    client: CompletionClient,
    prompt: Input,
    max_tokens: Input,
    mode: Mode,
    focus: Focus,
    display: String,
    history: HistoryLog,
    view: View,
    error: Option<String>,
    status: Option<String>,
    busy: bool,
}

impl Shell {
    /// Create a shell with the form pre-filled from configuration.
    pub fn new(client: CompletionClient, defaults: &FormDefaults) -> Self {
        let max_tokens = defaults.max_tokens.clamp(MIN_TOKENS, MAX_TOKENS);
        Self {
            client,
            prompt: Input::default(),
            max_tokens: Input::default().with_value(max_tokens.to_string()),
            mode: defaults.mode,
            focus: Focus::Prompt,
            display: String::new(),
            history: HistoryLog::new(),
            view: View::Main,
            error: None,
            status: None,
            busy: false,
        }
    }

    pub fn prompt(&self) -> &Input {
        &self.prompt
    }

    pub fn max_tokens(&self) -> &Input {
        &self.max_tokens
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn model(&self) -> &str {
        &self.client.model
    }

    /// Validate the form and run one generation.
    ///
    /// `before_call` runs after validation passes and the shell is marked
    /// busy, right before the request is sent. The event loop uses it to draw
    /// the loading label. It is not called when the input is rejected.
    pub async fn submit<F>(&mut self, before_call: F) -> Result<Outcome>
    where
        F: FnOnce(&Shell) -> Result<()>,
    {
        self.status = None;
        let request = match self.build_request() {
            Ok(request) => request,
            Err(message) => {
                debug!("Submission rejected: {}", message);
                self.error = Some(message);
                return Ok(Outcome::Rejected);
            }
        };

        self.busy = true;
        if let Err(e) = before_call(&*self) {
            self.busy = false;
            return Err(e);
        }
        let result = self.client.generate(&request).await;
        self.busy = false;

        match result {
            Ok(text) => {
                info!(mode = %request.mode(), "Generation succeeded");
                self.display = text.clone();
                self.history.push(request.mode(), text);
                Ok(Outcome::Generated)
            }
            Err(e) => {
                warn!(status = ?e.status(), "Generation failed: {}", e);
                self.error = Some(e.to_string());
                Ok(Outcome::Failed)
            }
        }
    }

    fn build_request(&self) -> Result<GenerationRequest, String> {
        let prompt = self.prompt.value();
        if prompt.trim().is_empty() {
            return Err(RequestError::EmptyPrompt.to_string());
        }
        let max_tokens = self.max_tokens.value().trim();
        if max_tokens.is_empty() {
            return Err("Please enter a maximum number of tokens.".to_string());
        }
        let max_tokens: u32 = max_tokens
            .parse()
            .map_err(|_| RequestError::TokensOutOfRange.to_string())?;
        GenerationRequest::new(prompt, self.mode, max_tokens).map_err(|e| e.to_string())
    }

    /// Open the history list.
    pub fn show_history(&mut self) {
        self.view = View::History { scroll: 0 };
    }

    /// Start saving the displayed text. Opens the save dialog unless there is
    /// nothing to save.
    pub fn save_current(&mut self) {
        self.status = None;
        if self.display.trim().is_empty() {
            self.error = Some("No lyrics to save.".to_string());
            return;
        }
        self.view = View::Save {
            path: Input::default().with_value(DEFAULT_SAVE_NAME.to_string()),
        };
    }

    /// Write the displayed text to the path typed into the save dialog.
    pub fn confirm_save(&mut self) {
        let View::Save { path } = &self.view else {
            return;
        };
        let raw = path.value().trim().to_string();
        self.view = View::Main;
        if raw.is_empty() {
            return;
        }

        let path = with_default_extension(&raw);
        match write_text(&path, &self.display) {
            Ok(()) => {
                info!("Saved lyrics to {}", path.display());
                self.status = Some(format!("Saved to {}", path.display()));
            }
            Err(e) => {
                warn!("Save failed: {:#}", e);
                self.error = Some(format!("Failed to save lyrics: {:#}", e));
            }
        }
    }

    /// Close the save dialog without writing.
    pub fn cancel_save(&mut self) {
        if matches!(self.view, View::Save { .. }) {
            self.view = View::Main;
        }
    }

    /// Route a key press to the modal, the open view, or the focused field.
    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.kind != KeyEventKind::Press {
            return Action::None;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Action::Quit;
        }

        if self.error.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.error = None;
            }
            return Action::None;
        }

        match &mut self.view {
            View::History { scroll } => {
                match key.code {
                    KeyCode::Esc | KeyCode::Enter => self.view = View::Main,
                    KeyCode::Up => *scroll = scroll.saturating_sub(1),
                    KeyCode::Down => {
                        *scroll = (*scroll + 1).min(self.history.len().saturating_sub(1))
                    }
                    _ => {}
                }
                Action::None
            }
            View::Save { path } => {
                match key.code {
                    KeyCode::Enter => self.confirm_save(),
                    KeyCode::Esc => self.cancel_save(),
                    _ => {
                        path.handle_event(&Event::Key(key));
                    }
                }
                Action::None
            }
            View::Main => self.handle_main_key(key),
        }
    }

    fn handle_main_key(&mut self, key: KeyEvent) -> Action {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return Action::Quit,
            KeyCode::Enter => return Action::Submit,
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Char('r') if ctrl => self.show_history(),
            KeyCode::Char('s') if ctrl => self.save_current(),
            _ => match self.focus {
                Focus::Prompt => self.edit_prompt(key),
                Focus::MaxTokens => self.edit_max_tokens(key),
                Focus::Mode => {
                    if matches!(key.code, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) {
                        self.mode = self.mode.toggled();
                    }
                }
            },
        }
        Action::None
    }

    /// Apply an edit to the prompt only if the result stays within the cap.
    fn edit_prompt(&mut self, key: KeyEvent) {
        let mut candidate = self.prompt.clone();
        candidate.handle_event(&Event::Key(key));
        if candidate.value().chars().count() <= MAX_PROMPT_CHARS {
            self.prompt = candidate;
        }
    }

    fn edit_max_tokens(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.step_max_tokens(1),
            KeyCode::Down => self.step_max_tokens(-1),
            KeyCode::Char(c) if !c.is_ascii_digit() => {}
            _ => {
                let mut candidate = self.max_tokens.clone();
                candidate.handle_event(&Event::Key(key));
                if candidate.value().len() <= MAX_TOKENS_DIGITS {
                    self.max_tokens = candidate;
                }
            }
        }
    }

    fn step_max_tokens(&mut self, delta: i64) {
        let next = match self.max_tokens.value().trim().parse::<i64>() {
            Ok(current) => current + delta,
            Err(_) => i64::from(MIN_TOKENS),
        };
        let next = next.clamp(i64::from(MIN_TOKENS), i64::from(MAX_TOKENS));
        self.max_tokens = Input::default().with_value(next.to_string());
    }
}

/// Append the default text extension when the path has none.
fn with_default_extension(raw: &str) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.extension().is_some() {
        path
    } else {
        path.with_extension(DEFAULT_EXTENSION)
    }
}

/// Create or truncate `path` and write `text` to it exactly.
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}
