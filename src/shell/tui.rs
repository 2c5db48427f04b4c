//! Full-screen terminal front end for the shell.
//!
//! Draws the form, result pane, history list, save dialog and error modal,
//! and feeds key presses back into [`Shell`].

use super::{Action, Focus, Shell, View};
use crate::completion::Mode;
use anyhow::Result;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use tracing::debug;
use tui_input::Input;

const KEY_HINTS: &str =
    " Enter generate · Tab next field · Ctrl+R history · Ctrl+S save · Esc quit ";

/// Run the TUI until the user quits.
pub async fn run_tui(shell: &mut Shell) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, shell).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

/// The main event loop. Generation is awaited inline, so no input is read
/// while a request is outstanding.
async fn run_event_loop<B: Backend>(terminal: &mut Terminal<B>, shell: &mut Shell) -> Result<()> {
    loop {
        terminal.draw(|frame| draw_ui(frame, shell))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };

        match shell.handle_key(key) {
            Action::Quit => return Ok(()),
            Action::Submit => {
                let outcome = shell
                    .submit(|shell| {
                        terminal.draw(|frame| draw_ui(frame, shell))?;
                        Ok(())
                    })
                    .await?;
                debug!(?outcome, "Submission finished");
            }
            Action::None => {}
        }
    }
}

/// Draw the whole screen for the current shell state.
fn draw_ui(frame: &mut Frame, shell: &Shell) {
    let size = frame.area();

    let outer = Block::default()
        .title(format!(" lyricgen · {} ", shell.model()))
        .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .title_bottom(Line::from(KEY_HINTS).style(Style::default().fg(Color::DarkGray)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = outer.inner(size);
    frame.render_widget(outer, size);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // prompt
            Constraint::Length(3), // max tokens + mode
            Constraint::Min(3),    // result
            Constraint::Length(1), // status
        ])
        .split(inner);

    let prompt_title = format!(" Enter your prompt ({}/50) ", shell.prompt().value().chars().count());
    draw_input(frame, rows[0], &prompt_title, shell.prompt(), shell.focus() == Focus::Prompt);

    let fields = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(40), Constraint::Min(20)])
        .split(rows[1]);
    draw_input(
        frame,
        fields[0],
        " Maximum number of tokens (1-500) ",
        shell.max_tokens(),
        shell.focus() == Focus::MaxTokens,
    );
    draw_mode(frame, fields[1], shell.mode(), shell.focus() == Focus::Mode);

    let result = Paragraph::new(shell.display())
        .wrap(Wrap { trim: false })
        .block(Block::default().title(" Lyrics ").borders(Borders::ALL));
    frame.render_widget(result, rows[2]);

    let status = if shell.is_busy() {
        Span::styled("Generating...", Style::default().fg(Color::Yellow))
    } else if let Some(status) = shell.status() {
        Span::styled(status.to_string(), Style::default().fg(Color::Green))
    } else {
        Span::raw("")
    };
    frame.render_widget(Paragraph::new(Line::from(status)), rows[3]);

    match shell.view() {
        View::Main => {}
        View::History { scroll } => draw_history(frame, shell, *scroll),
        View::Save { path } => draw_save_dialog(frame, path),
    }

    if let Some(error) = shell.error() {
        draw_error(frame, error);
    }
}

/// Draw a single-line input, scrolling it horizontally to keep the cursor visible.
fn draw_input(frame: &mut Frame, area: Rect, title: &str, input: &Input, focused: bool) {
    let border = if focused { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let input_width = inner_area.width as usize;
    if input_width == 0 {
        return;
    }
    let cursor_pos = input.visual_cursor();
    let scroll = cursor_pos.saturating_sub(input_width - 1);

    let visible_value: String = input.value().chars().skip(scroll).take(input_width).collect();
    frame.render_widget(
        Paragraph::new(Span::styled(visible_value, Style::default().fg(Color::White))),
        inner_area,
    );

    if focused {
        let cursor_x = inner_area.x + cursor_pos.saturating_sub(scroll) as u16;
        frame.set_cursor_position((cursor_x, inner_area.y));
    }
}

fn draw_mode(frame: &mut Frame, area: Rect, mode: Mode, focused: bool) {
    let border = if focused { Color::Cyan } else { Color::DarkGray };
    let option = |m: Mode| {
        let marker = if m == mode { "(•)" } else { "( )" };
        let style = if m == mode {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        Span::styled(format!("{} {}  ", marker, m.label()), style)
    };
    let line = Line::from(vec![option(Mode::Song), option(Mode::Poem)]);
    let widget = Paragraph::new(line).block(
        Block::default()
            .title(" Mode ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(widget, area);
}

fn draw_history(frame: &mut Frame, shell: &Shell, scroll: usize) {
    let area = frame.area();
    let popup = centered_rect(area.width.saturating_sub(8), area.height.saturating_sub(4), area);
    frame.render_widget(Clear, popup);

    let items: Vec<ListItem> = if shell.history().is_empty() {
        vec![ListItem::new(Span::styled(
            "No generations yet.",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        shell
            .history()
            .lines()
            .into_iter()
            .skip(scroll)
            .map(ListItem::new)
            .collect()
    };
    let list = List::new(items).block(
        Block::default()
            .title(" History ")
            .title_bottom(Line::from(" ↑/↓ scroll · Esc close ").style(Style::default().fg(Color::DarkGray)))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(list, popup);
}

fn draw_save_dialog(frame: &mut Frame, path: &Input) {
    let area = frame.area();
    let popup = centered_rect(area.width.saturating_sub(4).min(70), 3, area);
    frame.render_widget(Clear, popup);
    draw_input(frame, popup, " Save lyrics to (Enter save · Esc cancel) ", path, true);
}

fn draw_error(frame: &mut Frame, message: &str) {
    let area = frame.area();
    let width = area.width.saturating_sub(4).min(70);
    // Border plus a blank line and the dismiss hint.
    let text_width = width.saturating_sub(2).max(1) as usize;
    let text_lines = message.chars().count().div_ceil(text_width).max(1) as u16;
    let popup = centered_rect(width, text_lines + 4, area);
    frame.render_widget(Clear, popup);

    let body = vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(Span::styled("Enter/Esc to dismiss", Style::default().fg(Color::DarkGray))),
    ];
    let widget = Paragraph::new(body).wrap(Wrap { trim: true }).block(
        Block::default()
            .title(" Error ")
            .title_style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    );
    frame.render_widget(widget, popup);
}

/// Create a centered rectangle.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((area.width.saturating_sub(width)) / 2),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vertical[1]);

    horizontal[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionClient;
    use crate::config::{ClientConfig, FormDefaults};
    use ratatui::backend::TestBackend;

    fn test_shell() -> Shell {
        let client = CompletionClient::new(ClientConfig {
            url: "http://127.0.0.1:1/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key: None,
            timeout: None,
        })
        .unwrap();
        Shell::new(client, &FormDefaults::default())
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_centered_rect() {
        let area = Rect::new(0, 0, 100, 50);
        let centered = centered_rect(40, 10, area);
        assert_eq!(centered.width, 40);
        assert_eq!(centered.height, 10);
        assert_eq!(centered.x, 30); // (100 - 40) / 2
        assert_eq!(centered.y, 20); // (50 - 10) / 2
    }

    #[test]
    fn test_draw_main_view() {
        let shell = test_shell();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| draw_ui(frame, &shell)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Enter your prompt"));
        assert!(text.contains("Song"));
        assert!(text.contains("Poem"));
        assert!(text.contains("Lyrics"));
    }

    #[test]
    fn test_draw_on_narrow_terminal() {
        let mut shell = test_shell();
        let mut terminal = Terminal::new(TestBackend::new(4, 20)).unwrap();
        terminal.draw(|frame| draw_ui(frame, &shell)).unwrap();

        shell.prompt = Input::default().with_value("write about rain".to_string());
        terminal.draw(|frame| draw_ui(frame, &shell)).unwrap();

        shell.save_current();
        terminal.draw(|frame| draw_ui(frame, &shell)).unwrap();
    }

    #[test]
    fn test_draw_error_modal() {
        let mut shell = test_shell();
        shell.save_current();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| draw_ui(frame, &shell)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Error"));
        assert!(text.contains("No lyrics to save."));
    }

    #[test]
    fn test_draw_history_view() {
        let mut shell = test_shell();
        shell.history.push(Mode::Poem, "Waves");
        shell.show_history();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| draw_ui(frame, &shell)).unwrap();

        assert!(screen_text(&terminal).contains("Poem 1: Waves"));
    }
}
