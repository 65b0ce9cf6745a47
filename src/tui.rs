use crate::auth::PasswordPrompt;
use crate::error::{LaunchError, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;

/// Masked password dialog drawn on the alternate screen.
#[derive(Debug, Default)]
pub struct PasswordModal;

impl PasswordPrompt for PasswordModal {
    fn prompt(&self, message: &str) -> Result<Option<String>> {
        let mut session = TerminalSession::enter().map_err(prompt_error)?;
        run_prompt(&mut session.terminal, message).map_err(prompt_error)
    }
}

fn prompt_error(err: io::Error) -> LaunchError {
    LaunchError::Install(format!("password prompt failed: {err}"))
}

/// Raw mode plus alternate screen, restored on drop.
struct TerminalSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalSession {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let setup = || -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
            let mut stdout = io::stdout();
            execute!(stdout, EnterAlternateScreen)?;
            Terminal::new(CrosstermBackend::new(stdout))
        };
        match setup() {
            Ok(terminal) => Ok(Self { terminal }),
            Err(err) => {
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                let _ = disable_raw_mode();
                Err(err)
            }
        }
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

#[derive(Debug, Default)]
struct PromptState {
    input: String,
}

enum Step {
    Continue,
    Submit,
    Cancel,
}

impl PromptState {
    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Step {
        match code {
            KeyCode::Enter => Step::Submit,
            KeyCode::Esc => Step::Cancel,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Step::Cancel,
            KeyCode::Backspace => {
                self.input.pop();
                Step::Continue
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                Step::Continue
            }
            _ => Step::Continue,
        }
    }
}

fn run_prompt<B: Backend>(terminal: &mut Terminal<B>, message: &str) -> io::Result<Option<String>> {
    let mut state = PromptState::default();
    loop {
        terminal.draw(|f| draw(f, message, &state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match state.handle_key(key.code, key.modifiers) {
                Step::Continue => {}
                Step::Submit => return Ok(Some(std::mem::take(&mut state.input))),
                Step::Cancel => return Ok(None),
            }
        }
    }
}

fn draw(frame: &mut Frame, message: &str, state: &PromptState) {
    let area = centered_rect(60, 9, frame.size());
    let masked = "*".repeat(state.input.chars().count());

    let lines = vec![
        Line::raw(message.to_string()),
        Line::raw(""),
        Line::from(vec![
            Span::styled("Password: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(masked.clone()),
        ]),
        Line::raw(""),
        Line::styled(
            "Enter to confirm | Esc to cancel",
            Style::default().fg(Color::DarkGray),
        ),
    ];

    let block = Block::default()
        .title(Span::styled(
            " Authentication required ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL);
    let inner = block.inner(area);

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true }),
        area,
    );

    if let Some((x, y)) = cursor_position(inner, masked.len()) {
        frame.set_cursor(x, y);
    }
}

/// Where the cursor sits after the masked input, if that is inside `inner`.
fn cursor_position(inner: Rect, masked_len: usize) -> Option<(u16, u16)> {
    let offset = u16::try_from("Password: ".len().saturating_add(masked_len)).unwrap_or(u16::MAX);
    let x = inner.x.saturating_add(offset);
    if inner.height > 2 && x < inner.x.saturating_add(inner.width) {
        Some((x, inner.y + 2))
    } else {
        None
    }
}

/// A `width` percent wide, `height` rows tall rectangle centred in `area`.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let height = height.min(area.height);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height - height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width) / 2),
            Constraint::Percentage(width),
            Constraint::Percentage((100 - width) / 2),
        ])
        .split(vertical[1])[1]
}
