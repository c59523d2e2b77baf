//! Interactive prompts: an arrow-key selection list and a line prompt.
//!
//! Raw input mode is owned by [`RawModeGuard`]; dropping the guard restores
//! cooked mode and the cursor, whichever way the selection ends.

use std::io::{self, BufRead, IsTerminal, Write};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::Stylize,
    terminal::{self, ClearType},
};
use tracing::debug;

use crate::errors::AppError;

/// One entry of a selection list.
#[derive(Debug, Clone)]
pub struct Choice<T> {
    pub label: String,
    pub value: T,
}

impl<T> Choice<T> {
    pub fn new(label: impl Into<String>, value: T) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Holds the terminal in raw mode with a hidden cursor until dropped.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn acquire() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let guard = RawModeGuard;
        execute!(io::stdout(), cursor::Hide)?;
        Ok(guard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), cursor::Show);
        let _ = terminal::disable_raw_mode();
    }
}

/// What a key press does to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Move(isize),
    Confirm,
    Cancel,
    Ignore,
}

fn key_action(key: &KeyEvent) -> KeyAction {
    if key.kind == KeyEventKind::Release {
        return KeyAction::Ignore;
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => KeyAction::Move(-1),
        KeyCode::Down | KeyCode::Char('j') => KeyAction::Move(1),
        KeyCode::Enter => KeyAction::Confirm,
        KeyCode::Esc => KeyAction::Cancel,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Cancel,
        _ => KeyAction::Ignore,
    }
}

/// Moves `index` by `delta` within `len` entries, wrapping at both ends.
fn step(index: usize, delta: isize, len: usize) -> usize {
    (index as isize + delta).rem_euclid(len as isize) as usize
}

fn render<T>(out: &mut impl Write, choices: &[Choice<T>], selected: usize) -> io::Result<()> {
    for (i, choice) in choices.iter().enumerate() {
        queue!(out, terminal::Clear(ClearType::CurrentLine))?;
        if i == selected {
            write!(out, "{} {}\r\n", "❯".cyan(), choice.label.as_str().cyan())?;
        } else {
            write!(out, "  {}\r\n", choice.label.as_str().dark_grey())?;
        }
    }
    out.flush()
}

/// Asks the user to pick one of `choices`.
///
/// Escape or Ctrl-C yields [`AppError::Cancelled`]. Without a terminal on
/// stdin the first choice is taken.
pub fn select<T: Clone>(message: &str, choices: &[Choice<T>]) -> Result<T, AppError> {
    let first = choices
        .first()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("nothing to select for {message:?}")))?;

    if !io::stdin().is_terminal() {
        debug!("stdin is not a terminal; selecting {:?}", first.label);
        println!("{} {message}: {}", "✔".green(), first.label.as_str().cyan());
        return Ok(first.value.clone());
    }

    let mut out = io::stdout();
    println!("{}\n", message.bold());

    let selected = {
        let _raw = RawModeGuard::acquire()?;
        let mut selected = 0;
        render(&mut out, choices, selected)?;

        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            match key_action(&key) {
                KeyAction::Move(delta) => {
                    selected = step(selected, delta, choices.len());
                    queue!(out, cursor::MoveUp(choices.len() as u16))?;
                    render(&mut out, choices, selected)?;
                }
                KeyAction::Confirm => break selected,
                KeyAction::Cancel => {
                    execute!(
                        out,
                        terminal::Clear(ClearType::All),
                        cursor::MoveTo(0, 0)
                    )?;
                    return Err(AppError::Cancelled);
                }
                KeyAction::Ignore => {}
            }
        }
    };

    // collapse the list into a one-line summary
    let rows = choices.len() as u16 + 2;
    execute!(
        out,
        cursor::MoveUp(rows),
        terminal::Clear(ClearType::FromCursorDown)
    )?;
    println!(
        "{} {message}: {}\n",
        "✔".green(),
        choices[selected].label.as_str().cyan()
    );
    Ok(choices[selected].value.clone())
}

/// Reads one trimmed line after printing `question`.
pub fn prompt(question: &str) -> Result<String, AppError> {
    print!("{question}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
