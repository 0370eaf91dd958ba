//! Interactive terminal prompts.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result, bail};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// Shown instead of a secret default.
const MASK: &str = "*****";

/// Formats a prompt label with its current value.
fn label(prompt: &str, default: &str, secret: bool) -> String {
    if default.is_empty() {
        format!("{prompt}: ")
    } else if secret {
        format!("{prompt} [{MASK}]: ")
    } else {
        format!("{prompt} [{default}]: ")
    }
}

/// Trims an answer and falls back to `default` when it is blank.
fn resolve_answer(raw: &str, default: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        String::from(default)
    } else {
        String::from(trimmed)
    }
}

/// Reads one line from `input`.
fn read_line(input: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line)
}

/// Prompts for a visible value; a blank answer keeps `default`.
///
/// # Errors
///
/// Returns an error if reading or writing the terminal fails.
pub fn read_input(
    input: &mut impl BufRead,
    out: &mut impl Write,
    prompt: &str,
    default: &str,
) -> Result<String> {
    write!(out, "{}", label(prompt, default, false))?;
    out.flush()?;
    Ok(resolve_answer(&read_line(input)?, default))
}

/// Prompts for a hidden value; a blank answer keeps `default`.
///
/// Keystrokes are not echoed when stdin is a terminal. Piped input is read
/// as a plain line.
///
/// # Errors
///
/// Returns an error if reading or writing the terminal fails or the user
/// interrupts the prompt.
pub fn read_secret(out: &mut impl Write, prompt: &str, default: &str) -> Result<String> {
    write!(out, "{}", label(prompt, default, true))?;
    out.flush()?;

    let raw = if io::stdin().is_terminal() {
        enable_raw_mode().context("failed to enable raw mode")?;
        let result = read_hidden();
        disable_raw_mode().context("failed to disable raw mode")?;
        writeln!(out)?;
        result?
    } else {
        read_line(&mut io::stdin().lock())?
    };

    Ok(resolve_answer(&raw, default))
}

/// Collects keystrokes until Enter, without echo.
fn read_hidden() -> Result<String> {
    let mut buf = String::new();
    loop {
        let Event::Key(key) = event::read().context("failed to read terminal event")? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(buf),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                bail!("interrupted")
            }
            KeyCode::Esc => bail!("cancelled"),
            KeyCode::Backspace => {
                buf.pop();
            }
            KeyCode::Char(c) => buf.push(c),
            _ => {}
        }
    }
}

/// Returns `true` for answers starting with `y` or `Y`.
fn is_affirmative(answer: &str) -> bool {
    answer
        .trim_start()
        .chars()
        .next()
        .is_some_and(|c| c.eq_ignore_ascii_case(&'y'))
}

/// Asks a yes/no question defaulting to no.
///
/// # Errors
///
/// Returns an error if reading or writing the terminal fails.
pub fn confirm(input: &mut impl BufRead, out: &mut impl Write, question: &str) -> Result<bool> {
    write!(out, "\n{question} (y/N): ")?;
    out.flush()?;
    Ok(is_affirmative(&read_line(input)?))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_label_variants() {
        // Arrange & Act & Assert
        assert_eq!(label("Username", "", false), "Username: ");
        assert_eq!(label("Username", "me", false), "Username [me]: ");
        assert_eq!(label("Password", "hunter2", true), "Password [*****]: ");
    }

    #[test]
    fn test_read_input_uses_answer() {
        // Arrange
        let mut input = io::Cursor::new("  new@example.com \n");
        let mut out = Vec::new();

        // Act
        let value = read_input(&mut input, &mut out, "Username", "old@example.com").unwrap();

        // Assert
        assert_eq!(value, "new@example.com");
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Username [old@example.com]: "
        );
    }

    #[test]
    fn test_read_input_blank_keeps_default() {
        // Arrange
        let mut input = io::Cursor::new("\n");
        let mut out = Vec::new();

        // Act
        let value = read_input(&mut input, &mut out, "Username", "old@example.com").unwrap();

        // Assert
        assert_eq!(value, "old@example.com");
    }

    #[test]
    fn test_read_input_eof_keeps_default() {
        // Arrange
        let mut input = io::Cursor::new("");
        let mut out = Vec::new();

        // Act
        let value = read_input(&mut input, &mut out, "Username", "").unwrap();

        // Assert
        assert_eq!(value, "");
    }

    #[test]
    fn test_confirm_answers() {
        // Arrange
        let cases = [
            ("y\n", true),
            ("Yes\n", true),
            ("yolo\n", true),
            ("n\n", false),
            ("\n", false),
            ("sure\n", false),
            ("", false),
        ];

        for (answer, expected) in cases {
            let mut input = io::Cursor::new(answer);
            let mut out = Vec::new();

            // Act
            let result = confirm(&mut input, &mut out, "Are you sure?").unwrap();

            // Assert
            assert_eq!(result, expected, "answer {answer:?}");
        }
    }
}
