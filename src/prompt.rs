// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Operator prompts.
//!
//! Every top-level action of a bootstrap run is gated by a yes/no question.
//! The gate only accepts an exact "y" or "n", and keeps asking on any other
//! answer. Prompting is modeled through the [`Prompt`] trait, so a run can be
//! driven by a terminal, or by any line-oriented reader when standard input is
//! not a terminal.

use inquire::{InquireError, Text};
use std::io::{BufRead, Write};
use tracing::debug;

/// Ask the operator questions.
pub trait Prompt {
    /// Ask yes/no question.
    ///
    /// Keeps asking until the answer is exactly "y" or "n".
    fn confirm(&mut self, message: &str) -> Result<bool>;

    /// Ask for free text answer.
    fn text(&mut self, message: &str) -> Result<String>;
}

/// Map raw answer to confirmation, if it is one.
fn parse_confirmation(answer: &str) -> Option<bool> {
    match answer {
        "y" => Some(true),
        "n" => Some(false),
        _ => None,
    }
}

/// Prompt through the terminal with inquire.
#[derive(Debug, Default, Clone)]
pub struct InquirePrompt;

impl InquirePrompt {
    /// Construct new terminal prompt.
    pub fn new() -> Self {
        Self
    }
}

impl Prompt for InquirePrompt {
    fn confirm(&mut self, message: &str) -> Result<bool> {
        loop {
            let answer = match Text::new(message).with_help_message("y/n").prompt() {
                Ok(answer) => answer,
                Err(InquireError::OperationCanceled) => continue,
                Err(err) => return Err(err.into()),
            };

            if let Some(confirmed) = parse_confirmation(&answer) {
                return Ok(confirmed);
            }
            debug!("ignore answer {answer:?}");
        }
    }

    fn text(&mut self, message: &str) -> Result<String> {
        Ok(Text::new(message).prompt()?)
    }
}

/// Prompt through plain line-oriented streams.
///
/// Writes each question to `output`, and reads one line from `input` as the
/// answer. Only the line terminator is stripped from the answer.
#[derive(Debug)]
pub struct LinePrompt<R, W>
where
    R: BufRead,
    W: Write,
{
    input: R,
    output: W,
}

impl<R, W> LinePrompt<R, W>
where
    R: BufRead,
    W: Write,
{
    /// Construct new line prompt.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Give back underlying streams.
    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    fn read_answer(&mut self, message: &str) -> Result<String> {
        write!(self.output, "{message} ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(PromptError::EndOfInput);
        }

        // INVARIANT: Chomp line terminator only.
        let answer = line
            .strip_suffix("\r\n")
            .or(line.strip_suffix('\n'))
            .unwrap_or(line.as_str())
            .to_string();

        Ok(answer)
    }
}

impl<R, W> Prompt for LinePrompt<R, W>
where
    R: BufRead,
    W: Write,
{
    fn confirm(&mut self, message: &str) -> Result<bool> {
        loop {
            let answer = self.read_answer(message)?;
            if let Some(confirmed) = parse_confirmation(&answer) {
                return Ok(confirmed);
            }
            debug!("ignore answer {answer:?}");
        }
    }

    fn text(&mut self, message: &str) -> Result<String> {
        self.read_answer(message)
    }
}

/// Prompt error types.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// Operator interrupted the prompt, e.g., hit Ctrl-C.
    #[error("operator interrupted prompt")]
    Interrupted,

    /// Input ran dry before an answer was given.
    #[error("reached end of input while waiting for an answer")]
    EndOfInput,

    /// Terminal prompt failed.
    #[error(transparent)]
    Inquire(InquireError),

    /// Reading or writing plain streams failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<InquireError> for PromptError {
    fn from(err: InquireError) -> Self {
        match err {
            InquireError::OperationInterrupted => Self::Interrupted,
            err => Self::Inquire(err),
        }
    }
}

/// Friendly result alias :3
pub type Result<T, E = PromptError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;
    use std::io::Cursor;

    #[test]
    fn confirm_declined() -> anyhow::Result<()> {
        let mut prompt = LinePrompt::new(Cursor::new("n\n"), Vec::new());
        assert!(!prompt.confirm("Do you want to config git? (y/n)")?);

        let (_, output) = prompt.into_inner();
        assert_eq!(String::from_utf8(output)?, "Do you want to config git? (y/n) ");

        Ok(())
    }

    #[test]
    fn confirm_reprompts_until_exact_answer() -> anyhow::Result<()> {
        let mut prompt = LinePrompt::new(Cursor::new("yes\nY\n y\n\ny\nn\n"), Vec::new());
        assert!(prompt.confirm("ok?")?);

        let (mut input, output) = prompt.into_inner();
        assert_eq!(String::from_utf8(output)?, "ok? ".repeat(5));

        // Remaining input is left untouched.
        let mut rest = String::new();
        input.read_line(&mut rest)?;
        assert_eq!(rest, "n\n");

        Ok(())
    }

    #[test_case("y\r\n", true; "crlf yes")]
    #[test_case("n", false; "no without newline")]
    #[test]
    fn confirm_strips_line_terminator(input: &str, expect: bool) -> anyhow::Result<()> {
        let mut prompt = LinePrompt::new(Cursor::new(input.to_string()), Vec::new());
        pretty_assertions::assert_eq!(prompt.confirm("ok?")?, expect);
        Ok(())
    }

    #[test]
    fn confirm_end_of_input() {
        let mut prompt = LinePrompt::new(Cursor::new("maybe\n"), Vec::new());
        let result = prompt.confirm("ok?");
        assert!(matches!(result, Err(PromptError::EndOfInput)));
    }

    #[test]
    fn text_keeps_inner_whitespace() -> anyhow::Result<()> {
        let mut prompt = LinePrompt::new(Cursor::new("John Doe\n\n"), Vec::new());
        assert_eq!(prompt.text("name?")?, "John Doe");
        assert_eq!(prompt.text("mail?")?, "");
        Ok(())
    }
}
