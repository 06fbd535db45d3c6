//! Terminal output of the client

use std::io::{self, Write};

use shared::protocol::{InputError, InputSpec};

/// Writes server text, input prompts and local notices to a terminal.
pub struct Renderer<W> {
    out: W,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Text of a `display` instruction.
    pub fn show(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text)?;
        self.out.flush()
    }

    /// Prompt line for a pending reply. Nothing is written for `None`.
    pub fn prompt(&mut self, input: &InputSpec) -> io::Result<()> {
        match input {
            InputSpec::None => return Ok(()),
            InputSpec::Text { max_len } => {
                write!(self.out, "> Enter input (max {} chars): ", max_len)?
            }
            InputSpec::Choice(tokens) => write!(self.out, "> Choose one ({}): ", tokens.join(", "))?,
        }
        self.out.flush()
    }

    /// Why a typed reply was refused.
    pub fn rejected(&mut self, error: &InputError) -> io::Result<()> {
        let text = match error {
            InputError::NotAscii => "Error: ASCII only.".to_string(),
            InputError::TooLong { max_len } => format!("Error: Max length is {}.", max_len),
            InputError::NotAnOption | InputError::Unexpected => {
                "Error: Invalid selection.".to_string()
            }
        };
        self.show(&text)
    }

    /// Client-side status line, prefixed with `[Client]`.
    pub fn notice(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "[Client] {}", text)?;
        self.out.flush()
    }
}
