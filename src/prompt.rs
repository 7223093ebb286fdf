//! Line-based terminal interaction.

use std::io::{self, BufRead, Write};

/// Source of interactive answers and sink for user-facing messages.
pub trait Prompt {
    /// Shows `question` and returns the answer without its line ending, or
    /// `None` once the input is closed.
    fn ask(&mut self, question: &str) -> io::Result<Option<String>>;

    /// Shows a message that needs no answer.
    fn tell(&mut self, message: &str);
}

/// Prompt bound to the process' stdin and stdout.
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        print!("{question}");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn tell(&mut self, message: &str) {
        println!("{message}");
    }
}
