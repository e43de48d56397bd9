use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

use crate::errors::AppError;

/// A line-oriented conversation with the user.
pub trait Prompt {
    /// Prints one line of information.
    fn say(&mut self, line: &str) -> io::Result<()>;
    /// Prints `question` and reads the trimmed answer. EOF reads as an empty answer.
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl LinePrompt<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn say(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.output, "{line}")?;
        self.output.flush()
    }

    fn ask(&mut self, question: &str) -> io::Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(answer.trim().to_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Local,
    Tunnel,
}

/// Asks whether to listen locally or through the tunnel. Anything but an
/// explicit tunnel answer picks local.
pub fn choose_mode(prompt: &mut dyn Prompt) -> Result<Mode, AppError> {
    prompt
        .say("Select mode: [1] Local (default)  [2] Tunnel (ngrok)")
        .map_err(AppError::Prompt)?;
    let answer = prompt
        .ask("Enter 1 or 2 (default 1): ")
        .map_err(AppError::Prompt)?;
    let mode = match answer.to_ascii_lowercase().as_str() {
        "2" | "tunnel" | "ngrok" => Mode::Tunnel,
        _ => Mode::Local,
    };
    Ok(mode)
}
