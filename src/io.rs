use std::collections::VecDeque;
use std::io::{stdin, BufRead as _, IsTerminal as _};

use console::Term;

use crate::output::Output;

/// Text input/output used by the `int 21h` services.
///
/// Both calls are synchronous; `request_input` blocks until a line is available.
pub trait Console {
    /// One line of input, without the line ending. Empty on end of input.
    fn request_input(&mut self) -> String;
    fn emit_output(&mut self, text: &str);
}

/// Reads from stdin and writes program output to stdout.
#[derive(Debug, Default)]
pub struct TerminalConsole;

impl TerminalConsole {
    pub fn new() -> Self {
        TerminalConsole
    }
}

impl Console for TerminalConsole {
    fn request_input(&mut self) -> String {
        if stdin().is_terminal() {
            match Term::stdout().read_line() {
                Ok(line) => {
                    // The terminal already echoed the line and its newline
                    Output::set_line_start(true);
                    line
                }
                Err(e) => {
                    tprintln!(Always, "Failed to read from terminal: {}", e);
                    String::new()
                }
            }
        } else {
            let mut line = String::new();
            if let Err(e) = stdin().lock().read_line(&mut line) {
                tprintln!(Always, "Failed to read from stdin: {}", e);
                line.clear();
            }
            line.trim_end_matches(['\r', '\n']).to_owned()
        }
    }

    fn emit_output(&mut self, text: &str) {
        Output::Normal.print_str(text);
    }
}

/// Scripted input and captured output, for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct BufferConsole {
    input: VecDeque<String>,
    output: String,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Console that answers input requests with `lines`, in order.
    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        BufferConsole {
            input: lines.into_iter().map(Into::into).collect(),
            output: String::new(),
        }
    }

    pub fn push_input(&mut self, line: impl Into<String>) {
        self.input.push_back(line.into());
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// Take everything written so far.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

impl Console for BufferConsole {
    fn request_input(&mut self) -> String {
        self.input.pop_front().unwrap_or_default()
    }

    fn emit_output(&mut self, text: &str) {
        self.output.push_str(text);
    }
}

impl<C: Console + ?Sized> Console for &mut C {
    fn request_input(&mut self) -> String {
        (**self).request_input()
    }

    fn emit_output(&mut self, text: &str) {
        (**self).emit_output(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_console() {
        let mut console = BufferConsole::with_input(["7", "x"]);
        assert_eq!(console.request_input(), "7");
        console.emit_output("a");
        console.emit_output("b");
        assert_eq!(console.request_input(), "x");
        assert_eq!(console.request_input(), "");
        assert_eq!(console.take_output(), "ab");
        assert_eq!(console.output(), "");
    }
}
