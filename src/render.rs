//! Output rendering for the chat front-end.
//!
//! This module provides a trait-based rendering abstraction so that the
//! dispatcher and the response stream never write to the terminal directly.
//! The default implementation prints to stdout/stderr with optional ANSI
//! colouring of the speaker labels.

use std::io::{self, Stdout, Write};

/// ANSI escape code for bright blue text (used for the user label).
const ANSI_BLUE: &str = "\x1b[94m";

/// ANSI escape code for bright green text (used for the assistant label).
const ANSI_GREEN: &str = "\x1b[92m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for dim text (used for interruption notices).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - In-memory capture for tests
pub trait Renderer: Send {
    /// Called before the first unit of an assistant response is echoed.
    fn start_response(&mut self) {}

    /// Print a chunk of streamed response text.
    ///
    /// This is called incrementally as units arrive from the engine.
    fn print_text(&mut self, text: &str);

    /// Called when a response is complete.
    ///
    /// Used to ensure proper newlines after streaming.
    fn finish_response(&mut self);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when a response is interrupted by the user.
    fn print_interrupted(&mut self) {}
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    line_start: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            line_start: true,
        }
    }

    /// Returns the readline prompt for the user label.
    pub fn user_prompt(&self) -> String {
        if self.use_color {
            format!("{ANSI_BLUE}You:{ANSI_RESET} ")
        } else {
            "You: ".to_string()
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        print!("{text}");
        self.line_start = text.ends_with('\n');
        self.flush();
    }

    fn ensure_line_start(&mut self) {
        if !self.line_start {
            self.write("\n");
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_response(&mut self) {
        self.ensure_line_start();
        if self.use_color {
            self.write(&format!("{ANSI_GREEN}Assistant:{ANSI_RESET} "));
        } else {
            self.write("Assistant: ");
        }
    }

    fn print_text(&mut self, text: &str) {
        self.write(text);
    }

    fn finish_response(&mut self) {
        self.write("\n");
    }

    fn print_error(&mut self, error: &str) {
        self.ensure_line_start();
        if self.use_color {
            eprintln!("{ANSI_RED}Error:{ANSI_RESET} {error}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        self.ensure_line_start();
        self.write(&format!("{info}\n"));
    }

    fn print_interrupted(&mut self) {
        self.ensure_line_start();
        if self.use_color {
            self.write(&format!("{ANSI_DIM}[interrupted]{ANSI_RESET}\n"));
        } else {
            self.write("[interrupted]\n");
        }
    }
}
