//! Conversation state.
//!
//! This module provides the turn model and the `Conversation` that owns the
//! in-memory session for one interactive run: prompt formatting for the
//! engine and window truncation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default number of turns retained in a conversation.
pub const DEFAULT_WINDOW: usize = 20;

/// The speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Initial instructions loaded from a prompt file.
    System,
    /// The person at the keyboard.
    User,
    /// The inference engine.
    Assistant,
}

impl Role {
    /// Returns the capitalized label used in prompts and transcripts.
    pub fn label(self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One labelled message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who said it.
    pub role: Role,
    /// What was said.
    pub content: String,
}

impl Turn {
    /// Creates a turn.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

impl fmt::Display for Turn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.role, self.content)
    }
}

/// The ordered, capped turn history of the active session.
///
/// After every append the conversation holds at most `window` turns; older
/// turns are dropped first. A leading system turn is not pinned and ages out
/// like any other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<Turn>,
    window: usize,
}

impl Conversation {
    /// Creates an empty conversation with the default window.
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    /// Creates an empty conversation that retains at most `window` turns.
    pub fn with_window(window: usize) -> Self {
        Self {
            turns: Vec::new(),
            window: window.max(1),
        }
    }

    /// Renders the history plus a new user message as an engine prompt.
    ///
    /// Each turn becomes `"<Role>: <content>\n"`, followed by
    /// `"User: <input>\nAssistant: "`.
    pub fn format_prompt(&self, input: &str) -> String {
        let mut prompt = String::new();
        for turn in &self.turns {
            prompt.push_str(&format!("{}: {}\n", turn.role, turn.content));
        }
        prompt.push_str(&format!(
            "{}: {input}\n{}: ",
            Role::User,
            Role::Assistant
        ));
        prompt
    }

    /// Appends a single turn, then truncates to the window.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.truncate();
    }

    /// Appends a completed exchange: the user turn, then the assistant turn.
    pub fn append_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.push(Turn::user(user));
        self.push(Turn::assistant(assistant));
    }

    /// Replaces every turn, keeping only the most recent `window` of them.
    pub fn replace(&mut self, turns: Vec<Turn>) {
        self.turns = turns;
        self.truncate();
    }

    /// Discards all turns.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Returns the turns, oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns the number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns true if there are no turns.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Returns the maximum number of retained turns.
    pub fn window(&self) -> usize {
        self.window
    }

    fn truncate(&mut self) {
        if self.turns.len() > self.window {
            let excess = self.turns.len() - self.window;
            self.turns.drain(..excess);
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
