//! Command dispatch and the inference turn cycle.
//!
//! The `Dispatcher` owns everything one interactive run mutates: the
//! engine, the conversation, and handles to the history and prompt stores.
//! Each input line either runs a command or starts a turn; failures are
//! reported through the renderer and never end the run.

use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::chat::commands::{ChatCommand, help_text, parse_command};
use crate::chat::session::{Conversation, Turn};
use crate::engine::{Engine, ResponseStream};
use crate::error::{Error, Result};
use crate::history::HistoryStore;
use crate::observability::{CHAT_COMMANDS, CHAT_TURN_DURATION, CHAT_TURN_ERRORS, CHAT_TURNS};
use crate::prompts::PromptLibrary;
use crate::render::Renderer;

/// What the run should do after a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading input.
    Continue,
    /// End the run.
    Exit,
}

/// Drives one interactive run against an engine.
pub struct Dispatcher<E: Engine> {
    engine: E,
    conversation: Conversation,
    history: HistoryStore,
    prompts: PromptLibrary,
    stream: ResponseStream,
    needs_resync: bool,
}

impl<E: Engine> Dispatcher<E> {
    /// Creates a dispatcher with the default response parser.
    pub fn new(
        engine: E,
        conversation: Conversation,
        history: HistoryStore,
        prompts: PromptLibrary,
    ) -> Self {
        Self {
            engine,
            conversation,
            history,
            prompts,
            stream: ResponseStream::new(),
            needs_resync: false,
        }
    }

    /// Replaces the response parser.
    pub fn with_stream(mut self, stream: ResponseStream) -> Self {
        self.stream = stream;
        self
    }

    /// Returns the conversation.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the history store.
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Returns the engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Consumes the dispatcher and returns the engine.
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Loads prompt `name` from the prompt library as the leading system turn.
    ///
    /// A missing or empty prompt is reported and leaves the conversation
    /// unchanged.
    pub fn load_initial_prompt(&mut self, name: &str, renderer: &mut dyn Renderer) {
        let path = self.prompts.path_for(name);
        match self.prompts.load(name) {
            Ok(Some(prompt)) => {
                self.conversation.push(Turn::system(prompt));
                renderer.print_info(&format!("Loaded initial prompt from: {}", path.display()));
            }
            Ok(None) => {
                renderer.print_info(&format!("Prompt file is empty: {}", path.display()));
            }
            Err(err) if err.is_not_found() => {
                renderer.print_error(&format!("Prompt file not found: {}", path.display()));
            }
            Err(err) => renderer.print_error(&err.to_string()),
        }
    }

    /// Handles one line of user input.
    ///
    /// Empty lines are ignored, `/` lines are commands, and anything else is
    /// sent to the engine as a new user turn.
    pub async fn handle_line(
        &mut self,
        line: &str,
        renderer: &mut dyn Renderer,
        cancel: &CancellationToken,
    ) -> Flow {
        let line = line.trim();
        if line.is_empty() {
            return Flow::Continue;
        }
        if let Some(command) = parse_command(line) {
            return self.run_command(command, renderer);
        }
        if let Err(err) = self.send_turn(line, renderer, cancel).await {
            if err.is_abort() {
                renderer.print_interrupted();
            } else {
                renderer.print_error(&err.to_string());
            }
        }
        Flow::Continue
    }

    /// Runs a parsed command.
    pub fn run_command(&mut self, command: ChatCommand, renderer: &mut dyn Renderer) -> Flow {
        CHAT_COMMANDS.click();
        match command {
            ChatCommand::Exit => return Flow::Exit,
            ChatCommand::Clear => {
                self.conversation.clear();
                renderer.print_info("Chat context cleared.");
            }
            ChatCommand::Save(name) => {
                if self.conversation.is_empty() {
                    renderer.print_info("Nothing to save yet.");
                } else {
                    match self.history.save(self.conversation.turns(), name.as_deref()) {
                        Ok(saved) => renderer
                            .print_info(&format!("History saved to: {}", saved.path.display())),
                        Err(err) => {
                            renderer.print_error(&format!("Failed to save history: {err}"))
                        }
                    }
                }
            }
            ChatCommand::Load(name) => match self.history.load(&name) {
                Ok(turns) => {
                    self.conversation.replace(turns);
                    renderer.print_info(&format!(
                        "Loaded history {name} ({} turns)",
                        self.conversation.len()
                    ));
                }
                Err(err) if err.is_not_found() => {
                    renderer.print_error(&format!("No history file found with name: {name}"));
                }
                Err(err) => renderer.print_error(&format!("Failed to load history: {err}")),
            },
            ChatCommand::Delete(name) => match self.history.delete(&name) {
                Ok(()) => renderer.print_info(&format!("Deleted history: {name}")),
                Err(err) if err.is_not_found() => {
                    renderer.print_error(&format!("No history file found with name: {name}"));
                }
                Err(err) => renderer.print_error(&format!("Failed to delete history: {err}")),
            },
            ChatCommand::List => match self.history.list() {
                Ok(names) if names.is_empty() => renderer.print_info("No chat histories found."),
                Ok(names) => renderer.print_info(&bulleted("Available chat histories:", &names)),
                Err(err) => renderer.print_error(&format!("Failed to list histories: {err}")),
            },
            ChatCommand::Prompts => match self.prompts.list() {
                Ok(names) if names.is_empty() => renderer.print_info("No prompt files found."),
                Ok(names) => renderer.print_info(&bulleted("Available prompt files:", &names)),
                Err(err) => renderer.print_error(&format!("Failed to list prompts: {err}")),
            },
            ChatCommand::Context => {
                let mut text = String::from("Current context:");
                for turn in self.conversation.turns() {
                    text.push('\n');
                    text.push_str(&turn.to_string());
                }
                renderer.print_info(&text);
            }
            ChatCommand::Help => renderer.print_info(help_text()),
            ChatCommand::Invalid(message) => renderer.print_error(&message),
        }
        Flow::Continue
    }

    /// Sends `input` as a user turn and streams the response.
    ///
    /// The exchange is appended to the conversation only once the complete
    /// response has arrived; on any error the conversation is unchanged.
    pub async fn send_turn(
        &mut self,
        input: &str,
        renderer: &mut dyn Renderer,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let start = Instant::now();
        let result = self.exchange(input, renderer, cancel).await;
        match &result {
            Ok(response) => {
                CHAT_TURNS.click();
                CHAT_TURN_DURATION.add(start.elapsed().as_secs_f64());
                self.conversation.append_exchange(input, response.clone());
                tracing::debug!(turns = self.conversation.len(), "turn complete");
            }
            Err(err) => {
                CHAT_TURN_ERRORS.click();
                if err.is_abort() {
                    self.needs_resync = true;
                }
                tracing::debug!(error = %err, "turn failed");
            }
        }
        result
    }

    async fn exchange(
        &mut self,
        input: &str,
        renderer: &mut dyn Renderer,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if self.needs_resync {
            self.stream.discard_pending(&mut self.engine, cancel).await?;
            self.needs_resync = false;
        }
        let prompt = self.conversation.format_prompt(input);
        self.engine.write_line(&prompt).await?;
        renderer.start_response();
        let response = self
            .stream
            .read_response(&mut self.engine, renderer, cancel)
            .await;
        if !matches!(response, Err(Error::Abort { .. })) {
            renderer.finish_response();
        }
        response
    }
}

fn bulleted(header: &str, names: &[String]) -> String {
    let mut text = header.to_string();
    for name in names {
        text.push_str("\n- ");
        text.push_str(name);
    }
    text
}
