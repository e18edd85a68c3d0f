//! Interactive chat over a local inference engine.
//!
//! This module turns the engine's raw text stream into a turn-based
//! conversation. It supports:
//!
//! - Streaming responses echoed as they are generated
//! - A capped conversation window replayed to the engine on every turn
//! - Named sessions saved to and loaded from disk
//! - Slash commands for session control
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: turns and the in-memory conversation
//! - [`commands`]: slash command parsing
//! - [`dispatch`]: command execution and the turn cycle

mod commands;
mod config;
mod dispatch;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_SYSTEM_CONFIG, SystemConfig};
pub use dispatch::{Dispatcher, Flow};
pub use session::{Conversation, DEFAULT_WINDOW, Role, Turn};
