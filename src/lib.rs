// Public modules
pub mod chat;
pub mod engine;
pub mod error;
pub mod history;
pub mod interrupt;
pub mod observability;
pub mod prompts;
pub mod render;
pub mod utils;

// Re-exports
pub use chat::{Conversation, Dispatcher, Flow, Role, Turn};
pub use engine::{ChildProcessChannel, Engine, EngineSpec, ResponseStream, UnitSource};
pub use error::{Error, Result};
pub use history::{HistoryStore, SavedSession};
pub use interrupt::Interrupt;
pub use observability::register_biometrics;
pub use prompts::PromptLibrary;
pub use render::{PlainTextRenderer, Renderer};
