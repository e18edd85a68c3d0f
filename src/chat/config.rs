//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg`, the optional
//! system-wide JSON configuration, and the resolved `ChatConfig`. Each
//! startup parameter comes from the command line if given, else from the
//! system configuration, else from a built-in default.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use arrrg_derive::CommandLine;
use serde::Deserialize;

use crate::chat::session::DEFAULT_WINDOW;
use crate::engine::{
    DEFAULT_CTX_SIZE, DEFAULT_ENGINE_PROGRAM, DEFAULT_GPU_LAYERS, DEFAULT_SENTINEL, EngineSpec,
    ResponseStream,
};
use crate::error::{Error, Result};
use crate::history::HistoryStore;
use crate::prompts::DEFAULT_PROMPTS_DIR;

/// Location of the system-wide configuration file.
pub const DEFAULT_SYSTEM_CONFIG: &str = "/opt/llm-chat/config/system.json";

/// Command-line arguments for the llm-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Path to the model file.
    #[arrrg(optional, "Path to model file", "PATH")]
    pub model: Option<String>,

    /// Number of layers to offload to the GPU.
    #[arrrg(optional, "Number of GPU layers (default: 35)", "N")]
    pub gpu_layers: Option<u32>,

    /// Context size in tokens.
    #[arrrg(optional, "Context size (default: 4096)", "N")]
    pub ctx_size: Option<u32>,

    /// Initial prompt file name.
    #[arrrg(optional, "Initial prompt file name", "NAME")]
    pub prompt: Option<String>,

    /// Path to the engine binary.
    #[arrrg(optional, "Engine binary (default: ./main)", "PATH")]
    pub engine: Option<String>,

    /// Path to the system configuration file.
    #[arrrg(optional, "System config file (default: /opt/llm-chat/config/system.json)", "PATH")]
    pub system_config: Option<String>,

    /// Directory for saved sessions.
    #[arrrg(optional, "History directory (default: ~/.llm_chat_history)", "DIR")]
    pub history_dir: Option<String>,

    /// Directory holding prompt files.
    #[arrrg(optional, "Prompts directory (default: /opt/llm-chat/prompts)", "DIR")]
    pub prompts_dir: Option<String>,

    /// Maximum number of turns kept in the conversation.
    #[arrrg(optional, "Turns kept in the conversation (default: 20)", "N")]
    pub window: Option<usize>,

    /// End-of-turn marker printed by the engine.
    #[arrrg(optional, "End-of-turn marker printed by the engine (default: \"User: \")", "TEXT")]
    pub sentinel: Option<String>,

    /// Only accept the end-of-turn marker at the start of a line.
    #[arrrg(flag, "Only accept the end-of-turn marker at the start of a line")]
    pub anchor_sentinel: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// The system-wide configuration file.
///
/// Every key is optional; a missing file behaves like an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Default model file.
    pub model_path: Option<String>,
    /// Default GPU layer count.
    pub default_gpu_layers: Option<u32>,
    /// Default context size.
    pub default_ctx_size: Option<u32>,
    /// Default engine binary.
    pub engine_path: Option<String>,
}

impl SystemConfig {
    /// Reads the configuration at `path`.
    ///
    /// A missing file yields the empty configuration. A file that exists but
    /// cannot be read or parsed is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no system config; using defaults");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(Error::io(
                    format!("failed to open {}", path.display()),
                    err,
                ));
            }
        };
        serde_json::from_reader(BufReader::new(file)).map_err(|err| {
            Error::serialization(
                format!("failed to parse {}", path.display()),
                Some(Box::new(err)),
            )
        })
    }
}

/// Configuration for a chat run.
///
/// This struct holds the resolved configuration values after layering
/// command-line arguments over the system configuration and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Engine binary.
    pub engine_path: PathBuf,

    /// Model file; required to start the engine.
    pub model_path: Option<PathBuf>,

    /// Number of GPU layers.
    pub gpu_layers: u32,

    /// Context size in tokens.
    pub ctx_size: u32,

    /// Prompt file loaded as the leading system turn.
    pub prompt: Option<String>,

    /// Directory for saved sessions.
    pub history_dir: PathBuf,

    /// Directory holding prompt files.
    pub prompts_dir: PathBuf,

    /// Maximum number of turns kept in the conversation.
    pub window: usize,

    /// End-of-turn marker printed by the engine.
    pub sentinel: String,

    /// Whether the marker must start a line.
    pub anchor_sentinel: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Engine: ./main
    /// - Model: none
    /// - GPU layers: 35
    /// - Context size: 4096
    /// - Window: 20 turns
    /// - Sentinel: "User: ", unanchored
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            engine_path: PathBuf::from(DEFAULT_ENGINE_PROGRAM),
            model_path: None,
            gpu_layers: DEFAULT_GPU_LAYERS,
            ctx_size: DEFAULT_CTX_SIZE,
            prompt: None,
            history_dir: HistoryStore::default_dir(),
            prompts_dir: PathBuf::from(DEFAULT_PROMPTS_DIR),
            window: DEFAULT_WINDOW,
            sentinel: DEFAULT_SENTINEL.to_string(),
            anchor_sentinel: false,
            use_color: true,
        }
    }

    /// Layers `args` over `system` over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a zero window or an empty sentinel.
    pub fn resolve(args: ChatArgs, system: SystemConfig) -> Result<Self> {
        let defaults = Self::new();
        if args.window == Some(0) {
            return Err(Error::validation(
                "window must keep at least one turn",
                Some("window".to_string()),
            ));
        }
        if args.sentinel.as_deref() == Some("") {
            return Err(Error::validation(
                "sentinel must not be empty",
                Some("sentinel".to_string()),
            ));
        }
        Ok(Self {
            engine_path: args
                .engine
                .or(system.engine_path)
                .map(PathBuf::from)
                .unwrap_or(defaults.engine_path),
            model_path: args.model.or(system.model_path).map(PathBuf::from),
            gpu_layers: args
                .gpu_layers
                .or(system.default_gpu_layers)
                .unwrap_or(defaults.gpu_layers),
            ctx_size: args
                .ctx_size
                .or(system.default_ctx_size)
                .unwrap_or(defaults.ctx_size),
            prompt: args.prompt,
            history_dir: args
                .history_dir
                .map(PathBuf::from)
                .unwrap_or(defaults.history_dir),
            prompts_dir: args
                .prompts_dir
                .map(PathBuf::from)
                .unwrap_or(defaults.prompts_dir),
            window: args.window.unwrap_or(defaults.window),
            sentinel: args.sentinel.unwrap_or(defaults.sentinel),
            anchor_sentinel: args.anchor_sentinel,
            use_color: !args.no_color,
        })
    }

    /// Returns the launch description for the engine.
    pub fn engine_spec(&self) -> EngineSpec {
        EngineSpec {
            program: self.engine_path.clone(),
            model_path: self.model_path.clone(),
            gpu_layers: self.gpu_layers,
            ctx_size: self.ctx_size,
        }
    }

    /// Returns the response parser for the configured marker.
    pub fn response_stream(&self) -> ResponseStream {
        ResponseStream::with_sentinel(self.sentinel.clone()).anchored(self.anchor_sentinel)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}
