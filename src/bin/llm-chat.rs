//! Interactive chat front-end for a local inference engine.
//!
//! This binary starts the engine as a child process, replays the
//! conversation to it on every turn, and streams each response back to the
//! terminal as it is generated.
//!
//! # Usage
//!
//! ```bash
//! # Model from the command line, everything else from defaults
//! llm-chat --model /models/llama-7b.gguf
//!
//! # Offload fewer layers and start from a named system prompt
//! llm-chat --model /models/llama-7b.gguf --gpu-layers 20 --prompt coder
//!
//! # Disable colors (useful for piping output)
//! llm-chat --no-color
//! ```
//!
//! Defaults for the model, GPU layers, context size, and engine binary are
//! read from `/opt/llm-chat/config/system.json` when it exists.
//!
//! # Commands
//!
//! - `/exit` - End chat session
//! - `/clear` - Clear current context
//! - `/save [name]`, `/load <name>`, `/delete <name>`, `/list` - Manage saved sessions
//! - `/prompts` - List available prompt files
//! - `/context` - Show current context
//!
//! Ctrl+C at the prompt is ignored; during a response it stops generation.

use std::process::ExitCode;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use llm_chat::chat::{
    ChatArgs, ChatConfig, Conversation, DEFAULT_SYSTEM_CONFIG, Dispatcher, Flow,
    PlainTextRenderer, Renderer, SystemConfig, help_text,
};
use llm_chat::{ChildProcessChannel, Error, HistoryStore, Interrupt, PromptLibrary};

/// Main entry point for the llm-chat application.
#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let (args, _) = ChatArgs::from_command_line_relaxed("llm-chat [OPTIONS]");
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("llm-chat: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LLM_CHAT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let system_path = args
        .system_config
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_CONFIG.to_string());
    let system = SystemConfig::load(&system_path)
        .map_err(|err| Error::startup(format!("unusable system config: {err}"), None))?;
    let config = ChatConfig::resolve(args, system)?;

    let history = HistoryStore::open(&config.history_dir)?;
    let prompts = PromptLibrary::new(&config.prompts_dir);
    let mut renderer = PlainTextRenderer::with_color(config.use_color);

    print_banner(&config);

    let engine = ChildProcessChannel::spawn(&config.engine_spec())?;
    let mut dispatcher = Dispatcher::new(
        engine,
        Conversation::with_window(config.window),
        history,
        prompts,
    )
    .with_stream(config.response_stream());
    if let Some(prompt) = &config.prompt {
        dispatcher.load_initial_prompt(prompt, &mut renderer);
    }

    let interrupt = Interrupt::new();
    let handler = interrupt.clone();
    ctrlc::set_handler(move || handler.trigger())?;

    let mut rl = DefaultEditor::new()?;
    let user_prompt = renderer.user_prompt();

    loop {
        match rl.readline(&user_prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                let cancel = interrupt.arm();
                if dispatcher.handle_line(line, &mut renderer, &cancel).await == Flow::Exit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                renderer.print_info("Use /exit to end the session");
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    let status = dispatcher.into_engine().shutdown().await?;
    tracing::debug!(%status, "session ended");
    Ok(())
}

fn print_banner(config: &ChatConfig) {
    println!("\n=== LLM Chat Session ===");
    println!("GPU Layers: {}", config.gpu_layers);
    println!("Context Size: {}", config.ctx_size);
    println!("{}", help_text());
    println!("=====================\n");
}
