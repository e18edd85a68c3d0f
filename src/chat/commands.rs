//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to manage sessions without sending anything to the engine.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Exit the chat application.
    Exit,

    /// Clear the conversation history.
    Clear,

    /// Save the conversation, under a timestamp name if none is given.
    Save(Option<String>),

    /// Replace the conversation with a saved session.
    Load(String),

    /// Delete a saved session.
    Delete(String),

    /// List saved sessions.
    List,

    /// List available prompt files.
    Prompts,

    /// Show the current conversation.
    Context,

    /// Display help information.
    Help,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input starts with `/`,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use llm_chat::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/exit"), Some(ChatCommand::Exit));
/// assert_eq!(parse_command("/load work"), Some(ChatCommand::Load("work".to_string())));
/// assert!(parse_command("Hello there").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.split_whitespace();
    let Some(command) = parts.next() else {
        return Some(ChatCommand::Invalid(
            "Empty command; type /help for a list of commands".to_string(),
        ));
    };
    let command = command.to_lowercase();
    let argument = parts.next().map(|s| s.to_string());

    let result = match command.as_str() {
        "exit" | "quit" => ChatCommand::Exit,
        "clear" => ChatCommand::Clear,
        "save" => ChatCommand::Save(argument),
        "load" => match argument {
            Some(name) => ChatCommand::Load(name),
            None => ChatCommand::Invalid("Please specify a history name to load".to_string()),
        },
        "delete" => match argument {
            Some(name) => ChatCommand::Delete(name),
            None => ChatCommand::Invalid("Please specify a history name to delete".to_string()),
        },
        "list" => ChatCommand::List,
        "prompts" => ChatCommand::Prompts,
        "context" => ChatCommand::Context,
        "help" | "?" => ChatCommand::Help,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Commands:
  /exit            End chat session
  /clear           Clear current context
  /save [name]     Save chat history
  /load <name>     Load chat history
  /delete <name>   Delete chat history
  /list            List saved histories
  /prompts         List available prompt files
  /context         Show current context
  /help            Show this help message"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_exit_commands() {
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Exit));
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Exit));
        assert_eq!(parse_command("  /exit  "), Some(ChatCommand::Exit));
        assert_eq!(parse_command("/EXIT"), Some(ChatCommand::Exit));
    }

    #[test]
    fn parse_clear_list_prompts_context() {
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/list"), Some(ChatCommand::List));
        assert_eq!(parse_command("/prompts"), Some(ChatCommand::Prompts));
        assert_eq!(parse_command("/context"), Some(ChatCommand::Context));
        assert_eq!(parse_command("/help"), Some(ChatCommand::Help));
    }

    #[test]
    fn parse_save() {
        assert_eq!(parse_command("/save"), Some(ChatCommand::Save(None)));
        assert_eq!(
            parse_command("/save   weekly  "),
            Some(ChatCommand::Save(Some("weekly".to_string())))
        );
    }

    #[test]
    fn parse_load_and_delete() {
        assert_eq!(
            parse_command("/load weekly"),
            Some(ChatCommand::Load("weekly".to_string()))
        );
        assert_eq!(
            parse_command("/delete weekly"),
            Some(ChatCommand::Delete("weekly".to_string()))
        );
        assert!(matches!(
            parse_command("/load"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("to load")
        ));
        assert!(matches!(
            parse_command("/delete   "),
            Some(ChatCommand::Invalid(msg)) if msg.contains("to delete")
        ));
    }

    #[test]
    fn extra_arguments_are_ignored() {
        assert_eq!(
            parse_command("/load a b"),
            Some(ChatCommand::Load("a".to_string()))
        );
    }

    #[test]
    fn unknown_command_is_reported() {
        assert_eq!(
            parse_command("/model llama"),
            Some(ChatCommand::Invalid("Unknown command: /model".to_string()))
        );
        assert!(matches!(parse_command("/"), Some(ChatCommand::Invalid(_))));
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello there"), None);
        assert_eq!(parse_command("a/b"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_lists_every_command() {
        let help = help_text();
        for command in [
            "/exit", "/clear", "/save", "/load", "/delete", "/list", "/prompts", "/context",
        ] {
            assert!(help.contains(command), "missing {command}");
        }
    }
}
