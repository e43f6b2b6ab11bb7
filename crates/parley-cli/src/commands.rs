//! Slash commands for interactive mode

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text: send as a message
    Send(String),
    /// Load the next older page
    More,
    Edit { id: String, content: String },
    Delete(String),
    Typing(bool),
    /// Start a fresh conversation
    New,
    Help,
    Quit,
    /// Known command with bad arguments; carries the usage line
    Usage(&'static str),
    Unknown(String),
}

/// Parse an input line. Blank lines yield `None`.
pub fn parse(input: &str) -> Option<Command> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let Some(rest) = input.strip_prefix('/') else {
        return Some(Command::Send(input.to_string()));
    };

    let (command, args) = match rest.split_once(char::is_whitespace) {
        Some((command, args)) => (command, args.trim()),
        None => (rest, ""),
    };

    Some(match command.to_lowercase().as_str() {
        "more" | "m" => Command::More,
        "edit" | "e" => match args.split_once(char::is_whitespace) {
            Some((id, content)) if !content.trim().is_empty() => Command::Edit {
                id: id.to_string(),
                content: content.trim().to_string(),
            },
            _ => Command::Usage("/edit <id> <text>"),
        },
        "delete" | "d" => match args {
            "" => Command::Usage("/delete <id>"),
            id => Command::Delete(id.to_string()),
        },
        "typing" | "t" => match args {
            "on" => Command::Typing(true),
            "off" => Command::Typing(false),
            _ => Command::Usage("/typing on|off"),
        },
        "new" | "n" => Command::New,
        "help" | "h" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    })
}

pub fn help_message() -> &'static str {
    r#"Available commands:
  <text>               Send a message
  /more, /m            Load older messages
  /edit, /e <id> <txt> Edit a message
  /delete, /d <id>     Delete a message
  /typing, /t on|off   Tell the agent whether you are typing
  /new, /n             Start a new conversation
  /help, /h, /?        Show this help message
  /quit, /q            Exit"#
}
