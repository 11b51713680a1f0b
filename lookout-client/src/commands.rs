//! User input parsing
//!
//! Parses lines typed at the `lookout` prompt such as `break index.php 16`
//! or `!context_get global` into user actions.

use lookout_protocol::{DebuggerCommand, Scope};

/// Parsed user command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Open a file view
    Open(String),
    /// Close a file view
    Close(String),
    /// Set or remove a breakpoint; no file means the active view
    Toggle { filepath: Option<String>, line: u32 },
    /// Send a debugger command
    Debugger(DebuggerCommand),
    /// Send an instruction verbatim
    Raw(String),
    /// List recently opened files
    Recent,
    /// List open views
    Files,
    /// Reload session state and reconnect
    Reload,
    Help,
    Quit,
}

/// Error parsing a command
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Empty command
    Empty,
    /// A required argument is missing
    MissingArgument(&'static str),
    /// Line number is not a positive integer
    InvalidLine(String),
    /// Unrecognised command name
    Unknown(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty command"),
            ParseError::MissingArgument(what) => write!(f, "missing {}", what),
            ParseError::InvalidLine(line) => write!(f, "invalid line number: {}", line),
            ParseError::Unknown(name) => write!(f, "unknown command: {} (try `help`)", name),
        }
    }
}

impl std::error::Error for ParseError {}

/// Usage text for `help`
pub const HELP: &str = "\
open <file>            open a file view
close <file>           close a file view
break [<file>] <line>  set or remove a breakpoint
step | into | out      step over, into or out of a call
run | continue         resume execution
on | off               start or stop listening for debug connections
vars | globals         show local or global variables
expand <name>          load the children of a variable
stack                  show the call stack
refresh <file>         reload the source of a file
files | recent         list open or recently opened files
reload                 reload state and reconnect
!<instruction>         send an instruction as typed
quit                   exit";

/// Parse an input line into a Command
pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let input = input.trim();

    if input.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some(raw) = input.strip_prefix('!') {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ParseError::MissingArgument("instruction"));
        }
        return Ok(Command::Raw(raw.to_string()));
    }

    let (name, rest) = split_first_token(input);
    let rest = rest.trim();

    match name.to_lowercase().as_str() {
        "open" | "o" => Ok(Command::Open(required(rest, "file")?)),
        "close" => Ok(Command::Close(required(rest, "file")?)),
        "break" | "b" | "toggle" => parse_toggle(rest),
        "step" | "over" | "s" => Ok(Command::Debugger(DebuggerCommand::StepOver)),
        "into" | "i" => Ok(Command::Debugger(DebuggerCommand::StepInto)),
        "out" => Ok(Command::Debugger(DebuggerCommand::StepOut)),
        "run" | "r" => Ok(Command::Debugger(DebuggerCommand::Run)),
        "continue" | "c" => Ok(Command::Debugger(DebuggerCommand::Continue)),
        "on" => Ok(Command::Debugger(DebuggerCommand::On)),
        "off" => Ok(Command::Debugger(DebuggerCommand::Off)),
        "vars" | "v" => Ok(Command::Debugger(DebuggerCommand::ContextGet {
            scope: Scope::Local,
        })),
        "globals" => Ok(Command::Debugger(DebuggerCommand::ContextGet {
            scope: Scope::Global,
        })),
        "stack" | "bt" => Ok(Command::Debugger(DebuggerCommand::StackGet)),
        "expand" => Ok(Command::Debugger(DebuggerCommand::PropertyGet {
            full_name: required(rest, "variable name")?,
        })),
        "refresh" => Ok(Command::Debugger(DebuggerCommand::UpdateSource {
            filepath: required(rest, "file")?,
        })),
        "files" => Ok(Command::Files),
        "recent" => Ok(Command::Recent),
        "reload" => Ok(Command::Reload),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        _ => Err(ParseError::Unknown(name.to_string())),
    }
}

/// Parse `break` arguments
///
/// Format: `break [<file>] <line>`
fn parse_toggle(args: &str) -> Result<Command, ParseError> {
    if args.is_empty() {
        return Err(ParseError::MissingArgument("line number"));
    }

    let (filepath, line) = match args.rsplit_once(char::is_whitespace) {
        Some((filepath, line)) => (Some(filepath.trim().to_string()), line),
        None => (None, args),
    };

    let line = match line.parse::<u32>() {
        Ok(line) if line > 0 => line,
        _ => return Err(ParseError::InvalidLine(line.to_string())),
    };

    Ok(Command::Toggle { filepath, line })
}

fn required(args: &str, what: &'static str) -> Result<String, ParseError> {
    if args.is_empty() {
        Err(ParseError::MissingArgument(what))
    } else {
        Ok(args.to_string())
    }
}

/// Split off the first whitespace-delimited token
fn split_first_token(input: &str) -> (&str, &str) {
    match input.find(char::is_whitespace) {
        Some(idx) => (&input[..idx], &input[idx..]),
        None => (input, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== parse_command Tests ====================

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_command(""), Err(ParseError::Empty));
        assert_eq!(parse_command("   "), Err(ParseError::Empty));
    }

    #[test]
    fn test_parse_open_close() {
        assert_eq!(
            parse_command("open lib/a.php").unwrap(),
            Command::Open("lib/a.php".into())
        );
        assert_eq!(
            parse_command("close  lib/a.php ").unwrap(),
            Command::Close("lib/a.php".into())
        );
        assert_eq!(
            parse_command("open"),
            Err(ParseError::MissingArgument("file"))
        );
    }

    #[test]
    fn test_parse_break_with_file() {
        assert_eq!(
            parse_command("break index.php 16").unwrap(),
            Command::Toggle {
                filepath: Some("index.php".into()),
                line: 16
            }
        );
    }

    #[test]
    fn test_parse_break_path_with_spaces() {
        assert_eq!(
            parse_command("b my dir/index.php 3").unwrap(),
            Command::Toggle {
                filepath: Some("my dir/index.php".into()),
                line: 3
            }
        );
    }

    #[test]
    fn test_parse_break_active_file() {
        assert_eq!(
            parse_command("break 42").unwrap(),
            Command::Toggle {
                filepath: None,
                line: 42
            }
        );
    }

    #[test]
    fn test_parse_break_invalid_line() {
        assert_eq!(
            parse_command("break index.php zero"),
            Err(ParseError::InvalidLine("zero".into()))
        );
        assert_eq!(
            parse_command("break 0"),
            Err(ParseError::InvalidLine("0".into()))
        );
        assert_eq!(
            parse_command("break"),
            Err(ParseError::MissingArgument("line number"))
        );
    }

    #[test]
    fn test_parse_stepping() {
        assert_eq!(
            parse_command("step").unwrap(),
            Command::Debugger(DebuggerCommand::StepOver)
        );
        assert_eq!(
            parse_command("INTO").unwrap(),
            Command::Debugger(DebuggerCommand::StepInto)
        );
        assert_eq!(
            parse_command("c").unwrap(),
            Command::Debugger(DebuggerCommand::Continue)
        );
    }

    #[test]
    fn test_parse_inspection() {
        assert_eq!(
            parse_command("globals").unwrap(),
            Command::Debugger(DebuggerCommand::ContextGet {
                scope: Scope::Global
            })
        );
        assert_eq!(
            parse_command("expand $user->address").unwrap(),
            Command::Debugger(DebuggerCommand::PropertyGet {
                full_name: "$user->address".into()
            })
        );
        assert_eq!(
            parse_command("refresh a.php").unwrap(),
            Command::Debugger(DebuggerCommand::UpdateSource {
                filepath: "a.php".into()
            })
        );
    }

    #[test]
    fn test_parse_raw_instruction() {
        assert_eq!(
            parse_command("!context_get global").unwrap(),
            Command::Raw("context_get global".into())
        );
        assert_eq!(
            parse_command("!"),
            Err(ParseError::MissingArgument("instruction"))
        );
    }

    #[test]
    fn test_parse_session_commands() {
        assert_eq!(parse_command("reload").unwrap(), Command::Reload);
        assert_eq!(parse_command("recent").unwrap(), Command::Recent);
        assert_eq!(parse_command("exit").unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            parse_command("jump 3"),
            Err(ParseError::Unknown("jump".into()))
        );
    }

    // ==================== ParseError Tests ====================

    #[test]
    fn test_parse_error_display() {
        assert_eq!(ParseError::Empty.to_string(), "empty command");
        assert_eq!(
            ParseError::MissingArgument("file").to_string(),
            "missing file"
        );
        assert_eq!(
            ParseError::InvalidLine("x".into()).to_string(),
            "invalid line number: x"
        );
    }
}
