//! Line syntax of the interactive console.
//!
//! Plain lines name a command, optionally followed by its argument:
//! `switchTerminalInstance 2: bash`. Lines starting with `:` drive the
//! console itself (scratch editor, listing, quitting).

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine {
    Empty,
    Command { name: String, arg: Option<String> },
    /// Replace the scratch editor's text. `\n` escapes become newlines.
    Buffer(String),
    /// Select a char range in the scratch editor.
    Select { anchor: usize, head: usize },
    /// Rename the active terminal.
    Title(String),
    List,
    Commands(Option<String>),
    Help,
    Quit,
    Invalid(String),
}

impl ConsoleLine {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ConsoleLine::Empty;
        }

        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        let rest_opt = (!rest.is_empty()).then(|| rest.to_string());

        let Some(directive) = head.strip_prefix(':') else {
            return ConsoleLine::Command {
                name: head.to_string(),
                arg: rest_opt,
            };
        };

        match directive {
            "buffer" | "b" => ConsoleLine::Buffer(rest.replace("\\n", "\n")),
            "select" | "s" => {
                let mut bounds = rest.split_whitespace().map(str::parse::<usize>);
                match (bounds.next(), bounds.next(), bounds.next()) {
                    (Some(Ok(anchor)), Some(Ok(head)), None) => {
                        ConsoleLine::Select { anchor, head }
                    }
                    _ => ConsoleLine::Invalid(format!("usage: :select <anchor> <head>, got {:?}", rest)),
                }
            }
            "title" | "t" => match rest_opt {
                Some(title) => ConsoleLine::Title(title),
                None => ConsoleLine::Invalid("usage: :title <text>".to_string()),
            },
            "list" | "l" => ConsoleLine::List,
            "commands" | "c" => ConsoleLine::Commands(rest_opt),
            "help" | "h" | "?" => ConsoleLine::Help,
            "quit" | "q" => ConsoleLine::Quit,
            other => ConsoleLine::Invalid(format!("unknown directive :{}", other)),
        }
    }
}

pub const HELP: &str = "\
Commands: toggleTerminal kill copySelection new focus focusNext focusPrevious
          paste runSelectedText switchTerminalInstance <n: title> scrollDown scrollUp
Console:  :buffer <text>     set scratch editor text (\\n for newline)
          :select <a> <h>    select chars a..h in the scratch editor
          :title <text>      rename the active terminal
          :list              show the instance selector and start times
          :commands [query]  search commands by label
          :quit";
