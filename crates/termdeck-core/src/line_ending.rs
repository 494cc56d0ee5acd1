use serde::{Deserialize, Serialize};

/// Line ending used when text leaves an editor buffer for a terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// Whatever the host operating system uses.
    #[default]
    Native,
    Lf,
    CrLf,
}

impl LineEnding {
    /// Resolve `Native` to the host convention. Never returns `Native`.
    pub fn resolve(self) -> Self {
        match self {
            LineEnding::Native => {
                if cfg!(windows) {
                    LineEnding::CrLf
                } else {
                    LineEnding::Lf
                }
            }
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self.resolve() {
            LineEnding::CrLf => "\r\n",
            _ => "\n",
        }
    }

    /// Rewrite every `\n` / `\r\n` in `text` to this line ending.
    pub fn normalize(self, text: &str) -> String {
        let eol = self.as_str();
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(pos) = rest.find('\n') {
            let line = &rest[..pos];
            out.push_str(line.strip_suffix('\r').unwrap_or(line));
            out.push_str(eol);
            rest = &rest[pos + 1..];
        }
        out.push_str(rest);
        out
    }
}
