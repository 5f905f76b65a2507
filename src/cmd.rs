//! The command tree: the parser's output and the executor's input.
//!
//! A [`CommandNode`] chain represents one parsed input line. Ownership is
//! exclusive: the REPL builds the chain, hands it to the executor, and
//! drops it once execution completes (`Option<Box<CommandNode>>` gives us
//! this for free rather than as a documented convention).

use std::fmt::Write as _;

/// The relation between one command node and the next in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    /// `;` — run the next node after this one finishes.
    Sequential,
    /// `&` — run this node in the background, then continue.
    Background,
    /// `|` — this node's stdout feeds the next node's stdin.
    Pipe,
    /// `|&` — like `Pipe`, but this node's stderr is merged into the pipe.
    PipeErr,
}

/// Output redirection target: a file path plus how to open it.
#[derive(Debug, Clone)]
pub struct OutputRedirection {
    pub path: String,
    /// `>>` rather than `>`.
    pub append: bool,
    /// `>&`/`>>&` — stderr also goes to `path`.
    pub redirect_stderr: bool,
}

/// One command in a chain: a name, its arguments, optional redirections,
/// and the connector to whatever comes next.
#[derive(Debug, Clone)]
pub struct CommandNode {
    pub name: String,
    pub args: Vec<String>,
    pub file_in: Option<String>,
    pub file_out: Option<OutputRedirection>,
    pub mode: Connector,
    pub next: Option<Box<CommandNode>>,
}

impl CommandNode {
    /// A bare node with no arguments, redirections, or successor, joined
    /// to whatever comes after it by `Connector::Sequential`.
    pub fn new(name: impl Into<String>) -> CommandNode {
        CommandNode {
            name: name.into(),
            args: Vec::new(),
            file_in: None,
            file_out: None,
            mode: Connector::Sequential,
            next: None,
        }
    }

    /// The last node in the chain starting at `self`.
    pub fn last(&self) -> &CommandNode {
        let mut last = self;
        while let Some(next) = &last.next {
            last = next;
        }
        last
    }

    /// Strips one matched pair of outer single or double quotes (if
    /// present) and removes every literal backslash, in a single pass.
    ///
    /// This is applied to each argument (never to the command name) at the
    /// point the executor builds an argv, not at parse time, so the raw
    /// token survives into [`cmd_str`] for job-listing display.
    pub fn process_arg(raw: &str) -> String {
        let bytes = raw.as_bytes();
        let stripped = if bytes.len() >= 2
            && (bytes[0] == b'\'' || bytes[0] == b'"')
            && bytes[bytes.len() - 1] == bytes[0]
        {
            &raw[1..raw.len() - 1]
        } else {
            raw
        };
        stripped.chars().filter(|&c| c != '\\').collect()
    }

    /// Human-readable rendering of the whole chain starting at `self`, as
    /// printed in job listings (`jobs`, `fg`, backgrounding announcements).
    pub fn render_chain(&self) -> String {
        let mut out = String::new();
        let mut node = Some(self);
        while let Some(c) = node {
            let _ = write!(out, "{}", c.name);
            for a in &c.args {
                let _ = write!(out, " {a}");
            }
            if let Some(file_in) = &c.file_in {
                let _ = write!(out, " <{file_in}");
            }
            if let Some(out_redir) = &c.file_out {
                out.push_str(" >");
                if out_redir.append {
                    out.push('>');
                }
                if out_redir.redirect_stderr {
                    out.push('&');
                }
                out.push_str(&out_redir.path);
            }
            if c.next.is_some() {
                match c.mode {
                    Connector::Sequential => out.push(';'),
                    Connector::Background => out.push('&'),
                    Connector::Pipe => out.push_str(" |"),
                    Connector::PipeErr => out.push_str(" |&"),
                }
                out.push(' ');
            }
            node = c.next.as_deref();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_arg_strips_single_quotes_and_backslashes() {
        assert_eq!(CommandNode::process_arg(r"'a\b'"), "ab");
    }

    #[test]
    fn process_arg_strips_double_quotes_and_backslashes() {
        assert_eq!(CommandNode::process_arg(r#""hello\ world""#), "hello world");
    }

    #[test]
    fn process_arg_plain_token_untouched() {
        assert_eq!(CommandNode::process_arg("foo"), "foo");
    }

    #[test]
    fn process_arg_removes_interior_backslashes_without_quotes() {
        assert_eq!(CommandNode::process_arg(r"a\b\c"), "abc");
    }

    #[test]
    fn render_sequential_chain() {
        let mut echo = CommandNode::new("echo");
        echo.args.push("hello".into());
        echo.mode = Connector::Sequential;
        echo.next = Some(Box::new(CommandNode::new("world")));
        assert_eq!(echo.render_chain(), "echo hello; world");
    }

    #[test]
    fn render_redirections() {
        let mut cat = CommandNode::new("cat");
        cat.file_in = Some("in.txt".into());
        cat.file_out = Some(OutputRedirection {
            path: "out.txt".into(),
            append: true,
            redirect_stderr: true,
        });
        assert_eq!(cat.render_chain(), "cat <in.txt >>&out.txt");
    }

    #[test]
    fn render_pipeline() {
        let mut a = CommandNode::new("a");
        a.mode = Connector::Pipe;
        let mut b = CommandNode::new("b");
        b.mode = Connector::PipeErr;
        b.next = Some(Box::new(CommandNode::new("c")));
        a.next = Some(Box::new(b));
        assert_eq!(a.render_chain(), "a | b |& c");
    }

    #[test]
    fn last_follows_chain() {
        let mut a = CommandNode::new("a");
        a.next = Some(Box::new(CommandNode::new("b")));
        assert_eq!(a.last().name, "b");
    }
}
