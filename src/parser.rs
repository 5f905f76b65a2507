//! A minimal tokenizer/parser turning one input line into a
//! [`CommandNode`] chain. No variables, no globs, no subshells, no
//! control flow — just enough syntax for the core to have a caller.

use crate::cmd::{CommandNode, Connector, OutputRedirection};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unterminated quote")]
    UnterminatedQuote,
    #[error("here-documents are not supported")]
    HereDoc,
    #[error("unexpected end of input after {0:?}")]
    DanglingOperator(String),
    #[error("empty command")]
    EmptyCommand,
}

#[derive(Debug, PartialEq, Eq, Clone)]
enum Token {
    Word(String),
    Semicolon,
    Amp,
    Pipe,
    PipeAmp,
    Less,
    Great,
    GreatGreat,
    GreatAmp,
    GreatGreatAmp,
}

fn tokenize(line: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    let mut word = String::new();
    let mut in_word = false;

    macro_rules! flush {
        () => {
            if in_word {
                tokens.push(Token::Word(std::mem::take(&mut word)));
                in_word = false;
            }
        };
    }

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                flush!();
                chars.next();
            }
            '\'' | '"' => {
                let quote = c;
                word.push(c);
                in_word = true;
                chars.next();
                loop {
                    match chars.next() {
                        Some(ch) if ch == quote => {
                            word.push(ch);
                            break;
                        }
                        Some(ch) => word.push(ch),
                        None => return Err(ParseError::UnterminatedQuote),
                    }
                }
            }
            '\\' => {
                word.push(c);
                in_word = true;
                chars.next();
                if let Some(next) = chars.next() {
                    word.push(next);
                }
            }
            ';' => {
                flush!();
                chars.next();
                tokens.push(Token::Semicolon);
            }
            '&' => {
                flush!();
                chars.next();
                tokens.push(Token::Amp);
            }
            '|' => {
                flush!();
                chars.next();
                if chars.peek() == Some(&'&') {
                    chars.next();
                    tokens.push(Token::PipeAmp);
                } else {
                    tokens.push(Token::Pipe);
                }
            }
            '<' => {
                flush!();
                chars.next();
                if chars.peek() == Some(&'<') {
                    return Err(ParseError::HereDoc);
                }
                tokens.push(Token::Less);
            }
            '>' => {
                flush!();
                chars.next();
                if chars.peek() == Some(&'>') {
                    chars.next();
                    if chars.peek() == Some(&'&') {
                        chars.next();
                        tokens.push(Token::GreatGreatAmp);
                    } else {
                        tokens.push(Token::GreatGreat);
                    }
                } else if chars.peek() == Some(&'&') {
                    chars.next();
                    tokens.push(Token::GreatAmp);
                } else {
                    tokens.push(Token::Great);
                }
            }
            _ => {
                word.push(c);
                in_word = true;
                chars.next();
            }
        }
    }
    flush!();
    Ok(tokens)
}

/// Parses one input line into a command chain, or `None` for a blank
/// line (whitespace only, or empty).
pub fn parse_line(line: &str) -> Result<Option<CommandNode>, ParseError> {
    let tokens = tokenize(line)?;
    if tokens.is_empty() {
        return Ok(None);
    }
    let mut pos = 0;
    let head = parse_chain(&tokens, &mut pos)?;
    Ok(Some(head))
}

fn parse_chain(tokens: &[Token], pos: &mut usize) -> Result<CommandNode, ParseError> {
    let mut node = parse_simple_command(tokens, pos)?;

    match tokens.get(*pos) {
        Some(Token::Semicolon) => {
            *pos += 1;
            node.mode = Connector::Sequential;
            if *pos < tokens.len() {
                node.next = Some(Box::new(parse_chain(tokens, pos)?));
            }
        }
        Some(Token::Amp) => {
            *pos += 1;
            node.mode = Connector::Background;
            if *pos < tokens.len() {
                node.next = Some(Box::new(parse_chain(tokens, pos)?));
            }
        }
        Some(Token::Pipe) => {
            *pos += 1;
            node.mode = Connector::Pipe;
            node.next = Some(Box::new(parse_chain(tokens, pos)?));
        }
        Some(Token::PipeAmp) => {
            *pos += 1;
            node.mode = Connector::PipeErr;
            node.next = Some(Box::new(parse_chain(tokens, pos)?));
        }
        None => {}
        Some(other) => return Err(ParseError::DanglingOperator(format!("{other:?}"))),
    }
    Ok(node)
}

fn parse_simple_command(tokens: &[Token], pos: &mut usize) -> Result<CommandNode, ParseError> {
    let name = match tokens.get(*pos) {
        Some(Token::Word(w)) => w.clone(),
        _ => return Err(ParseError::EmptyCommand),
    };
    *pos += 1;
    let mut node = CommandNode::new(name);

    loop {
        match tokens.get(*pos) {
            Some(Token::Word(w)) => {
                node.args.push(w.clone());
                *pos += 1;
            }
            Some(Token::Less) => {
                *pos += 1;
                let path = expect_word(tokens, pos)?;
                node.file_in = Some(path);
            }
            Some(Token::Great) => {
                *pos += 1;
                let path = expect_word(tokens, pos)?;
                node.file_out = Some(OutputRedirection {
                    path,
                    append: false,
                    redirect_stderr: false,
                });
            }
            Some(Token::GreatGreat) => {
                *pos += 1;
                let path = expect_word(tokens, pos)?;
                node.file_out = Some(OutputRedirection {
                    path,
                    append: true,
                    redirect_stderr: false,
                });
            }
            Some(Token::GreatAmp) => {
                *pos += 1;
                let path = expect_word(tokens, pos)?;
                node.file_out = Some(OutputRedirection {
                    path,
                    append: false,
                    redirect_stderr: true,
                });
            }
            Some(Token::GreatGreatAmp) => {
                *pos += 1;
                let path = expect_word(tokens, pos)?;
                node.file_out = Some(OutputRedirection {
                    path,
                    append: true,
                    redirect_stderr: true,
                });
            }
            _ => break,
        }
    }
    Ok(node)
}

fn expect_word(tokens: &[Token], pos: &mut usize) -> Result<String, ParseError> {
    match tokens.get(*pos) {
        Some(Token::Word(w)) => {
            *pos += 1;
            Ok(CommandNode::process_arg(w))
        }
        other => Err(ParseError::DanglingOperator(format!("{other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_line_is_none() {
        assert_eq!(parse_line("   ").unwrap(), None);
    }

    #[test]
    fn simple_command_with_args() {
        let node = parse_line("echo hello world").unwrap().unwrap();
        assert_eq!(node.name, "echo");
        assert_eq!(node.args, vec!["hello", "world"]);
        assert!(node.next.is_none());
    }

    #[test]
    fn sequential_connector() {
        let node = parse_line("echo a; echo b").unwrap().unwrap();
        assert_eq!(node.mode, Connector::Sequential);
        assert_eq!(node.next.unwrap().name, "echo");
    }

    #[test]
    fn background_connector() {
        let node = parse_line("sleep 10 &").unwrap().unwrap();
        assert_eq!(node.name, "sleep");
        assert_eq!(node.mode, Connector::Background);
        assert!(node.next.is_none());
    }

    #[test]
    fn pipe_chain() {
        let node = parse_line("echo err |& cat").unwrap().unwrap();
        assert_eq!(node.mode, Connector::PipeErr);
        assert_eq!(node.next.unwrap().name, "cat");
    }

    #[test]
    fn output_redirection_append_and_stderr() {
        let node = parse_line("cmd >>&out.log").unwrap().unwrap();
        let redir = node.file_out.unwrap();
        assert!(redir.append);
        assert!(redir.redirect_stderr);
        assert_eq!(redir.path, "out.log");
    }

    #[test]
    fn heredoc_rejected() {
        assert_eq!(parse_line("cat <<EOF"), Err(ParseError::HereDoc));
    }

    #[test]
    fn unterminated_quote_rejected() {
        assert_eq!(parse_line("echo 'abc"), Err(ParseError::UnterminatedQuote));
    }

    #[test]
    fn quotes_retained_for_later_stripping() {
        let node = parse_line("echo 'a b'").unwrap().unwrap();
        assert_eq!(node.args, vec!["'a b'"]);
    }
}
