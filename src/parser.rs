//! YANG text syntax tokenizer
//!
//! Turns source text into a [`StatementNode`] tree. Only the lexical layer is
//! handled here: keywords are not interpreted, that is the reactor's job.

use std::sync::Arc;

use crate::error::{ReactorError, Result};
use crate::stmt::{StatementLocation, StatementNode};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Text { value: String, quoted: bool },
    Open,
    Close,
    Semicolon,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: u32,
    column: u32,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
    column: u32,
    origin: Arc<str>,
}

impl<'a> Lexer<'a> {
    fn new(origin: Arc<str>, text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
            column: 1,
            origin,
        }
    }

    fn error(&self, line: u32, column: u32, message: impl Into<String>) -> ReactorError {
        ReactorError::Syntax {
            location: StatementLocation::new(self.origin.clone(), line, column),
            message: message.into(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    match ahead.peek() {
                        Some('/') => {
                            while let Some(c) = self.bump() {
                                if c == '\n' {
                                    break;
                                }
                            }
                        }
                        Some('*') => {
                            let (line, column) = (self.line, self.column);
                            self.bump();
                            self.bump();
                            let mut prev = '\0';
                            loop {
                                match self.bump() {
                                    Some('/') if prev == '*' => break,
                                    Some(c) => prev = c,
                                    None => return Err(self.error(line, column, "unterminated comment")),
                                }
                            }
                        }
                        _ => return Ok(()),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Spanned>> {
        self.skip_trivia()?;
        let (line, column) = (self.line, self.column);
        let Some(&c) = self.chars.peek() else {
            return Ok(None);
        };

        let token = match c {
            '{' => {
                self.bump();
                Token::Open
            }
            '}' => {
                self.bump();
                Token::Close
            }
            ';' => {
                self.bump();
                Token::Semicolon
            }
            '"' => Token::Text {
                value: self.double_quoted(line, column)?,
                quoted: true,
            },
            '\'' => Token::Text {
                value: self.single_quoted(line, column)?,
                quoted: true,
            },
            _ => {
                let mut value = String::new();
                while let Some(&c) = self.chars.peek() {
                    if c.is_whitespace() || matches!(c, '{' | '}' | ';' | '"' | '\'') {
                        break;
                    }
                    value.push(c);
                    self.bump();
                }
                Token::Text {
                    value,
                    quoted: false,
                }
            }
        };
        Ok(Some(Spanned { token, line, column }))
    }

    fn double_quoted(&mut self, line: u32, column: u32) -> Result<String> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => break,
                },
                Some(c) => value.push(c),
                None => break,
            }
        }
        Err(self.error(line, column, "unterminated double-quoted string"))
    }

    fn single_quoted(&mut self, line: u32, column: u32) -> Result<String> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('\'') => return Ok(value),
                Some(c) => value.push(c),
                None => return Err(self.error(line, column, "unterminated single-quoted string")),
            }
        }
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: Option<Spanned>,
}

impl<'a> Parser<'a> {
    fn peek(&mut self) -> Result<Option<&Spanned>> {
        if self.lookahead.is_none() {
            self.lookahead = self.lexer.next_token()?;
        }
        Ok(self.lookahead.as_ref())
    }

    fn next(&mut self) -> Result<Option<Spanned>> {
        match self.lookahead.take() {
            Some(tok) => Ok(Some(tok)),
            None => self.lexer.next_token(),
        }
    }

    fn location(&self, line: u32, column: u32) -> StatementLocation {
        StatementLocation::new(self.lexer.origin.clone(), line, column)
    }

    fn statement(&mut self) -> Result<StatementNode> {
        let Some(first) = self.next()? else {
            return Err(self.lexer.error(self.lexer.line, self.lexer.column, "expected statement"));
        };
        let keyword = match first.token {
            Token::Text { value, quoted: false } if !value.is_empty() => value,
            other => {
                return Err(self.lexer.error(
                    first.line,
                    first.column,
                    format!("expected keyword, found {:?}", other),
                ))
            }
        };
        let mut node = StatementNode::new(&keyword, None, self.location(first.line, first.column));
        node.argument = self.argument()?;

        let Some(end) = self.next()? else {
            return Err(self.lexer.error(first.line, first.column, format!("unterminated statement '{}'", keyword)));
        };
        match end.token {
            Token::Semicolon => Ok(node),
            Token::Open => {
                loop {
                    match self.peek()? {
                        Some(Spanned { token: Token::Close, .. }) => {
                            self.next()?;
                            return Ok(node);
                        }
                        Some(_) => node.children.push(self.statement()?),
                        None => {
                            return Err(self.lexer.error(
                                first.line,
                                first.column,
                                format!("missing '}}' for '{}'", keyword),
                            ))
                        }
                    }
                }
            }
            other => Err(self.lexer.error(
                end.line,
                end.column,
                format!("expected ';' or '{{' after '{}', found {:?}", keyword, other),
            )),
        }
    }

    /// Argument, including `"a" + "b"` concatenation of quoted strings
    fn argument(&mut self) -> Result<Option<String>> {
        let quoted = match self.peek()? {
            Some(Spanned { token: Token::Text { quoted, .. }, .. }) => *quoted,
            _ => return Ok(None),
        };
        let Some(Spanned { token: Token::Text { mut value, .. }, .. }) = self.next()? else {
            return Ok(None);
        };
        if !quoted {
            return Ok(Some(value));
        }

        loop {
            match self.peek()? {
                Some(Spanned { token: Token::Text { value: plus, quoted: false }, .. }) if plus == "+" => {
                    let Some(op) = self.next()? else { break };
                    match self.next()? {
                        Some(Spanned { token: Token::Text { value: tail, quoted: true }, .. }) => {
                            value.push_str(&tail)
                        }
                        _ => {
                            return Err(self.lexer.error(op.line, op.column, "expected quoted string after '+'"))
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(Some(value))
    }
}

/// Parse the text of one YANG source into its root statement
pub fn parse_yang(origin: &str, text: &str) -> Result<StatementNode> {
    let mut parser = Parser {
        lexer: Lexer::new(Arc::from(origin), text),
        lookahead: None,
    };
    let root = parser.statement()?;
    if let Some(extra) = parser.next()? {
        return Err(parser
            .lexer
            .error(extra.line, extra.column, "trailing content after the root statement"));
    }
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_nested_statements() {
        let root = parse_yang(
            "t.yang",
            r#"
            module t {
                namespace "urn:t"; // trailing comment
                prefix t;
                /* block
                   comment */
                container c {
                    leaf x { type string; }
                }
            }
            "#,
        )
        .unwrap();

        assert_eq!(root.keyword.identifier, "module");
        assert_eq!(root.argument(), Some("t"));
        assert_eq!(root.children.len(), 3);
        let container = &root.children[2];
        assert_eq!(container.argument(), Some("c"));
        assert_eq!(container.location.line, 7);
        assert_eq!(container.children[0].children[0].argument(), Some("string"));
    }

    #[test]
    fn test_quoted_concatenation_and_escapes() {
        let root = parse_yang(
            "t",
            "module t { description \"a\\\"b\" + 'c\\n'; pattern '[0-9]+'; }",
        )
        .unwrap();
        assert_eq!(root.children[0].argument(), Some("a\"bc\\n"));
        assert_eq!(root.children[1].argument(), Some("[0-9]+"));
    }

    #[test]
    fn test_extension_keyword_is_kept_prefixed() {
        let root = parse_yang("t", "module t { ext:marker \"on\"; }").unwrap();
        assert_eq!(root.children[0].keyword.prefix.as_deref(), Some("ext"));
    }

    #[test]
    fn test_syntax_errors() {
        for text in ["module t {", "module t { leaf x }", "module t; extra;", "module \"t\" { /* x"] {
            let err = parse_yang("bad", text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Syntax, "{}", text);
        }
    }
}
