//! Lexer (tokenizer) for stack trace scripts
//!
//! Converts raw script text into a flat [`Token`] stream consumed by the parser.
//! Scripts are line oriented, so newlines are tokens; `#` starts a comment
//! that runs to the end of the line.

use super::ast::SourceLocation;
use std::fmt;

/// All token variants produced by the lexer.
///
/// Every variant carries a [`SourceLocation`] so that parse errors can report
/// an accurate line and column without a separate token→location table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Keywords and names alike; the parser tells them apart by position
    Ident(String, SourceLocation),
    /// Decimal or `0x` hexadecimal literal
    Number(u64, SourceLocation),
    Eq(SourceLocation),
    Newline(SourceLocation),
    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::Ident(_, loc)
            | Token::Number(_, loc)
            | Token::Eq(loc)
            | Token::Newline(loc)
            | Token::Eof(loc) => *loc,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s, _) => write!(f, "identifier '{}'", s),
            Token::Number(n, _) => write!(f, "number {}", n),
            Token::Eq(_) => write!(f, "'='"),
            Token::Newline(_) => write!(f, "end of line"),
            Token::Eof(_) => write!(f, "end of file"),
        }
    }
}

/// Lexer error type
#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lexer error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

/// Lexer for trace scripts
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_blanks_and_comments();

            if self.is_at_end() {
                tokens.push(Token::Eof(self.current_location()));
                break;
            }

            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file".to_string(),
            location: loc,
        })?;

        match ch {
            '\n' => Ok(Token::Newline(loc)),
            '=' => Ok(Token::Eq(loc)),
            '0'..='9' => self.number_literal(ch, loc),
            'a'..='z' | 'A'..='Z' | '_' => Ok(self.identifier(ch, loc)),
            other => Err(LexError {
                message: format!("Unexpected character '{}'", other),
                location: loc,
            }),
        }
    }

    fn number_literal(&mut self, first: char, loc: SourceLocation) -> Result<Token, LexError> {
        let radix = if first == '0' && matches!(self.peek(), Some('x') | Some('X')) {
            self.advance();
            16
        } else {
            10
        };

        let mut digits = String::new();
        if radix == 10 {
            digits.push(first);
        }
        while let Some(c) = self.peek() {
            if c == '_' {
                self.advance();
            } else if c.is_digit(radix) {
                digits.push(c);
                self.advance();
            } else if c.is_ascii_alphanumeric() {
                return Err(LexError {
                    message: format!("Invalid digit '{}' in number literal", c),
                    location: self.current_location(),
                });
            } else {
                break;
            }
        }

        if digits.is_empty() {
            return Err(LexError {
                message: "Missing digits after '0x'".to_string(),
                location: loc,
            });
        }

        u64::from_str_radix(&digits, radix)
            .map(|n| Token::Number(n, loc))
            .map_err(|_| LexError {
                message: format!("Number literal out of range: {}", digits),
                location: loc,
            })
    }

    fn identifier(&mut self, first: char, loc: SourceLocation) -> Token {
        let mut ident = String::new();
        ident.push(first);
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Token::Ident(ident, loc)
    }

    /// Skip spaces, tabs, carriage returns and `#` comments (not newlines)
    fn skip_blanks_and_comments(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }
}
