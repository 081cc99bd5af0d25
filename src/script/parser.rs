//! Script parser
//!
//! This module provides the [`Parser`] struct: it turns the token stream into
//! a [`Program`], one [`Statement`] per non-empty line.
//!
//! # Grammar
//!
//! ```text
//! program   := { line }
//! line      := [ statement ] ( NEWLINE | EOF )
//! statement := KEYWORD { NAME | NUMBER | NAME '=' NUMBER }
//! ```
//!
//! Keyed arguments (`high=`, `low=`, `base=`, `end=`) may come in any order
//! but each must appear exactly once.

use crate::script::ast::*;
use crate::script::lexer::{LexError, Lexer, Token};
use std::fmt;

/// Parser error type
#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Line-oriented parser for trace scripts
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse the whole script
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::new();

        loop {
            self.skip_newlines();
            if self.is_at_end() {
                break;
            }
            let stmt = self.parse_statement()?;
            self.expect_end_of_line()?;
            program.statements.push(stmt);
        }

        Ok(program)
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let (keyword, location) = self.expect_ident("a statement keyword")?;

        match keyword.as_str() {
            "memory" => {
                let pages = self.expect_number("page count")?;
                Ok(Statement::Memory { pages, location })
            }
            "layout" => {
                let [high, low] = self.parse_keyed(["high", "low"], location)?;
                Ok(Statement::Layout {
                    high,
                    low,
                    location,
                })
            }
            "init" => Ok(Statement::Init { location }),
            "call" => {
                let (name, _) = self.expect_ident("function name")?;
                let size = self.expect_number("frame size")?;
                Ok(Statement::Call {
                    name,
                    size,
                    location,
                })
            }
            "ret" => Ok(Statement::Ret { location }),
            "alloc" => {
                let size = self.expect_number("allocation size")?;
                Ok(Statement::Alloc { size, location })
            }
            "save" => Ok(Statement::Save { location }),
            "restore" => Ok(Statement::Restore { location }),
            "sp" => {
                let address = self.expect_number("stack pointer address")?;
                Ok(Statement::SetStackPointer { address, location })
            }
            "limits" => {
                let [base, end] = self.parse_keyed(["base", "end"], location)?;
                Ok(Statement::Limits {
                    base,
                    end,
                    location,
                })
            }
            "fiber" => {
                let (name, _) = self.expect_ident("fiber name")?;
                let [base, end] = self.parse_keyed(["base", "end"], location)?;
                Ok(Statement::Fiber {
                    name,
                    base,
                    end,
                    location,
                })
            }
            "switch" => {
                let (name, _) = self.expect_ident("fiber name")?;
                Ok(Statement::Switch { name, location })
            }
            "report" => Ok(Statement::Report { location }),
            other => Err(ParseError {
                message: format!(
                    "Unknown statement '{}' (expected one of: {})",
                    other,
                    KEYWORDS.join(", ")
                ),
                location,
            }),
        }
    }

    /// Parse `key=value` pairs for exactly the given keys, in any order
    fn parse_keyed<const N: usize>(
        &mut self,
        keys: [&str; N],
        statement_location: SourceLocation,
    ) -> Result<[u64; N], ParseError> {
        let mut values: [Option<u64>; N] = [None; N];

        for _ in 0..N {
            let (key, key_loc) = self.expect_ident(&format!("one of {}", keys.join("/")))?;
            let slot = keys.iter().position(|k| *k == key).ok_or_else(|| ParseError {
                message: format!("Unexpected argument '{}', expected {}", key, keys.join("/")),
                location: key_loc,
            })?;
            if values[slot].is_some() {
                return Err(ParseError {
                    message: format!("Duplicate argument '{}'", key),
                    location: key_loc,
                });
            }
            self.expect_eq()?;
            values[slot] = Some(self.expect_number(&format!("value for '{}'", key))?);
        }

        let mut out = [0u64; N];
        for (i, value) in values.iter().enumerate() {
            out[i] = value.ok_or_else(|| ParseError {
                message: format!("Missing argument '{}'", keys[i]),
                location: statement_location,
            })?;
        }
        Ok(out)
    }

    // ========== Token helpers ==========

    fn peek(&self) -> &Token {
        // tokenize() always ends the stream with Eof
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.position += 1;
        }
        token
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof(_))
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Token::Newline(_)) {
            self.advance();
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, SourceLocation), ParseError> {
        match self.advance() {
            Token::Ident(name, loc) => Ok((name, loc)),
            other => Err(ParseError {
                message: format!("Expected {}, found {}", what, other),
                location: other.location(),
            }),
        }
    }

    fn expect_number(&mut self, what: &str) -> Result<u64, ParseError> {
        match self.advance() {
            Token::Number(n, _) => Ok(n),
            other => Err(ParseError {
                message: format!("Expected {}, found {}", what, other),
                location: other.location(),
            }),
        }
    }

    fn expect_eq(&mut self) -> Result<(), ParseError> {
        match self.advance() {
            Token::Eq(_) => Ok(()),
            other => Err(ParseError {
                message: format!("Expected '=', found {}", other),
                location: other.location(),
            }),
        }
    }

    fn expect_end_of_line(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            Token::Newline(_) => {
                self.advance();
                Ok(())
            }
            Token::Eof(_) => Ok(()),
            other => Err(ParseError {
                message: format!("Unexpected {} after statement", other),
                location: other.location(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Program {
        Parser::new(src)
            .expect("Parser creation failed")
            .parse_program()
            .expect("Parsing failed")
    }

    #[test]
    fn parses_every_statement_kind() {
        let program = parse(
            "memory 4\n\
             layout low=0x4_0008 high=0x5_0000\n\
             init\n\
             call main 64\n\
             alloc 20\n\
             save\n\
             restore\n\
             sp 0x4_8000\n\
             limits base=2000 end=1000\n\
             fiber worker base=0x3_0000 end=0x2_f000\n\
             switch worker\n\
             report\n\
             ret\n",
        );
        let keywords: Vec<&str> = program.statements.iter().map(|s| s.keyword()).collect();
        assert_eq!(
            keywords,
            [
                "memory", "layout", "init", "call", "alloc", "save", "restore", "sp", "limits",
                "fiber", "switch", "report", "ret"
            ]
        );
        assert_eq!(
            program.statements[1],
            Statement::Layout {
                high: 0x5_0000,
                low: 0x4_0008,
                location: SourceLocation::new(2, 1),
            }
        );
    }

    #[test]
    fn blank_lines_and_comments_are_skipped() {
        let program = parse("\n# header\n\n  init   # go\n\n");
        assert_eq!(program.statements.len(), 1);
        assert_eq!(program.statements[0].location(), SourceLocation::new(4, 3));
    }

    #[test]
    fn unknown_keyword_is_an_error() {
        let err = Parser::new("jump 4").unwrap().parse_program().unwrap_err();
        assert!(err.message.contains("Unknown statement 'jump'"));
    }

    #[test]
    fn keyed_arguments_are_checked() {
        let missing = Parser::new("layout high=1 high=2")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert!(missing.message.contains("Duplicate argument 'high'"));

        let wrong = Parser::new("limits base=1 top=2")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert!(wrong.message.contains("Unexpected argument 'top'"));
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let err = Parser::new("init 5").unwrap().parse_program().unwrap_err();
        assert_eq!(err.location, SourceLocation::new(1, 6));
    }
}
