//! Trace script parser
//!
//! A trace script describes what a running module does to its stack, one
//! operation per line:
//! - [`lexer`]: Tokenization (script text → tokens)
//! - [`parser`]: Parsing (tokens → [`ast::Program`])
//! - [`ast`]: Statement definitions
//!
//! # Example
//!
//! ```text
//! memory 16
//! layout high=0x5_0000 low=0x4_0008   # linker bound symbols
//! init
//! call main 64
//! fiber worker base=0x3_0000 end=0x2_f000
//! switch worker
//! call task 256
//! switch main
//! report
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;

pub use parser::{ParseError, Parser};
