pub use crate::buffer::Buffer;
pub use crate::parser::Parser;
pub use crate::parser_diagnostics::{
    Diagnostic, ErrorSink, FatalError, MessageFormat, Severity, SyntaxError,
};
pub use crate::parsing::parse;
pub use crate::pos::Position;
pub use crate::scanner::{CommentRule, Scanner};
pub use crate::token::{Token, TokenKind};

use std::path::Path;

pub mod buffer;
pub mod escape;
pub(crate) mod lexing;
pub mod parser;
pub mod parser_diagnostics;
pub mod parsing;
pub mod pos;
pub mod scanner;
pub mod sets;
pub mod token;
pub mod utf8;

/// Parses the file at `path`, collecting diagnostics into a fresh sink.
pub fn parse_file(path: impl AsRef<Path>) -> Result<ErrorSink, FatalError> {
    parse(Buffer::open(path)?, ErrorSink::new())
}

pub fn parse_source(source: &[u8]) -> Result<ErrorSink, FatalError> {
    parse(Buffer::from_bytes(source), ErrorSink::new())
}
