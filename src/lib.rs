pub mod compiler;
pub mod errors;
pub mod formatter;
pub mod lexer;
pub mod parser;

use std::error::Error as StdError;
use std::fmt;

/// Any error the pipeline can stop on. Compilation has no recovery: the
/// first error aborts and is returned whole.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Lex(lexer::LexError),
    Parse(parser::ParseError),
    Compile(compiler::CompileError),
}

impl Error {
    /// The source byte offset the error points at, where one is known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Lex(err) => Some(err.offset),
            Error::Parse(err) => Some(err.offset),
            Error::Compile(_) => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Lex(err) => write!(f, "{}", err.message),
            Error::Parse(err) => write!(f, "{}", err.message),
            Error::Compile(err) => write!(f, "{}", err.message),
        }
    }
}

impl StdError for Error {}

impl From<lexer::LexError> for Error {
    fn from(err: lexer::LexError) -> Self {
        Error::Lex(err)
    }
}

impl From<parser::ParseError> for Error {
    fn from(err: parser::ParseError) -> Self {
        Error::Parse(err)
    }
}

impl From<compiler::CompileError> for Error {
    fn from(err: compiler::CompileError) -> Self {
        Error::Compile(err)
    }
}

/// Compiles source text to IR text.
pub fn compile(source: &str) -> Result<String, Error> {
    let tokens = lexer::lex(source)?;
    let program = parser::Parser::new(tokens).parse_program()?;
    Ok(compiler::compile(&program)?)
}
