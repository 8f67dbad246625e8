//! Error types for the gradexpr crate.
//!
//! Compilation is all-or-nothing: every failure mode of the tokenizer and the
//! parser collapses into a single [`CompileError`] carrying the byte offset at
//! which compilation gave up. Evaluation has no error channel at all; invalid
//! numeric domains surface purely through IEEE NaN/Infinity propagation.

use thiserror::Error;

/// The specific reason a compilation failed.
///
/// Lexical errors come out of the tokenizer, everything else out of the
/// parser. The distinction is informational only; callers that just need a
/// position can ignore the kind and read [`CompileError::offset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    /// A character that starts no token (lexical error)
    #[error("unrecognized character")]
    UnrecognizedCharacter,
    /// An identifier that resolves to neither a caller binding nor a builtin (lexical error)
    #[error("unknown identifier")]
    UnknownIdentifier,
    /// Numeric-literal text that does not form a valid number (lexical error)
    #[error("malformed number")]
    MalformedNumber,
    /// A token that fits no grammar production at this point
    #[error("unexpected token")]
    UnexpectedToken,
    /// A `(` with no matching `)`
    #[error("unbalanced parenthesis")]
    UnbalancedParenthesis,
    /// A multi-argument function call without its mandatory `(`
    #[error("missing opening parenthesis in function call")]
    MissingParenthesis,
    /// Two function arguments without a `,` between them
    #[error("missing argument separator")]
    MissingSeparator,
    /// A function call with the wrong number of arguments
    #[error("wrong number of arguments, expected {expected}")]
    WrongArity { expected: usize },
    /// Expression nesting beyond the fixed depth cap
    #[error("expression nesting too deep")]
    ExcessiveNesting,
    /// A valid expression followed by leftover characters
    #[error("trailing characters after expression")]
    TrailingInput,
}

/// Error returned when an expression fails to compile.
///
/// `offset` is the 1-based byte position of the cursor at the point of
/// failure; it is never 0. No compiled expression is ever produced together
/// with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset}")]
pub struct CompileError {
    /// What went wrong
    pub kind: CompileErrorKind,
    /// 1-based byte offset into the source text
    pub offset: usize,
}

impl CompileError {
    pub(crate) fn new(kind: CompileErrorKind, offset: usize) -> Self {
        // offset 0 is reserved to mean "no error"
        Self {
            kind,
            offset: offset.max(1),
        }
    }
}
