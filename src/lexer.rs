//! Single-pass tokenizer.
//!
//! Streams the source bytes into typed tokens, resolving identifiers through
//! the registry as it goes. The tokenizer holds one token of lookahead: the
//! parser reads [`Tokenizer::current`] and calls [`Tokenizer::advance`] to
//! consume it. An [`Token::Error`] token is terminal, the parser surfaces it
//! and never asks for another.

use crate::builtins::Operator;
use crate::errors::CompileErrorKind;
use crate::expr::VarRef;
use crate::registry::{Registry, Resolved};
use crate::types::NativeFunction;

/// One lexical token. Identifier tokens carry their resolution payload so the
/// parser never needs the registry.
#[derive(Clone)]
pub(crate) enum Token {
    /// A numeric literal
    Number(f64),
    /// A resolved variable reference
    Variable(VarRef),
    /// A resolved function, builtin or caller-supplied
    Function {
        name: String,
        arity: usize,
        callable: NativeFunction,
        pure: bool,
    },
    /// A binary infix operator
    Infix(Operator),
    /// `(`
    Open,
    /// `)`
    Close,
    /// `,`
    Separator,
    /// End of input
    End,
    /// Terminal lexical error
    Error(CompileErrorKind),
}

/// Cursor over the source text plus the most recently produced token.
pub(crate) struct Tokenizer<'a> {
    src: &'a [u8],
    cursor: usize,
    registry: Registry<'a>,
    current: Token,
}

impl<'a> Tokenizer<'a> {
    pub(crate) fn new(source: &'a str, registry: Registry<'a>) -> Self {
        let mut tokenizer = Self {
            src: source.as_bytes(),
            cursor: 0,
            registry,
            current: Token::End,
        };
        tokenizer.advance();
        tokenizer
    }

    pub(crate) fn current(&self) -> &Token {
        &self.current
    }

    /// 1-based byte offset of the cursor, for error reporting. Never 0.
    pub(crate) fn offset(&self) -> usize {
        self.cursor.max(1)
    }

    /// Produces the next token, skipping whitespace.
    pub(crate) fn advance(&mut self) {
        self.current = loop {
            let Some(&c) = self.src.get(self.cursor) else {
                break Token::End;
            };
            match c {
                b' ' | b'\t' | b'\n' | b'\r' => self.cursor += 1,
                b'0'..=b'9' | b'.' => break self.lex_number(),
                b'a'..=b'z' => break self.lex_identifier(),
                b'+' => break self.operator(Operator::Add),
                b'-' => break self.operator(Operator::Sub),
                b'*' => break self.operator(Operator::Mul),
                b'/' => break self.operator(Operator::Div),
                b'%' => break self.operator(Operator::Mod),
                b'^' => break self.operator(Operator::Pow),
                b'(' => {
                    self.cursor += 1;
                    break Token::Open;
                }
                b')' => {
                    self.cursor += 1;
                    break Token::Close;
                }
                b',' => {
                    self.cursor += 1;
                    break Token::Separator;
                }
                _ => {
                    self.cursor += 1;
                    break Token::Error(CompileErrorKind::UnrecognizedCharacter);
                }
            }
        };
    }

    fn operator(&mut self, op: Operator) -> Token {
        self.cursor += 1;
        Token::Infix(op)
    }

    /// Lexes a decimal/exponent literal. Locale-independent; the exponent is
    /// only consumed when digits actually follow it, so `1e` lexes as `1`
    /// followed by the identifier `e`.
    fn lex_number(&mut self) -> Token {
        let start = self.cursor;
        while self.peek_digit() {
            self.cursor += 1;
        }
        if self.src.get(self.cursor) == Some(&b'.') {
            self.cursor += 1;
            while self.peek_digit() {
                self.cursor += 1;
            }
        }
        if matches!(self.src.get(self.cursor), Some(b'e' | b'E')) {
            let mut lookahead = self.cursor + 1;
            if matches!(self.src.get(lookahead), Some(b'+' | b'-')) {
                lookahead += 1;
            }
            if matches!(self.src.get(lookahead), Some(b'0'..=b'9')) {
                self.cursor = lookahead;
                while self.peek_digit() {
                    self.cursor += 1;
                }
            }
        }

        // the captured text is pure ASCII
        let text = std::str::from_utf8(&self.src[start..self.cursor]).unwrap_or("");
        match text.parse::<f64>() {
            Ok(value) => Token::Number(value),
            Err(_) => Token::Error(CompileErrorKind::MalformedNumber),
        }
    }

    fn peek_digit(&self) -> bool {
        matches!(self.src.get(self.cursor), Some(b'0'..=b'9'))
    }

    /// Lexes `[a-z][a-z0-9_]*` and resolves it through the registry.
    fn lex_identifier(&mut self) -> Token {
        let start = self.cursor;
        while matches!(
            self.src.get(self.cursor),
            Some(b'a'..=b'z' | b'0'..=b'9' | b'_')
        ) {
            self.cursor += 1;
        }

        // identifier bytes are ASCII by construction
        let Ok(name) = std::str::from_utf8(&self.src[start..self.cursor]) else {
            return Token::Error(CompileErrorKind::UnknownIdentifier);
        };
        match self.registry.resolve(name) {
            Some(Resolved::Variable { name, slot }) => Token::Variable(VarRef { name, slot }),
            Some(Resolved::Function {
                name,
                arity,
                callable,
                pure,
            }) => Token::Function {
                name,
                arity,
                callable,
                pure,
            },
            None => Token::Error(CompileErrorKind::UnknownIdentifier),
        }
    }
}
