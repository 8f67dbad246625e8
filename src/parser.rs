//! Recursive-descent parser with explicit operator precedence.
//!
//! One method per precedence level, lowest to highest:
//!
//! ```text
//! list   := expr (',' expr)*                comma is a real binary operator
//! expr   := term (('+'|'-') term)*          left-associative
//! term   := factor (('*'|'/'|'%') factor)*  left-associative
//! factor := power ('^' power)*              left-associative by default; the
//!                                           `pow-right` feature makes a^b^c
//!                                           parse as a^(b^c) and -a^b as -(a^b)
//! power  := ('+'|'-')* base                 odd '-' count wraps base in negate
//! base   := NUMBER | VARIABLE | FUNC0 ['(' ')'] | FUNC1 power
//!         | FUNCn '(' expr (',' expr){n-1} ')' | '(' list ')'
//! ```
//!
//! Errors unwind immediately with the cursor's byte offset; there is no
//! recovery. Nesting depth is capped so pathologically deep input fails with
//! a compile error instead of exhausting the call stack.

use crate::builtins::Operator;
use crate::errors::{CompileError, CompileErrorKind};
use crate::expr::{Call, Expr};
use crate::lexer::{Token, Tokenizer};
use crate::registry::Registry;

/// Maximum nesting depth of `base` productions before compilation fails.
pub(crate) const MAX_DEPTH: usize = 256;

pub(crate) struct Parser<'a> {
    tokens: Tokenizer<'a>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(source: &'a str, registry: Registry<'a>) -> Self {
        Self {
            tokens: Tokenizer::new(source, registry),
            depth: 0,
        }
    }

    /// Parses the whole source as a top-level `list`, requiring the token
    /// stream to reach end-of-input.
    pub(crate) fn parse(mut self) -> Result<Expr, CompileError> {
        let root = self.list()?;
        match self.tokens.current() {
            Token::End => Ok(root),
            _ => Err(self.fail(CompileErrorKind::TrailingInput)),
        }
    }

    /// Builds a `CompileError` at the cursor. A pending lexical error token
    /// takes priority over the parser's own diagnosis.
    fn fail(&self, fallback: CompileErrorKind) -> CompileError {
        let kind = match self.tokens.current() {
            Token::Error(kind) => *kind,
            _ => fallback,
        };
        CompileError::new(kind, self.tokens.offset())
    }

    fn list(&mut self) -> Result<Expr, CompileError> {
        let mut ret = self.expr()?;
        while matches!(self.tokens.current(), Token::Separator) {
            self.tokens.advance();
            let rhs = self.expr()?;
            ret = Expr::comma(ret, rhs);
        }
        Ok(ret)
    }

    fn expr(&mut self) -> Result<Expr, CompileError> {
        let mut ret = self.term()?;
        loop {
            let op = match self.tokens.current() {
                Token::Infix(op @ (Operator::Add | Operator::Sub)) => *op,
                _ => break,
            };
            self.tokens.advance();
            let rhs = self.term()?;
            ret = Expr::binary(op, ret, rhs);
        }
        Ok(ret)
    }

    fn term(&mut self) -> Result<Expr, CompileError> {
        let mut ret = self.factor()?;
        loop {
            let op = match self.tokens.current() {
                Token::Infix(op @ (Operator::Mul | Operator::Div | Operator::Mod)) => *op,
                _ => break,
            };
            self.tokens.advance();
            let rhs = self.factor()?;
            ret = Expr::binary(op, ret, rhs);
        }
        Ok(ret)
    }

    #[cfg(not(feature = "pow-right"))]
    fn factor(&mut self) -> Result<Expr, CompileError> {
        let mut ret = self.power()?;
        while matches!(self.tokens.current(), Token::Infix(Operator::Pow)) {
            self.tokens.advance();
            let rhs = self.power()?;
            ret = Expr::binary(Operator::Pow, ret, rhs);
        }
        Ok(ret)
    }

    #[cfg(feature = "pow-right")]
    fn factor(&mut self) -> Result<Expr, CompileError> {
        // A leading sign binds looser than `^` in this mode: -a^b = -(a^b).
        let (negated, base) = self.signed_base()?;
        let ret = self.pow_tail(base)?;
        Ok(if negated { Expr::negate(ret) } else { ret })
    }

    /// Right-associative `^` chain: `lhs ^ (next ^ (...))`.
    #[cfg(feature = "pow-right")]
    fn pow_tail(&mut self, lhs: Expr) -> Result<Expr, CompileError> {
        if !matches!(self.tokens.current(), Token::Infix(Operator::Pow)) {
            return Ok(lhs);
        }
        self.tokens.advance();
        let next = self.power()?;
        let rhs = self.pow_tail(next)?;
        Ok(Expr::binary(Operator::Pow, lhs, rhs))
    }

    fn power(&mut self) -> Result<Expr, CompileError> {
        let (negated, base) = self.signed_base()?;
        Ok(if negated { Expr::negate(base) } else { base })
    }

    /// Consumes any run of unary `+`/`-` signs and the following `base`.
    /// An even count of `-` is a no-op: no node is inserted.
    fn signed_base(&mut self) -> Result<(bool, Expr), CompileError> {
        let mut negated = false;
        loop {
            match self.tokens.current() {
                Token::Infix(Operator::Add) => {}
                Token::Infix(Operator::Sub) => negated = !negated,
                _ => break,
            }
            self.tokens.advance();
        }
        Ok((negated, self.base()?))
    }

    fn base(&mut self) -> Result<Expr, CompileError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.fail(CompileErrorKind::ExcessiveNesting));
        }
        self.depth += 1;
        let result = self.base_inner();
        self.depth -= 1;
        result
    }

    fn base_inner(&mut self) -> Result<Expr, CompileError> {
        match self.tokens.current().clone() {
            Token::Number(value) => {
                self.tokens.advance();
                Ok(Expr::Const(value))
            }
            Token::Variable(var) => {
                self.tokens.advance();
                Ok(Expr::Var(var))
            }
            Token::Function {
                name,
                arity,
                callable,
                pure,
            } => {
                self.tokens.advance();
                let args = match arity {
                    0 => {
                        self.empty_args()?;
                        Vec::new()
                    }
                    1 => vec![self.power()?],
                    n => self.call_args(n)?,
                };
                Ok(Expr::Call(Call {
                    name,
                    callable,
                    pure,
                    args,
                }))
            }
            Token::Open => {
                self.tokens.advance();
                let ret = self.list()?;
                match self.tokens.current() {
                    Token::Close => {
                        self.tokens.advance();
                        Ok(ret)
                    }
                    _ => Err(self.fail(CompileErrorKind::UnbalancedParenthesis)),
                }
            }
            Token::Error(kind) => Err(CompileError::new(kind, self.tokens.offset())),
            _ => Err(self.fail(CompileErrorKind::UnexpectedToken)),
        }
    }

    /// A 0-ary function optionally accepts an empty argument list `()`.
    fn empty_args(&mut self) -> Result<(), CompileError> {
        if matches!(self.tokens.current(), Token::Open) {
            self.tokens.advance();
            if !matches!(self.tokens.current(), Token::Close) {
                return Err(self.fail(CompileErrorKind::WrongArity { expected: 0 }));
            }
            self.tokens.advance();
        }
        Ok(())
    }

    /// A mandatory parenthesized, comma-separated list of exactly `arity`
    /// `expr`-level subexpressions, for functions of arity 2..=7.
    fn call_args(&mut self, arity: usize) -> Result<Vec<Expr>, CompileError> {
        if !matches!(self.tokens.current(), Token::Open) {
            return Err(self.fail(CompileErrorKind::MissingParenthesis));
        }
        let mut args = Vec::with_capacity(arity);
        for i in 0..arity {
            self.tokens.advance(); // past `(` or `,`
            args.push(self.expr()?);
            if i + 1 < arity {
                match self.tokens.current() {
                    Token::Separator => {}
                    Token::Close => {
                        return Err(self.fail(CompileErrorKind::WrongArity { expected: arity }))
                    }
                    _ => return Err(self.fail(CompileErrorKind::MissingSeparator)),
                }
            }
        }
        match self.tokens.current() {
            Token::Close => {
                self.tokens.advance();
                Ok(args)
            }
            Token::Separator => Err(self.fail(CompileErrorKind::WrongArity { expected: arity })),
            _ => Err(self.fail(CompileErrorKind::UnbalancedParenthesis)),
        }
    }
}
