//! Lexer for SQL query text.

use logos::Logos;
use quarry_common::{QuarryError, Result};

use crate::token::TokenKind;

/// A byte range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset, inclusive.
    pub start: usize,
    /// End byte offset, exclusive.
    pub end: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A token with its source span.
#[derive(Debug, Clone)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The source span.
    pub span: Span,
}

/// Tokenize SQL text into a list of tokens.
///
/// Fails with `InvalidInput` on any slice the token grammar does not cover
/// (unknown characters, unterminated strings) and with `OutOfRange` when a
/// numeric literal does not fit its type.
pub fn lex(source: &str) -> Result<Vec<Token>> {
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(kind) => tokens.push(Token {
                kind,
                span: Span::new(span.start, span.end),
            }),
            Err(()) => {
                let slice = lexer.slice();
                // A failed match whose text is all digits means the literal
                // matched but its value callback rejected it: parse overflow.
                if !slice.is_empty() && slice.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
                    return Err(QuarryError::OutOfRange(format!(
                        "numeric literal '{slice}' at offset {} does not fit",
                        span.start
                    )));
                }
                return Err(QuarryError::InvalidInput(format!(
                    "unexpected character sequence '{slice}' at offset {}",
                    span.start
                )));
            }
        }
    }

    Ok(tokens)
}
