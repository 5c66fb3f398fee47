//! Pratt parser for the SQL grammar.
//!
//! Entry point is [`parse_sql`]. Expression parsing is precedence-climbing:
//! a prefix production followed by infix productions while the next token
//! binds tighter than the current precedence.

use quarry_common::{QuarryError, Result};

use crate::ast::{SqlBinaryOp, SqlExpr, SqlSelect};
use crate::lexer::{lex, Token};
use crate::token::TokenKind;

/// Parse one SQL `SELECT` statement.
pub fn parse_sql(sql: &str) -> Result<SqlSelect> {
    let tokens = lex(sql)?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr(0)?;
    parser.eat(&TokenKind::Semicolon);
    parser.expect_end()?;

    match expr {
        SqlExpr::Select(select) => Ok(select),
        other => Err(QuarryError::InvalidInput(format!(
            "expected a SELECT statement, found expression {other:?}"
        ))),
    }
}

/// The parser state.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Precedence of the next token; 0 at end of input or for any token
    /// that is not an infix operator.
    fn next_precedence(&self) -> u8 {
        match self.peek_kind() {
            Some(TokenKind::As | TokenKind::Asc | TokenKind::Desc) => 10,
            Some(TokenKind::Or | TokenKind::OrOr) => 20,
            Some(TokenKind::And | TokenKind::AndAnd) => 30,
            Some(
                TokenKind::Lt
                | TokenKind::LtEq
                | TokenKind::Gt
                | TokenKind::GtEq
                | TokenKind::Eq
                | TokenKind::EqEq
                | TokenKind::NotEq,
            ) => 40,
            Some(TokenKind::Plus | TokenKind::Minus) => 50,
            Some(TokenKind::Star | TokenKind::Slash | TokenKind::Percent) => 60,
            Some(TokenKind::LParen) => 70,
            _ => 0,
        }
    }

    fn parse_expr(&mut self, precedence: u8) -> Result<SqlExpr> {
        let mut expr = self.parse_prefix()?;
        while precedence < self.next_precedence() {
            let next = self.next_precedence();
            expr = self.parse_infix(expr, next)?;
        }
        Ok(expr)
    }

    fn parse_prefix(&mut self) -> Result<SqlExpr> {
        let token = self.advance().ok_or_else(|| {
            QuarryError::InvalidInput("unexpected end of input, expected expression".to_string())
        })?;

        match token.kind {
            TokenKind::Select => self.parse_select(),
            TokenKind::Cast => self.parse_cast(),
            // Aggregate keywords act as plain identifiers so that a
            // following `(` starts a function call.
            TokenKind::Max => Ok(SqlExpr::Identifier("MAX".to_string())),
            TokenKind::Min => Ok(SqlExpr::Identifier("MIN".to_string())),
            TokenKind::Sum => Ok(SqlExpr::Identifier("SUM".to_string())),
            TokenKind::Avg => Ok(SqlExpr::Identifier("AVG".to_string())),
            TokenKind::Count => Ok(SqlExpr::Identifier("COUNT".to_string())),
            TokenKind::Identifier(name) => Ok(SqlExpr::Identifier(name)),
            TokenKind::String(value) => Ok(SqlExpr::String(value)),
            TokenKind::Long(value) => Ok(SqlExpr::Long(value)),
            TokenKind::Double(value) => Ok(SqlExpr::Double(value)),
            other => Err(QuarryError::InvalidInput(format!(
                "unexpected token '{other}' at offset {}, expected expression",
                token.span.start
            ))),
        }
    }

    fn parse_infix(&mut self, left: SqlExpr, precedence: u8) -> Result<SqlExpr> {
        let token = self.advance().ok_or_else(|| {
            QuarryError::Internal("infix parse called at end of input".to_string())
        })?;

        let op = match token.kind {
            TokenKind::And | TokenKind::AndAnd => SqlBinaryOp::And,
            TokenKind::Or | TokenKind::OrOr => SqlBinaryOp::Or,
            TokenKind::Eq | TokenKind::EqEq => SqlBinaryOp::Eq,
            TokenKind::NotEq => SqlBinaryOp::NotEq,
            TokenKind::Gt => SqlBinaryOp::Gt,
            TokenKind::GtEq => SqlBinaryOp::GtEq,
            TokenKind::Lt => SqlBinaryOp::Lt,
            TokenKind::LtEq => SqlBinaryOp::LtEq,
            TokenKind::Plus => SqlBinaryOp::Plus,
            TokenKind::Minus => SqlBinaryOp::Minus,
            TokenKind::Star => SqlBinaryOp::Multiply,
            TokenKind::Slash => SqlBinaryOp::Divide,
            TokenKind::Percent => SqlBinaryOp::Modulus,

            TokenKind::As => {
                let alias = self.expect_identifier()?;
                return Ok(SqlExpr::Alias {
                    expr: Box::new(left),
                    alias,
                });
            }
            TokenKind::Asc => {
                return Ok(SqlExpr::Sort {
                    expr: Box::new(left),
                    asc: true,
                });
            }
            TokenKind::Desc => {
                return Ok(SqlExpr::Sort {
                    expr: Box::new(left),
                    asc: false,
                });
            }
            TokenKind::LParen => return self.parse_function_call(left),

            other => {
                return Err(QuarryError::InvalidInput(format!(
                    "unexpected token '{other}' at offset {}, expected operator",
                    token.span.start
                )));
            }
        };

        let right = self.parse_expr(precedence)?;
        Ok(SqlExpr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    /// `(` was just consumed; `left` must be a callable identifier.
    fn parse_function_call(&mut self, left: SqlExpr) -> Result<SqlExpr> {
        let name = match left {
            SqlExpr::Identifier(name) => name,
            other => {
                return Err(QuarryError::InvalidInput(format!(
                    "cannot call expression {other:?} as a function"
                )));
            }
        };

        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            args.push(self.parse_expr(0)?);
            while self.eat(&TokenKind::Comma) {
                args.push(self.parse_expr(0)?);
            }
        }
        self.expect(&TokenKind::RParen)?;

        Ok(SqlExpr::Function { name, args })
    }

    /// `SELECT` was just consumed.
    fn parse_select(&mut self) -> Result<SqlExpr> {
        let projection = if self.eat(&TokenKind::Star) {
            Vec::new()
        } else {
            let mut exprs = vec![self.parse_expr(0)?];
            while self.eat(&TokenKind::Comma) {
                exprs.push(self.parse_expr(0)?);
            }
            exprs
        };

        self.expect(&TokenKind::From)?;
        let table = self.expect_identifier()?;

        let selection = if self.eat(&TokenKind::Where) {
            Some(Box::new(self.parse_expr(0)?))
        } else {
            None
        };

        let group_by = if self.eat(&TokenKind::Group) {
            self.expect(&TokenKind::By)?;
            let mut exprs = vec![self.parse_expr(0)?];
            while self.eat(&TokenKind::Comma) {
                exprs.push(self.parse_expr(0)?);
            }
            exprs
        } else {
            Vec::new()
        };

        let having = if self.eat(&TokenKind::Having) {
            Some(Box::new(self.parse_expr(0)?))
        } else {
            None
        };

        let order_by = if self.eat(&TokenKind::Order) {
            self.expect(&TokenKind::By)?;
            let mut keys = vec![self.parse_order_key()?];
            while self.eat(&TokenKind::Comma) {
                keys.push(self.parse_order_key()?);
            }
            keys
        } else {
            Vec::new()
        };

        Ok(SqlExpr::Select(SqlSelect {
            projection,
            selection,
            group_by,
            having,
            order_by,
            table,
        }))
    }

    /// An ORDER BY key; defaults to ascending when ASC/DESC is omitted.
    fn parse_order_key(&mut self) -> Result<SqlExpr> {
        let expr = self.parse_expr(0)?;
        Ok(match expr {
            sort @ SqlExpr::Sort { .. } => sort,
            other => SqlExpr::Sort {
                expr: Box::new(other),
                asc: true,
            },
        })
    }

    /// `CAST` was just consumed: `( expr AS type )`.
    ///
    /// The inner expression parses at the alias precedence so the `AS`
    /// belongs to the cast, not to an alias.
    fn parse_cast(&mut self) -> Result<SqlExpr> {
        self.expect(&TokenKind::LParen)?;
        let expr = self.parse_expr(10)?;
        self.expect(&TokenKind::As)?;
        let data_type = self.expect_identifier()?;
        self.expect(&TokenKind::RParen)?;
        Ok(SqlExpr::Cast {
            expr: Box::new(expr),
            data_type,
        })
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token> {
        match self.tokens.get(self.pos) {
            Some(token) if &token.kind == kind => {
                let token = token.clone();
                self.pos += 1;
                Ok(token)
            }
            Some(token) => Err(QuarryError::InvalidInput(format!(
                "expected '{kind}', found '{}' at offset {}",
                token.kind, token.span.start
            ))),
            None => Err(QuarryError::InvalidInput(format!(
                "expected '{kind}', found end of input"
            ))),
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.tokens.get(self.pos) {
            Some(Token {
                kind: TokenKind::Identifier(name),
                ..
            }) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            Some(token) => Err(QuarryError::InvalidInput(format!(
                "expected identifier, found '{}' at offset {}",
                token.kind, token.span.start
            ))),
            None => Err(QuarryError::InvalidInput(
                "expected identifier, found end of input".to_string(),
            )),
        }
    }

    fn expect_end(&self) -> Result<()> {
        match self.tokens.get(self.pos) {
            None => Ok(()),
            Some(token) => Err(QuarryError::InvalidInput(format!(
                "unexpected trailing token '{}' at offset {}",
                token.kind, token.span.start
            ))),
        }
    }
}
