//! Token definitions for the SQL lexer.

use logos::Logos;

/// Token kinds produced by the lexer.
///
/// Keywords match case-insensitively; an identifier whose uppercased text
/// equals a keyword lexes as that keyword. Compound operators (`==`, `!=`,
/// `<=`, `>=`, `&&`, `||`) win over their single-character prefixes by
/// longest match.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum TokenKind {
    // Keywords
    #[token("SELECT", ignore(ascii_case))]
    Select,
    #[token("WHERE", ignore(ascii_case))]
    Where,
    #[token("ORDER", ignore(ascii_case))]
    Order,
    #[token("BY", ignore(ascii_case))]
    By,
    #[token("FROM", ignore(ascii_case))]
    From,
    #[token("AND", ignore(ascii_case))]
    And,
    #[token("OR", ignore(ascii_case))]
    Or,
    #[token("AS", ignore(ascii_case))]
    As,
    #[token("ASC", ignore(ascii_case))]
    Asc,
    #[token("DESC", ignore(ascii_case))]
    Desc,
    #[token("MAX", ignore(ascii_case))]
    Max,
    #[token("MIN", ignore(ascii_case))]
    Min,
    #[token("SUM", ignore(ascii_case))]
    Sum,
    #[token("AVG", ignore(ascii_case))]
    Avg,
    #[token("COUNT", ignore(ascii_case))]
    Count,
    #[token("CAST", ignore(ascii_case))]
    Cast,
    #[token("GROUP", ignore(ascii_case))]
    Group,
    #[token("HAVING", ignore(ascii_case))]
    Having,
    #[token("TRUE", ignore(ascii_case))]
    True,
    #[token("FALSE", ignore(ascii_case))]
    False,

    // Identifiers
    #[regex(r"[A-Za-z][A-Za-z0-9]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Literals. Strings have no escapes; a lone `"` fails to match and
    // surfaces as an error slice in the lexer.
    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    String(String),

    #[regex(r"[0-9]+", |lex| lex.slice().parse().ok(), priority = 3)]
    Long(i64),

    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse().ok())]
    Double(f64),

    // Symbols
    #[token(".")]
    Period,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(";")]
    Semicolon,

    // Operators
    #[token("==")]
    EqEq,
    #[token("=")]
    Eq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("?")]
    Question,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Select => write!(f, "SELECT"),
            TokenKind::Where => write!(f, "WHERE"),
            TokenKind::Order => write!(f, "ORDER"),
            TokenKind::By => write!(f, "BY"),
            TokenKind::From => write!(f, "FROM"),
            TokenKind::And => write!(f, "AND"),
            TokenKind::Or => write!(f, "OR"),
            TokenKind::As => write!(f, "AS"),
            TokenKind::Asc => write!(f, "ASC"),
            TokenKind::Desc => write!(f, "DESC"),
            TokenKind::Max => write!(f, "MAX"),
            TokenKind::Min => write!(f, "MIN"),
            TokenKind::Sum => write!(f, "SUM"),
            TokenKind::Avg => write!(f, "AVG"),
            TokenKind::Count => write!(f, "COUNT"),
            TokenKind::Cast => write!(f, "CAST"),
            TokenKind::Group => write!(f, "GROUP"),
            TokenKind::Having => write!(f, "HAVING"),
            TokenKind::True => write!(f, "TRUE"),
            TokenKind::False => write!(f, "FALSE"),
            TokenKind::Identifier(s) => write!(f, "{s}"),
            TokenKind::String(s) => write!(f, "\"{s}\""),
            TokenKind::Long(v) => write!(f, "{v}"),
            TokenKind::Double(v) => write!(f, "{v}"),
            TokenKind::Period => write!(f, "."),
            TokenKind::Comma => write!(f, ","),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::Eq => write!(f, "="),
            TokenKind::NotEq => write!(f, "!="),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::LtEq => write!(f, "<="),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::GtEq => write!(f, ">="),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Caret => write!(f, "^"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::Question => write!(f, "?"),
            TokenKind::AndAnd => write!(f, "&&"),
            TokenKind::OrOr => write!(f, "||"),
        }
    }
}
