use thiserror::Error;

/// Canonical Quarry error taxonomy used across crates.
///
/// Classification guidance:
/// - [`QuarryError::InvalidInput`]: malformed SQL, unknown operators or
///   functions, bad type names, contract violations in user-provided input
/// - [`QuarryError::NotFound`]: unknown table or column referenced by name
/// - [`QuarryError::OutOfRange`]: positional references outside their bounds,
///   numeric parse overflow
/// - [`QuarryError::TypeMismatch`]: operand type conflicts discovered during
///   planning (binary expressions, non-boolean predicates)
/// - [`QuarryError::Unimplemented`]: syntactically valid but intentionally
///   unsupported behavior in this version
/// - [`QuarryError::Internal`]: invariant violations, unexpected runtime type
///   ids, and I/O failures surfaced from the columnar runtime
#[derive(Debug, Error)]
pub enum QuarryError {
    /// Malformed query text or invalid user-supplied input.
    ///
    /// Examples:
    /// - unknown character or unterminated string during lexing
    /// - unexpected token during parsing
    /// - unknown cast type name, GROUP BY without aggregates
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A table or column referenced by name does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A positional reference is outside its valid bounds.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// Operand types conflict in an expression.
    ///
    /// Examples:
    /// - binary expression over differently-typed operands
    /// - non-boolean WHERE predicate
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Valid request for behavior outside the supported surface.
    ///
    /// Examples:
    /// - ORDER BY / HAVING execution
    /// - cast between unsupported type pairs
    /// - Parquet sources
    #[error("unimplemented: {0}")]
    Unimplemented(String),

    /// Engine invariant violation or failure surfaced from the columnar
    /// runtime (including file I/O).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for QuarryError {
    fn from(e: std::io::Error) -> Self {
        QuarryError::Internal(format!("io error: {e}"))
    }
}

/// Standard Quarry result alias.
pub type Result<T> = std::result::Result<T, QuarryError>;
