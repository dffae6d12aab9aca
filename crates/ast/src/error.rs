use crate::ast::Span;
use thiserror::Error as ThisError;

#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum Error {
    #[error("{0}")]
    Lex(String),

    #[error("unexpected token at {span:?}: expected {expected}, found {found}")]
    UnexpectedToken {
        span: Span,
        expected: String,
        found: String,
    },

    #[error("unexpected end of input: expected {0}")]
    UnexpectedEof(String),

    #[error("hex literal at {0:?} exceeds 32 bytes")]
    HexLiteralTooLarge(Span),

    #[error("unknown Solidity type \"{0}\"")]
    UnknownSolType(String),

    #[error("invalid uint/int width {0} (must be a multiple of 8 in 8..=256)")]
    InvalidIntWidth(u16),

    #[error("invalid bytesN width {0} (must be in 1..=32)")]
    InvalidBytesWidth(u16),

    #[error("array size 0 at {0:?} is not allowed")]
    ZeroSizedArray(Span),
}

impl Error {
    /// The span this error is anchored to, if it carries one. Some variants
    /// (bare lex failures, type-name errors) only have a message.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::UnexpectedToken { span, .. } => Some(*span),
            Error::HexLiteralTooLarge(span) => Some(*span),
            Error::ZeroSizedArray(span) => Some(*span),
            Error::Lex(_)
            | Error::UnexpectedEof(_)
            | Error::UnknownSolType(_)
            | Error::InvalidIntWidth(_)
            | Error::InvalidBytesWidth(_) => None,
        }
    }
}
