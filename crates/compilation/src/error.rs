use huff_evm::{AssembleError, OpcodeError};
use thiserror::Error as ThisError;

/// Everything that can go wrong after a program has already passed static
/// analysis: constant resolution, macro expansion, and final assembly.
#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum CompileError {
    #[error("no MAIN macro defined")]
    MissingMain,

    #[error("macro '{0}' not found")]
    UndefinedMacro(String),

    #[error("'{name}' takes {expected} argument(s), invoked with {given}")]
    ArityMismatch {
        name: String,
        expected: usize,
        given: usize,
    },

    #[error("macro '{0}' recursively invokes itself")]
    CircularMacro(String),

    #[error("duplicate label '{0}'")]
    DuplicateLabel(String),

    #[error("identifier '{0}' not found")]
    UnknownIdentifier(String),

    #[error("constant '{0}' not found")]
    UndefinedConstant(String),

    #[error("code table or jump table '{0}' not found")]
    UndefinedTable(String),

    #[error("function or error '{0}' not found (needed by __FUNC_SIG)")]
    UndefinedFunctionOrError(String),

    #[error("event '{0}' not found (needed by __EVENT_HASH)")]
    UndefinedEvent(String),

    #[error("jump table '{table}' lists label '{label}', which isn't defined in the macro that references it")]
    UndefinedJumpLabel { table: String, label: String },

    #[error("{builtin} argument must be {expected}")]
    ArgumentKind {
        builtin: &'static str,
        expected: &'static str,
    },

    #[error("__{0} can only be used inside CONSTRUCTOR")]
    ConstructorOnly(&'static str),

    #[error("__codesize is not supported")]
    CodesizeUnsupported,

    #[error("duplicate constant '{0}'")]
    DuplicateConstant(String),

    #[error("constant override '{0}' does not match any declared constant")]
    UnknownOverride(String),

    #[error(transparent)]
    Opcode(#[from] OpcodeError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error("circular #include: '{0}'")]
    CircularInclude(String),

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    Parse(String),
}
