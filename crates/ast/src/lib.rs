//! Parses Huff source text into an abstract syntax tree: the lexer and
//! hand-written recursive-descent parser that turn a source file into the
//! `#define`/`#include` sections later stages of the compiler walk.

mod ast;
mod error;
mod lexer;
mod parser;
mod sol_type;

pub use ast::{
    is_builtin_name, ConstExpr, Definition, IdentifiableNode, Instruction, Invoke, Jumptable,
    Macro, MacroStatement, Root, RootSection, SolError, SolEvent, SolFunction, Span, Spanned,
    StateMutability, BUILTIN_NAMES,
};
pub use error::Error;
pub use parser::parse;
pub use sol_type::{parse_base_type, SolArg, SolType};
