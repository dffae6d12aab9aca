use crate::sol_type::SolArg;
use alloy_primitives::U256;
use huff_evm::Opcode;

/// A span.
pub type Span = chumsky::span::SimpleSpan<usize>;

/// A spanned value.
pub type Spanned<T> = (T, Span);

pub trait IdentifiableNode<'a> {
    fn ident(&self) -> &'a str;
}

impl<'src> IdentifiableNode<'src> for Spanned<&'src str> {
    fn ident(&self) -> &'src str {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root<'src>(pub Box<[RootSection<'src>]>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSection<'src> {
    Definition(Definition<'src>),
    Include(Spanned<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition<'src> {
    Macro(Macro<'src>),
    Constant {
        name: Spanned<&'src str>,
        expr: Spanned<ConstExpr>,
    },
    Table {
        name: Spanned<&'src str>,
        data: Box<[u8]>,
    },
    Jumptable(Jumptable<'src>),
    Function(SolFunction<'src>),
    Event(SolEvent<'src>),
    Error(SolError<'src>),
}

impl<'src> IdentifiableNode<'src> for Definition<'src> {
    fn ident(&self) -> &'src str {
        match self {
            Self::Macro(m) => m.name.0,
            Self::Constant { name, .. } => name.0,
            Self::Table { name, .. } => name.0,
            Self::Jumptable(jt) => jt.name.0,
            Self::Function(f) => f.name.0,
            Self::Event(e) => e.name.0,
            Self::Error(e) => e.name.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro<'src> {
    pub name: Spanned<&'src str>,
    pub params: Box<[Spanned<&'src str>]>,
    pub takes_returns: Option<(Spanned<u64>, Spanned<u64>)>,
    pub body: Box<[MacroStatement<'src>]>,
}

impl<'src> IdentifiableNode<'src> for Macro<'src> {
    fn ident(&self) -> &'src str {
        self.name.ident()
    }
}

/// A `#define constant` right-hand side: either a literal value or the
/// `FREE_STORAGE_POINTER()` sentinel, which is resolved to a slot number
/// during constant resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstExpr {
    Value(U256),
    FreeStoragePointer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroStatement<'src> {
    LabelDefinition(Spanned<&'src str>),
    Instruction(Instruction<'src>),
    Invoke(Invoke<'src>),
}

/// A single element of a macro body.
///
/// Hex literals are kept as [`Instruction::VariablePush`] rather than
/// immediately lowered to an `Opcode::PUSHn`: whether a single zero byte
/// becomes `PUSH0` depends on the `--avoid-push0` flag, which isn't known
/// until expansion time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction<'src> {
    Op(Spanned<Opcode>),
    VariablePush(Spanned<U256>, Option<u8>),
    LabelReference(Spanned<&'src str>),
    MacroArgReference(Spanned<&'src str>),
    ConstantReference(Spanned<&'src str>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invoke<'src> {
    Macro {
        name: Spanned<&'src str>,
        args: Box<[Instruction<'src>]>,
    },
    /// Every built-in takes 0 or 1 arguments; the argument's AST shape is
    /// identical to a macro invocation argument (an identifier name lookup,
    /// a macro parameter, a constant ref, or a literal) -- which of those is
    /// actually valid for a given built-in is a semantic, not syntactic, rule.
    Builtin {
        name: Spanned<&'src str>,
        args: Box<[Instruction<'src>]>,
    },
}

pub const BUILTIN_NAMES: &[&str] = &[
    "__tablestart",
    "__tablesize",
    "__FUNC_SIG",
    "__EVENT_HASH",
    "__RUNTIME_START",
    "__RUNTIME_SIZE",
    "__RETURN_RUNTIME",
    "__codesize",
];

pub fn is_builtin_name(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jumptable<'src> {
    pub name: Spanned<&'src str>,
    pub size: u8,
    pub labels: Box<[Spanned<&'src str>]>,
}

impl<'src> IdentifiableNode<'src> for Jumptable<'src> {
    fn ident(&self) -> &'src str {
        self.name.ident()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateMutability {
    Pure,
    View,
    Payable,
    NonPayable,
}

impl std::fmt::Display for StateMutability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StateMutability::Pure => "pure",
            StateMutability::View => "view",
            StateMutability::Payable => "payable",
            StateMutability::NonPayable => "nonpayable",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolFunction<'src> {
    pub name: Spanned<&'src str>,
    pub inputs: Box<[SolArg<'src>]>,
    pub outputs: Box<[SolArg<'src>]>,
    pub mutability: StateMutability,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolEvent<'src> {
    pub name: Spanned<&'src str>,
    pub inputs: Box<[SolArg<'src>]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolError<'src> {
    pub name: Spanned<&'src str>,
    pub inputs: Box<[SolArg<'src>]>,
}
