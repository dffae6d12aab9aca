pub mod abi;
pub mod driver;
pub mod error;
pub mod expand;
pub mod include;
pub mod scope;
pub mod sig;

pub use driver::{compile, CompileOutput};
pub use error::CompileError;
pub use include::{resolve, ResolvedProgram};
pub use scope::GlobalScope;

use huff_analysis::const_overrides::ConstantOverride;
use huff_ast::Definition;
use huff_evm::ContextTracker;
use serde_json::Value;

/// Everything a caller needs to emit artifacts: the assembled runtime/deploy
/// bytecode plus the ABI built from the program's functions/events/errors.
pub struct CompiledProgram {
    pub output: CompileOutput,
    pub abi: Value,
}

/// Builds a [`GlobalScope`] from an already-flattened, already-analyzed
/// definition list, then runs the full top-level driver and ABI builder.
/// Callers that need the intermediate `GlobalScope` (for example, to report
/// builtin-argument errors with access to table/jumptable names) should call
/// [`GlobalScope::build`] and [`driver::compile`] directly instead.
pub fn compile_program<'src>(
    defs: &[Definition<'src>],
    overrides: &[ConstantOverride],
    avoid_push0: bool,
) -> Result<CompiledProgram, CompileError> {
    let mut context = ContextTracker::root();
    let scope = GlobalScope::build(defs, overrides, avoid_push0, &mut context)?;
    let output = driver::compile(&scope, &mut context, avoid_push0)?;
    let abi = abi::build_abi(
        scope.functions.values().copied(),
        scope.events.values().copied(),
        scope.errors.values().copied(),
    );
    Ok(CompiledProgram { output, abi })
}
