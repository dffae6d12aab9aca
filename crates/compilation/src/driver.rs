//! The top-level compilation driver: expands `MAIN` into a runtime object,
//! then either `CONSTRUCTOR` or a synthesised minimal initialiser into a
//! deploy object, assembling both.

use crate::error::CompileError;
use crate::expand::{expand, return_runtime_asm};
use crate::scope::GlobalScope;
use huff_ast::Spanned;
use huff_evm::{assemble, bytes_to_push, Asm, ContextTracker, MarkId, ObjectId, RefTarget};

/// The two top-level code objects a Huff program compiles to.
pub struct CompileOutput {
    pub runtime: Vec<u8>,
    pub deploy: Vec<u8>,
}

fn macro_name_span<'src>(scope: &GlobalScope<'src, '_>, name: &str) -> Option<Spanned<&'src str>> {
    scope.macros.get(name).map(|m| m.name)
}

/// Appends every code table / jump table referenced since the last call to
/// `scope.take_referenced`, in declaration order. Jump tables lower to a run
/// of `FixedRef` entries at the table's own packed/unpacked width, resolved
/// against the labels of whichever macro invoked `__tablestart`/`__tablesize`
/// on them.
fn append_referenced_tables(mut asm: Vec<Asm>, scope: &GlobalScope<'_, '_>) -> Vec<Asm> {
    let referenced = scope.take_referenced();
    for name in scope.declared_order(&referenced) {
        if let Some(table) = scope.tables.get(name) {
            asm.push(Asm::Mark(table.start.clone()));
            asm.push(Asm::Data(table.data.to_vec()));
            asm.push(Asm::Mark(table.end.clone()));
        } else if let Some(jt) = scope.jumptables.get(name) {
            asm.push(Asm::Mark(jt.start.clone()));
            for label_mid in scope.jumptable_resolution(name) {
                asm.push(Asm::FixedRef(RefTarget::Direct(label_mid), jt.def.size));
            }
            asm.push(Asm::Mark(jt.end.clone()));
        }
    }
    asm
}

/// Runs the full driver: `MAIN` always exists (checked earlier by static
/// analysis, but re-checked here since this function is also reachable
/// directly by tests). `CONSTRUCTOR`, if present, is expanded with the
/// runtime object available to `__RUNTIME_START`/`__RUNTIME_SIZE`/
/// `__RETURN_RUNTIME`; otherwise a minimal initialiser equivalent to
/// `__RETURN_RUNTIME(0)` is synthesised and the runtime embedded after it.
pub fn compile(
    scope: &GlobalScope<'_, '_>,
    context: &mut ContextTracker,
    avoid_push0: bool,
) -> Result<CompileOutput, CompileError> {
    let main_name = macro_name_span(scope, "MAIN").ok_or(CompileError::MissingMain)?;

    let mut main_ctx = context.next_sub_context();
    let mut trace = Vec::new();
    let runtime_asm = expand(
        main_name,
        scope,
        Vec::new(),
        &mut main_ctx,
        &mut trace,
        avoid_push0,
        None,
    )?;
    let runtime_asm = append_referenced_tables(runtime_asm, scope);
    let runtime_bytes = assemble(&runtime_asm)?;

    let runtime_obj: ObjectId = context.next_obj_id();

    let deploy_asm = if let Some(ctor_name) = macro_name_span(scope, "CONSTRUCTOR") {
        let mut ctor_ctx = context.next_sub_context();
        let mut ctor_trace = Vec::new();
        let mut asm = expand(
            ctor_name,
            scope,
            Vec::new(),
            &mut ctor_ctx,
            &mut ctor_trace,
            avoid_push0,
            Some(&runtime_obj),
        )?;
        asm = append_referenced_tables(asm, scope);
        asm.push(Asm::Mark(MarkId::start(runtime_obj.clone())));
        asm.push(Asm::Data(runtime_bytes.clone()));
        asm.push(Asm::Mark(MarkId::end(runtime_obj)));
        asm
    } else {
        let zero_offset = bytes_to_push(&[0u8], avoid_push0)?;
        let mut asm = return_runtime_asm(runtime_obj.clone(), zero_offset);
        asm.push(Asm::Mark(MarkId::start(runtime_obj.clone())));
        asm.push(Asm::Data(runtime_bytes.clone()));
        asm.push(Asm::Mark(MarkId::end(runtime_obj)));
        asm
    };
    let deploy_bytes = assemble(&deploy_asm)?;

    Ok(CompileOutput {
        runtime: runtime_bytes,
        deploy: deploy_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use huff_analysis::const_overrides::ConstantOverride;

    fn compile_src(src: &str) -> Result<CompileOutput, CompileError> {
        let root = huff_ast::parse(src).expect("source should parse");
        let defs: Vec<huff_ast::Definition> = root
            .0
            .iter()
            .filter_map(|s| match s {
                huff_ast::RootSection::Definition(d) => Some(d.clone()),
                _ => None,
            })
            .collect();
        let mut errs = Vec::new();
        huff_analysis::analyze(defs.iter(), |e| errs.push(e));
        assert!(errs.is_empty(), "unexpected analysis errors: {errs:?}");

        let overrides: Vec<ConstantOverride> = Vec::new();
        let mut context = ContextTracker::root();
        let scope = GlobalScope::build(&defs, &overrides, false, &mut context)?;
        compile(&scope, &mut context, false)
    }

    #[test]
    fn minimal_main_returns_expected_runtime() {
        let out = compile_src(
            "#define macro MAIN() = takes(0) returns(0) {\n\
                 0x03 0x017389 add 0x00 mstore 0x20 0x00 return\n\
             }",
        )
        .unwrap();
        assert_eq!(hex::encode(&out.runtime), "600362017389015f5260205ff3");
    }

    #[test]
    fn missing_main_is_an_error() {
        let src = "#define macro FOO() = takes(0) returns(0) {\nstop\n}";
        let root = huff_ast::parse(src).unwrap();
        let defs: Vec<huff_ast::Definition> = root
            .0
            .iter()
            .filter_map(|s| match s {
                huff_ast::RootSection::Definition(d) => Some(d.clone()),
                _ => None,
            })
            .collect();
        let mut context = ContextTracker::root();
        let scope = GlobalScope::build(&defs, &[], false, &mut context).unwrap();
        assert_eq!(compile(&scope, &mut context, false), Err(CompileError::MissingMain));
    }

    #[test]
    fn jump_to_label_assembles_minimal_width() {
        let out = compile_src(
            "#define macro MAIN() = takes(0) returns(0) {\n\
                 target jump target:\n\
             }",
        )
        .unwrap();
        // push1(offset) jump jumpdest -- label definitions emit their own
        // jumpdest, so the source names the label only once.
        assert_eq!(out.runtime, vec![0x60, 0x03, 0x56, 0x5b]);
    }

    #[test]
    fn constructor_embeds_runtime_via_codecopy() {
        let out = compile_src(
            "#define macro MAIN() = takes(0) returns(0) {\n\
                 stop\n\
             }\n\
             #define macro CONSTRUCTOR() = takes(0) returns(0) {\n\
                 __RETURN_RUNTIME(0x00)\n\
             }",
        )
        .unwrap();
        assert_eq!(out.runtime, vec![0x00]);
        assert!(out.deploy.len() > out.runtime.len());
    }
}
