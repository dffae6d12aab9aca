use crate::error::CompileError;
use crate::scope::{GlobalScope, MacroArg};
use crate::sig::{error_selector_push, event_topic_push, func_selector_push};
use alloy_primitives::U256;
use huff_ast::{Instruction, Invoke, Macro, MacroStatement, Spanned};
use huff_evm::{bytes_to_push, minimal_push, Asm, ContextTracker, MarkId, ObjectId, Opcode};
use std::collections::BTreeMap;

/// A builtin call argument that hasn't yet been forced into a concrete value:
/// a bare identifier is kept around as `Ident` because which global category
/// it names (a table, a function, an event...) depends on which builtin is
/// being invoked.
enum InvokeValue<'src> {
    Ident(Spanned<&'src str>),
    Resolved(MacroArg),
}

/// Lowers a hex literal to its final `Opcode`, trimming to the value's
/// significant bytes first -- `Opcode::push`/`minimal_push` pad up to a given
/// width but never trim, so the trim has to happen here regardless of
/// whether the literal carried an explicit `pushN` width.
fn compile_literal(value: U256, width: Option<u8>, avoid_push0: bool) -> Result<Opcode, CompileError> {
    let full = value.to_be_bytes::<32>();
    let first_nonzero = full.iter().position(|&b| b != 0);
    let trimmed: &[u8] = match first_nonzero {
        Some(i) => &full[i..],
        None => &full[31..],
    };
    match width {
        Some(w) => Ok(minimal_push(trimmed, Some(w))?),
        None => Ok(bytes_to_push(trimmed, avoid_push0)?),
    }
}

fn macro_arg_to_asm(arg: MacroArg) -> Asm {
    match arg {
        MacroArg::Op(op) => Asm::Op(op),
        MacroArg::MarkRef(mid) => Asm::MarkRef(mid),
    }
}

/// Resolves a plain body element: an opcode, a deferred literal, a label
/// reference, a macro-parameter substitution, or a constant reference.
fn resolve_instruction<'src>(
    instr: &Instruction<'src>,
    scope: &GlobalScope<'src, '_>,
    args: &BTreeMap<&'src str, MacroArg>,
    labels: &BTreeMap<&'src str, MarkId>,
    avoid_push0: bool,
) -> Result<Asm, CompileError> {
    match instr {
        Instruction::Op((op, _)) => Ok(Asm::Op(op.clone())),
        Instruction::VariablePush((value, _), width) => {
            Ok(Asm::Op(compile_literal(*value, *width, avoid_push0)?))
        }
        Instruction::LabelReference((name, _)) => labels
            .get(name)
            .cloned()
            .map(Asm::MarkRef)
            .ok_or_else(|| CompileError::UnknownIdentifier((*name).to_string())),
        Instruction::MacroArgReference((name, _)) => args
            .get(name)
            .cloned()
            .map(macro_arg_to_asm)
            .ok_or_else(|| CompileError::UnknownIdentifier((*name).to_string())),
        Instruction::ConstantReference((name, _)) => scope
            .constants
            .get(name)
            .cloned()
            .map(Asm::Op)
            .ok_or_else(|| CompileError::UndefinedConstant((*name).to_string())),
    }
}

/// Resolves a macro invocation argument. Constant references are not a valid
/// invocation argument shape -- only an opcode, a literal, a label, or
/// another macro's parameter can be passed down to a nested invocation.
fn resolve_call_arg<'src>(
    instr: &Instruction<'src>,
    args: &BTreeMap<&'src str, MacroArg>,
    labels: &BTreeMap<&'src str, MarkId>,
    avoid_push0: bool,
) -> Result<MacroArg, CompileError> {
    match instr {
        Instruction::Op((op, _)) => Ok(MacroArg::Op(op.clone())),
        Instruction::VariablePush((value, _), width) => {
            Ok(MacroArg::Op(compile_literal(*value, *width, avoid_push0)?))
        }
        Instruction::LabelReference((name, _)) => labels
            .get(name)
            .cloned()
            .map(MacroArg::MarkRef)
            .ok_or_else(|| CompileError::UnknownIdentifier((*name).to_string())),
        Instruction::MacroArgReference((name, _)) => args
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::UnknownIdentifier((*name).to_string())),
        Instruction::ConstantReference(_) => Err(CompileError::ArgumentKind {
            builtin: "macro invocation argument",
            expected: "an opcode, a literal, a label, or a macro parameter (not a constant)",
        }),
    }
}

/// Resolves a builtin invocation argument. A bare identifier that doesn't
/// name an opcode is kept unresolved (`InvokeValue::Ident`) since builtins
/// like `__tablestart` need the raw name, not a mark.
fn resolve_builtin_arg<'src>(
    instr: &Instruction<'src>,
    args: &BTreeMap<&'src str, MacroArg>,
    avoid_push0: bool,
) -> Result<InvokeValue<'src>, CompileError> {
    match instr {
        Instruction::Op((op, _)) => Ok(InvokeValue::Resolved(MacroArg::Op(op.clone()))),
        Instruction::VariablePush((value, _), width) => Ok(InvokeValue::Resolved(MacroArg::Op(
            compile_literal(*value, *width, avoid_push0)?,
        ))),
        Instruction::LabelReference(name_sp) => {
            if let Some(op) = Opcode::from_mnemonic(name_sp.0) {
                Ok(InvokeValue::Resolved(MacroArg::Op(op)))
            } else {
                Ok(InvokeValue::Ident(*name_sp))
            }
        }
        Instruction::MacroArgReference((name, _)) => args
            .get(name)
            .cloned()
            .map(InvokeValue::Resolved)
            .ok_or_else(|| CompileError::UnknownIdentifier((*name).to_string())),
        Instruction::ConstantReference(_) => Err(CompileError::ArgumentKind {
            builtin: "builtin invocation argument",
            expected: "an identifier, a macro parameter, or a literal (not a constant)",
        }),
    }
}

fn expect_single_ident<'src>(
    builtin: &'static str,
    values: &[InvokeValue<'src>],
) -> Result<&'src str, CompileError> {
    match values {
        [InvokeValue::Ident(name)] => Ok(name.0),
        _ => Err(CompileError::ArgumentKind {
            builtin,
            expected: "a single bare identifier",
        }),
    }
}

fn expect_single_op(builtin: &'static str, values: &[InvokeValue]) -> Result<Opcode, CompileError> {
    match values {
        [InvokeValue::Resolved(MacroArg::Op(op))] => Ok(op.clone()),
        _ => Err(CompileError::ArgumentKind {
            builtin,
            expected: "a single opcode or literal",
        }),
    }
}

/// The sequence `__RETURN_RUNTIME(offset)` lowers to: push the runtime's
/// size, dup it, push the runtime's start, push `offset` again, `codecopy`
/// into memory at `offset`, then `return` that same region.
pub fn return_runtime_asm(runtime: ObjectId, offset: Opcode) -> Vec<Asm> {
    let start = MarkId::start(runtime.clone());
    let end = MarkId::end(runtime);
    vec![
        Asm::delta_ref(start.clone(), end),
        Asm::Op(Opcode::DUP1),
        Asm::mref(start),
        Asm::Op(offset.clone()),
        Asm::Op(Opcode::CODECOPY),
        Asm::Op(offset),
        Asm::Op(Opcode::RETURN),
    ]
}

fn dispatch_builtin<'src>(
    name: Spanned<&'src str>,
    scope: &GlobalScope<'src, '_>,
    values: Vec<InvokeValue<'src>>,
    own_labels: &BTreeMap<&'src str, MarkId>,
    constructor_runtime: Option<&ObjectId>,
) -> Result<Vec<Asm>, CompileError> {
    match name.0 {
        "__tablestart" | "__tablesize" => {
            let ident = expect_single_ident(name.0, &values)?;
            let (start, end) = scope.table_marks(ident)?;
            if scope.jumptables.contains_key(ident) {
                scope.resolve_jumptable(ident, own_labels)?;
            }
            scope.mark_table_referenced(ident);
            Ok(vec![if name.0 == "__tablestart" {
                Asm::mref(start)
            } else {
                Asm::delta_ref(start, end)
            }])
        }
        "__FUNC_SIG" => {
            let ident = expect_single_ident(name.0, &values)?;
            let op = if let Some(f) = scope.functions.get(ident) {
                func_selector_push(f)
            } else if let Some(e) = scope.errors.get(ident) {
                error_selector_push(e)
            } else {
                return Err(CompileError::UndefinedFunctionOrError(ident.to_string()));
            };
            Ok(vec![Asm::Op(op)])
        }
        "__EVENT_HASH" => {
            let ident = expect_single_ident(name.0, &values)?;
            let e = scope
                .events
                .get(ident)
                .ok_or_else(|| CompileError::UndefinedEvent(ident.to_string()))?;
            Ok(vec![Asm::Op(event_topic_push(e))])
        }
        "__RUNTIME_START" => {
            let rt = constructor_runtime.ok_or(CompileError::ConstructorOnly("RUNTIME_START"))?;
            Ok(vec![Asm::mref(MarkId::start(rt.clone()))])
        }
        "__RUNTIME_SIZE" => {
            let rt = constructor_runtime.ok_or(CompileError::ConstructorOnly("RUNTIME_SIZE"))?;
            Ok(vec![Asm::delta_ref(MarkId::start(rt.clone()), MarkId::end(rt.clone()))])
        }
        "__RETURN_RUNTIME" => {
            let rt = constructor_runtime.ok_or(CompileError::ConstructorOnly("RETURN_RUNTIME"))?;
            let offset = expect_single_op(name.0, &values)?;
            Ok(return_runtime_asm(rt.clone(), offset))
        }
        "__codesize" => Err(CompileError::CodesizeUnsupported),
        other => unreachable!("not a known builtin name: {other}"),
    }
}

/// Expands `macro_name` into a flat assembly stream.
///
/// Label scope is local to the macro that defines it: a label goes out of
/// scope once that macro's own body has been walked, and a macro invoked
/// from within never sees its caller's labels (static analysis rejects any
/// cross-macro label reference before expansion runs, per spec section 9's
/// leave to reject rather than implement caller-to-callee label visibility).
/// `context` mints a fresh `ObjectId` for every label this invocation
/// defines, so two invocations of the same macro never collide.
#[allow(clippy::too_many_arguments)]
pub fn expand<'src>(
    macro_name: Spanned<&'src str>,
    scope: &GlobalScope<'src, '_>,
    args: Vec<MacroArg>,
    context: &mut ContextTracker,
    trace: &mut Vec<&'src str>,
    avoid_push0: bool,
    constructor_runtime: Option<&ObjectId>,
) -> Result<Vec<Asm>, CompileError> {
    let macro_def = *scope
        .macros
        .get(macro_name.0)
        .ok_or_else(|| CompileError::UndefinedMacro(macro_name.0.to_string()))?;

    if trace.contains(&macro_name.0) {
        return Err(CompileError::CircularMacro(macro_name.0.to_string()));
    }
    if args.len() != macro_def.params.len() {
        return Err(CompileError::ArityMismatch {
            name: macro_name.0.to_string(),
            expected: macro_def.params.len(),
            given: args.len(),
        });
    }
    trace.push(macro_name.0);
    let result = expand_body(macro_def, scope, args, context, trace, avoid_push0, constructor_runtime);
    trace.pop();
    result
}

/// The actual body walk, split out of [`expand`] so its caller can pop the
/// invocation trace exactly once regardless of how this returns.
#[allow(clippy::too_many_arguments)]
fn expand_body<'src>(
    macro_def: &Macro<'src>,
    scope: &GlobalScope<'src, '_>,
    args: Vec<MacroArg>,
    context: &mut ContextTracker,
    trace: &mut Vec<&'src str>,
    avoid_push0: bool,
    constructor_runtime: Option<&ObjectId>,
) -> Result<Vec<Asm>, CompileError> {
    let args_map: BTreeMap<&'src str, MacroArg> = macro_def
        .params
        .iter()
        .map(|p| p.0)
        .zip(args)
        .collect();

    let mut labels: BTreeMap<&'src str, MarkId> = BTreeMap::new();
    for stmt in macro_def.body.iter() {
        if let MacroStatement::LabelDefinition(label) = stmt {
            let mid = MarkId::label(context.next_obj_id());
            if let Some(existing) = labels.get(label.0) {
                if !existing.different_ctx(&mid) {
                    return Err(CompileError::DuplicateLabel(label.0.to_string()));
                }
            }
            labels.insert(label.0, mid);
        }
    }

    let mut asm = Vec::new();
    for stmt in macro_def.body.iter() {
        match stmt {
            MacroStatement::LabelDefinition(label) => {
                asm.push(Asm::Mark(labels[label.0].clone()));
                asm.push(Asm::Op(Opcode::JUMPDEST));
            }
            MacroStatement::Instruction(instr) => {
                asm.push(resolve_instruction(instr, scope, &args_map, &labels, avoid_push0)?);
            }
            MacroStatement::Invoke(Invoke::Macro { name: target, args: call_args }) => {
                let resolved_args = call_args
                    .iter()
                    .map(|a| resolve_call_arg(a, &args_map, &labels, avoid_push0))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut child_ctx = context.next_sub_context();
                asm.extend(expand(
                    *target,
                    scope,
                    resolved_args,
                    &mut child_ctx,
                    trace,
                    avoid_push0,
                    constructor_runtime,
                )?);
            }
            MacroStatement::Invoke(Invoke::Builtin { name: target, args: call_args }) => {
                let values = call_args
                    .iter()
                    .map(|a| resolve_builtin_arg(a, &args_map, avoid_push0))
                    .collect::<Result<Vec<_>, _>>()?;
                asm.extend(dispatch_builtin(*target, scope, values, &labels, constructor_runtime)?);
            }
        }
    }

    Ok(asm)
}
