//! Static validation of a parsed Huff program: per-category name uniqueness,
//! table/macro collisions, and per-macro reference checks (label, macro
//! argument, constant, and invocation arity) that can be decided without
//! expanding anything.

pub mod const_overrides;
pub mod errors;

use crate::errors::AnalysisError;
use huff_ast::{Definition, IdentifiableNode, Instruction, Invoke, Macro, MacroStatement};
use std::collections::{BTreeMap, BTreeSet};

/// Returns the fixed arity of a built-in, or `None` if the built-in has no
/// statically-checkable arity (`__codesize`, which always fails at
/// expansion time regardless of how many arguments it's called with).
fn builtin_arity(name: &str) -> Option<usize> {
    match name {
        "__tablestart" | "__tablesize" | "__FUNC_SIG" | "__EVENT_HASH" | "__RETURN_RUNTIME" => {
            Some(1)
        }
        "__RUNTIME_START" | "__RUNTIME_SIZE" => Some(0),
        _ => None,
    }
}

/// Validates every definition and returns the unique, per-category-checked
/// identifier map on success. Errors are reported through `emit_error`
/// rather than short-circuiting, so a single pass surfaces everything wrong
/// with the program at once.
pub fn analyze<
    'src,
    'ast: 'src,
    I: Iterator<Item = &'ast Definition<'src>>,
    E: FnMut(AnalysisError<'ast, 'src>),
>(
    defs: I,
    mut emit_error: E,
) -> Option<BTreeMap<&'src str, &'ast Definition<'src>>> {
    let all_defs: Vec<&'ast Definition<'src>> = defs.collect();

    check_category_uniqueness(&all_defs, "macro", |d| matches!(d, Definition::Macro(_)), &mut emit_error);
    check_category_uniqueness(
        &all_defs,
        "constant",
        |d| matches!(d, Definition::Constant { .. }),
        &mut emit_error,
    );
    check_category_uniqueness(&all_defs, "table", |d| matches!(d, Definition::Table { .. }), &mut emit_error);
    check_category_uniqueness(
        &all_defs,
        "function",
        |d| matches!(d, Definition::Function(_)),
        &mut emit_error,
    );
    check_category_uniqueness(&all_defs, "event", |d| matches!(d, Definition::Event(_)), &mut emit_error);
    check_category_uniqueness(&all_defs, "error", |d| matches!(d, Definition::Error(_)), &mut emit_error);

    check_table_macro_collision(&all_defs, &mut emit_error);

    let global_defs = build_ident_map(all_defs.iter().copied());

    if !global_defs
        .values()
        .flatten()
        .any(|def| matches!(def, Definition::Macro(m) if m.ident() == "MAIN"))
    {
        emit_error(AnalysisError::MissingMain);
    }

    let mut analyzed_macros: BTreeSet<&str> = BTreeSet::new();
    let mut invoke_stack: Vec<(&'ast Macro<'src>, huff_ast::Spanned<&'src str>)> =
        Vec::with_capacity(32);

    global_defs.iter().for_each(|(_, defs)| {
        defs.iter()
            .filter_map(|def| match def {
                Definition::Macro(m) => Some(m),
                _ => None,
            })
            .for_each(|m| {
                analyze_macro(
                    &global_defs,
                    m,
                    &mut invoke_stack,
                    &mut analyzed_macros,
                    &mut emit_error,
                );
                analyzed_macros.insert(m.ident());
            })
    });

    global_defs
        .into_iter()
        .try_fold(BTreeMap::new(), |mut unique, (name, found_defs)| {
            let def = found_defs.first().copied()?;
            unique.insert(name, def);
            Some(unique)
        })
}

fn check_category_uniqueness<'ast, 'src, E: FnMut(AnalysisError<'ast, 'src>)>(
    all_defs: &[&'ast Definition<'src>],
    category: &'static str,
    matches_category: impl Fn(&Definition<'src>) -> bool,
    emit_error: &mut E,
) {
    let mut by_name: BTreeMap<&'src str, Vec<&'ast Definition<'src>>> = BTreeMap::new();
    all_defs
        .iter()
        .copied()
        .filter(|d| matches_category(d))
        .for_each(|d| by_name.entry(d.ident()).or_default().push(d));

    by_name.into_iter().for_each(|(name, defs)| {
        if defs.len() >= 2 {
            emit_error(AnalysisError::DuplicateDefinition {
                category,
                duplicate_name: name,
                collided: defs.into_boxed_slice(),
            });
        }
    });
}

fn check_table_macro_collision<'ast, 'src, E: FnMut(AnalysisError<'ast, 'src>)>(
    all_defs: &[&'ast Definition<'src>],
    emit_error: &mut E,
) {
    let tables: BTreeMap<&'src str, &'ast Definition<'src>> = all_defs
        .iter()
        .copied()
        .filter(|d| matches!(d, Definition::Table { .. }))
        .map(|d| (d.ident(), d))
        .collect();
    let macros: BTreeMap<&'src str, &'ast Definition<'src>> = all_defs
        .iter()
        .copied()
        .filter(|d| matches!(d, Definition::Macro(_)))
        .map(|d| (d.ident(), d))
        .collect();

    tables.iter().for_each(|(name, table)| {
        if let Some(macro_def) = macros.get(name) {
            emit_error(AnalysisError::TableMacroCollision {
                name: *name,
                table: *table,
                macro_def: *macro_def,
            });
        }
    });
}

fn analyze_macro<'ast: 'src, 'src, E: FnMut(AnalysisError<'ast, 'src>)>(
    global_defs: &BTreeMap<&'src str, Vec<&'ast Definition<'src>>>,
    m: &'ast Macro<'src>,
    invoke_stack: &mut Vec<(&'ast Macro<'src>, huff_ast::Spanned<&'src str>)>,
    validated_macros: &mut BTreeSet<&'src str>,
    emit_error: &mut E,
) {
    let name = m.name.0;

    if validated_macros.contains(name) {
        return;
    }

    if invoke_stack.iter().any(|(invoked, _)| invoked.name.0 == name) {
        emit_error(AnalysisError::CircularMacro {
            invocation_chain: invoke_stack.clone().into_boxed_slice(),
        });
        return;
    }

    let labels = build_ident_map(m.body.iter().filter_map(|stmt| match stmt {
        MacroStatement::LabelDefinition(label) => Some(label),
        _ => None,
    }));
    let params = build_ident_map(m.params.iter());

    labels.iter().for_each(|(_, defs)| {
        if defs.len() >= 2 {
            emit_error(AnalysisError::DuplicateLabel {
                scope: m,
                duplicates: defs.iter().map(|d| **d).collect(),
            });
        }
    });
    params.iter().for_each(|(_, defs)| {
        if defs.len() >= 2 {
            emit_error(AnalysisError::DuplicateMacroParam {
                scope: m,
                duplicates: defs.iter().map(|d| **d).collect(),
            });
        }
    });

    let analyze_instruction = |instruction: &'ast Instruction<'src>| -> Option<AnalysisError<'ast, 'src>> {
        match instruction {
            Instruction::Op(_) | Instruction::VariablePush(_, _) => None,
            Instruction::LabelReference(label) => {
                if in_ident_map(&labels, label.ident()) {
                    None
                } else {
                    Some(AnalysisError::UnknownIdentifier {
                        scope: m,
                        kind: "label",
                        reference: *label,
                    })
                }
            }
            Instruction::MacroArgReference(arg) => {
                if in_ident_map(&params, arg.ident()) {
                    None
                } else {
                    Some(AnalysisError::UnknownIdentifier {
                        scope: m,
                        kind: "macro argument",
                        reference: *arg,
                    })
                }
            }
            Instruction::ConstantReference(const_ref) => {
                if global_exists(global_defs, const_ref.ident(), |d| {
                    matches!(d, Definition::Constant { .. })
                }) {
                    None
                } else {
                    Some(AnalysisError::UndefinedConstant {
                        scope: m,
                        reference: *const_ref,
                    })
                }
            }
        }
    };

    m.body.iter().for_each(|stmt| match stmt {
        MacroStatement::LabelDefinition(_) => {}
        MacroStatement::Instruction(instruction) => {
            if let Some(err) = analyze_instruction(instruction) {
                emit_error(err);
            }
        }
        MacroStatement::Invoke(invoke) => match invoke {
            Invoke::Macro { name: target, args } => {
                args.iter().filter_map(analyze_instruction).for_each(|e| emit_error(e));

                if !global_exists(global_defs, target.ident(), |d| matches!(d, Definition::Macro(_))) {
                    emit_error(AnalysisError::UndefinedMacro {
                        scope: m,
                        invoke: *target,
                    });
                }

                invoke_stack.push((m, *target));
                global_defs
                    .get(target.ident())
                    .map(|found| found.as_slice())
                    .unwrap_or(&[])
                    .iter()
                    .filter_map(|def| match def {
                        Definition::Macro(invoked) => Some(invoked),
                        _ => None,
                    })
                    .for_each(|invoked| {
                        if invoked.params.len() != args.len() {
                            emit_error(AnalysisError::ArityMismatch {
                                scope: m,
                                invoke: *target,
                                expected: invoked.params.len(),
                                given: args.len(),
                            });
                        }
                        analyze_macro(global_defs, invoked, invoke_stack, validated_macros, &mut *emit_error);
                    });
                invoke_stack.pop().unwrap();
                validated_macros.insert(target.ident());
            }
            Invoke::Builtin { name: target, args } => {
                // Built-in argument identifiers are resolved against global
                // scope (table/function/event names) rather than local
                // labels/params/constants, so validating them is left to the
                // compilation driver's built-in dispatch.
                if let Some(expected) = builtin_arity(target.ident()) {
                    if expected != args.len() {
                        emit_error(AnalysisError::ArityMismatch {
                            scope: m,
                            invoke: *target,
                            expected,
                            given: args.len(),
                        });
                    }
                }
            }
        },
    });
}

fn global_exists<'ast, 'src>(
    global_defs: &BTreeMap<&'src str, Vec<&'ast Definition<'src>>>,
    ident: &str,
    matches: impl Fn(&Definition<'src>) -> bool,
) -> bool {
    global_defs
        .get(ident)
        .map(|defs| defs.iter().any(|d| matches(d)))
        .unwrap_or(false)
}

fn build_ident_map<'ast, 'src, N: IdentifiableNode<'src>, I: Iterator<Item = &'ast N>>(
    nodes: I,
) -> BTreeMap<&'src str, Vec<&'ast N>> {
    let mut ident_map: BTreeMap<&'src str, Vec<&'ast N>> = BTreeMap::new();
    nodes.for_each(|node| {
        ident_map.entry(node.ident()).or_insert_with(|| Vec::with_capacity(1)).push(node)
    });
    ident_map
}

fn in_ident_map<'ast, 'src, N: IdentifiableNode<'src>>(
    ident_map: &BTreeMap<&'src str, Vec<&'ast N>>,
    ident: &'src str,
) -> bool {
    ident_map.get(ident).map(|found| !found.is_empty()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use huff_ast::RootSection;

    fn definitions(root: &huff_ast::Root<'_>) -> Vec<&Definition<'_>> {
        root.0
            .iter()
            .filter_map(|section| match section {
                RootSection::Definition(def) => Some(def),
                RootSection::Include(_) => None,
            })
            .collect()
    }

    fn errors_for(src: &str) -> Vec<String> {
        let root = huff_ast::parse(src).expect("parses");
        let defs = definitions(&root);
        let mut errors = Vec::new();
        analyze(defs.into_iter(), |e| errors.push(format!("{e:?}")));
        errors
    }

    #[test]
    fn accepts_minimal_main() {
        let errors = errors_for("#define macro MAIN() = takes(0) returns(0) {\n  stop\n}");
        assert!(errors.is_empty());
    }

    #[test]
    fn flags_missing_main() {
        let errors = errors_for("#define macro OTHER() = takes(0) returns(0) {\n  stop\n}");
        assert!(errors.iter().any(|e| e.contains("MissingMain")));
    }

    #[test]
    fn flags_duplicate_macro_definition() {
        let src = "#define macro MAIN() = takes(0) returns(0) {\n  stop\n}\n\
                   #define macro MAIN() = takes(0) returns(0) {\n  stop\n}";
        let errors = errors_for(src);
        assert!(errors.iter().any(|e| e.contains("DuplicateDefinition")));
    }

    #[test]
    fn flags_table_macro_collision() {
        let src = "#define table FOO {0x00}\n#define macro FOO() = takes(0) returns(0) {\n  stop\n}\n\
                   #define macro MAIN() = takes(0) returns(0) {\n  stop\n}";
        let errors = errors_for(src);
        assert!(errors.iter().any(|e| e.contains("TableMacroCollision")));
    }

    #[test]
    fn flags_undefined_macro_invocation() {
        let src = "#define macro MAIN() = takes(0) returns(0) {\n  NOT_DEFINED()\n}";
        let errors = errors_for(src);
        assert!(errors.iter().any(|e| e.contains("UndefinedMacro")));
    }

    #[test]
    fn flags_undefined_constant_reference() {
        let src = "#define macro MAIN() = takes(0) returns(0) {\n  [MISSING]\n}";
        let errors = errors_for(src);
        assert!(errors.iter().any(|e| e.contains("UndefinedConstant")));
    }

    #[test]
    fn flags_arity_mismatch() {
        let src = "#define macro HELPER(x) = takes(0) returns(0) {\n  stop\n}\n\
                   #define macro MAIN() = takes(0) returns(0) {\n  HELPER()\n}";
        let errors = errors_for(src);
        assert!(errors.iter().any(|e| e.contains("ArityMismatch")));
    }

    #[test]
    fn flags_circular_macro_invocation() {
        let src = "#define macro A() = takes(0) returns(0) {\n  B()\n}\n\
                   #define macro B() = takes(0) returns(0) {\n  A()\n}\n\
                   #define macro MAIN() = takes(0) returns(0) {\n  A()\n}";
        let errors = errors_for(src);
        assert!(errors.iter().any(|e| e.contains("CircularMacro")));
    }

    #[test]
    fn flags_duplicate_label() {
        let src = "#define macro MAIN() = takes(0) returns(0) {\n  start:\n  stop\n  start:\n  stop\n}";
        let errors = errors_for(src);
        assert!(errors.iter().any(|e| e.contains("DuplicateLabel")));
    }

    #[test]
    fn flags_unknown_label_reference() {
        let src = "#define macro MAIN() = takes(0) returns(0) {\n  missing_label jump\n}";
        let errors = errors_for(src);
        assert!(errors.iter().any(|e| e.contains("UnknownIdentifier")));
    }

    #[test]
    fn accepts_valid_builtin_invocation() {
        let src = "#define table DATA {0x0001}\n\
                   #define macro MAIN() = takes(0) returns(0) {\n  __tablestart(DATA) pop\n}";
        let errors = errors_for(src);
        assert!(errors.is_empty());
    }

    #[test]
    fn flags_builtin_arity_mismatch() {
        let src = "#define macro MAIN() = takes(0) returns(0) {\n  __RUNTIME_START(0x00) pop\n}";
        let errors = errors_for(src);
        assert!(errors.iter().any(|e| e.contains("ArityMismatch")));
    }
}
