use crate::error::CompileError;
use alloy_primitives::U256;
use huff_analysis::const_overrides::ConstantOverride;
use huff_ast::{ConstExpr, Definition, IdentifiableNode, Jumptable, Macro, SolError, SolEvent, SolFunction};
use huff_evm::{bytes_to_push, ContextTracker, MarkId, ObjectId, Opcode};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

/// A value a macro parameter is bound to during expansion: either a concrete
/// operation or a reference to a mark (a label, or the start/end of a table).
#[derive(Debug, Clone)]
pub enum MacroArg {
    Op(Opcode),
    MarkRef(MarkId),
}

/// A `#define table`, already placed under a single `ObjectId` so its
/// start/end marks can be referenced before the table itself is appended to
/// the output.
pub struct CodeTable<'ast> {
    pub data: &'ast [u8],
    pub start: MarkId,
    pub end: MarkId,
}

pub struct JumpTable<'src, 'ast> {
    pub def: &'ast Jumptable<'src>,
    pub start: MarkId,
    pub end: MarkId,
}

/// Everything needed to expand any macro in the program: the full set of
/// macros/constants/tables/jumptables/functions/events/errors, plus the
/// bookkeeping the built-in dispatcher needs (which tables have been
/// referenced so far, and how a jump table's labels resolved once they were
/// first looked up).
pub struct GlobalScope<'src, 'ast> {
    pub macros: BTreeMap<&'src str, &'ast Macro<'src>>,
    pub constants: BTreeMap<&'src str, Opcode>,
    pub tables: BTreeMap<&'src str, CodeTable<'ast>>,
    pub jumptables: BTreeMap<&'src str, JumpTable<'src, 'ast>>,
    pub functions: BTreeMap<&'src str, &'ast SolFunction<'src>>,
    pub events: BTreeMap<&'src str, &'ast SolEvent<'src>>,
    pub errors: BTreeMap<&'src str, &'ast SolError<'src>>,
    table_decl_order: Vec<&'src str>,
    referenced_tables: RefCell<BTreeSet<&'src str>>,
    jumptable_entries: RefCell<BTreeMap<&'src str, Vec<MarkId>>>,
}

impl<'src, 'ast> GlobalScope<'src, 'ast> {
    /// Builds the global scope from a flattened, already-analyzed definition
    /// list. `context` is the compilation's root context tracker: table and
    /// jump table marks are allocated directly from it (not a child
    /// sub-context), so that the first child context handed out afterwards
    /// -- for `MAIN`'s own expansion -- really is the root's first child.
    pub fn build(
        defs: &'ast [Definition<'src>],
        overrides: &[ConstantOverride],
        avoid_push0: bool,
        context: &mut ContextTracker,
    ) -> Result<Self, CompileError> {
        let mut macros = BTreeMap::new();
        let mut tables = BTreeMap::new();
        let mut jumptables = BTreeMap::new();
        let mut functions = BTreeMap::new();
        let mut events = BTreeMap::new();
        let mut errors = BTreeMap::new();
        let mut table_decl_order = Vec::new();
        let mut const_decls: Vec<(&'src str, Option<U256>)> = Vec::new();

        for def in defs {
            match def {
                Definition::Macro(m) => {
                    macros.insert(m.ident(), m);
                }
                Definition::Constant { name, expr } => {
                    let value = match expr.0 {
                        ConstExpr::Value(v) => Some(v),
                        ConstExpr::FreeStoragePointer => None,
                    };
                    const_decls.push((name.0, value));
                }
                Definition::Table { name, data } => {
                    let obj_id = context.next_obj_id();
                    table_decl_order.push(name.0);
                    tables.insert(
                        name.0,
                        CodeTable {
                            data,
                            start: MarkId::start(obj_id.clone()),
                            end: MarkId::end(obj_id),
                        },
                    );
                }
                Definition::Jumptable(jt) => {
                    let obj_id = context.next_obj_id();
                    table_decl_order.push(jt.name.0);
                    jumptables.insert(
                        jt.name.0,
                        JumpTable {
                            def: jt,
                            start: MarkId::start(obj_id.clone()),
                            end: MarkId::end(obj_id),
                        },
                    );
                }
                Definition::Function(f) => {
                    functions.insert(f.name.0, f);
                }
                Definition::Event(e) => {
                    events.insert(e.name.0, e);
                }
                Definition::Error(e) => {
                    errors.insert(e.name.0, e);
                }
            }
        }

        let constants = resolve_constants(const_decls, overrides, avoid_push0)?;

        Ok(GlobalScope {
            macros,
            constants,
            tables,
            jumptables,
            functions,
            events,
            errors,
            table_decl_order,
            referenced_tables: RefCell::new(BTreeSet::new()),
            jumptable_entries: RefCell::new(BTreeMap::new()),
        })
    }

    /// Marks `name` (a code table or jump table) as used by the expansion
    /// currently in progress.
    pub fn mark_table_referenced(&self, name: &'src str) {
        self.referenced_tables.borrow_mut().insert(name);
    }

    /// Clears and returns the set of tables referenced since the last call
    /// (or since scope construction) -- used to isolate "tables referenced
    /// by MAIN" from "tables referenced by CONSTRUCTOR" since both expand
    /// against this one shared scope.
    pub fn take_referenced(&self) -> BTreeSet<&'src str> {
        std::mem::take(&mut *self.referenced_tables.borrow_mut())
    }

    /// The start/end marks for either a code table or a jump table.
    pub fn table_marks(&self, name: &str) -> Result<(MarkId, MarkId), CompileError> {
        if let Some(t) = self.tables.get(name) {
            return Ok((t.start.clone(), t.end.clone()));
        }
        if let Some(t) = self.jumptables.get(name) {
            return Ok((t.start.clone(), t.end.clone()));
        }
        Err(CompileError::UndefinedTable(name.to_string()))
    }

    /// Resolves a jump table's listed labels against `own_labels` -- the
    /// labels defined directly in the macro body that is referencing it --
    /// the first time it's looked up. Later references to the same table
    /// reuse the first resolution.
    pub fn resolve_jumptable(
        &self,
        name: &'src str,
        own_labels: &BTreeMap<&'src str, MarkId>,
    ) -> Result<(), CompileError> {
        if self.jumptable_entries.borrow().contains_key(name) {
            return Ok(());
        }
        let jt = self
            .jumptables
            .get(name)
            .ok_or_else(|| CompileError::UndefinedTable(name.to_string()))?;
        let mut entries = Vec::with_capacity(jt.def.labels.len());
        for label in jt.def.labels.iter() {
            let mid = own_labels.get(label.0).cloned().ok_or_else(|| {
                CompileError::UndefinedJumpLabel {
                    table: name.to_string(),
                    label: label.0.to_string(),
                }
            })?;
            entries.push(mid);
        }
        self.jumptable_entries.borrow_mut().insert(name, entries);
        Ok(())
    }

    pub fn jumptable_resolution(&self, name: &str) -> Vec<MarkId> {
        self.jumptable_entries
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Table/jump table names from `referenced`, in declaration order.
    pub fn declared_order<'a>(&'a self, referenced: &'a BTreeSet<&'src str>) -> Vec<&'src str> {
        self.table_decl_order
            .iter()
            .copied()
            .filter(|name| referenced.contains(name))
            .collect()
    }
}

/// Assigns free storage pointer slots in declaration order and folds in CLI
/// `--constant` overrides, then lowers every constant's value to the minimal
/// `PUSH` that represents it (a single zero byte becomes `PUSH0` unless
/// `avoid_push0` is set, exactly like any other constant-valued push).
fn resolve_constants<'src>(
    const_decls: Vec<(&'src str, Option<U256>)>,
    overrides: &[ConstantOverride],
    avoid_push0: bool,
) -> Result<BTreeMap<&'src str, Opcode>, CompileError> {
    let mut constants: BTreeMap<&'src str, Opcode> = BTreeMap::new();
    let mut free_ptr: u64 = 0;

    for (name, value) in const_decls {
        let value = match value {
            Some(v) => v,
            None => {
                let v = U256::from(free_ptr);
                free_ptr += 1;
                v
            }
        };
        let push = bytes_to_push(trim_be_bytes(&value.to_be_bytes::<32>()), avoid_push0)?;
        if constants.insert(name, push).is_some() {
            return Err(CompileError::DuplicateConstant(name.to_string()));
        }
    }

    for over in overrides {
        let key = constants
            .keys()
            .find(|k| **k == over.name.as_str())
            .copied()
            .ok_or_else(|| CompileError::UnknownOverride(over.name.clone()))?;
        let push = bytes_to_push(trim_be_bytes(&over.value.to_be_bytes::<32>()), avoid_push0)?;
        constants.insert(key, push);
    }

    Ok(constants)
}

/// Trims a 32-byte big-endian word to its significant bytes (minimum one),
/// so a zero-valued constant hits `bytes_to_push`'s `PUSH0` fast path instead
/// of always lowering through `PUSH1 0x00`.
fn trim_be_bytes(full: &[u8; 32]) -> &[u8] {
    match full.iter().position(|&b| b != 0) {
        Some(i) => &full[i..],
        None => &full[31..],
    }
}
