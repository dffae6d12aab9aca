//! Flattens `#include` chains into one ordered list of source files, matching
//! the upstream resolver contract: a file's own definitions always follow
//! everything it transitively includes, depth-first, in declaration order.

use crate::error::CompileError;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Every file reachable from an entry point, in resolution order, alongside
/// its raw text. Kept as owned `String`s (rather than handed back as parsed
/// `Root`s) because a `Root` borrows from its own source text, and that text
/// isn't known to be final -- no later sibling include could still need
/// slotting in before it -- until the whole recursive walk completes.
pub struct ResolvedProgram {
    pub sources: Vec<(PathBuf, String)>,
}

/// Recursively resolves `#include` chains starting at `entry`.
///
/// Each file is parsed here to discover its own `#include` paths, then
/// immediately dropped once those paths are extracted; the caller parses
/// every file a second time, against the now-final `sources` list, to build
/// the actual AST it compiles from. Already-resolved paths are skipped
/// (`already_resolved` semantics); a path appearing twice on the current
/// path from the entry file is a `CircularInclude`.
pub fn resolve(entry: &Path) -> Result<ResolvedProgram, CompileError> {
    let mut sources = Vec::new();
    let mut visiting = Vec::new();
    let mut seen = HashSet::new();
    resolve_into(entry, &mut visiting, &mut seen, &mut sources)?;
    Ok(ResolvedProgram { sources })
}

fn resolve_into(
    path: &Path,
    visiting: &mut Vec<PathBuf>,
    seen: &mut HashSet<PathBuf>,
    sources: &mut Vec<(PathBuf, String)>,
) -> Result<(), CompileError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| CompileError::Io(format!("{}: {e}", path.display())))?;

    if seen.contains(&canonical) {
        return Ok(());
    }
    if visiting.contains(&canonical) {
        return Err(CompileError::CircularInclude(canonical.display().to_string()));
    }
    visiting.push(canonical.clone());

    let text = fs::read_to_string(&canonical)
        .map_err(|e| CompileError::Io(format!("{}: {e}", canonical.display())))?;

    let includes: Vec<PathBuf> = {
        let root = huff_ast::parse(&text).map_err(|errs| {
            CompileError::Parse(
                errs.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "),
            )
        })?;
        let dir = canonical.parent().map(Path::to_path_buf).unwrap_or_default();
        root.0
            .iter()
            .filter_map(|section| match section {
                huff_ast::RootSection::Include((inc_path, _)) => Some(dir.join(inc_path)),
                _ => None,
            })
            .collect()
    };

    for inc in &includes {
        resolve_into(inc, visiting, seen, sources)?;
    }

    visiting.pop();
    seen.insert(canonical.clone());
    sources.push((canonical, text));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_file_resolves_to_itself() {
        let dir = std::env::temp_dir().join(format!("huff_resolve_test_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let main = dir.join("main.huff");
        fs::write(&main, "#define macro MAIN() = takes(0) returns(0) {\nstop\n}").unwrap();

        let resolved = resolve(&main).unwrap();
        assert_eq!(resolved.sources.len(), 1);
        assert!(resolved.sources[0].1.contains("MAIN"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn include_chain_flattens_dependency_first() {
        let dir = std::env::temp_dir().join(format!("huff_resolve_test_chain_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let dep = dir.join("dep.huff");
        fs::write(&dep, "#define constant X = 0x01").unwrap();
        let main = dir.join("main.huff");
        fs::write(
            &main,
            "#include \"dep.huff\"\n#define macro MAIN() = takes(0) returns(0) {\n[X]\n}",
        )
        .unwrap();

        let resolved = resolve(&main).unwrap();
        assert_eq!(resolved.sources.len(), 2);
        assert!(resolved.sources[0].1.contains("constant X"));
        assert!(resolved.sources[1].1.contains("MAIN"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn circular_include_is_rejected() {
        let dir = std::env::temp_dir().join(format!("huff_resolve_test_cycle_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let a = dir.join("a.huff");
        let b = dir.join("b.huff");
        fs::write(&a, "#include \"b.huff\"").unwrap();
        fs::write(&b, "#include \"a.huff\"").unwrap();

        assert!(matches!(resolve(&a), Err(CompileError::CircularInclude(_))));

        fs::remove_dir_all(&dir).ok();
    }
}
