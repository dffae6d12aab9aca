use ariadne::{Color, Config, Fmt, IndexType, Label, Report, ReportKind};
use huff_ast::{Definition, IdentifiableNode, Macro, Spanned};

type InvocationChain<'ast, 'src> = Box<[(&'ast Macro<'src>, Spanned<&'src str>)]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError<'ast, 'src> {
    DuplicateDefinition {
        category: &'static str,
        duplicate_name: &'src str,
        collided: Box<[&'ast Definition<'src>]>,
    },
    TableMacroCollision {
        name: &'src str,
        table: &'ast Definition<'src>,
        macro_def: &'ast Definition<'src>,
    },
    MissingMain,
    UndefinedMacro {
        scope: &'ast Macro<'src>,
        invoke: Spanned<&'src str>,
    },
    UndefinedConstant {
        scope: &'ast Macro<'src>,
        reference: Spanned<&'src str>,
    },
    CircularMacro {
        invocation_chain: InvocationChain<'ast, 'src>,
    },
    ArityMismatch {
        scope: &'ast Macro<'src>,
        invoke: Spanned<&'src str>,
        expected: usize,
        given: usize,
    },
    DuplicateMacroParam {
        scope: &'ast Macro<'src>,
        duplicates: Box<[Spanned<&'src str>]>,
    },
    DuplicateLabel {
        scope: &'ast Macro<'src>,
        duplicates: Box<[Spanned<&'src str>]>,
    },
    UnknownIdentifier {
        scope: &'ast Macro<'src>,
        kind: &'static str,
        reference: Spanned<&'src str>,
    },
}

impl AnalysisError<'_, '_> {
    /// Builds an ariadne report for this error. `entry_file` is used for
    /// errors with no span to anchor on (`MissingMain`); every other error
    /// resolves each of its labels' source file through `locate`, which maps
    /// an identifier's own text back to the file it was lexed from -- needed
    /// because `#include` can pull definitions (and the identifiers inside
    /// them) in from a file other than the one compilation started at.
    pub fn report(
        &self,
        entry_file: &str,
        locate: impl Fn(&str) -> String,
    ) -> Report<(String, std::ops::Range<usize>)> {
        match self {
            Self::DuplicateDefinition {
                category,
                duplicate_name,
                collided,
            } => {
                let first = collided.iter().map(|d| d.ident_span()).min_by_key(|s| s.start).unwrap();
                let first_file = locate(collided.iter().min_by_key(|d| d.ident_span().start).unwrap().ident());
                Report::build(ReportKind::Error, first_file, first.start)
                    .with_config(Config::default().with_index_type(IndexType::Byte))
                    .with_message(format!(
                        "duplicate {} name '{}'",
                        category,
                        duplicate_name.fg(Color::Red)
                    ))
                    .with_labels(collided.iter().map(|d| {
                        Label::new((locate(d.ident()), d.ident_span().into_range())).with_color(Color::Red)
                    }))
                    .with_help("rename the duplicate definitions so each name is unique")
                    .finish()
            }
            Self::TableMacroCollision { name, table, macro_def } => {
                Report::build(ReportKind::Error, locate(table.ident()), table.ident_span().start)
                    .with_config(Config::default().with_index_type(IndexType::Byte))
                    .with_message(format!(
                        "code table and macro share the name '{}'",
                        name.fg(Color::Red)
                    ))
                    .with_label(
                        Label::new((locate(table.ident()), table.ident_span().into_range()))
                            .with_color(Color::Red),
                    )
                    .with_label(
                        Label::new((locate(macro_def.ident()), macro_def.ident_span().into_range()))
                            .with_color(Color::Yellow),
                    )
                    .with_help("rename either the table or the macro")
                    .finish()
            }
            Self::MissingMain => Report::build(ReportKind::Error, entry_file.to_string(), 0)
                .with_message("no MAIN macro defined")
                .with_help("define a macro named MAIN as the runtime entry point")
                .finish(),
            Self::UndefinedMacro { scope, invoke } => {
                let file = locate(scope.ident());
                Report::build(ReportKind::Error, file.clone(), invoke.1.start)
                    .with_config(Config::default().with_index_type(IndexType::Byte))
                    .with_message(format!(
                        "macro '{}' not found, invoked from '{}'",
                        invoke.0.fg(Color::Red),
                        scope.ident().fg(Color::Blue)
                    ))
                    .with_label(Label::new((file, invoke.1.into_range())).with_color(Color::Red))
                    .finish()
            }
            Self::UndefinedConstant { scope, reference } => {
                let file = locate(scope.ident());
                Report::build(ReportKind::Error, file.clone(), reference.1.start)
                    .with_config(Config::default().with_index_type(IndexType::Byte))
                    .with_message(format!(
                        "constant '{}' not found, referenced in '{}'",
                        reference.0.fg(Color::Red),
                        scope.ident().fg(Color::Blue)
                    ))
                    .with_label(Label::new((file, reference.1.into_range())).with_color(Color::Red))
                    .finish()
            }
            Self::CircularMacro { invocation_chain } => {
                let first = invocation_chain.first().unwrap();
                let first_file = locate(first.0.ident());
                Report::build(ReportKind::Error, first_file, first.1 .1.start)
                    .with_config(Config::default().with_index_type(IndexType::Byte))
                    .with_message(format!(
                        "macro '{}' recursively invokes itself",
                        first.0.ident().fg(Color::Red)
                    ))
                    .with_labels(invocation_chain.iter().map(|(scope, invoke)| {
                        Label::new((locate(scope.ident()), invoke.1.into_range()))
                            .with_color(Color::Yellow)
                            .with_message(format!("inside '{}'", scope.ident()))
                    }))
                    .with_help("replace recursion with a loop expressed via jumps and labels")
                    .finish()
            }
            Self::ArityMismatch {
                scope,
                invoke,
                expected,
                given,
            } => {
                let file = locate(scope.ident());
                Report::build(ReportKind::Error, file.clone(), invoke.1.start)
                    .with_config(Config::default().with_index_type(IndexType::Byte))
                    .with_message(format!(
                        "'{}' takes {} argument(s), invoked with {} in '{}'",
                        invoke.0.fg(Color::Red),
                        expected,
                        given,
                        scope.ident().fg(Color::Blue)
                    ))
                    .with_label(Label::new((file, invoke.1.into_range())).with_color(Color::Red))
                    .finish()
            }
            Self::DuplicateMacroParam { scope, duplicates } => {
                let file = locate(scope.ident());
                let start = duplicates.iter().map(|d| d.1.start).min().unwrap();
                Report::build(ReportKind::Error, file.clone(), start)
                    .with_config(Config::default().with_index_type(IndexType::Byte))
                    .with_message(format!(
                        "duplicate parameter '{}' in macro '{}'",
                        duplicates.first().unwrap().0.fg(Color::Red),
                        scope.ident().fg(Color::Blue)
                    ))
                    .with_labels(duplicates.iter().map(|d| {
                        Label::new((file.clone(), d.1.into_range())).with_color(Color::Red)
                    }))
                    .finish()
            }
            Self::DuplicateLabel { scope, duplicates } => {
                let file = locate(scope.ident());
                let start = duplicates.iter().map(|d| d.1.start).min().unwrap();
                Report::build(ReportKind::Error, file.clone(), start)
                    .with_config(Config::default().with_index_type(IndexType::Byte))
                    .with_message(format!(
                        "duplicate label '{}' in macro '{}'",
                        duplicates.first().unwrap().0.fg(Color::Red),
                        scope.ident().fg(Color::Blue)
                    ))
                    .with_labels(duplicates.iter().map(|d| {
                        Label::new((file.clone(), d.1.into_range())).with_color(Color::Red)
                    }))
                    .with_help("rename the labels so each definition in the macro is unique")
                    .finish()
            }
            Self::UnknownIdentifier {
                scope,
                kind,
                reference,
            } => {
                let file = locate(scope.ident());
                Report::build(ReportKind::Error, file.clone(), reference.1.start)
                    .with_config(Config::default().with_index_type(IndexType::Byte))
                    .with_message(format!(
                        "{} '{}' not found in '{}'",
                        kind,
                        reference.0.fg(Color::Red),
                        scope.ident().fg(Color::Blue)
                    ))
                    .with_label(Label::new((file, reference.1.into_range())).with_color(Color::Red))
                    .finish()
            }
        }
    }
}

trait IdentSpan {
    fn ident_span(&self) -> huff_ast::Span;
}

impl<'src> IdentSpan for Definition<'src> {
    fn ident_span(&self) -> huff_ast::Span {
        match self {
            Definition::Macro(m) => m.name.1,
            Definition::Constant { name, .. } => name.1,
            Definition::Table { name, .. } => name.1,
            Definition::Jumptable(jt) => jt.name.1,
            Definition::Function(f) => f.name.1,
            Definition::Event(e) => e.name.1,
            Definition::Error(e) => e.name.1,
        }
    }
}
