use ariadne::{sources, Color, Config, Fmt, IndexType, Label, Report, ReportKind};
use clap::Parser;
use huff_analysis::const_overrides::{parse_constant_override, ConstantOverride};
use huff_ast::{Definition, RootSection};
use huff_compilation::{abi, driver, include, GlobalScope};
use huff_evm::ContextTracker;
use std::path::{Path, PathBuf};
use std::process::exit;

/// Huff language compiler.
#[derive(Parser, Debug)]
#[command(name = "huffc", version, about = "Compiles a Huff source file to EVM bytecode")]
struct Args {
    /// Path to the Huff entry-point source file.
    source: PathBuf,

    /// Print the runtime bytecode as hex.
    #[arg(short = 'r', long = "runtime")]
    runtime: bool,

    /// Print the deploy (constructor) bytecode as hex.
    #[arg(short = 'b', long = "deploy")]
    deploy: bool,

    /// Override a declared constant: NAME=0xHEX. Repeatable.
    #[arg(long = "constant", value_name = "NAME=0xHEX")]
    constant: Vec<String>,

    /// Write ABI + bytecode artifacts JSON; defaults to artifacts.json.
    #[arg(long = "artifacts", value_name = "PATH", num_args = 0..=1, default_missing_value = "artifacts.json")]
    artifacts: Option<String>,

    /// Lower the zero-byte literal to PUSH1 0x00 instead of PUSH0.
    #[arg(long = "avoid-push0")]
    avoid_push0: bool,
}

fn main() {
    let args = Args::parse();
    if let Err(code) = run(args) {
        exit(code);
    }
}

/// Builds a closure mapping an `&str` slice back to the path of the resolved
/// source file it was lexed from, by comparing pointer ranges -- byte
/// offsets alone can't disambiguate since every file's spans start at 0.
fn locator(sources: &[(PathBuf, String)]) -> impl Fn(&str) -> String + '_ {
    move |text: &str| {
        let ptr = text.as_ptr() as usize;
        for (path, src) in sources {
            let start = src.as_ptr() as usize;
            let end = start + src.len();
            if ptr >= start && ptr <= end {
                return path.display().to_string();
            }
        }
        sources
            .first()
            .map(|(p, _)| p.display().to_string())
            .unwrap_or_default()
    }
}

fn run(args: Args) -> Result<(), i32> {
    let entry_file = args.source.display().to_string();

    let overrides: Vec<ConstantOverride> = args
        .constant
        .iter()
        .map(|s| parse_constant_override(s))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            eprintln!("error: {e}");
            1
        })?;

    let resolved = include::resolve(&args.source).map_err(|e| {
        eprintln!("error: {e}");
        1
    })?;

    let mut all_defs: Vec<Definition> = Vec::new();
    for (path, src) in &resolved.sources {
        let root = huff_ast::parse(src).map_err(|errs| {
            report_parse_errors(path, src, &errs);
            1
        })?;
        for section in root.0.iter() {
            if let RootSection::Definition(def) = section {
                all_defs.push(def.clone());
            }
        }
    }

    let mut analysis_errors = Vec::new();
    huff_analysis::analyze(all_defs.iter(), |e| analysis_errors.push(e));
    if !analysis_errors.is_empty() {
        let locate = locator(&resolved.sources);
        for err in &analysis_errors {
            let cache = sources(
                resolved
                    .sources
                    .iter()
                    .map(|(p, s)| (p.display().to_string(), s.as_str())),
            );
            err.report(&entry_file, &locate).print(cache).ok();
        }
        return Err(1);
    }

    let mut context = ContextTracker::root();
    let scope = GlobalScope::build(&all_defs, &overrides, args.avoid_push0, &mut context).map_err(|e| {
        eprintln!("error: {e}");
        1
    })?;
    let output = driver::compile(&scope, &mut context, args.avoid_push0).map_err(|e| {
        eprintln!("error: {e}");
        1
    })?;

    print_requested_bytecode(&args, &output);

    if let Some(path) = &args.artifacts {
        let abi = abi::build_abi(
            scope.functions.values().copied(),
            scope.events.values().copied(),
            scope.errors.values().copied(),
        );
        let artifacts = abi::build_artifacts(abi, &output.deploy, &output.runtime);
        let json = serde_json::to_string_pretty(&artifacts).expect("artifacts JSON is always valid");
        std::fs::write(path, json).map_err(|e| {
            eprintln!("error: writing '{path}': {e}");
            1
        })?;
    }

    Ok(())
}

fn print_requested_bytecode(args: &Args, output: &driver::CompileOutput) {
    if args.runtime && args.deploy {
        println!("runtime: 0x{}", hex::encode(&output.runtime));
        println!("deploy: 0x{}", hex::encode(&output.deploy));
    } else if args.runtime {
        println!("0x{}", hex::encode(&output.runtime));
    } else if args.deploy {
        println!("0x{}", hex::encode(&output.deploy));
    }
}

fn report_parse_errors(path: &Path, src: &str, errs: &[huff_ast::Error]) {
    let filename = path.display().to_string();
    for e in errs {
        let span = e.span().unwrap_or_else(|| huff_ast::Span::new(0, 0));
        let mut report = Report::build(ReportKind::Error, filename.clone(), span.start)
            .with_config(Config::default().with_index_type(IndexType::Byte))
            .with_message(e.to_string().fg(Color::Red).to_string());
        if e.span().is_some() {
            report = report.with_label(
                Label::new((filename.clone(), span.into_range())).with_color(Color::Red),
            );
        }
        report.finish().print(sources([(filename.clone(), src)])).ok();
    }
}
