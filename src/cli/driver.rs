#![allow(clippy::print_stdout)]

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::cli::args::{CliArgs, DumpKind};
use crate::cli::reporter::Reporter;
use crate::pipeline::{Compilation, CompileOptions, CompileResult, SourceInput};

pub const SOURCE_EXTENSION: &str = "prp";

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_DIAGNOSTICS: i32 = 1;

pub fn run(args: &CliArgs, color: bool) -> Result<i32> {
    let inputs = discover_inputs(args)?;

    let compilation = Compilation::new(CompileOptions {
        optimize: args.optimize,
    });
    let result = compilation.compile(&inputs);

    let mut reporter = Reporter::new(color && !args.no_color);
    for input in &inputs {
        reporter.register_source(&input.file_name, &input.text);
    }
    if !result.diagnostics.is_empty() {
        println!("{}", reporter.render(&result.diagnostics));
    }
    for error in &result.lowering_errors {
        println!("internal error: {error}");
    }

    match args.dump {
        Some(DumpKind::Schema) => {
            for line in result.schema.dump_lines() {
                println!("{line}");
            }
        }
        Some(DumpKind::Declarations) => {
            for line in result.declarations.dump_lines() {
                println!("{line}");
            }
        }
        Some(DumpKind::Instructions) => dump_instructions(&result),
        None => {}
    }

    if result.has_errors() {
        return Ok(EXIT_DIAGNOSTICS);
    }
    Ok(EXIT_SUCCESS)
}

fn dump_instructions(result: &CompileResult) {
    for unit in &result.lowered {
        println!("{}:", unit.file_name);
        for call in &unit.calls {
            println!("  {:?}", call.kind);
            for instruction in &call.instructions {
                println!("    {instruction}");
            }
        }
    }
    for initializer in &result.initializers {
        println!(
            "initializer {} for {}",
            initializer.class_name, initializer.identifier
        );
    }
}

fn discover_inputs(args: &CliArgs) -> Result<Vec<SourceInput>> {
    let mut inputs = Vec::new();
    for path in &args.inputs {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.with_context(|| format!("failed to walk {}", path.display()))?;
                if entry.file_type().is_file() && has_source_extension(entry.path()) {
                    inputs.push(read_input(entry.path())?);
                }
            }
        } else {
            inputs.push(read_input(path)?);
        }
    }
    if inputs.is_empty() {
        bail!("no .{SOURCE_EXTENSION} files found");
    }
    Ok(inputs)
}

fn has_source_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION)
}

fn read_input(path: &Path) -> Result<SourceInput> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(SourceInput::new(path.display().to_string(), text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn args(inputs: &[&str]) -> CliArgs {
        let mut argv = vec!["propel"];
        argv.extend(inputs);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn compiles_a_directory_of_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.prp");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "define {{ ui.message as String initially \"hi\" }}").unwrap();

        let dir_arg = dir.path().to_str().unwrap().to_string();
        let code = run(&args(&[&dir_arg]), false).unwrap();
        assert_eq!(code, EXIT_SUCCESS);
    }

    #[test]
    fn diagnostics_set_the_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.prp");
        fs::write(&path, "define { ui.message }").unwrap();

        let path_arg = path.to_str().unwrap().to_string();
        let code = run(&args(&[&path_arg]), false).unwrap();
        assert_eq!(code, EXIT_DIAGNOSTICS);
    }

    #[test]
    fn unrelated_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "not source").unwrap();

        let dir_arg = dir.path().to_str().unwrap().to_string();
        assert!(run(&args(&[&dir_arg]), false).is_err());
    }
}
