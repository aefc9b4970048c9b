use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "propel",
    version,
    about = "Compiler extension for a reactive state-property DSL"
)]
pub struct CliArgs {
    /// Source files or directories to compile.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Strip the inlining prologues from lowered instruction streams.
    #[arg(long)]
    pub optimize: bool,

    /// Print an intermediate artifact instead of the default output.
    #[arg(long, value_enum)]
    pub dump: Option<DumpKind>,

    /// Disable colored diagnostics.
    #[arg(long)]
    pub no_color: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DumpKind {
    /// The resolved namespace schema tree.
    Schema,
    /// The generated synthetic declarations.
    Declarations,
    /// Lowered instruction streams, one block per recognized call.
    Instructions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inputs_and_flags() {
        let args =
            CliArgs::try_parse_from(["propel", "--optimize", "--dump", "schema", "src"]).unwrap();
        assert!(args.optimize);
        assert_eq!(args.dump, Some(DumpKind::Schema));
        assert_eq!(args.inputs, vec![PathBuf::from("src")]);
    }

    #[test]
    fn inputs_are_required() {
        assert!(CliArgs::try_parse_from(["propel"]).is_err());
    }
}
