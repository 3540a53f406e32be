//! CLI argument parsing for the acceptance harness.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "genassert",
    version,
    about = "Scenario-driven acceptance tests for a multi-stack auth code generator",
    after_help = "Commands:\n  run <COLLECTION>...       Invoke the generator per scenario and assert its output\n  validate <COLLECTION>...  Check fixtures and print the resolved order\n\nExamples:\n  genassert validate fixtures/*.json\n  genassert run fixtures/*.json --generator 'node bin/generate.js' --templates templates\n  genassert run fixtures/extension-auth0.json --jobs 4 --json --out report.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Validate(ValidateArgs),
}

/// Run command inputs.
#[derive(Parser, Debug)]
#[command(about = "Run every scenario against the generator and report results")]
pub struct RunArgs {
    /// Fixture collection files (JSON)
    #[arg(value_name = "COLLECTION", required = true)]
    pub collections: Vec<PathBuf>,

    /// Generator command line; receives the module config on stdin and
    /// writes files below $GENASSERT_OUTPUT_DIR
    #[arg(long, value_name = "CMD")]
    pub generator: Option<String>,

    /// Root directory of raw generator templates for template validations
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,

    /// Per-invocation generator timeout
    #[arg(long, value_name = "N")]
    pub timeout_seconds: Option<f64>,

    /// Maximum concurrent generator invocations within a level
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Harness config file (default: ./genassert.json, then user config dir)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the JSON report to this path
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Emit the JSON report on stdout instead of the summary
    #[arg(long)]
    pub json: bool,

    /// Debug-level logging on stderr
    #[arg(long)]
    pub verbose: bool,
}

/// Validate command inputs.
#[derive(Parser, Debug)]
#[command(about = "Validate fixtures and resolve dependency order without running")]
pub struct ValidateArgs {
    /// Fixture collection files (JSON)
    #[arg(value_name = "COLLECTION", required = true)]
    pub collections: Vec<PathBuf>,

    /// Harness config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Debug-level logging on stderr
    #[arg(long)]
    pub verbose: bool,
}
