use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;

mod assert;
mod cli;
mod config;
mod error;
mod generate;
mod report;
mod resolve;
mod runner;
mod scenarios;
mod util;

use cli::{Command, RootArgs, RunArgs, ValidateArgs};
use error::HarnessError;
use generate::CommandGenerator;
use resolve::ResolvedPlan;
use runner::TestRunner;

const EXIT_FAILED: u8 = 1;
const EXIT_DEFINITION: u8 = 2;
const LOG_ENV: &str = "GENASSERT_LOG";

fn main() -> ExitCode {
    let args = RootArgs::parse();
    let outcome = match args.command {
        Command::Run(args) => {
            init_logging(args.verbose);
            cmd_run(args)
        }
        Command::Validate(args) => {
            init_logging(args.verbose);
            cmd_validate(args)
        }
    };
    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_DEFINITION)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Read, validate, and resolve collections. The outer error is I/O or JSON
/// syntax; the inner one is a definition error.
fn load_plan(paths: &[PathBuf]) -> Result<Result<ResolvedPlan, HarnessError>> {
    let sources = scenarios::read_collection_sources(paths)?;
    Ok(scenarios::load_suite(&sources).and_then(resolve::resolve))
}

fn report_definition_error(err: &HarnessError, as_json: bool) -> Result<ExitCode> {
    if as_json {
        let value = json!({
            "ok": false,
            "error": err.to_string(),
            "details": err.lines(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("serialize validation output")?
        );
    } else {
        eprintln!("error: {err}");
        for line in err.lines() {
            eprintln!("  {line}");
        }
    }
    Ok(ExitCode::from(EXIT_DEFINITION))
}

fn cmd_run(args: RunArgs) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("resolve current dir")?;
    let (mut config, config_path) = config::discover_config(args.config.as_deref(), &cwd)?;
    if let Some(generator) = args.generator {
        config.generator = Some(generator);
    }
    if let Some(templates) = args.templates {
        config.templates_root = Some(templates);
    }
    if let Some(timeout_seconds) = args.timeout_seconds {
        config.timeout_seconds = timeout_seconds;
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    config::validate_config(&config).context("invalid harness options")?;

    let plan = match load_plan(&args.collections)? {
        Ok(plan) => plan,
        Err(err) => return report_definition_error(&err, args.json),
    };

    let command = config.generator.as_deref().ok_or_else(|| {
        anyhow!(
            "no generator configured; pass --generator or set \"generator\" in {}",
            config_path
                .as_deref()
                .map(|path| util::display_path(path, Some(&cwd)))
                .unwrap_or_else(|| config::LOCAL_CONFIG_FILE.to_string())
        )
    })?;
    let generator = CommandGenerator::from_command_line(command, Some(config.timeout()?))?;
    tracing::info!(
        scenarios = plan.scenarios().len(),
        levels = plan.levels().len(),
        jobs = config.jobs,
        "starting run"
    );

    let report = TestRunner::new(config.jobs)
        .with_templates_root(config.templates_root.clone())
        .run(&plan, &generator);

    if let Some(out) = args.out.as_deref() {
        util::write_json(out, &report)?;
        tracing::info!(path = %util::display_path(out, Some(&cwd)), "wrote report");
    }
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize report")?
        );
    } else {
        print!("{}", report::render_summary(&report));
    }

    Ok(if report.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILED)
    })
}

fn cmd_validate(args: ValidateArgs) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("resolve current dir")?;
    config::discover_config(args.config.as_deref(), &cwd)?;

    let plan = match load_plan(&args.collections)? {
        Ok(plan) => plan,
        Err(err) => return report_definition_error(&err, args.json),
    };
    let warnings = &plan.suite().warnings;

    if args.json {
        let modules: Vec<_> = plan
            .module_order()
            .into_iter()
            .map(|(module_id, level)| json!({ "module_id": module_id, "level": level }))
            .collect();
        let scenarios: Vec<_> = plan
            .scenarios()
            .iter()
            .map(|planned| {
                let definition = plan.definition(planned);
                json!({
                    "module_id": plan.module_id(planned),
                    "scenario": definition.name,
                    "level": planned.level,
                    "layers": definition.module_config.layers(),
                })
            })
            .collect();
        let value = json!({
            "ok": true,
            "modules": modules,
            "scenarios": scenarios,
            "levels": plan.levels().len(),
            "warnings": warnings,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("serialize validation output")?
        );
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "ok: {} scenario(s) in {} module(s), {} level(s)",
        plan.scenarios().len(),
        plan.suite().collections.len(),
        plan.levels().len()
    );
    for (module_id, level) in plan.module_order() {
        println!("  [{level}] {module_id}");
        for planned in plan
            .scenarios()
            .iter()
            .filter(|planned| plan.module_id(planned) == module_id)
        {
            println!("        {}", plan.definition(planned).name);
        }
    }
    for warning in warnings {
        println!(
            "warning: {}/{}: {}",
            warning.module_id, warning.scenario, warning.message
        );
    }
    Ok(ExitCode::SUCCESS)
}
