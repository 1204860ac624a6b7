//! Subcommand implementations.

use crate::commands::{CheckStrategyArgs, MutateArgs, OperatorArgs, RunArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, ProgressReporter};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tamut::{
    generate_all, CaseStatus, Component, EnginePool, FileStrategyEngine, MutationClass,
    MutationTestCase, NonRefinementStrategy, TamutConfig, TestPlan, Verdict,
};

/// Load a component, choosing the parser from the file extension.
pub fn load_component(path: &Path) -> CliResult<Arc<Component>> {
    let text = std::fs::read_to_string(path)?;
    let component = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Component::from_json(&text)?,
        _ => Component::from_yaml(&text)?,
    };
    tracing::info!(
        component = %component.name,
        locations = component.locations.len(),
        edges = component.edges.len(),
        "loaded model"
    );
    Ok(Arc::new(component))
}

/// Configuration file (if any) with the command-line operator selection applied.
pub fn load_config(path: Option<&Path>, selection: &OperatorArgs) -> CliResult<TamutConfig> {
    let config = match path {
        Some(path) => TamutConfig::load(path)?,
        None => TamutConfig::default(),
    };
    Ok(if selection.operators.is_empty() {
        config
    } else {
        config.with_operators(selection.operators.iter().cloned())
    })
}

fn reporter(config: &CliConfig) -> ProgressReporter {
    ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet())
}

#[derive(Debug, Serialize)]
struct MutantSummary<'a> {
    id: &'a str,
    class: MutationClass,
    description: &'a str,
}

fn generate(config: &TamutConfig, model: &Path) -> CliResult<Vec<MutationTestCase>> {
    let classes = config.classes()?;
    let original = load_component(model)?;
    Ok(generate_all(&original, &classes))
}

/// `tamut mutate`
pub fn run_mutate(cli: &CliConfig, config_path: Option<&Path>, args: &MutateArgs) -> CliResult<()> {
    let config = load_config(config_path, &args.selection)?;
    let cases = generate(&config, &args.model)?;

    if let Some(dir) = &args.out {
        std::fs::create_dir_all(dir)?;
        for case in &cases {
            std::fs::write(dir.join(format!("{}.yaml", case.id)), case.mutant.to_yaml()?)?;
        }
    }

    match OutputFormat::from(args.format) {
        OutputFormat::Json => {
            let summaries: Vec<_> = cases
                .iter()
                .map(|case| MutantSummary {
                    id: &case.id,
                    class: case.class,
                    description: &case.description,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        OutputFormat::Text => {
            for case in &cases {
                println!("{}\t{}", case.id, case.description);
            }
            let reporter = reporter(cli);
            reporter.info(&format!("{} mutants", cases.len()));
            if let Some(dir) = &args.out {
                reporter.info(&format!("mutants written to {}", dir.display()));
            }
        }
    }
    Ok(())
}

/// `tamut run`
pub fn run_plan(cli: &CliConfig, config_path: Option<&Path>, args: &RunArgs) -> CliResult<()> {
    let mut config = load_config(config_path, &args.selection)?;
    if let Some(jobs) = args.jobs {
        if jobs == 0 {
            return Err(CliError::invalid_argument("--jobs must be at least 1"));
        }
        config.engine.max_connections = jobs;
    }
    if let Some(max_steps) = args.max_steps {
        config.verdict.max_steps = max_steps;
    }
    if let Some(retries) = args.retries {
        config.engine.retry.max_retries = retries;
    }
    if !args.strategies.is_dir() {
        return Err(CliError::config(format!(
            "strategy directory {} does not exist",
            args.strategies.display()
        )));
    }

    let cases = generate(&config, &args.model)?;
    let pool = EnginePool::from_factory(config.engine.max_connections, || {
        Box::new(FileStrategyEngine::new(&args.strategies))
    });
    let plan = TestPlan::from_config(cases, &config);

    let mut reporter = reporter(cli);
    let format = OutputFormat::from(args.format);
    if format == OutputFormat::Text {
        reporter.start_progress(plan.cases().len() as u64, "mutants");
    }
    let bar = reporter.progress_bar();
    let report = plan.run_with_progress(&pool, |_| {
        if let Some(bar) = &bar {
            bar.inc(1);
        }
    });
    reporter.finish();

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    reporter.header("Results");
    for outcome in &report.outcomes {
        match &outcome.status {
            CaseStatus::Completed { result } => match result.verdict {
                Verdict::Fail => reporter.killed(&outcome.case_id),
                Verdict::Pass => {
                    reporter.survived(&outcome.case_id);
                    if cli.verbosity.is_verbose() {
                        eprintln!("{result}");
                    }
                }
                Verdict::Inconclusive => {
                    reporter.info(&format!("{} inconclusive: {}", outcome.case_id, result.reason));
                }
            },
            CaseStatus::Errored { message } => reporter.warning(message),
        }
    }
    reporter.summary(
        &report.score,
        report.errors,
        Duration::from_millis(report.duration_ms),
    );
    Ok(())
}

/// `tamut check-strategy`
pub fn run_check_strategy(cli: &CliConfig, args: &CheckStrategyArgs) -> CliResult<()> {
    let text = std::fs::read_to_string(&args.path)?;
    let strategy: NonRefinementStrategy = text.parse()?;

    println!("{}: {} states", args.path.display(), strategy.len());
    if cli.verbosity.is_verbose() {
        for state in strategy.states() {
            let rules = strategy.rules(state).map_or(0, <[_]>::len);
            let [first, second] = state.locations();
            println!("  ( {first} {second} ) {}: {rules} rules", state.equalities().join(" "));
        }
    }
    Ok(())
}

/// `tamut operators`
pub fn run_operators() {
    for class in MutationClass::all() {
        println!("{:<24} {}", class.code(), class.description());
    }
}
