//! CLI command implementations.

use std::path::PathBuf;

use casetree::{
    load_expectations, resolve, CaseResult, Logger, Query, RunnerConfig, StaticLoader, Status,
};

/// Flags of `ctq run`; merged over the config file.
pub struct RunOptions {
    pub verbose: bool,
    pub debug: bool,
    pub print_json: bool,
    pub expectations: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

fn print_logs(result: &CaseResult) {
    for log in &result.logs {
        for (i, line) in log.to_string().lines().enumerate() {
            let indent = if i == 0 { "  - " } else { "    " };
            println!("{}{}", indent, line);
        }
    }
}

fn print_result(query: &Query, result: &CaseResult) {
    println!("{} - {} ({:.3}ms)", query, result.status, result.time_ms);
    print_logs(result);
}

fn print_section(logger: &Logger, title: &str, status: Status, with_logs: bool) {
    let mut matching = logger
        .results()
        .filter(|(_, r)| r.status == status)
        .peekable();
    if matching.peek().is_none() {
        return;
    }
    println!();
    println!("** {} **", title);
    for (name, result) in matching {
        println!("{}", name);
        if with_logs {
            print_logs(result);
        }
    }
}

fn print_summary(logger: &Logger) {
    let total = logger.len();
    print_section(logger, "Skipped", Status::Skip, false);
    print_section(logger, "Warnings", Status::Warn, true);
    print_section(logger, "Failures", Status::Fail, true);

    println!();
    println!("** Summary **");
    println!("Passed  w/o warnings = {} / {}", logger.count(Status::Pass), total);
    println!("Passed with warnings = {} / {}", logger.count(Status::Warn), total);
    println!("Skipped              = {} / {}", logger.count(Status::Skip), total);
    println!("Failed               = {} / {}", logger.count(Status::Fail), total);
}

/// Skips are allowed; any warning or failure fails the run.
fn run_passed(logger: &Logger) -> bool {
    logger.count(Status::Fail) == 0 && logger.count(Status::Warn) == 0
}

/// Run every case of a query. Returns whether the run passed.
pub async fn run(
    loader: &StaticLoader,
    query_str: &str,
    opts: RunOptions,
) -> casetree::Result<bool> {
    let config = RunnerConfig::load(opts.config.as_deref())?.with_overrides(
        opts.debug,
        opts.verbose,
        opts.print_json,
        opts.expectations,
    );

    let tree = resolve(loader, query_str).await?;
    let expectations = match &config.expectations {
        Some(path) => load_expectations(path, tree.query())?,
        None => Vec::new(),
    };
    tracing::debug!(
        target: "ctq::run",
        query = %tree.query(),
        cases = tree.leaf_count(),
        expectations = expectations.len(),
        "Starting run"
    );

    let mut logger = Logger::new(config.debug);
    let mut recorder = logger.recorder();
    for leaf in tree.iter_leaves() {
        leaf.run(&mut recorder, &expectations);
        let result = recorder.finish();
        if config.verbose {
            print_result(&leaf.query, &result);
        }
        logger.record(leaf.query.to_string(), result);
    }

    print_summary(&logger);
    if config.print_json {
        println!();
        println!("{}", logger.as_json()?);
    }

    Ok(run_passed(&logger))
}

/// Print the canonical query of every selected case.
pub async fn list(loader: &StaticLoader, query_str: &str) -> casetree::Result<bool> {
    let tree = resolve(loader, query_str).await?;
    for leaf in tree.iter_leaves() {
        println!("{}", leaf.query);
    }
    Ok(true)
}

pub async fn tree(loader: &StaticLoader, query_str: &str) -> casetree::Result<bool> {
    let tree = resolve(loader, query_str).await?;
    print!("{}", tree);
    Ok(true)
}

pub fn suites(loader: &StaticLoader) -> casetree::Result<bool> {
    for suite in loader.suites() {
        println!("{}", suite);
    }
    Ok(true)
}
