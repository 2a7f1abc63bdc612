//! Action plan linting

use std::path::{Path, PathBuf};

use clap::Args;
use colored::Colorize;
use serde::Serialize;
use shopwatch_core::ActionPlan;

use crate::output::{self, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct LintArgs {
    /// A plan file or a directory of `.yaml` plans
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct LintResult {
    pub file: String,
    pub plan: Option<String>,
    pub signals: usize,
    pub error: Option<String>,
}

impl LintResult {
    fn ok(&self) -> bool {
        self.error.is_none()
    }
}

impl TableDisplay for LintResult {
    fn headers() -> Vec<&'static str> {
        vec!["File", "Plan", "Signals", "Status"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.file.clone(),
            self.plan.clone().unwrap_or_else(|| "-".to_string()),
            self.signals.to_string(),
            match &self.error {
                None => "ok".green().to_string(),
                Some(e) => e.red().to_string(),
            },
        ]
    }
}

pub fn lint_file(path: &Path) -> LintResult {
    let file = path.display().to_string();
    match ActionPlan::from_file(path) {
        Ok(plan) => LintResult {
            file,
            signals: plan.signals.len(),
            error: plan.validate().err().map(|e| e.to_string()),
            plan: Some(plan.name),
        },
        Err(e) => LintResult { file, plan: None, signals: 0, error: Some(e.to_string()) },
    }
}

pub fn lint_path(path: &Path) -> Vec<LintResult> {
    if path.is_dir() {
        ActionPlan::plan_files(path).iter().map(|p| lint_file(p)).collect()
    } else {
        vec![lint_file(path)]
    }
}

pub fn execute(args: LintArgs, format: OutputFormat) -> anyhow::Result<()> {
    if !args.path.exists() {
        anyhow::bail!("{} does not exist", args.path.display());
    }

    let results = lint_path(&args.path);
    let failed = results.iter().filter(|r| !r.ok()).count();

    match format {
        OutputFormat::Table => {
            if results.is_empty() {
                output::print_warning(&format!("No action plans found under {}", args.path.display()));
                return Ok(());
            }
            output::print_section("Action plans", &results);
            println!();
            if failed == 0 {
                output::print_success(&format!("{} plan(s) valid", results.len()));
            } else {
                output::print_error(&format!("{} of {} plan(s) invalid", failed, results.len()));
            }
        }
        _ => output::print_document(&results, format)?,
    }

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
