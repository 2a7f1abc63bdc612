//! Web vitals validation

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use shopwatch_core::vitals::{validate, PerformanceEntry, Tier, VitalsAccumulator};
use shopwatch_core::{ProbeConfig, Severity, VitalsReport, VitalsSnapshot, VitalsThresholds};

use crate::output::{self, OutputFormat};

#[derive(Args)]
#[command(group = clap::ArgGroup::new("input").required(true).args(["snapshot", "trace"]))]
pub struct VitalsArgs {
    /// Snapshot as read from the page: `{"lcp": .., "cls": .., "inp": ..}`
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Array of performance entries to replay through the accumulator
    #[arg(long)]
    pub trace: Option<PathBuf>,

    /// Journey tier; overrides the configured tier and thresholds
    #[arg(long)]
    pub tier: Option<Tier>,

    /// Fail (exit 1) on violations regardless of the configured severity
    #[arg(long)]
    pub enforce: bool,
}

#[derive(Serialize)]
struct VitalsOutput {
    snapshot: VitalsSnapshot,
    thresholds: VitalsThresholds,
    severity: Severity,
    report: VitalsReport,
}

fn load_snapshot(args: &VitalsArgs) -> anyhow::Result<VitalsSnapshot> {
    if let Some(path) = &args.snapshot {
        let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        return serde_json::from_str(&content).with_context(|| format!("parsing snapshot {}", path.display()));
    }

    let path = args.trace.as_ref().context("either --snapshot or --trace is required")?;
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let entries: Vec<PerformanceEntry> =
        serde_json::from_str(&content).with_context(|| format!("parsing trace {}", path.display()))?;
    Ok(VitalsAccumulator::replay(&entries))
}

pub fn execute(args: VitalsArgs, config: &ProbeConfig, format: OutputFormat) -> anyhow::Result<()> {
    let snapshot = load_snapshot(&args)?;

    let thresholds = match args.tier {
        Some(tier) => tier.thresholds(),
        None => config.vitals.thresholds(),
    };
    let severity = if args.enforce { Severity::Enforced } else { config.vitals.severity };
    let report = validate(&snapshot, &thresholds);
    let blocking = !report.blocking(severity).is_empty();

    match format {
        OutputFormat::Table => print_table(&snapshot, &thresholds, severity, &report),
        _ => output::print_document(&VitalsOutput { snapshot, thresholds, severity, report }, format)?,
    }

    if blocking {
        std::process::exit(1);
    }

    Ok(())
}

fn status(value: Option<f64>, bound: f64) -> String {
    match value.filter(|v| v.is_finite()) {
        None => "not reported".dimmed().to_string(),
        Some(v) if v > bound => "over".red().bold().to_string(),
        Some(_) => "ok".green().to_string(),
    }
}

fn print_table(snapshot: &VitalsSnapshot, thresholds: &VitalsThresholds, severity: Severity, report: &VitalsReport) {
    let show = |v: Option<f64>| v.map(|v| format!("{}", v)).unwrap_or_else(|| "-".to_string());

    let mut table = output::new_table();
    table.set_header(vec!["Metric", "Value", "Threshold", "Status"]);
    table.add_row(vec![
        "LCP (ms)".to_string(),
        show(snapshot.lcp),
        thresholds.lcp.to_string(),
        status(snapshot.lcp, thresholds.lcp),
    ]);
    table.add_row(vec![
        "CLS".to_string(),
        show(snapshot.cls),
        thresholds.cls.to_string(),
        status(snapshot.cls, thresholds.cls),
    ]);
    table.add_row(vec![
        "INP (ms)".to_string(),
        show(snapshot.inp),
        thresholds.inp.to_string(),
        status(snapshot.inp, thresholds.inp),
    ]);
    println!("{table}");

    if report.passed {
        output::print_success("All reported vitals within thresholds");
        return;
    }

    for failure in &report.failures {
        match severity {
            Severity::Enforced => output::print_error(failure),
            Severity::Advisory => output::print_warning(&format!("{} (advisory)", failure)),
        }
    }
}
