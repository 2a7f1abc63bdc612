//! Replay a recorded driver event log into evidence artifacts

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use shopwatch_core::evidence::compile_network_summary_with;
use shopwatch_core::{compile_har, DirectorySink, EventCorrelator, EvidenceBundle, NetworkSummary, ProbeConfig, SessionEvent};
use tracing::warn;

use crate::output::{self, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct EvidenceArgs {
    /// JSON-lines file, one driver event per line
    #[arg(long)]
    pub events: PathBuf,

    /// URL of the journey's page, used as the HAR page title
    #[arg(long)]
    pub page_url: String,

    /// Directory the artifacts are written to
    #[arg(long, default_value = "evidence")]
    pub out: PathBuf,

    /// Override the slow-request threshold (ms)
    #[arg(long)]
    pub slow_ms: Option<f64>,
}

/// Parsed event log plus the lines that could not be read
pub struct EventLog {
    pub events: Vec<SessionEvent>,
    pub skipped: usize,
}

pub fn read_event_log(path: &Path) -> anyhow::Result<EventLog> {
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut log = EventLog { events: Vec::new(), skipped: 0 };

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SessionEvent>(&line) {
            Ok(event) => log.events.push(event),
            Err(e) => {
                warn!("Skipping line {} of {}: {}", index + 1, path.display(), e);
                log.skipped += 1;
            }
        }
    }

    Ok(log)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EvidenceReport<'a> {
    page_url: &'a str,
    out_dir: String,
    events: usize,
    skipped_lines: usize,
    ignored_events: usize,
    summary: &'a NetworkSummary,
    artifacts: Vec<&'a str>,
}

struct ProblemRow {
    kind: &'static str,
    method: String,
    url: String,
    detail: String,
}

impl TableDisplay for ProblemRow {
    fn headers() -> Vec<&'static str> {
        vec!["Kind", "Method", "URL", "Detail"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.kind.to_string(), self.method.clone(), self.url.clone(), self.detail.clone()]
    }
}

fn problem_rows(summary: &NetworkSummary) -> Vec<ProblemRow> {
    let failed = summary.failed_requests.iter().map(|r| ProblemRow {
        kind: "failed",
        method: r.method.clone(),
        url: r.url.clone(),
        detail: r.failure.clone(),
    });
    let errors = summary.error_responses.iter().map(|r| ProblemRow {
        kind: "error",
        method: r.method.clone(),
        url: r.url.clone(),
        detail: format!("HTTP {}", r.status),
    });
    let slow = summary.slow_requests.iter().map(|r| ProblemRow {
        kind: "slow",
        method: r.method.clone(),
        url: r.url.clone(),
        detail: format!("{:.0} ms", r.duration),
    });
    let pending = summary.pending_requests.iter().map(|r| ProblemRow {
        kind: "pending",
        method: r.method.clone(),
        url: r.url.clone(),
        detail: "no response".to_string(),
    });

    failed.chain(errors).chain(slow).chain(pending).collect()
}

pub async fn execute(args: EvidenceArgs, config: &ProbeConfig, format: OutputFormat) -> anyhow::Result<()> {
    let log = read_event_log(&args.events)?;
    let event_count = log.events.len();

    let mut correlator = EventCorrelator::new();
    for event in log.events {
        correlator.observe(event);
    }

    let slow_ms = args.slow_ms.unwrap_or(config.network.slow_request_ms);
    let summary = compile_network_summary_with(correlator.records(), slow_ms);
    let har = compile_har(correlator.records(), &args.page_url);

    let bundle = EvidenceBundle::assemble(
        &summary,
        &har,
        correlator.console_entries(),
        correlator.error_messages(),
        None,
    )?;
    let sink = DirectorySink::new(&args.out);
    let attach = bundle.attach_all(&sink).await;
    if attach.failed > 0 {
        output::print_error(&format!("{} artifact(s) could not be written to {}", attach.failed, args.out.display()));
    }

    match format {
        OutputFormat::Table => print_table(&args, &summary, event_count, log.skipped, &bundle, &sink),
        _ => output::print_document(
            &EvidenceReport {
                page_url: &args.page_url,
                out_dir: args.out.display().to_string(),
                events: event_count,
                skipped_lines: log.skipped,
                ignored_events: correlator.ignored_events(),
                summary: &summary,
                artifacts: bundle.names(),
            },
            format,
        )?,
    }

    Ok(())
}

fn print_table(
    args: &EvidenceArgs,
    summary: &NetworkSummary,
    events: usize,
    skipped: usize,
    bundle: &EvidenceBundle,
    sink: &DirectorySink,
) {
    println!();
    println!("{}", "━".repeat(60).dimmed());
    println!("{}", format!(" Network evidence for {}", args.page_url).bold());
    println!("{}", "━".repeat(60).dimmed());

    let mut table = output::new_table();
    table.set_header(vec!["Requests", "OK", "Failed", "HTTP errors", "Slow", "Pending"]);
    table.add_row(vec![
        summary.total_requests.to_string(),
        summary.total_ok.to_string().green().to_string(),
        colour_count(summary.total_failed),
        colour_count(summary.total_errors),
        summary.total_slow.to_string().yellow().to_string(),
        summary.total_pending.to_string(),
    ]);
    println!("{table}");

    output::print_section("Problems", &problem_rows(summary));

    println!();
    if summary.has_failures() {
        output::print_error(&format!(
            "{} failed request(s), {} HTTP error response(s)",
            summary.total_failed, summary.total_errors
        ));
    }
    if skipped > 0 {
        output::print_warning(&format!("{} unreadable line(s) skipped", skipped));
    }
    output::print_info(&format!("{} event(s) replayed", events));
    output::print_success(&format!(
        "Wrote {} to {}",
        bundle.names().join(", "),
        sink.dir().display()
    ));
}

fn colour_count(count: usize) -> String {
    if count == 0 {
        count.to_string().green().to_string()
    } else {
        count.to_string().red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_event_log_skips_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"event":"request_issued","id":"1","url":"https://shop.example/","method":"GET","timestamp_ms":0.0,"wall_time":"2024-05-01T10:00:00Z"}"#,
                "\n\n",
                "not json\n",
                r#"{"event":"response_received","id":"1","status":200,"timestamp_ms":150.0}"#,
                "\n",
            ),
        )
        .unwrap();

        let log = read_event_log(&path).unwrap();
        assert_eq!(log.events.len(), 2);
        assert_eq!(log.skipped, 1);
    }

    #[test]
    fn test_problem_rows_order() {
        let mut correlator = EventCorrelator::new();
        let lines = [
            r#"{"event":"request_issued","id":"a","url":"https://shop.example/api","method":"POST","timestamp_ms":0.0,"wall_time":"2024-05-01T10:00:00Z"}"#,
            r#"{"event":"request_issued","id":"b","url":"https://cdn.example/x.js","method":"GET","timestamp_ms":0.0,"wall_time":"2024-05-01T10:00:00Z"}"#,
            r#"{"event":"response_received","id":"a","status":500,"timestamp_ms":20.0}"#,
            r#"{"event":"request_failed","id":"b","reason":"net::ERR_FAILED","timestamp_ms":30.0}"#,
        ];
        for line in lines {
            correlator.observe(serde_json::from_str(line).unwrap());
        }

        let rows = problem_rows(&compile_network_summary_with(correlator.records(), 4000.0));
        let kinds: Vec<_> = rows.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec!["failed", "error"]);
    }
}
