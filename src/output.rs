//! CLI output formatting for plans and stages.
//!
//! # Output Format
//!
//! ## Plan run
//!
//! ```text
//! build: [css js fonts src-root images hugo] → optimize
//! 001 css: 2 files (0.41s)
//! 002 js: 14 files (1.90s)
//! 003 fonts: 6 files (0.01s)
//! 004 src-root: 3 files (0.00s)
//! 005 images: 48 files (0.12s)
//! 006 hugo: done (2.37s)
//! 007 optimize: 161 files (9.84s)
//!
//! Finished build: 7 stages, 234 files in 12.21s
//! ```
//!
//! ## Failure
//!
//! ```text
//! Failed build
//!     hugo: Hugo build failed
//!     Skipped: optimize
//! ```
//!
//! ## Watch
//!
//! ```text
//! Changed src/css/main.css → css
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>` or `String`)
//! for testability and a `print_*` wrapper that writes to stdout/stderr.
//! Format functions are pure: no I/O, no side effects.

use crate::plan::{Plan, PlanError};
use crate::stage::{Stage, StageReport};
use std::path::Path;
use std::time::Duration;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.2}s", elapsed.as_secs_f64())
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{} {}", n, one)
    } else {
        format!("{} {}", n, many)
    }
}

// ============================================================================
// Plan runs
// ============================================================================

pub fn format_plan_header(plan: &Plan) -> String {
    plan.to_string()
}

/// One line per finished stage.
///
/// The site generator's output is opaque, so it reports `done` instead of a
/// file count.
pub fn format_stage_report(index: usize, report: &StageReport) -> String {
    let detail = match report.stage {
        Stage::Hugo | Stage::HugoPreview => "done".to_string(),
        _ => plural(report.files, "file", "files"),
    };
    format!(
        "{} {}: {} ({})",
        format_index(index),
        report.stage,
        detail,
        format_elapsed(report.elapsed)
    )
}

pub fn format_plan_summary(plan: &Plan, reports: &[StageReport], elapsed: Duration) -> Vec<String> {
    let mut lines: Vec<String> = reports
        .iter()
        .enumerate()
        .map(|(i, r)| format_stage_report(i + 1, r))
        .collect();
    let files: usize = reports.iter().map(|r| r.files).sum();
    lines.push(String::new());
    lines.push(format!(
        "Finished {}: {}, {} in {}",
        plan.name,
        plural(reports.len(), "stage", "stages"),
        plural(files, "file", "files"),
        format_elapsed(elapsed)
    ));
    lines
}

pub fn format_failure(err: &PlanError) -> Vec<String> {
    let mut lines = vec![format!("Failed {}", err.plan)];
    for (stage, error) in &err.failures {
        lines.push(format!("    {}: {}", stage, error));
    }
    if !err.skipped.is_empty() {
        let names: Vec<&str> = err.skipped.iter().map(|s| s.name()).collect();
        lines.push(format!("    Skipped: {}", names.join(", ")));
    }
    lines
}

pub fn print_plan_header(plan: &Plan) {
    println!("{}", format_plan_header(plan));
}

pub fn print_plan_summary(plan: &Plan, reports: &[StageReport], elapsed: Duration) {
    for line in format_plan_summary(plan, reports, elapsed) {
        println!("{}", line);
    }
}

pub fn print_failure(err: &PlanError) {
    for line in format_failure(err) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// Watch
// ============================================================================

/// Describe a rebuild triggered by changed files.
pub fn format_rebuild(root: &Path, changed: &[impl AsRef<Path>], stages: &[Stage]) -> String {
    let paths: Vec<String> = changed
        .iter()
        .map(|p| {
            let p = p.as_ref();
            p.strip_prefix(root).unwrap_or(p).display().to_string()
        })
        .collect();
    let names: Vec<&str> = stages.iter().map(|s| s.name()).collect();
    format!("Changed {} → {}", paths.join(", "), names.join(" "))
}

pub fn print_rebuild(root: &Path, changed: &[impl AsRef<Path>], stages: &[Stage]) {
    println!("{}", format_rebuild(root, changed, stages));
}
