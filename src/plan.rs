//! Task plans: ordered steps of stages.
//!
//! ```text
//! build          [css js fonts src-root images hugo] → optimize
//! build-preview  [css js fonts src-root images hugo-preview]
//! server         [hugo css js fonts src-root images] → (serve + watch)
//! ```
//!
//! Stages inside a `[...]` step run concurrently on the rayon pool. A step
//! only starts once every stage of the previous step has finished. When any
//! stage of a step fails, the rest of that step still runs to completion,
//! every failure is reported, and no later step runs.

use crate::stage::{Stage, StageError, StageReport};
use rayon::prelude::*;
use std::fmt;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Single(Stage),
    Parallel(Vec<Stage>),
}

impl Step {
    pub fn stages(&self) -> &[Stage] {
        match self {
            Step::Single(stage) => std::slice::from_ref(stage),
            Step::Parallel(stages) => stages,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Single(stage) => write!(f, "{}", stage),
            Step::Parallel(stages) => {
                let names: Vec<&str> = stages.iter().map(|s| s.name()).collect();
                write!(f, "[{}]", names.join(" "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub name: &'static str,
    pub steps: Vec<Step>,
}

impl Plan {
    /// Full production build.
    pub fn build() -> Self {
        Self {
            name: "build",
            steps: vec![
                Step::Parallel(vec![
                    Stage::Css,
                    Stage::Js,
                    Stage::Fonts,
                    Stage::SrcRoot,
                    Stage::Images,
                    Stage::Hugo,
                ]),
                Step::Single(Stage::Optimize),
            ],
        }
    }

    /// Build including drafts and future content, without image optimization.
    pub fn build_preview() -> Self {
        Self {
            name: "build-preview",
            steps: vec![Step::Parallel(vec![
                Stage::Css,
                Stage::Js,
                Stage::Fonts,
                Stage::SrcRoot,
                Stage::Images,
                Stage::HugoPreview,
            ])],
        }
    }

    /// Prerequisites of the dev server.
    pub fn server() -> Self {
        Self {
            name: "server",
            steps: vec![Step::Parallel(vec![
                Stage::Hugo,
                Stage::Css,
                Stage::Js,
                Stage::Fonts,
                Stage::SrcRoot,
                Stage::Images,
            ])],
        }
    }

    /// Run one stage on its own.
    pub fn single(stage: Stage) -> Self {
        Self {
            name: stage.name(),
            steps: vec![Step::Single(stage)],
        }
    }

    /// Every stage in execution order.
    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.steps.iter().flat_map(|step| step.stages().iter().copied())
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<String> = self.steps.iter().map(|s| s.to_string()).collect();
        write!(f, "{}: {}", self.name, steps.join(" → "))
    }
}

/// Executes single stages for a plan.
///
/// `Sync` so one runner can drive every stage of a parallel step.
pub trait StageRunner: Sync {
    /// Run `stage` to completion. Returns the number of files written.
    fn run_stage(&self, stage: Stage) -> Result<usize, StageError>;
}

#[derive(Error, Debug)]
#[error("{}", describe_failures(.failures))]
pub struct PlanError {
    pub plan: &'static str,
    pub failures: Vec<(Stage, StageError)>,
    /// Stages of later steps that never ran.
    pub skipped: Vec<Stage>,
    /// Stages that succeeded before the plan stopped.
    pub completed: Vec<StageReport>,
}

fn describe_failures(failures: &[(Stage, StageError)]) -> String {
    match failures {
        [(stage, err)] => format!("{} failed: {}", stage, err),
        _ => {
            let names: Vec<&str> = failures.iter().map(|(s, _)| s.name()).collect();
            format!("{} stages failed: {}", failures.len(), names.join(", "))
        }
    }
}

fn timed(runner: &impl StageRunner, stage: Stage) -> Result<StageReport, (Stage, StageError)> {
    let start = Instant::now();
    info!(%stage, "starting");
    match runner.run_stage(stage) {
        Ok(files) => {
            let elapsed = start.elapsed();
            info!(%stage, files, ?elapsed, "finished");
            Ok(StageReport {
                stage,
                files,
                elapsed,
            })
        }
        Err(err) => {
            error!(%stage, error = %err, "failed");
            Err((stage, err))
        }
    }
}

/// Run `plan` step by step. Returns one report per stage, in plan order.
pub fn execute(plan: &Plan, runner: &impl StageRunner) -> Result<Vec<StageReport>, PlanError> {
    let mut reports = Vec::new();

    for (index, step) in plan.steps.iter().enumerate() {
        let results: Vec<Result<StageReport, (Stage, StageError)>> = match step {
            Step::Single(stage) => vec![timed(runner, *stage)],
            Step::Parallel(stages) => stages.par_iter().map(|s| timed(runner, *s)).collect(),
        };

        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(report) => reports.push(report),
                Err(failure) => failures.push(failure),
            }
        }

        if !failures.is_empty() {
            let skipped = plan.steps[index + 1..]
                .iter()
                .flat_map(|s| s.stages().iter().copied())
                .collect();
            return Err(PlanError {
                plan: plan.name,
                failures,
                skipped,
                completed: reports,
            });
        }
    }

    Ok(reports)
}
