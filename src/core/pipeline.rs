use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{Error, ErrorCode, Hint, Result, NO_PROCESS_EXIT_CODE};
use crate::mode::PipelineMode;
use crate::process::{Invocation, ProcessOutcome, ProcessRunner};
use crate::run_log::RunLog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Run each invocation in order; the first failure stops the step.
    Run(Vec<Invocation>),
    /// Copy a file produced by an earlier step to where a later tool expects it.
    Copy { from: PathBuf, to: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStep {
    pub id: String,
    pub label: String,
    pub needs: Vec<String>,
    pub action: StepAction,
}

impl PipelineStep {
    pub fn run(id: &str, label: &str, invocations: Vec<Invocation>) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            needs: Vec::new(),
            action: StepAction::Run(invocations),
        }
    }

    pub fn copy(id: &str, label: &str, from: PathBuf, to: PathBuf) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            needs: Vec::new(),
            action: StepAction::Copy { from, to },
        }
    }

    pub fn needs(mut self, ids: &[&str]) -> Self {
        self.needs = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    fn commands(&self) -> Vec<String> {
        match &self.action {
            StepAction::Run(invocations) => invocations.iter().map(Invocation::display).collect(),
            StepAction::Copy { from, to } => {
                vec![format!("copy {} -> {}", from.display(), to.display())]
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PipelinePlan {
    pub mode: String,
    pub steps: Vec<PipelinePlanStep>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PipelinePlanStep {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineRunStatus {
    Success,
    PartialSuccess,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandRecord {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStepResult {
    pub id: String,
    pub label: String,
    pub status: PipelineRunStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunResult {
    pub mode: String,
    pub steps: Vec<PipelineStepResult>,
    pub status: PipelineRunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    /// Exit code of the last invoked process (or the failure code when the
    /// last attempt produced none).
    pub exit_code: i32,
    pub summary: PipelineRunSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunSummary {
    pub total_steps: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub next_actions: Vec<String>,
}

impl PipelineRunResult {
    pub fn step(&self, id: &str) -> Option<&PipelineStepResult> {
        self.steps.iter().find(|step| step.id == id)
    }
}

/// Check step ids are unique and every prerequisite names an earlier step.
pub fn validate(steps: &[PipelineStep]) -> Result<()> {
    let mut seen = HashSet::new();
    for step in steps {
        for need in &step.needs {
            if !seen.contains(need.as_str()) {
                return Err(Error::validation_invalid_argument(
                    "steps",
                    format!("Step '{}' depends on '{}', which does not run before it", step.id, need),
                    None,
                ));
            }
        }
        if !seen.insert(step.id.as_str()) {
            return Err(Error::validation_invalid_argument(
                "steps",
                format!("Duplicate step id '{}'", step.id),
                None,
            ));
        }
    }
    Ok(())
}

pub fn plan(steps: &[PipelineStep], mode: PipelineMode) -> Result<PipelinePlan> {
    validate(steps)?;
    Ok(PipelinePlan {
        mode: mode.as_str().to_string(),
        steps: steps
            .iter()
            .map(|step| PipelinePlanStep {
                id: step.id.clone(),
                label: step.label.clone(),
                needs: step.needs.clone(),
                commands: step.commands(),
            })
            .collect(),
    })
}

/// Run `steps` in order.
///
/// Strict mode stops at the first failed step and records the rest as
/// skipped. Best-effort mode keeps going but skips any step whose
/// prerequisites did not all succeed. Once the steps validate, every
/// failure (including runner and log errors) is recorded against the step
/// it happened in.
pub fn run(
    steps: &[PipelineStep],
    mode: PipelineMode,
    runner: &dyn ProcessRunner,
    log: &mut RunLog,
    timeout: Option<Duration>,
) -> Result<PipelineRunResult> {
    validate(steps)?;

    let mut results: Vec<PipelineStepResult> = Vec::with_capacity(steps.len());
    let mut status_map: HashMap<String, PipelineRunStatus> = HashMap::new();
    let mut failed_step: Option<String> = None;
    let mut last_exit: Option<i32> = None;

    for step in steps {
        if let Some(reason) = skip_reason(step, mode, &status_map, failed_step.as_deref()) {
            let line = format!("--- {} skipped: {}", step.id, reason);
            let mut result = skipped_result(step, reason);
            note(log, &line, &mut result);
            status_map.insert(step.id.clone(), PipelineRunStatus::Skipped);
            results.push(result);
            continue;
        }

        crate::log_status!("annotload", "{}", step.label);

        let (mut result, exit) = execute_step(step, runner, log, timeout);
        if exit.is_some() {
            last_exit = exit;
        }

        if result.status == PipelineRunStatus::Failed {
            let line = format!(
                "*** {} failed: {}",
                step.id,
                result.error.as_deref().unwrap_or("unknown error")
            );
            note(log, &line, &mut result);
            if failed_step.is_none() {
                failed_step = Some(step.id.clone());
            }
        }

        status_map.insert(step.id.clone(), result.status.clone());
        results.push(result);
    }

    let status = derive_overall_status(&results);
    let summary = build_summary(&results, &status);

    Ok(PipelineRunResult {
        mode: mode.as_str().to_string(),
        steps: results,
        status,
        failed_step,
        exit_code: last_exit.unwrap_or(0),
        summary,
    })
}

/// Write a log line; a failed write becomes a warning on `result`.
fn note(log: &mut RunLog, text: &str, result: &mut PipelineStepResult) {
    if let Err(err) = log.line(text) {
        result
            .warnings
            .push(format!("Could not write to log: {}", describe(&err)));
    }
}

fn skip_reason(
    step: &PipelineStep,
    mode: PipelineMode,
    status_map: &HashMap<String, PipelineRunStatus>,
    failed_step: Option<&str>,
) -> Option<String> {
    if let (PipelineMode::Strict, Some(failed)) = (mode, failed_step) {
        return Some(format!("aborted after '{}' failed", failed));
    }

    step.needs
        .iter()
        .find(|need| status_map.get(need.as_str()) != Some(&PipelineRunStatus::Success))
        .map(|need| format!("'{}' did not succeed", need))
}

fn skipped_result(step: &PipelineStep, reason: String) -> PipelineStepResult {
    PipelineStepResult {
        id: step.id.clone(),
        label: step.label.clone(),
        status: PipelineRunStatus::Skipped,
        commands: Vec::new(),
        warnings: vec![format!("Skipped because {}", reason)],
        hints: Vec::new(),
        error_code: None,
        error: None,
    }
}

/// Returns the step result plus the exit code to report for it, if any.
fn execute_step(
    step: &PipelineStep,
    runner: &dyn ProcessRunner,
    log: &mut RunLog,
    timeout: Option<Duration>,
) -> (PipelineStepResult, Option<i32>) {
    let mut commands = Vec::new();
    let mut last_exit = None;

    let outcome = log
        .line(&format!("=== {}: {}", step.id, step.label))
        .and_then(|()| match &step.action {
            StepAction::Run(invocations) => run_invocations(
                step,
                invocations,
                runner,
                log,
                timeout,
                &mut commands,
                &mut last_exit,
            ),
            StepAction::Copy { from, to } => copy_step(step, from, to, log, &mut commands),
        });

    let result = match outcome {
        Ok(()) => PipelineStepResult {
            id: step.id.clone(),
            label: step.label.clone(),
            status: PipelineRunStatus::Success,
            commands,
            warnings: Vec::new(),
            hints: Vec::new(),
            error_code: None,
            error: None,
        },
        Err(err) => {
            last_exit = Some(step_exit_code(&err));
            PipelineStepResult {
                id: step.id.clone(),
                label: step.label.clone(),
                status: PipelineRunStatus::Failed,
                commands,
                warnings: Vec::new(),
                hints: err.hints.clone(),
                error_code: Some(err.code.as_str().to_string()),
                error: Some(describe(&err)),
            }
        }
    };

    (result, last_exit)
}

/// Run each invocation in order; the first failure stops the step.
fn run_invocations(
    step: &PipelineStep,
    invocations: &[Invocation],
    runner: &dyn ProcessRunner,
    log: &mut RunLog,
    timeout: Option<Duration>,
    commands: &mut Vec<CommandRecord>,
    last_exit: &mut Option<i32>,
) -> Result<()> {
    for invocation in invocations {
        let command = invocation.display();
        log.line(&format!("$ {}", command))?;

        let started = Instant::now();
        let outcome = runner.run(invocation, log, timeout);
        let exit_code = match &outcome {
            Ok(ProcessOutcome::Exited(exit)) => Some(exit.code),
            _ => None,
        };
        commands.push(CommandRecord {
            command: command.clone(),
            exit_code,
            duration_ms: started.elapsed().as_millis(),
        });

        match outcome? {
            ProcessOutcome::Exited(exit) => {
                *last_exit = Some(exit.code);
                if !exit.success() {
                    return Err(Error::step_failed(&step.id, &command, exit.code));
                }
            }
            ProcessOutcome::TimedOut(limit) => {
                return Err(Error::step_timeout(&step.id, &command, limit.as_secs()));
            }
            ProcessOutcome::SpawnFailed(reason) => {
                log.line(&format!("cannot start {}: {}", invocation.program, reason))?;
                return Err(Error::step_spawn_failed(&step.id, &command, reason));
            }
        }
    }
    Ok(())
}

fn copy_step(
    step: &PipelineStep,
    from: &Path,
    to: &Path,
    log: &mut RunLog,
    commands: &mut Vec<CommandRecord>,
) -> Result<()> {
    let command = format!("copy {} -> {}", from.display(), to.display());
    log.line(&format!("$ {}", command))?;

    let started = Instant::now();
    let copied = copy_file(from, to);
    commands.push(CommandRecord {
        command: command.clone(),
        exit_code: None,
        duration_ms: started.elapsed().as_millis(),
    });

    copied.map_err(|err| Error::step_copy_failed(&step.id, &command, describe(&err)))
}

/// Runner and log failures have no process exit code of their own.
fn step_exit_code(err: &Error) -> i32 {
    match err.code {
        ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalUnexpected => NO_PROCESS_EXIT_CODE,
        _ => err.exit_code(),
    }
}

fn describe(err: &Error) -> String {
    match err.code {
        ErrorCode::InternalIoError => format!(
            "{}: {}",
            err.details["context"].as_str().unwrap_or("io"),
            err.details["error"].as_str().unwrap_or(&err.message)
        ),
        _ => err.message.clone(),
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("create {}", parent.display())))
        })?;
    }

    if from == to {
        return Ok(());
    }

    fs::copy(from, to).map(|_| ()).map_err(|e| {
        Error::internal_io(
            e.to_string(),
            Some(format!("copy {} to {}", from.display(), to.display())),
        )
    })
}

fn derive_overall_status(results: &[PipelineStepResult]) -> PipelineRunStatus {
    let has_success = results
        .iter()
        .any(|result| matches!(result.status, PipelineRunStatus::Success));
    let has_failed = results
        .iter()
        .any(|result| matches!(result.status, PipelineRunStatus::Failed));

    if has_failed && has_success {
        return PipelineRunStatus::PartialSuccess;
    }
    if has_failed {
        return PipelineRunStatus::Failed;
    }
    if !results.is_empty() && !has_success {
        return PipelineRunStatus::Skipped;
    }
    PipelineRunStatus::Success
}

fn build_summary(results: &[PipelineStepResult], status: &PipelineRunStatus) -> PipelineRunSummary {
    let count = |wanted: PipelineRunStatus| results.iter().filter(|r| r.status == wanted).count();

    let next_actions = match status {
        PipelineRunStatus::PartialSuccess | PipelineRunStatus::Failed => vec![
            "Check the log for the failing step's output".to_string(),
            "Destination tables may be truncated or missing indexes until a full reload succeeds"
                .to_string(),
        ],
        _ => Vec::new(),
    };

    PipelineRunSummary {
        total_steps: results.len(),
        succeeded: count(PipelineRunStatus::Success),
        failed: count(PipelineRunStatus::Failed),
        skipped: count(PipelineRunStatus::Skipped),
        next_actions,
    }
}
