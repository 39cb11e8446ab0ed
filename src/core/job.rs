//! One run of the tool: log setup, input check, step execution.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{JobKind, LoadConfig};
use crate::error::{Error, Result};
use crate::pipeline::{self, PipelinePlan, PipelineRunResult, PipelineStep};
use crate::process::ProcessRunner;
use crate::reload;
use crate::run_log::RunLog;
use crate::wrapper;

#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub input_file: PathBuf,
    pub log_file: PathBuf,
    #[serde(flatten)]
    pub pipeline: PipelineRunResult,
}

impl JobReport {
    pub fn exit_code(&self) -> i32 {
        self.pipeline.exit_code
    }
}

pub fn steps_for(kind: JobKind, config: &LoadConfig) -> Result<Vec<PipelineStep>> {
    match kind {
        JobKind::Load => Ok(wrapper::load_steps(config)),
        JobKind::Translate => wrapper::translate_steps(config),
        JobKind::Reload => reload::steps(config),
    }
}

/// Render the steps `kind` would run, without touching the filesystem.
pub fn plan(kind: JobKind, config: &LoadConfig) -> Result<PipelinePlan> {
    pipeline::plan(&steps_for(kind, config)?, config.pipeline_mode)
}

/// Run `kind` to completion.
///
/// The log is truncated first. An unreadable input file is reported before
/// the start timestamp is written and before any process runs.
pub fn run(kind: JobKind, config: &LoadConfig, runner: &dyn ProcessRunner) -> Result<JobReport> {
    let steps = steps_for(kind, config)?;

    fs::create_dir_all(&config.output_dir).map_err(|e| {
        Error::internal_io(
            e.to_string(),
            Some(format!("create {}", config.output_dir.display())),
        )
    })?;

    let mut log = RunLog::create(&config.log_file)?;
    check_input(&config.input_file)?;

    log.start()?;
    write_header(&mut log, config)?;

    let outcome = pipeline::run(
        &steps,
        config.pipeline_mode,
        runner,
        &mut log,
        config.step_timeout(),
    );

    if let Ok(result) = &outcome {
        match &result.failed_step {
            Some(step) => log.line(&format!(
                "Run stopped with failures; first failing step: {} (exit {})",
                step, result.exit_code
            ))?,
            None => log.line("All steps completed")?,
        }
    }
    log.finish()?;

    let result = outcome?;
    crate::log_status!(
        "annotload",
        "{} of {} step(s) succeeded, log at {}",
        result.summary.succeeded,
        result.summary.total_steps,
        config.log_file.display()
    );

    Ok(JobReport {
        input_file: config.input_file.clone(),
        log_file: config.log_file.clone(),
        pipeline: result,
    })
}

/// Fails with `input.unreadable` unless `path` is a regular file we can open.
pub fn check_input(path: &Path) -> Result<()> {
    let unreadable = |error: String| Error::input_unreadable(path.display().to_string(), error);

    let metadata = fs::metadata(path).map_err(|e| unreadable(e.to_string()))?;
    if !metadata.is_file() {
        return Err(unreadable("not a regular file".to_string()));
    }
    File::open(path).map_err(|e| unreadable(e.to_string()))?;
    Ok(())
}

fn write_header(log: &mut RunLog, config: &LoadConfig) -> Result<()> {
    let connection = &config.connection;
    log.line(&format!("Server: {}", connection.server))?;
    log.line(&format!("Database: {}", connection.database))?;
    log.line(&format!("Input file: {}", config.input_file.display()))?;
    log.line(&format!("Mode: {}", config.mode))?;
    log.line(&format!("Annotation type: {}", config.annotation_type))?;
    log.line(&format!("Delete reference: {}", config.delete_reference))?;
    log.line(&format!("Pipeline mode: {}", config.pipeline_mode.as_str()))
}
