mod common;

use std::fs;
use std::time::Duration;

use annotload::config::JobKind;
use annotload::error::{ErrorCode, NO_PROCESS_EXIT_CODE};
use annotload::job;
use annotload::pipeline::PipelineRunStatus;
use annotload::run_log::{END_LABEL, START_LABEL};

use common::{arg_after, FakeRunner, Workspace, GENERATOR, LOADER};

#[test]
fn translate_loads_derived_annotation_file() {
    let ws = Workspace::new();
    let runner = FakeRunner::new();

    let report = job::run(JobKind::Translate, &ws.config(JobKind::Translate), &runner).unwrap();

    assert_eq!(report.pipeline.status, PipelineRunStatus::Success);
    assert_eq!(runner.programs(), vec![GENERATOR, LOADER]);

    let loader = &runner.calls()[1];
    let derived = ws.output_dir().join("sample.txt.annotload");
    assert_eq!(arg_after(loader, "-I"), Some(derived.display().to_string()));
    assert_eq!(arg_after(loader, "-M").as_deref(), Some("new"));
    assert_eq!(arg_after(loader, "-R").as_deref(), Some("J:0"));
    assert!(derived.exists());
}

#[test]
fn translate_passes_editor_to_generator() {
    let ws = Workspace::new();
    let runner = FakeRunner::new();
    let config = ws.config_with(JobKind::Translate, |o| o.editor = Some("csmith".to_string()));

    job::run(JobKind::Translate, &config, &runner).unwrap();

    assert_eq!(arg_after(&runner.calls()[0], "-E").as_deref(), Some("csmith"));
}

#[test]
fn failed_generator_skips_load() {
    let ws = Workspace::new();
    let runner = FakeRunner::new().failing(GENERATOR, 2);

    let report = job::run(JobKind::Translate, &ws.config(JobKind::Translate), &runner).unwrap();

    assert_eq!(runner.programs(), vec![GENERATOR]);
    assert_eq!(report.exit_code(), 2);
    assert_eq!(report.pipeline.status, PipelineRunStatus::Failed);
}

#[test]
fn load_passes_input_and_obsolete_flag() {
    let ws = Workspace::new();
    let runner = FakeRunner::new();
    let config = ws.config_with(JobKind::Load, |o| {
        o.load_obsolete = true;
        o.mode = Some("append".to_string());
        o.delete_reference = Some("J:65060".to_string());
    });

    let report = job::run(JobKind::Load, &config, &runner).unwrap();

    assert_eq!(report.exit_code(), 0);
    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(arg_after(&calls[0], "-I"), Some(ws.input().display().to_string()));
    assert_eq!(arg_after(&calls[0], "-M").as_deref(), Some("append"));
    assert_eq!(arg_after(&calls[0], "-R").as_deref(), Some("J:65060"));
    assert_eq!(calls[0].args.last().map(String::as_str), Some("-O"));
}

#[test]
fn load_exit_code_is_loader_exit_code() {
    let ws = Workspace::new();
    let runner = FakeRunner::new().failing(LOADER, 9);

    let report = job::run(JobKind::Load, &ws.config(JobKind::Load), &runner).unwrap();

    assert_eq!(report.exit_code(), 9);
}

#[test]
fn missing_input_leaves_log_without_timestamps() {
    let ws = Workspace::new();
    fs::remove_file(ws.input()).unwrap();
    let runner = FakeRunner::new();

    let err = job::run(JobKind::Load, &ws.config(JobKind::Load), &runner).unwrap_err();

    assert_eq!(err.code, ErrorCode::InputUnreadable);
    assert!(runner.calls().is_empty());
    assert!(ws.log_file().exists());
    assert!(!ws.log().contains(START_LABEL));
}

#[test]
fn step_timeout_reaches_the_runner_and_exits_twenty() {
    let ws = Workspace::new();
    let runner = FakeRunner::new().timing_out(LOADER);
    let config = ws.config_with(JobKind::Load, |o| o.step_timeout_secs = Some(30));

    let report = job::run(JobKind::Load, &config, &runner).unwrap();

    assert_eq!(runner.timeouts(), vec![Some(Duration::from_secs(30))]);
    assert_eq!(report.exit_code(), NO_PROCESS_EXIT_CODE);
    assert_eq!(report.pipeline.status, PipelineRunStatus::Failed);
    let step = &report.pipeline.steps[0];
    assert_eq!(step.error_code.as_deref(), Some("pipeline.step_timeout"));
    assert!(ws.log().contains(END_LABEL));
}

#[test]
fn unstartable_generator_exits_twenty_and_skips_load() {
    let ws = Workspace::new();
    let runner = FakeRunner::new().unstartable(GENERATOR);

    let report = job::run(JobKind::Translate, &ws.config(JobKind::Translate), &runner).unwrap();

    assert_eq!(runner.programs(), vec![GENERATOR]);
    assert_eq!(report.exit_code(), NO_PROCESS_EXIT_CODE);
    let step = &report.pipeline.steps[0];
    assert_eq!(step.error_code.as_deref(), Some("pipeline.step_spawn_failed"));
    assert_eq!(step.commands.len(), 1);
    assert_eq!(step.commands[0].exit_code, None);
    assert_eq!(report.pipeline.steps[1].status, PipelineRunStatus::Skipped);
    assert!(ws.log().contains("cannot start rikengo.py"));
}

#[test]
fn relative_paths_survive_the_tools_working_directory() {
    let ws = Workspace::new();
    let runner = FakeRunner::new();
    let config = ws.config_with(JobKind::Translate, |o| {
        o.input_file = Some("sample.txt".to_string());
        o.password_file = Some("./pgpass".to_string());
        o.output_dir = Some("out".to_string());
    });

    job::run(JobKind::Translate, &config, &runner).unwrap();

    let calls = runner.calls();
    let generator = &calls[0];
    assert_eq!(generator.working_dir, Some(ws.output_dir()));
    assert_eq!(arg_after(generator, "-I"), Some(ws.input().display().to_string()));
    assert_eq!(
        arg_after(generator, "-P"),
        Some(ws.path("pgpass").display().to_string())
    );
    let derived = ws.output_dir().join("sample.txt.annotload");
    assert_eq!(arg_after(&calls[1], "-I"), Some(derived.display().to_string()));
    assert!(derived.exists());
}
