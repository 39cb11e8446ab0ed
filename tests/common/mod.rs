#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use annotload::config::{FileConfig, JobKind, LoadConfig, Overrides};
use annotload::process::{Invocation, ProcessExit, ProcessOutcome, ProcessRunner};
use annotload::run_log::RunLog;
use annotload::Result;

pub const GENERATOR: &str = "rikengo.py";
pub const LOADER: &str = "annotload.py";
pub const PROMOTE: &str = "rikenloadprepub.sh";

/// Records every invocation and answers with scripted exit codes.
///
/// The generator is simulated by writing the annotation and candidate files
/// into its working directory, as the real tool does.
#[derive(Default)]
pub struct FakeRunner {
    codes: HashMap<String, i32>,
    timing_out: HashSet<String>,
    unstartable: HashSet<String>,
    calls: RefCell<Vec<Invocation>>,
    timeouts: RefCell<Vec<Option<Duration>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, program: &str, code: i32) -> Self {
        self.codes.insert(program.to_string(), code);
        self
    }

    /// `program` runs past whatever timeout it is given.
    pub fn timing_out(mut self, program: &str) -> Self {
        self.timing_out.insert(program.to_string());
        self
    }

    /// `program` cannot be started at all.
    pub fn unstartable(mut self, program: &str) -> Self {
        self.unstartable.insert(program.to_string());
        self
    }

    /// The timeout handed to each call, in call order.
    pub fn timeouts(&self) -> Vec<Option<Duration>> {
        self.timeouts.borrow().clone()
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls().into_iter().map(|inv| inv.program).collect()
    }
}

impl ProcessRunner for FakeRunner {
    fn run(
        &self,
        invocation: &Invocation,
        log: &mut RunLog,
        timeout: Option<Duration>,
    ) -> Result<ProcessOutcome> {
        self.calls.borrow_mut().push(invocation.clone());
        self.timeouts.borrow_mut().push(timeout);

        if self.unstartable.contains(&invocation.program) {
            return Ok(ProcessOutcome::SpawnFailed(
                "No such file or directory (os error 2)".to_string(),
            ));
        }
        if self.timing_out.contains(&invocation.program) {
            log.write_output(format!("{} started\n", invocation.program).as_bytes())?;
            return Ok(ProcessOutcome::TimedOut(timeout.unwrap_or_default()));
        }

        log.write_output(format!("{} ran\n", invocation.program).as_bytes())?;

        let code = self.codes.get(&invocation.program).copied().unwrap_or(0);
        if code == 0 && invocation.program == GENERATOR {
            write_generator_output(invocation);
        }

        Ok(ProcessOutcome::Exited(ProcessExit { code }))
    }
}

fn write_generator_output(invocation: &Invocation) {
    let dir = invocation.working_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let input = arg_after(invocation, "-I").expect("generator gets -I");
    let name = Path::new(&input).file_name().unwrap().to_string_lossy().into_owned();
    fs::write(dir.join(format!("{}.annotload", name)), "MGI:1\tGO:0005737\n").unwrap();
    fs::write(dir.join(format!("{}.annotload.newgenes", name)), "clone-1\n").unwrap();
}

pub fn arg_after(invocation: &Invocation, flag: &str) -> Option<String> {
    let pos = invocation.args.iter().position(|a| a == flag)?;
    invocation.args.get(pos + 1).cloned()
}

/// A scratch workspace with an input file, an output directory and a
/// promote drop location.
pub struct Workspace {
    pub dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sample.txt"), "MGI:1\tGO:0005737\tIDA\n").unwrap();
        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn input(&self) -> PathBuf {
        self.path("sample.txt")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path("out")
    }

    pub fn log_file(&self) -> PathBuf {
        self.path("logs/annotload.log")
    }

    pub fn log(&self) -> String {
        fs::read_to_string(self.log_file()).unwrap()
    }

    pub fn config(&self, job: JobKind) -> LoadConfig {
        self.config_with(job, |_| {})
    }

    /// Relative values in `adjust` are anchored at the workspace directory.
    pub fn config_with(&self, job: JobKind, adjust: impl FnOnce(&mut Overrides)) -> LoadConfig {
        let file: FileConfig = serde_json::from_value(serde_json::json!({
            "schema_dir": "/mgi/schema",
            "tools": {"generator": GENERATOR},
            "reload": {"promote": {
                "program": PROMOTE,
                "input_file": self.path("prepub/newgenes").display().to_string(),
            }}
        }))
        .unwrap();

        let mut overrides = Overrides {
            server: Some("MGD_DEV".to_string()),
            database: Some("mgd".to_string()),
            input_file: Some(self.input().display().to_string()),
            mode: Some("new".to_string()),
            user: Some("mgd_dbo".to_string()),
            password_file: Some("/opt/pgdbutils/.pgpass".to_string()),
            annotation_type: Some("GO/Marker".to_string()),
            output_dir: Some(self.output_dir().display().to_string()),
            log_file: Some(self.log_file().display().to_string()),
            ..Default::default()
        };
        adjust(&mut overrides);

        LoadConfig::resolve_in(file.with_overrides(&overrides), job, self.dir.path()).unwrap()
    }
}
