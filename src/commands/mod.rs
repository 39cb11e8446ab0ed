use std::path::PathBuf;

use clap::Args;

use annotload::config::{FileConfig, JobKind, LoadConfig, Overrides};

pub type CmdResult<T> = annotload::Result<(T, i32)>;

/// Positionals and flags shared by every job command.
#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Database server name
    pub server: String,
    /// Database name
    pub database: String,
    /// Input file
    pub input: String,
    /// Load mode: new, append or preview
    pub mode: String,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Database user
    #[arg(long)]
    pub user: Option<String>,

    /// File holding the database password
    #[arg(long, value_name = "FILE")]
    pub password_file: Option<String>,

    /// Annotation type label passed to the loader
    #[arg(long, value_name = "LABEL")]
    pub annotation_type: Option<String>,

    /// Reference whose existing annotations are replaced (J:<n>)
    #[arg(long, value_name = "J:N")]
    pub delete_reference: Option<String>,

    /// Also load annotations to obsolete terms
    #[arg(long)]
    pub load_obsolete: bool,

    /// Log file (truncated at the start of each run)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<String>,

    /// Working directory for generated files
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<String>,

    /// Per-step timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Keep running independent steps after a failure
    #[arg(long)]
    pub best_effort: bool,
}

impl JobArgs {
    fn overrides(&self, editor: Option<String>) -> Overrides {
        Overrides {
            server: Some(self.server.clone()),
            database: Some(self.database.clone()),
            input_file: Some(self.input.clone()),
            mode: Some(self.mode.clone()),
            editor,
            user: self.user.clone(),
            password_file: self.password_file.clone(),
            annotation_type: self.annotation_type.clone(),
            delete_reference: self.delete_reference.clone(),
            load_obsolete: self.load_obsolete,
            log_file: self.log_file.clone(),
            output_dir: self.output_dir.clone(),
            step_timeout_secs: self.timeout,
            best_effort: self.best_effort,
        }
    }

    /// Layer file, environment and command line, then validate for `job`.
    pub fn resolve(&self, job: JobKind, editor: Option<String>) -> annotload::Result<LoadConfig> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let layered = file
            .with_env(|key| std::env::var(key).ok())
            .with_overrides(&self.overrides(editor));

        LoadConfig::resolve(layered, job)
    }
}

pub mod load;
pub mod plan;
pub mod reload;
pub mod translate;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args))
    };
}

pub(crate) fn run_json(command: crate::Commands) -> (annotload::Result<serde_json::Value>, i32) {
    crate::tty::status("annotload is working...");

    match command {
        crate::Commands::Load(args) => dispatch!(args, load),
        crate::Commands::Translate(args) => dispatch!(args, translate),
        crate::Commands::Reload(args) => dispatch!(args, reload),
        crate::Commands::Plan(args) => dispatch!(args, plan),
    }
}
