//! Configuration loading and resolution.
//!
//! Values are layered, lowest precedence first: built-in defaults, the JSON
//! config file, `ANNOTLOAD_*` environment variables, then command-line values.
//! The layered `FileConfig` is resolved once into an immutable `LoadConfig`;
//! every required value is checked at that point, and every configured path
//! is made absolute against the directory the command was started from.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::defaults::{
    self, GeneratorOutput, ReloadConfig, ToolsConfig, DEFAULT_DELETE_REFERENCE,
    DEFAULT_LOG_FILE_NAME, DEFAULT_OUTPUT_DIR,
};
use crate::error::{Error, Result};
use crate::mode::{LoadMode, PipelineMode};
use crate::paths;

pub const ENV_USER: &str = "ANNOTLOAD_DBUSER";
pub const ENV_PASSWORD_FILE: &str = "ANNOTLOAD_DBPASSWORDFILE";
pub const ENV_ANNOTATION_TYPE: &str = "ANNOTLOAD_ANNOTTYPE";
pub const ENV_DELETE_REFERENCE: &str = "ANNOTLOAD_DELETEREF";
pub const ENV_SCHEMA_DIR: &str = "ANNOTLOAD_SCHEMADIR";
pub const ENV_LOG_FILE: &str = "ANNOTLOAD_LOGFILE";
pub const ENV_OUTPUT_DIR: &str = "ANNOTLOAD_OUTPUTDIR";

/// Which entry point is being configured; decides the required keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Load,
    Translate,
    Reload,
}

/// Raw, layered configuration. Every field is optional until resolution.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: Option<String>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password_file: Option<String>,
    pub input_file: Option<String>,
    pub mode: Option<String>,
    pub annotation_type: Option<String>,
    pub delete_reference: Option<String>,
    pub load_obsolete: Option<bool>,
    pub editor: Option<String>,
    pub log_file: Option<String>,
    pub output_dir: Option<String>,
    pub schema_dir: Option<String>,
    pub step_timeout_secs: Option<u64>,
    pub pipeline_mode: Option<PipelineMode>,
    pub tools: ToolsConfig,
    pub reload: Option<ReloadConfig>,

    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Values supplied on the command line. `None`/`false` leave lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server: Option<String>,
    pub database: Option<String>,
    pub input_file: Option<String>,
    pub mode: Option<String>,
    pub editor: Option<String>,
    pub user: Option<String>,
    pub password_file: Option<String>,
    pub annotation_type: Option<String>,
    pub delete_reference: Option<String>,
    pub load_obsolete: bool,
    pub log_file: Option<String>,
    pub output_dir: Option<String>,
    pub step_timeout_secs: Option<u64>,
    pub best_effort: bool,
}

impl FileConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
        })?;

        let mut config: FileConfig = serde_json::from_str(&content)
            .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Layer environment values over the file values.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        override_with(&mut self.user, non_empty(ENV_USER));
        override_with(&mut self.password_file, non_empty(ENV_PASSWORD_FILE));
        override_with(&mut self.annotation_type, non_empty(ENV_ANNOTATION_TYPE));
        override_with(&mut self.delete_reference, non_empty(ENV_DELETE_REFERENCE));
        override_with(&mut self.schema_dir, non_empty(ENV_SCHEMA_DIR));
        override_with(&mut self.log_file, non_empty(ENV_LOG_FILE));
        override_with(&mut self.output_dir, non_empty(ENV_OUTPUT_DIR));
        self
    }

    /// Layer command-line values over everything else.
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        override_with(&mut self.server, overrides.server.clone());
        override_with(&mut self.database, overrides.database.clone());
        override_with(&mut self.input_file, overrides.input_file.clone());
        override_with(&mut self.mode, overrides.mode.clone());
        override_with(&mut self.editor, overrides.editor.clone());
        override_with(&mut self.user, overrides.user.clone());
        override_with(&mut self.password_file, overrides.password_file.clone());
        override_with(&mut self.annotation_type, overrides.annotation_type.clone());
        override_with(&mut self.delete_reference, overrides.delete_reference.clone());
        override_with(&mut self.log_file, overrides.log_file.clone());
        override_with(&mut self.output_dir, overrides.output_dir.clone());
        override_with(&mut self.step_timeout_secs, overrides.step_timeout_secs);

        if overrides.load_obsolete {
            self.load_obsolete = Some(true);
        }
        if overrides.best_effort {
            self.pipeline_mode = Some(PipelineMode::BestEffort);
        }
        self
    }

    fn source_display(&self) -> Option<String> {
        self.source.as_ref().map(|p| p.display().to_string())
    }
}

fn override_with<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Database connection parameters passed to every external program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub server: String,
    pub database: String,
    pub user: String,
    pub password_file: PathBuf,
}

/// Schema scripts and promote tool for the reload pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadSettings {
    pub promote_program: String,
    pub promote_args: Vec<String>,
    pub promote_input: PathBuf,
    pub truncate: Vec<String>,
    pub drop_indexes: Vec<String>,
    pub create_indexes: Vec<String>,
}

/// Fully resolved, validated configuration for one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct LoadConfig {
    pub connection: Connection,
    pub input_file: PathBuf,
    pub mode: LoadMode,
    pub annotation_type: String,
    pub delete_reference: String,
    pub load_obsolete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
    pub log_file: PathBuf,
    pub output_dir: PathBuf,
    pub loader: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    pub generator_args: Vec<String>,
    pub generator_output: GeneratorOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_timeout_secs: Option<u64>,
    pub pipeline_mode: PipelineMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reload: Option<ReloadSettings>,
}

impl LoadConfig {
    /// Resolve and validate the layered configuration for `job`, anchoring
    /// relative paths at the current directory.
    pub fn resolve(file: FileConfig, job: JobKind) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| {
            Error::internal_io(e.to_string(), Some("read current directory".to_string()))
        })?;
        Self::resolve_in(file, job, &cwd)
    }

    /// Resolve against an explicit base directory for relative paths.
    pub fn resolve_in(file: FileConfig, job: JobKind, base: &Path) -> Result<Self> {
        let source = file.source_display();
        let required = |value: Option<String>, key: &str| -> Result<String> {
            match value {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => Err(Error::config_missing_key(key, source.clone())),
            }
        };

        let connection = Connection {
            server: required(file.server.clone(), "server")?,
            database: required(file.database.clone(), "database")?,
            user: required(file.user.clone(), "user")?,
            password_file: paths::absolute(
                &required(file.password_file.clone(), "password_file")?,
                base,
            ),
        };

        let input_file = paths::absolute(&required(file.input_file.clone(), "input_file")?, base);
        let mode: LoadMode = required(file.mode.clone(), "mode")?.parse()?;
        let annotation_type = required(file.annotation_type.clone(), "annotation_type")?;

        let delete_reference = file
            .delete_reference
            .clone()
            .unwrap_or_else(|| DEFAULT_DELETE_REFERENCE.to_string());
        validate_reference(&delete_reference)?;

        let output_dir =
            paths::absolute(file.output_dir.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR), base);
        let log_file = match file.log_file.as_deref() {
            Some(path) => paths::absolute(path, base),
            None => output_dir.join(DEFAULT_LOG_FILE_NAME),
        };

        let generator = match job {
            JobKind::Load => file.tools.generator.clone(),
            JobKind::Translate | JobKind::Reload => {
                Some(required(file.tools.generator.clone(), "tools.generator")?)
            }
        }
        .map(|program| program_path(&program, base));

        let reload = match job {
            JobKind::Reload => Some(resolve_reload(&file, source.clone(), base)?),
            JobKind::Load | JobKind::Translate => None,
        };

        Ok(LoadConfig {
            connection,
            input_file,
            mode,
            annotation_type,
            delete_reference,
            load_obsolete: file.load_obsolete.unwrap_or(false),
            editor: file.editor.clone().filter(|e| !e.trim().is_empty()),
            log_file,
            output_dir,
            loader: program_path(&file.tools.loader, base),
            generator,
            generator_args: file.tools.generator_args.clone(),
            generator_output: file.tools.generator_output,
            step_timeout_secs: file.step_timeout_secs.filter(|secs| *secs > 0),
            pipeline_mode: file.pipeline_mode.unwrap_or_default(),
            reload,
        })
    }

    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_secs.map(Duration::from_secs)
    }

    /// Directory the generator writes its derived files into.
    pub fn derived_dir(&self) -> &Path {
        match self.generator_output {
            GeneratorOutput::OutputDir => &self.output_dir,
            GeneratorOutput::InputDir => self.input_file.parent().unwrap_or(&self.output_dir),
        }
    }

    pub fn annotation_file(&self) -> Result<PathBuf> {
        paths::annotation_file(self.derived_dir(), &self.input_file)
    }

    pub fn candidate_file(&self) -> Result<PathBuf> {
        paths::candidate_file(self.derived_dir(), &self.input_file)
    }

    /// Reload settings; only present when resolved for `JobKind::Reload`.
    pub fn reload_settings(&self) -> Result<&ReloadSettings> {
        self.reload
            .as_ref()
            .ok_or_else(|| Error::config_missing_key("reload", None))
    }
}

/// Program names without a directory are left for `PATH` lookup.
fn program_path(program: &str, base: &Path) -> String {
    if program.contains('/') || program.starts_with('~') {
        paths::absolute(program, base).display().to_string()
    } else {
        program.to_string()
    }
}

fn validate_reference(reference: &str) -> Result<()> {
    let pattern = Regex::new(r"^J:\d+$").map_err(|e| Error::internal_unexpected(e.to_string()))?;
    if pattern.is_match(reference) {
        Ok(())
    } else {
        Err(Error::config_invalid_value(
            "delete_reference",
            Some(reference.to_string()),
            "Expected a J: number such as J:0 or J:65060",
        ))
    }
}

fn resolve_reload(file: &FileConfig, source: Option<String>, base: &Path) -> Result<ReloadSettings> {
    let reload = file
        .reload
        .as_ref()
        .ok_or_else(|| Error::config_missing_key("reload", source.clone()))?;

    if reload.promote.program.trim().is_empty() {
        return Err(Error::config_missing_key("reload.promote.program", source));
    }
    if reload.promote.input_file.trim().is_empty() {
        return Err(Error::config_missing_key("reload.promote.input_file", source));
    }

    let schema_dir = file.schema_dir.as_deref().map(|dir| {
        paths::absolute(dir, base)
            .display()
            .to_string()
            .trim_end_matches('/')
            .to_string()
    });

    Ok(ReloadSettings {
        promote_program: program_path(&reload.promote.program, base),
        promote_args: reload.promote.args.clone(),
        promote_input: paths::absolute(&reload.promote.input_file, base),
        truncate: schema_scripts(
            &reload.truncate,
            schema_dir.as_deref(),
            &reload.tables,
            defaults::truncate_script,
            &source,
            base,
        )?,
        drop_indexes: schema_scripts(
            &reload.drop_indexes,
            schema_dir.as_deref(),
            &reload.tables,
            defaults::drop_index_script,
            &source,
            base,
        )?,
        create_indexes: schema_scripts(
            &reload.create_indexes,
            schema_dir.as_deref(),
            &reload.tables,
            defaults::create_index_script,
            &source,
            base,
        )?,
    })
}

fn schema_scripts(
    explicit: &Option<Vec<String>>,
    schema_dir: Option<&str>,
    tables: &[String],
    derive: fn(&str, &str) -> String,
    source: &Option<String>,
    base: &Path,
) -> Result<Vec<String>> {
    if let Some(list) = explicit {
        return Ok(list.iter().map(|script| program_path(script, base)).collect());
    }

    let dir = schema_dir.ok_or_else(|| Error::config_missing_key("schema_dir", source.clone()))?;
    Ok(tables.iter().map(|table| derive(dir, table)).collect())
}
