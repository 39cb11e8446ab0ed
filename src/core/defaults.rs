use serde::{Deserialize, Serialize};

/// External programs invoked by the wrappers and the reload pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_loader")]
    pub loader: String,

    /// Spreadsheet-to-annotload translator. Required by `translate` and `reload`.
    #[serde(default)]
    pub generator: Option<String>,

    /// Generator argument templates; `-E <editor>` is appended when an editor is set.
    #[serde(default = "default_generator_args")]
    pub generator_args: Vec<String>,

    #[serde(default)]
    pub generator_output: GeneratorOutput,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            loader: default_loader(),
            generator: None,
            generator_args: default_generator_args(),
            generator_output: GeneratorOutput::default(),
        }
    }
}

/// Where the generator leaves `<basename>.annotload` and its candidate file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorOutput {
    /// The generator writes into its working directory, which is the output directory.
    #[default]
    OutputDir,
    /// The generator writes next to the input file.
    InputDir,
}

/// Settings only the reload pipeline needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ReloadConfig {
    pub promote: PromoteConfig,

    #[serde(default = "default_tables")]
    pub tables: Vec<String>,

    /// Explicit script lists replace the ones derived from the schema
    /// directory and `tables`.
    #[serde(default)]
    pub truncate: Option<Vec<String>>,

    #[serde(default)]
    pub drop_indexes: Option<Vec<String>>,

    #[serde(default)]
    pub create_indexes: Option<Vec<String>>,
}

/// The "promote and broadcast" tool that turns candidates into permanent records.
#[derive(Debug, Clone, Deserialize)]
pub struct PromoteConfig {
    pub program: String,

    /// Argument templates; see `crate::utils::template::TemplateVars`.
    #[serde(default = "default_promote_args")]
    pub args: Vec<String>,

    /// Where the promote tool expects its input.
    pub input_file: String,
}

// =============================================================================
// Default value functions
// =============================================================================

pub const DEFAULT_DELETE_REFERENCE: &str = "J:0";

pub const DEFAULT_LOG_FILE_NAME: &str = "annotload.log";

pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// Derived file suffixes, appended to the input file's base name.
pub const ANNOTATION_FILE_SUFFIX: &str = ".annotload";
pub const CANDIDATE_FILE_SUFFIX: &str = ".newgenes";

pub fn default_loader() -> String {
    "annotload.py".to_string()
}

pub fn default_generator_args() -> Vec<String> {
    vec![
        "-S".to_string(),
        "{{server}}".to_string(),
        "-D".to_string(),
        "{{database}}".to_string(),
        "-U".to_string(),
        "{{user}}".to_string(),
        "-P".to_string(),
        "{{password_file}}".to_string(),
        "-I".to_string(),
        "{{input_file}}".to_string(),
    ]
}

pub fn default_tables() -> Vec<String> {
    vec!["VOC_Annot".to_string(), "VOC_Evidence".to_string()]
}

pub fn default_promote_args() -> Vec<String> {
    vec![
        "-S".to_string(),
        "{{server}}".to_string(),
        "-D".to_string(),
        "{{database}}".to_string(),
        "-U".to_string(),
        "{{user}}".to_string(),
        "-P".to_string(),
        "{{password_file}}".to_string(),
        "-I".to_string(),
        "{{candidate_file}}".to_string(),
    ]
}

pub fn truncate_script(schema_dir: &str, table: &str) -> String {
    format!("{}/table/{}_truncate.object", schema_dir, table)
}

pub fn drop_index_script(schema_dir: &str, table: &str) -> String {
    format!("{}/index/{}_drop.object", schema_dir, table)
}

pub fn create_index_script(schema_dir: &str, table: &str) -> String {
    format!("{}/index/{}_create.object", schema_dir, table)
}
