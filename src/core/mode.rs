use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Processing mode handed to the bulk loader via `-M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Delete annotations for the delete-reference, then load.
    New,
    /// Add annotations without deleting anything.
    Append,
    /// Verify every record but write nothing.
    Preview,
}

impl LoadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadMode::New => "new",
            LoadMode::Append => "append",
            LoadMode::Preview => "preview",
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "new" => Ok(LoadMode::New),
            "append" => Ok(LoadMode::Append),
            "preview" => Ok(LoadMode::Preview),
            other => Err(Error::config_invalid_value(
                "mode",
                Some(other.to_string()),
                "Expected one of: new, append, preview",
            )),
        }
    }
}

/// How the step executor reacts to a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineMode {
    /// Abort on the first failure; every later step is skipped.
    #[default]
    Strict,
    /// Keep going, skipping only steps whose prerequisites did not succeed.
    BestEffort,
}

impl PipelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::Strict => "strict",
            PipelineMode::BestEffort => "best-effort",
        }
    }
}
