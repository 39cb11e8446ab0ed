use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Exit code for a step that failed without a process exit code of its own
/// (timeout, spawn failure, staging copy).
pub const NO_PROCESS_EXIT_CODE: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingKey,
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationInvalidArgument,

    InputUnreadable,

    PipelineStepFailed,
    PipelineStepTimeout,
    PipelineStepSpawnFailed,
    PipelineStepCopyFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingKey => "config.missing_key",
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::InputUnreadable => "input.unreadable",

            ErrorCode::PipelineStepFailed => "pipeline.step_failed",
            ErrorCode::PipelineStepTimeout => "pipeline.step_timeout",
            ErrorCode::PipelineStepSpawnFailed => "pipeline.step_spawn_failed",
            ErrorCode::PipelineStepCopyFailed => "pipeline.step_copy_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingKeyDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputUnreadableDetails {
    pub path: String,
    pub error: String,
}

/// Details attached to every `pipeline.*` error.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepFailureDetails {
    pub step: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            to_details(InvalidArgumentDetails {
                field: field.into(),
                problem: problem.into(),
                tried,
            }),
        )
    }

    pub fn config_missing_key(key: impl Into<String>, path: Option<String>) -> Self {
        let key = key.into();
        Self::new(
            ErrorCode::ConfigMissingKey,
            format!("Missing required configuration key '{}'", key),
            to_details(ConfigMissingKeyDetails { key, path }),
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            to_details(ConfigInvalidJsonDetails {
                path: path.into(),
                error: err.to_string(),
            }),
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            to_details(ConfigInvalidValueDetails {
                key: key.into(),
                value,
                problem: problem.into(),
            }),
        )
    }

    pub fn input_unreadable(path: impl Into<String>, error: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::InputUnreadable,
            format!("Cannot read input file {}", path),
            to_details(InputUnreadableDetails {
                path,
                error: error.into(),
            }),
        )
        .with_hint("Check that the input file exists and is readable by this user")
    }

    pub fn step_failed(step: impl Into<String>, command: impl Into<String>, exit_code: i32) -> Self {
        let step = step.into();
        Self::new(
            ErrorCode::PipelineStepFailed,
            format!("Step '{}' exited with status {}", step, exit_code),
            to_details(StepFailureDetails {
                step,
                command: command.into(),
                exit_code: Some(exit_code),
                timeout_secs: None,
                error: None,
            }),
        )
    }

    pub fn step_timeout(step: impl Into<String>, command: impl Into<String>, timeout_secs: u64) -> Self {
        let step = step.into();
        Self::new(
            ErrorCode::PipelineStepTimeout,
            format!("Step '{}' timed out after {}s", step, timeout_secs),
            to_details(StepFailureDetails {
                step,
                command: command.into(),
                exit_code: None,
                timeout_secs: Some(timeout_secs),
                error: None,
            }),
        )
        .with_hint("Raise --timeout or step_timeout_secs if the load is expected to run longer")
    }

    pub fn step_spawn_failed(
        step: impl Into<String>,
        command: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let step = step.into();
        Self::new(
            ErrorCode::PipelineStepSpawnFailed,
            format!("Step '{}' could not be started", step),
            to_details(StepFailureDetails {
                step,
                command: command.into(),
                exit_code: None,
                timeout_secs: None,
                error: Some(error.into()),
            }),
        )
    }

    pub fn step_copy_failed(
        step: impl Into<String>,
        command: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let step = step.into();
        Self::new(
            ErrorCode::PipelineStepCopyFailed,
            format!("Step '{}' could not copy its file", step),
            to_details(StepFailureDetails {
                step,
                command: command.into(),
                exit_code: None,
                timeout_secs: None,
                error: Some(error.into()),
            }),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalIoError,
            "IO error",
            to_details(InternalIoErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            serde_json::json!({ "error": error.into(), "context": context }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    /// Exit code the tool reports for this error.
    ///
    /// Step failures keep the failing process's own code.
    pub fn exit_code(&self) -> i32 {
        match self.code {
            ErrorCode::InputUnreadable => 1,

            ErrorCode::ConfigMissingKey
            | ErrorCode::ConfigInvalidJson
            | ErrorCode::ConfigInvalidValue
            | ErrorCode::ValidationInvalidArgument => 2,

            ErrorCode::PipelineStepFailed => self
                .details
                .get("exitCode")
                .and_then(Value::as_i64)
                .map(|code| code as i32)
                .unwrap_or(1),

            ErrorCode::PipelineStepTimeout
            | ErrorCode::PipelineStepSpawnFailed
            | ErrorCode::PipelineStepCopyFailed => NO_PROCESS_EXIT_CODE,

            ErrorCode::InternalIoError
            | ErrorCode::InternalJsonError
            | ErrorCode::InternalUnexpected => 1,
        }
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
