//! Derived file locations and path normalization.
//!
//! The generator names its output after the input file's base name, so every
//! derived path is `<dir>/<basename(input)><suffix>`. External tools run with
//! their own working directory, so configured paths are made absolute first.

use std::path::{Component, Path, PathBuf};

use crate::defaults::{ANNOTATION_FILE_SUFFIX, CANDIDATE_FILE_SUFFIX};
use crate::error::{Error, Result};

fn base_name(input: &Path) -> Result<String> {
    input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Error::validation_invalid_argument(
                "input_file",
                format!("'{}' does not name a file", input.display()),
                None,
            )
        })
}

/// Loader-format file produced by the generator.
pub fn annotation_file(dir: &Path, input: &Path) -> Result<PathBuf> {
    Ok(dir.join(format!("{}{}", base_name(input)?, ANNOTATION_FILE_SUFFIX)))
}

/// Entities the generator could not resolve, input to the promote tool.
pub fn candidate_file(dir: &Path, input: &Path) -> Result<PathBuf> {
    Ok(dir.join(format!(
        "{}{}{}",
        base_name(input)?,
        ANNOTATION_FILE_SUFFIX,
        CANDIDATE_FILE_SUFFIX
    )))
}

/// Expand a leading `~` the way the operator's shell would.
pub fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// Expand `~`, then anchor a relative path at `base`.
pub fn absolute(path: &str, base: &Path) -> PathBuf {
    let expanded = expand(path);
    if expanded.is_absolute() {
        return expanded;
    }

    base.join(expanded)
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}
