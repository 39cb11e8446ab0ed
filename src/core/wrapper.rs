//! Single-call wrappers around the bulk loader.

use crate::config::LoadConfig;
use crate::error::Result;
use crate::pipeline::PipelineStep;
use crate::reload::{GENERATE_ANNOTATIONS, LOAD_ANNOTATIONS};
use crate::tools;

/// Load an input file that is already in loader format.
pub fn load_steps(config: &LoadConfig) -> Vec<PipelineStep> {
    vec![PipelineStep::run(
        LOAD_ANNOTATIONS,
        "Loading annotations",
        vec![tools::loader(config, &config.input_file)],
    )]
}

/// Convert a curator file with the generator, then load the derived file.
pub fn translate_steps(config: &LoadConfig) -> Result<Vec<PipelineStep>> {
    Ok(vec![
        PipelineStep::run(
            GENERATE_ANNOTATIONS,
            "Generating annotation file",
            vec![tools::generator(config)?],
        ),
        PipelineStep::run(
            LOAD_ANNOTATIONS,
            "Loading annotations",
            vec![tools::loader(config, &config.annotation_file()?)],
        )
        .needs(&[GENERATE_ANNOTATIONS]),
    ])
}
