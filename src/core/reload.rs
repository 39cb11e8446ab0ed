//! The seven-stage reload pipeline.
//!
//! generate candidates → stage candidates → promote → prepare schema →
//! generate annotations → load → recreate indexes.

use crate::config::LoadConfig;
use crate::error::Result;
use crate::pipeline::PipelineStep;
use crate::tools;

pub const GENERATE_CANDIDATES: &str = "generate_candidates";
pub const STAGE_CANDIDATES: &str = "stage_candidates";
pub const PROMOTE: &str = "promote";
pub const PREPARE_SCHEMA: &str = "prepare_schema";
pub const GENERATE_ANNOTATIONS: &str = "generate_annotations";
pub const LOAD_ANNOTATIONS: &str = "load_annotations";
pub const RECREATE_INDEXES: &str = "recreate_indexes";

/// Stage ids in execution order.
pub const STAGES: [&str; 7] = [
    GENERATE_CANDIDATES,
    STAGE_CANDIDATES,
    PROMOTE,
    PREPARE_SCHEMA,
    GENERATE_ANNOTATIONS,
    LOAD_ANNOTATIONS,
    RECREATE_INDEXES,
];

pub fn steps(config: &LoadConfig) -> Result<Vec<PipelineStep>> {
    let settings = config.reload_settings()?;
    let generator = tools::generator(config)?;

    let prepare = settings
        .truncate
        .iter()
        .chain(settings.drop_indexes.iter())
        .map(|script| tools::schema_script(config, script))
        .collect();

    let recreate = settings
        .create_indexes
        .iter()
        .map(|script| tools::schema_script(config, script))
        .collect();

    Ok(vec![
        PipelineStep::run(
            GENERATE_CANDIDATES,
            "Generating new-entity candidates",
            vec![generator.clone()],
        ),
        PipelineStep::copy(
            STAGE_CANDIDATES,
            "Staging candidate file for promotion",
            config.candidate_file()?,
            settings.promote_input.clone(),
        )
        .needs(&[GENERATE_CANDIDATES]),
        PipelineStep::run(
            PROMOTE,
            "Promoting and broadcasting new entities",
            vec![tools::promote(config, settings)],
        )
        .needs(&[STAGE_CANDIDATES]),
        PipelineStep::run(
            PREPARE_SCHEMA,
            "Truncating tables and dropping indexes",
            prepare,
        )
        .needs(&[PROMOTE]),
        PipelineStep::run(
            GENERATE_ANNOTATIONS,
            "Generating annotation file",
            vec![generator],
        )
        .needs(&[PROMOTE]),
        PipelineStep::run(
            LOAD_ANNOTATIONS,
            "Loading annotations",
            vec![tools::loader(config, &config.annotation_file()?)],
        )
        .needs(&[GENERATE_ANNOTATIONS]),
        PipelineStep::run(
            RECREATE_INDEXES,
            "Recreating indexes",
            recreate,
        )
        .needs(&[PREPARE_SCHEMA]),
    ])
}
