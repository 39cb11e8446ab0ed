use clap::Args;
use serde::Serialize;

use annotload::config::{JobKind, LoadConfig};
use annotload::job;
use annotload::pipeline::PipelinePlan;

use super::{CmdResult, JobArgs};

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    job: JobArgs,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum PlanOutput {
    #[serde(rename = "reload.plan")]
    Plan {
        plan: PipelinePlan,
        config: LoadConfig,
    },
}

pub fn run(args: PlanArgs) -> CmdResult<PlanOutput> {
    let config = args.job.resolve(JobKind::Reload, None)?;
    let plan = job::plan(JobKind::Reload, &config)?;
    Ok((PlanOutput::Plan { plan, config }, 0))
}
