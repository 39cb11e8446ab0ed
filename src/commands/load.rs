use clap::Args;
use serde::Serialize;

use annotload::config::JobKind;
use annotload::job::{self, JobReport};
use annotload::process::SystemRunner;

use super::{CmdResult, JobArgs};

#[derive(Args)]
pub struct LoadArgs {
    #[command(flatten)]
    job: JobArgs,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum LoadOutput {
    #[serde(rename = "load.run")]
    Run { report: JobReport },
}

pub fn run(args: LoadArgs) -> CmdResult<LoadOutput> {
    let config = args.job.resolve(JobKind::Load, None)?;
    let report = job::run(JobKind::Load, &config, &SystemRunner::new())?;
    let exit_code = report.exit_code();
    Ok((LoadOutput::Run { report }, exit_code))
}
