use clap::Args;
use serde::Serialize;

use annotload::config::JobKind;
use annotload::job::{self, JobReport};
use annotload::process::SystemRunner;

use super::{CmdResult, JobArgs};

#[derive(Args)]
pub struct ReloadArgs {
    #[command(flatten)]
    job: JobArgs,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum ReloadOutput {
    #[serde(rename = "reload.run")]
    Run { report: JobReport },
}

pub fn run(args: ReloadArgs) -> CmdResult<ReloadOutput> {
    let config = args.job.resolve(JobKind::Reload, None)?;
    annotload::log_status!(
        "reload",
        "Reloading {} annotations into {}.{}",
        config.annotation_type,
        config.connection.server,
        config.connection.database
    );
    let report = job::run(JobKind::Reload, &config, &SystemRunner::new())?;
    let exit_code = report.exit_code();
    Ok((ReloadOutput::Run { report }, exit_code))
}
