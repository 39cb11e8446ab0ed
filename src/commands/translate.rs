use clap::Args;
use serde::Serialize;

use annotload::config::JobKind;
use annotload::job::{self, JobReport};
use annotload::process::SystemRunner;

use super::{CmdResult, JobArgs};

#[derive(Args)]
pub struct TranslateArgs {
    #[command(flatten)]
    job: JobArgs,

    /// Curator login recorded as the annotation editor
    editor: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum TranslateOutput {
    #[serde(rename = "translate.run")]
    Run { report: JobReport },
}

pub fn run(args: TranslateArgs) -> CmdResult<TranslateOutput> {
    let config = args.job.resolve(JobKind::Translate, args.editor)?;
    let report = job::run(JobKind::Translate, &config, &SystemRunner::new())?;
    let exit_code = report.exit_code();
    Ok((TranslateOutput::Run { report }, exit_code))
}
