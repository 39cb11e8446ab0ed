use clap::{Parser, Subcommand};

mod commands;
mod output;
mod tty;

use commands::{load, plan, reload, translate};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "annotload")]
#[command(version = VERSION)]
#[command(about = "Run annotation bulk loads and the annotation reload pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a file that is already in loader format
    Load(load::LoadArgs),
    /// Convert a curator file with the generator, then load it
    Translate(translate::TranslateArgs),
    /// Run the full reload pipeline
    Reload(reload::ReloadArgs),
    /// Show the reload steps and their commands without running them
    Plan(plan::PlanArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let (json_result, exit_code) = commands::run_json(cli.command);

    if output::print_json_result(json_result).is_err() {
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
