mod cli;
mod platform;

use auditor_logging::auditor_error;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    platform::run_app(cli).inspect_err(|err| auditor_error!("auditor failed: {:#}", err))
}
