pub mod app;
pub mod config;
pub mod effects;
pub mod logging;
pub mod ui;

use std::sync::Arc;

use auditor_engine::{EngineHandle, ReqwestStreamClient, ReqwestTaskApi};
use auditor_logging::{auditor_info, parse_level};
use log::LevelFilter;

use crate::cli::Cli;
use config::AuditorConfig;
use effects::EffectRunner;

pub fn run_app(cli: Cli) -> anyhow::Result<()> {
    let config = AuditorConfig::resolve(&cli)?;

    let level = parse_level(&config.log_level).unwrap_or(LevelFilter::Warn);
    logging::initialize(config.log_destination, level);
    auditor_info!(
        "auditor starting: stream={} api={}",
        config.stream_base_url,
        config.task_api_base_url
    );

    let stream = ReqwestStreamClient::new(config.stream_settings());
    let api = ReqwestTaskApi::new(config.api_settings())?;
    let engine = EngineHandle::new(Arc::new(stream), Arc::new(api))?;
    let runner = EffectRunner::new(engine, config.output_dir.clone());

    app::run(cli.command, &config, runner)
}
