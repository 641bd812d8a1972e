use anyhow::Result;
use shapeburst_engine::device::GpuInit;
use shapeburst_engine::frame::SceneConfig;
use shapeburst_engine::logging::{init_logging, LoggingConfig};
use shapeburst_engine::window::{Runtime, RuntimeConfig};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "Movement and Color".to_string(),
        ..RuntimeConfig::default()
    };

    log::info!("starting shapeburst demo");
    Runtime::run(config, GpuInit::default(), SceneConfig::default())
}
