//! Spinning cube / black hole demo

use std::path::Path;

use blackhole::core::{EngineConfig, run};

const CONFIG_FILE: &str = "blackhole.ron";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = if Path::new(CONFIG_FILE).exists() {
        log::info!("Loading {CONFIG_FILE}");
        EngineConfig::load(CONFIG_FILE)?
    } else {
        EngineConfig::default()
    };

    run(config)?;
    Ok(())
}
