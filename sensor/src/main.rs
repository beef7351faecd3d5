// Path and File Name : /home/sensor/home-sensor-core/sensor/src/main.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Main entrypoint for the Home Sensor Core sensor process - fail-closed lifecycle management

use std::process;

use sensor::config::SensorConfig;
use sensor::orchestrator::SensorOrchestrator;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    info!("home sensor core starting");

    let config = match SensorConfig::from_env_strict() {
        Ok(config) => config,
        Err(e) => {
            error!("configuration validation failed: {e}");
            error!("FAIL-CLOSED: sensor will not start with an invalid configuration");
            process::exit(1);
        }
    };

    let mut orchestrator = SensorOrchestrator::new(config);

    if let Err(e) = orchestrator.startup().await {
        error!("startup failed: {e}");
        error!("FAIL-CLOSED: sensor will not run with a partially initialized subsystem set");
        orchestrator.record_fatal_error(&format!("{e}")).await;
        process::exit(1);
    }

    match orchestrator.run_forever().await {
        Ok(_) => {
            info!("sensor exited successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("sensor error: {e}");
            orchestrator.record_fatal_error(&format!("{e}")).await;
            process::exit(1);
        }
    }
}
