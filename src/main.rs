mod agent;
mod clock;
mod config;
mod display;
mod remote;
mod scheduler;
mod sensor;
mod upload;

#[cfg(test)]
mod mocks;

use agent::{Agent, CycleHolds};
use anyhow::Result;
use clock::{Clock, SystemClock};
use config::{AgentConfig, HardwareMode, HardwareSettings, CONFIG_ENV};
use display::{DisplayFeedback, FramebufferMatrix, LedMatrix, LoggingMatrix};
use remote::{DataApi, FmsClient, RemoteSession};
use scheduler::Scheduler;
use sensor::{
    EnvironmentSensors, HostIdentity, IioSensors, ProcIdentity, SensorReader, SimulatedIdentity,
    SimulatedSensors,
};
use std::sync::Arc;
use upload::RecordUploader;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config_path = config::resolve_path(std::env::args().nth(1), std::env::var(CONFIG_ENV).ok());
    let config = AgentConfig::load(&config_path)?;

    info!("Sense HAT agent starting");
    info!("  Config: {}", config_path.display());
    info!(
        "  Server: {} (file {}, layout {})",
        config.server.fm_server_address, config.server.fm_file, config.server.fm_layout
    );
    info!("  Period: {:?}", config.agent.tick_interval());
    info!("  Hardware: {:?}", config.hardware.mode);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let api = FmsClient::new(config.server.clone(), &config.agent)?
        .with_reload_path(config_path.clone());
    info!("Data API endpoint: {}", api.endpoint());
    let session = RemoteSession::new(Box::new(api), config.agent.token_max_age(), clock.clone());

    let (sensors, identity) = build_sensors(&config.hardware);
    let matrix = build_matrix(&config.hardware).await;
    info!("LED matrix: {}", matrix.name());

    let mut agent = Agent::new(
        session,
        SensorReader::new(sensors, identity),
        RecordUploader::new(config.agent.script_name.clone()),
        DisplayFeedback::new(matrix),
        clock,
        CycleHolds::from(&config.agent),
    );
    agent.reset_display().await;

    let handle = Scheduler::new(agent, config.agent.tick_interval()).start();

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
    }
    info!("Shutdown requested");

    let stats = handle.stop().await;
    info!("Sense HAT agent stopped ({} cycles run)", stats.started);
    Ok(())
}

fn build_sensors(
    hardware: &HardwareSettings,
) -> (Box<dyn EnvironmentSensors>, Box<dyn HostIdentity>) {
    match hardware.mode {
        HardwareMode::SenseHat => (
            Box::new(IioSensors::new(hardware.iio_root.clone())),
            Box::new(ProcIdentity::new(
                hardware.cpuinfo_path.clone(),
                hardware.device_tree_model_path.clone(),
            )),
        ),
        HardwareMode::Simulation => (
            Box::new(SimulatedSensors::new()),
            Box::new(SimulatedIdentity),
        ),
    }
}

/// A missing matrix only costs the visual feedback
async fn build_matrix(hardware: &HardwareSettings) -> Box<dyn LedMatrix> {
    if hardware.mode == HardwareMode::Simulation {
        return Box::new(LoggingMatrix::new());
    }

    if let Some(device) = &hardware.framebuffer {
        return Box::new(FramebufferMatrix::new(device.clone()));
    }

    match FramebufferMatrix::discover(&hardware.graphics_root).await {
        Ok(matrix) => Box::new(matrix),
        Err(e) => {
            warn!("LED matrix unavailable, logging frames instead: {:#}", e);
            Box::new(LoggingMatrix::new())
        }
    }
}
