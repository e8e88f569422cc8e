//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use csi_stream_core::{EngineConfig, SimulationConfig, StreamResult};

/// Where records come from at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Source {
    /// Built-in simulated generator.
    Simulate,
    /// An external transport connected over `/ws/ingest` or `POST /api/v1/ingest`.
    External,
}

#[derive(Parser, Debug)]
#[command(name = "csi-stream-server", about = "CSI stream normalization and live feature server")]
pub struct Args {
    /// HTTP port for the REST API and WebSocket streams
    #[arg(long, default_value = "8080")]
    pub http_port: u16,

    /// Engine configuration file (JSON)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Record source at startup
    #[arg(long, value_enum, default_value = "simulate")]
    pub source: Source,

    /// Simulated tick interval in milliseconds
    #[arg(long, default_value = "1000")]
    pub tick_ms: u64,

    /// Topic stamped on simulated records
    #[arg(long, default_value = "csi/simulated")]
    pub sim_topic: String,

    /// Subcarriers per simulated record
    #[arg(long, default_value = "64")]
    pub sim_subcarriers: usize,

    /// Rolling buffer capacity (overrides the config file)
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Initial topic subscription pattern (overrides the config file)
    #[arg(long)]
    pub topic_filter: Option<String>,
}

impl Args {
    /// Load the config file (or defaults), apply flag overrides, and validate.
    ///
    /// Failures surface as [`StreamError::Config`](csi_stream_core::StreamError::Config).
    pub fn engine_config(&self) -> StreamResult<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_json(path)?,
            None => EngineConfig::default(),
        };
        if let Some(capacity) = self.capacity {
            config.buffer_capacity = capacity;
        }
        if let Some(filter) = &self.topic_filter {
            config.default_topic_filter = filter.clone();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            topic: self.sim_topic.clone(),
            n_subcarriers: self.sim_subcarriers,
            tick: Duration::from_millis(self.tick_ms),
            ..SimulationConfig::default()
        }
    }
}
