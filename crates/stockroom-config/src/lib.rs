#![allow(clippy::must_use_candidate)]

pub mod agent;
mod env;
pub mod images;
pub mod llm;
mod loader;
pub mod proxy;
pub mod telemetry;

use serde::Deserialize;

pub use agent::*;
pub use images::*;
pub use llm::*;
pub use proxy::*;
pub use telemetry::{ExportProtocol, ExporterConfig, TelemetryConfig};

/// Top-level Stockroom configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Payment proxy endpoint and credential
    pub proxy: ProxyConfig,
    /// Chat model configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Image provider configuration
    #[serde(default)]
    pub images: ImagesConfig,
    /// Assistant behavior
    #[serde(default)]
    pub agent: AgentConfig,
    /// Logging and trace export
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
