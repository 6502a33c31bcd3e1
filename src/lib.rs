pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::ScenarioConfig;

pub use crate::adapters::LocalStorage;
pub use crate::core::{engine::ForecastEngine, pipeline::ForecastPipeline};
pub use crate::utils::error::{ForecastError, Result};
