pub mod builder;
pub mod cloner;
pub mod engine;
pub mod fratar;
pub mod graph;
pub mod integerizer;
pub mod merger;
pub mod pipeline;
pub mod projector;
pub mod pruner;
pub mod vfr;

pub use crate::domain::model::{ForecastInputs, ForecastOutcome};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
