pub mod json_backend;

use std::path::Path;

use crate::{errors::Result, simulation::TimeBasedModel};

/// Loads a model from an external location.
pub trait ModelReader {
    fn read_model(&self, path: &Path) -> Result<TimeBasedModel>;
}

/// Persists a model to an external location.
pub trait ModelWriter {
    fn write_model(&self, model: &TimeBasedModel, path: &Path) -> Result<()>;
}

pub use json_backend::{JsonStorage, MODEL_SCHEMA_VERSION};
