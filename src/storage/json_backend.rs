use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::{
    errors::{ModelError, Result},
    simulation::TimeBasedModel,
    utils::persistence::{app_data_dir, canonical_name, ensure_dir, models_dir_in, write_atomic},
};

use super::{ModelReader, ModelWriter};

const MODEL_EXTENSION: &str = "json";

pub const MODEL_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct ModelEnvelope<'a> {
    schema_version: u32,
    model: &'a TimeBasedModel,
}

#[derive(Deserialize)]
struct StoredEnvelope {
    schema_version: u32,
    model: Value,
}

/// JSON files wrapped in a `{ schema_version, model }` envelope.
///
/// Path-based access goes through [`ModelReader`] / [`ModelWriter`]; the
/// named helpers manage a `models/` directory under the application root.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    models_dir: PathBuf,
}

impl JsonStorage {
    pub fn new(root: Option<PathBuf>) -> Result<Self> {
        let root = root.unwrap_or_else(app_data_dir);
        let models_dir = models_dir_in(&root);
        ensure_dir(&models_dir)?;
        Ok(Self { models_dir })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None)
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn model_path(&self, name: &str) -> PathBuf {
        self.models_dir
            .join(format!("{}.{}", canonical_name(name), MODEL_EXTENSION))
    }

    pub fn save(&self, model: &TimeBasedModel) -> Result<PathBuf> {
        let path = self.model_path(model.name());
        self.write_model(model, &path)?;
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<TimeBasedModel> {
        let path = self.model_path(name);
        if !path.exists() {
            return Err(ModelError::Persistence(format!("model `{}` not found", name)));
        }
        self.read_model(&path)
    }

    /// Stems of the stored model files, sorted.
    pub fn list_models(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.models_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(MODEL_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl ModelWriter for JsonStorage {
    fn write_model(&self, model: &TimeBasedModel, path: &Path) -> Result<()> {
        let envelope = ModelEnvelope {
            schema_version: MODEL_SCHEMA_VERSION,
            model,
        };
        let json = serde_json::to_string_pretty(&envelope)?;
        write_atomic(path, &json)?;
        info!(model = %model.name(), path = %path.display(), "model saved");
        Ok(())
    }
}

impl ModelReader for JsonStorage {
    fn read_model(&self, path: &Path) -> Result<TimeBasedModel> {
        let data = fs::read_to_string(path)?;
        let stored: StoredEnvelope = serde_json::from_str(&data)?;
        if stored.schema_version > MODEL_SCHEMA_VERSION {
            return Err(ModelError::Persistence(format!(
                "`{}` uses schema version {}, newest supported is {}",
                path.display(),
                stored.schema_version,
                MODEL_SCHEMA_VERSION
            )));
        }
        let model: TimeBasedModel = serde_json::from_value(stored.model)?;
        info!(model = %model.name(), path = %path.display(), "model loaded");
        Ok(model)
    }
}
