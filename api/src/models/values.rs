//! Typed view over a release's values document
//!
//! Helm values are an arbitrary map. The handful of fields this service reads
//! or writes (`image`, `auto_deploy`, `paused`, `container.env.normal`) are
//! accessed through [`ReleaseValues`], which rejects wrong shapes with
//! [`ReleaseError::MalformedConfig`] instead of guessing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ReleaseError;

/// Image reference written into a release's values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

/// Values of a deployed release
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseValues(Map<String, Value>);

impl ReleaseValues {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Parse a YAML values document. An empty document yields empty values.
    pub fn from_yaml(doc: &str) -> Result<Self, ReleaseError> {
        if doc.trim().is_empty() {
            return Ok(Self::default());
        }

        match serde_yaml::from_str::<Value>(doc)? {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(ReleaseError::MalformedConfig(format!(
                "values document must be a mapping, got {}",
                kind_of(&other)
            ))),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Current image repository
    pub fn image_repository(&self) -> Result<String, ReleaseError> {
        let image = self
            .0
            .get("image")
            .ok_or_else(|| ReleaseError::MalformedConfig("could not find field image in config".to_string()))?
            .as_object()
            .ok_or_else(|| ReleaseError::MalformedConfig("field image is not a mapping".to_string()))?;

        match image.get("repository") {
            Some(Value::String(repository)) => Ok(repository.clone()),
            Some(other) => Err(ReleaseError::MalformedConfig(format!(
                "field image.repository is a {}, expected a string",
                kind_of(other)
            ))),
            None => Err(ReleaseError::MalformedConfig(
                "could not find field repository in config".to_string(),
            )),
        }
    }

    /// Replace the image repository and tag, keeping any other image settings
    pub fn set_image(&mut self, image: &ImageRef) {
        let entry = self
            .0
            .entry("image".to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }

        if let Value::Object(map) = entry {
            map.insert("repository".to_string(), Value::String(image.repository.clone()));
            map.insert("tag".to_string(), Value::String(image.tag.clone()));
        }
    }

    /// Only an explicit `auto_deploy: false` disables webhook deploys
    pub fn auto_deploy_disabled(&self) -> bool {
        matches!(self.0.get("auto_deploy"), Some(Value::Bool(false)))
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.0.insert("paused".to_string(), Value::Bool(paused));
    }

    /// Build-time environment from `container.env.normal`.
    ///
    /// Missing sections yield an empty map; scalar values are stringified.
    pub fn build_env(&self) -> Result<BTreeMap<String, String>, ReleaseError> {
        let normal = self
            .0
            .get("container")
            .and_then(|c| c.get("env"))
            .and_then(|e| e.get("normal"));

        let normal = match normal {
            None | Some(Value::Null) => return Ok(BTreeMap::new()),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(ReleaseError::MalformedConfig(format!(
                    "field container.env.normal is a {}, expected a mapping",
                    kind_of(other)
                )))
            }
        };

        let mut env = BTreeMap::new();
        for (key, value) in normal {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                other => {
                    return Err(ReleaseError::MalformedConfig(format!(
                        "env var {} is a {}, expected a scalar",
                        key,
                        kind_of(other)
                    )))
                }
            };
            env.insert(key.clone(), value);
        }

        Ok(env)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
