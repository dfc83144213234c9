/*!
 * Boundary adapter between caller records and `Scene`.
 *
 * Callers describe scenes as JSON objects with their own field names.
 * `SceneSchema` names those fields; records are converted into canonical
 * scenes on the way in and written back into the caller's shape on the
 * way out, keeping any field the engine does not know about.
 */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;

use crate::errors::SchemaError;
use crate::scene::Scene;

/// Canonical fields copied through unchanged when present
const PASSTHROUGH_FIELDS: [&str; 5] = [
    "protection",
    "compression",
    "compression_rate",
    "kind",
    "transition",
];

/// Caller field names for the scene attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSchema {
    #[serde(default = "default_id_key")]
    pub id_key: String,
    #[serde(default = "default_start_key")]
    pub start_key: String,
    #[serde(default = "default_end_key")]
    pub end_key: String,
    #[serde(default = "default_duration_key")]
    pub duration_key: String,
    #[serde(default = "default_importance_key")]
    pub importance_key: String,
    #[serde(default = "default_tags_key")]
    pub tags_key: String,
}

impl Default for SceneSchema {
    fn default() -> Self {
        Self {
            id_key: default_id_key(),
            start_key: default_start_key(),
            end_key: default_end_key(),
            duration_key: default_duration_key(),
            importance_key: default_importance_key(),
            tags_key: default_tags_key(),
        }
    }
}

impl SceneSchema {
    /// Convert a JSON array of records into scenes
    pub fn to_scenes(&self, records: &Value) -> Result<Vec<Scene>, SchemaError> {
        let list = records.as_array().ok_or(SchemaError::NotAList)?;
        list.iter()
            .enumerate()
            .map(|(index, record)| self.to_scene(index, record))
            .collect()
    }

    /// Convert one record
    pub fn to_scene(&self, index: usize, record: &Value) -> Result<Scene, SchemaError> {
        let object = record
            .as_object()
            .ok_or(SchemaError::NotAnObject { index })?;

        let id = match object.get(&self.id_key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            None | Some(Value::Null) => format!("scene_{}", index),
            Some(other) => {
                return Err(self.invalid(index, &self.id_key, format!("unexpected {}", other)));
            }
        };

        let start = self
            .number(index, object, &self.start_key)?
            .ok_or_else(|| SchemaError::MissingField {
                index,
                field: self.start_key.clone(),
            })?;
        let end = self.number(index, object, &self.end_key)?;
        let duration = self.number(index, object, &self.duration_key)?;
        let end = match (end, duration) {
            (Some(end), _) => end,
            (None, Some(duration)) => start + duration,
            (None, None) => {
                return Err(SchemaError::MissingField {
                    index,
                    field: self.end_key.clone(),
                });
            }
        };
        if end < start {
            return Err(self.invalid(
                index,
                &self.end_key,
                format!("ends at {} before it starts at {}", end, start),
            ));
        }

        let mut canonical = Map::new();
        canonical.insert("id".to_string(), json!(id));
        canonical.insert("start_time".to_string(), json!(start));
        canonical.insert("end_time".to_string(), json!(end));
        canonical.insert("duration".to_string(), json!(end - start));
        if let Some(importance) = self.number(index, object, &self.importance_key)? {
            canonical.insert("importance".to_string(), json!(importance.clamp(0.0, 1.0)));
        }
        match object.get(&self.tags_key) {
            Some(Value::Array(tags)) => {
                canonical.insert("tags".to_string(), Value::Array(tags.clone()));
            }
            Some(Value::String(tag)) => {
                canonical.insert("tags".to_string(), json!([tag]));
            }
            _ => {}
        }
        for field in PASSTHROUGH_FIELDS {
            if let Some(value) = object.get(field) {
                canonical.insert(field.to_string(), value.clone());
            }
        }

        serde_json::from_value(Value::Object(canonical))
            .map_err(|e| self.invalid(index, "record", e.to_string()))
    }

    /// Write scenes back as caller records.
    ///
    /// Records in `originals` are matched by id; their unknown fields are
    /// kept. Scenes without an original (such as inserted transitions) get
    /// a fresh record.
    pub fn to_records(&self, scenes: &[Scene], originals: &Value) -> Value {
        let by_id: HashMap<String, &Map<String, Value>> = originals
            .as_array()
            .map(|list| {
                list.iter()
                    .enumerate()
                    .filter_map(|(index, record)| {
                        let object = record.as_object()?;
                        let id = match object.get(&self.id_key) {
                            Some(Value::String(s)) => s.clone(),
                            Some(Value::Number(n)) => n.to_string(),
                            _ => format!("scene_{}", index),
                        };
                        Some((id, object))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let records = scenes
            .iter()
            .map(|scene| {
                let mut record = by_id.get(&scene.id).map(|o| (*o).clone()).unwrap_or_default();
                self.write_scene(scene, &mut record);
                Value::Object(record)
            })
            .collect();
        Value::Array(records)
    }

    fn write_scene(&self, scene: &Scene, record: &mut Map<String, Value>) {
        record.insert(self.id_key.clone(), json!(scene.id));
        record.insert(self.start_key.clone(), json!(scene.start_time));
        record.insert(self.end_key.clone(), json!(scene.end_time));
        record.insert(self.duration_key.clone(), json!(scene.duration));
        record.insert(self.importance_key.clone(), json!(scene.importance));
        record.insert(self.tags_key.clone(), json!(scene.tags));

        if let Some(protection) = &scene.protection {
            record.insert("protection".to_string(), json!(protection));
        }
        if scene.is_transition() {
            record.insert("kind".to_string(), json!(scene.kind));
            if let Some(transition) = &scene.transition {
                record.insert("transition".to_string(), json!(transition));
            }
        }
        if let Some(adjustment) = &scene.adjustment {
            record.insert("adjustment".to_string(), json!(adjustment));
        }
    }

    fn number(
        &self,
        index: usize,
        object: &Map<String, Value>,
        key: &str,
    ) -> Result<Option<f64>, SchemaError> {
        match object.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => match n.as_f64() {
                Some(v) if v.is_finite() => Ok(Some(v)),
                _ => Err(self.invalid(index, key, "not a finite number".to_string())),
            },
            Some(other) => Err(self.invalid(index, key, format!("expected a number, got {}", other))),
        }
    }

    fn invalid(&self, index: usize, field: &str, reason: String) -> SchemaError {
        SchemaError::InvalidField {
            index,
            field: field.to_string(),
            reason,
        }
    }
}

fn default_id_key() -> String {
    "id".to_string()
}

fn default_start_key() -> String {
    "start_time".to_string()
}

fn default_end_key() -> String {
    "end_time".to_string()
}

fn default_duration_key() -> String {
    "duration".to_string()
}

fn default_importance_key() -> String {
    "importance".to_string()
}

fn default_tags_key() -> String {
    "tags".to_string()
}
