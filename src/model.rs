use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub type EntityId = i64;

/// One flat "reports-to" record. `parent_id` points at the manager, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    #[serde(default)]
    pub parent_id: Option<EntityId>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl Entity {
    pub fn new(id: EntityId, parent_id: Option<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id,
            parent_id,
            name: name.into(),
            title: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Name shown on the card; falls back to `#id` for unnamed records.
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("#{}", self.id)
        } else {
            self.name.clone()
        }
    }

    /// Parent reference with self-references filtered out.
    pub fn manager_id(&self) -> Option<EntityId> {
        self.parent_id.filter(|parent| *parent != self.id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read entity file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("entity list is not valid JSON or JSON5: {0}")]
    Parse(String),
    #[error("expected an array of entities or an object with an \"entities\" array")]
    Shape,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntityDocument {
    List(Vec<Entity>),
    Wrapped { entities: Vec<Entity> },
}

/// Parses an entity list. Accepts strict JSON first, then JSON5 (comments,
/// trailing commas), either as a bare array or wrapped in `{ "entities": [...] }`.
pub fn parse_entities(input: &str) -> Result<Vec<Entity>, LoadError> {
    let value: serde_json::Value = match serde_json::from_str(input) {
        Ok(value) => value,
        Err(json_err) => json5::from_str(input)
            .map_err(|json5_err| LoadError::Parse(format!("{json_err}; json5: {json5_err}")))?,
    };
    let document: EntityDocument =
        serde_json::from_value(value).map_err(|_| LoadError::Shape)?;
    let entities = match document {
        EntityDocument::List(entities) => entities,
        EntityDocument::Wrapped { entities } => entities,
    };
    tracing::debug!(count = entities.len(), "parsed entity list");
    Ok(entities)
}

pub fn load_entities(path: &Path) -> Result<Vec<Entity>, LoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_entities(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_records_with_extra_fields() {
        let input = r#"[
            {"id": 1, "parentId": null, "name": "Ada", "title": "CEO"},
            {"id": 2, "parentId": 1, "name": "Grace", "department": "R&D"}
        ]"#;
        let entities = parse_entities(input).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].title.as_deref(), Some("CEO"));
        assert_eq!(entities[1].parent_id, Some(1));
        assert_eq!(
            entities[1].fields.get("department"),
            Some(&serde_json::Value::String("R&D".to_string()))
        );
    }

    #[test]
    fn accepts_wrapped_json5() {
        let input = r#"{
            // exported from the directory
            entities: [
                {id: 7, name: "Root",},
                {id: 8, parentId: 7, name: "Leaf"},
            ],
        }"#;
        let entities = parse_entities(input).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].parent_id, None);
    }

    #[test]
    fn rejects_non_list_documents() {
        assert!(matches!(parse_entities("{\"id\": 1}"), Err(LoadError::Shape)));
        assert!(matches!(parse_entities("not json"), Err(LoadError::Parse(_))));
    }

    #[test]
    fn self_reference_is_not_a_manager() {
        let entity = Entity::new(3, Some(3), "Loop");
        assert_eq!(entity.manager_id(), None);
        assert_eq!(Entity::new(4, None, " ").display_name(), "#4");
    }
}
