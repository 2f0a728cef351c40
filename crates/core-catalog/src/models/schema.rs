use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};

/// A namespace level inside a catalog, enacted on the catalog's backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schema {
    pub comment: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl Entity for Schema {
    const KIND: EntityKind = EntityKind::Schema;
}

/// Alteration request for a schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaUpdate {
    pub new_name: Option<String>,
    pub comment: Option<String>,
    #[serde(default)]
    pub set_properties: HashMap<String, String>,
    #[serde(default)]
    pub remove_properties: Vec<String>,
}

impl SchemaUpdate {
    #[must_use]
    pub fn apply(&self, current: &Schema) -> Schema {
        let mut next = current.clone();
        if let Some(comment) = &self.comment {
            next.comment = Some(comment.clone());
        }
        for key in &self.remove_properties {
            next.properties.remove(key);
        }
        for (key, value) in &self.set_properties {
            next.properties.insert(key.clone(), value.clone());
        }
        next
    }
}
