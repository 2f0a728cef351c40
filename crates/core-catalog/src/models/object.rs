use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::Display;

use super::{Entity, EntityKind};

/// What a leaf object pointer refers to on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Table,
    Fileset,
    Topic,
}

/// Lightweight pointer to a backend-managed leaf object (table, fileset or
/// topic). The backend remains authoritative for the object's own content;
/// the store only tracks its existence under the namespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectPointer {
    pub kind: ObjectKind,
    pub comment: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl ObjectPointer {
    #[must_use]
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            comment: None,
            properties: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_properties(mut self, properties: HashMap<String, String>) -> Self {
        self.properties = properties;
        self
    }
}

impl Entity for ObjectPointer {
    const KIND: EntityKind = EntityKind::Object;
}
