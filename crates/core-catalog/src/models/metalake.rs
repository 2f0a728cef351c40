use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};

/// Top-level namespace tenant grouping catalogs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metalake {
    pub comment: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl Entity for Metalake {
    const KIND: EntityKind = EntityKind::Metalake;
}

/// Alteration request for a metalake.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetalakeUpdate {
    pub new_name: Option<String>,
    pub comment: Option<String>,
    #[serde(default)]
    pub set_properties: HashMap<String, String>,
    #[serde(default)]
    pub remove_properties: Vec<String>,
}

impl MetalakeUpdate {
    #[must_use]
    pub fn apply(&self, current: &Metalake) -> Metalake {
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
