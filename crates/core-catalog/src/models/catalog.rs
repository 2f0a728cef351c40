use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};
use crate::error::{self as catalog_err, Result};

/// Reserved property key: the provider token is part of the catalog's
/// identity and cannot be changed through property alters.
pub const PROVIDER_PROPERTY: &str = "provider";

/// A named, typed collection of schemas backed by one external system.
///
/// `provider` names the connector implementation governing this catalog and
/// is immutable after creation; changing backend technology requires
/// drop + recreate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    pub provider: String,
    pub comment: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl Catalog {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            comment: None,
            properties: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_properties(mut self, properties: HashMap<String, String>) -> Self {
        self.properties = properties;
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

impl Entity for Catalog {
    const KIND: EntityKind = EntityKind::Catalog;
}

/// Alteration request for a catalog. The provider token is not alterable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogUpdate {
    pub new_name: Option<String>,
    pub comment: Option<String>,
    #[serde(default)]
    pub set_properties: HashMap<String, String>,
    #[serde(default)]
    pub remove_properties: Vec<String>,
}

impl CatalogUpdate {
    /// Whether this update touches connector-relevant state and therefore
    /// requires invalidating any cached connector instance.
    #[must_use]
    pub fn affects_connector(&self) -> bool {
        !self.set_properties.is_empty() || !self.remove_properties.is_empty()
    }

    pub fn apply(&self, name: &str, current: &Catalog) -> Result<Catalog> {
        if self.set_properties.contains_key(PROVIDER_PROPERTY)
            || self.remove_properties.iter().any(|k| k == PROVIDER_PROPERTY)
        {
            return catalog_err::ProviderImmutableSnafu {
                name: name.to_string(),
            }
            .fail();
        }
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
        Ok(next)
    }
}
