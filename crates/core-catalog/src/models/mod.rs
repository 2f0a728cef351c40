use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use strum::Display;

use crate::ident::NameIdent;

pub mod catalog;
pub mod metalake;
pub mod object;
pub mod schema;

pub use catalog::*;
pub use metalake::*;
pub use object::*;
pub use schema::*;

/// Principal recorded in audit fields when the caller supplies none.
pub const ANONYMOUS_PRINCIPAL: &str = "anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Metalake,
    Catalog,
    Schema,
    Object,
}

impl EntityKind {
    /// Short name used in storage keys.
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::Metalake => "ml",
            Self::Catalog => "ca",
            Self::Schema => "sc",
            Self::Object => "ob",
        }
    }

    /// Identifier depth at which entities of this kind live.
    #[must_use]
    pub const fn depth(self) -> usize {
        match self {
            Self::Metalake => 1,
            Self::Catalog => 2,
            Self::Schema => 3,
            Self::Object => 4,
        }
    }
}

/// Lifecycle state of a persisted entity. `Dropped` is a tombstone: hidden
/// from listings, kept until physical cleanup completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityStatus {
    Active,
    Dropped,
}

/// Payload types persistable through the entity store.
pub trait Entity:
    Serialize + DeserializeOwned + Clone + Eq + PartialEq + Send + Sync + 'static
{
    const KIND: EntityKind;
}

/// A persisted, versioned entity record.
///
/// The store owns every field except `data`: surrogate `id` (stable across
/// renames), monotonically increasing `version` used for optimistic
/// concurrency, tombstone `status` and the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RwObject<T>
where
    T: Eq + PartialEq,
{
    #[serde(flatten)]
    pub data: T,
    pub id: i64,
    pub ident: NameIdent,
    pub version: u64,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl<T> RwObject<T>
where
    T: Eq + PartialEq,
{
    pub fn new(data: T, id: i64, ident: NameIdent, principal: &str) -> Self {
        let now = Utc::now();
        Self {
            data,
            id,
            ident,
            version: 1,
            status: EntityStatus::Active,
            created_at: now,
            updated_at: now,
            created_by: principal.to_string(),
            updated_by: principal.to_string(),
        }
    }

    /// Apply a mutation: replaces the payload (and optionally the name) and
    /// bumps version and audit fields.
    pub fn update(&mut self, data: T, ident: NameIdent, principal: &str) {
        self.data = data;
        self.ident = ident;
        self.version += 1;
        self.updated_at = Utc::now();
        self.updated_by = principal.to_string();
    }

    /// Mark the record as a tombstone pending physical cleanup.
    pub fn tombstone(&mut self, principal: &str) {
        self.status = EntityStatus::Dropped;
        self.version += 1;
        self.updated_at = Utc::now();
        self.updated_by = principal.to_string();
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, EntityStatus::Active)
    }
}

impl<T> Deref for RwObject<T>
where
    T: Eq + PartialEq,
{
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}
