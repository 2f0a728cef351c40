use async_trait::async_trait;

use crate::error::Result;
use crate::ident::NameIdent;
use crate::models::{Catalog, Metalake, ObjectPointer, RwObject, Schema};

pub mod memory;

pub use memory::MemoryEntityStore;

/// Outcome of a reconciliation sweep over the store.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Orphan rows removed: rows that existed without a child-index entry
    /// (a create that failed between its two phases).
    pub removed_orphans: Vec<String>,
    /// Tombstoned rows still awaiting physical removal.
    pub pending_purge: Vec<String>,
}

/// Durable, versioned persistence for namespace entities.
///
/// All writes are single-key atomic. Updates and soft deletes carry the
/// version the caller read; a stale version is rejected with
/// `VersionConflict`, never merged. `list_*` returns only ACTIVE entities in
/// identifier-lexicographic order (a committed contract). `purge_*` removes
/// a tombstoned row after backend cleanup has completed.
#[async_trait]
pub trait EntityStore: std::fmt::Debug + Send + Sync {
    async fn create_metalake(
        &self,
        ident: &NameIdent,
        metalake: Metalake,
        principal: &str,
    ) -> Result<RwObject<Metalake>>;
    async fn get_metalake(&self, ident: &NameIdent) -> Result<Option<RwObject<Metalake>>>;
    async fn list_metalakes(&self) -> Result<Vec<RwObject<Metalake>>>;
    async fn update_metalake(
        &self,
        ident: &NameIdent,
        new_ident: &NameIdent,
        metalake: Metalake,
        expected_version: u64,
        principal: &str,
    ) -> Result<RwObject<Metalake>>;
    async fn soft_delete_metalake(
        &self,
        ident: &NameIdent,
        expected_version: u64,
        principal: &str,
    ) -> Result<()>;
    async fn purge_metalake(&self, ident: &NameIdent) -> Result<()>;

    async fn create_catalog(
        &self,
        ident: &NameIdent,
        catalog: Catalog,
        principal: &str,
    ) -> Result<RwObject<Catalog>>;
    async fn get_catalog(&self, ident: &NameIdent) -> Result<Option<RwObject<Catalog>>>;
    async fn list_catalogs(&self, metalake: &NameIdent) -> Result<Vec<RwObject<Catalog>>>;
    async fn update_catalog(
        &self,
        ident: &NameIdent,
        new_ident: &NameIdent,
        catalog: Catalog,
        expected_version: u64,
        principal: &str,
    ) -> Result<RwObject<Catalog>>;
    async fn soft_delete_catalog(
        &self,
        ident: &NameIdent,
        expected_version: u64,
        principal: &str,
    ) -> Result<()>;
    async fn purge_catalog(&self, ident: &NameIdent) -> Result<()>;

    async fn create_schema(
        &self,
        ident: &NameIdent,
        schema: Schema,
        principal: &str,
    ) -> Result<RwObject<Schema>>;
    async fn get_schema(&self, ident: &NameIdent) -> Result<Option<RwObject<Schema>>>;
    async fn list_schemas(&self, catalog: &NameIdent) -> Result<Vec<RwObject<Schema>>>;
    async fn update_schema(
        &self,
        ident: &NameIdent,
        new_ident: &NameIdent,
        schema: Schema,
        expected_version: u64,
        principal: &str,
    ) -> Result<RwObject<Schema>>;
    async fn soft_delete_schema(
        &self,
        ident: &NameIdent,
        expected_version: u64,
        principal: &str,
    ) -> Result<()>;
    async fn purge_schema(&self, ident: &NameIdent) -> Result<()>;

    async fn create_object(
        &self,
        ident: &NameIdent,
        object: ObjectPointer,
        principal: &str,
    ) -> Result<RwObject<ObjectPointer>>;
    async fn get_object(&self, ident: &NameIdent) -> Result<Option<RwObject<ObjectPointer>>>;
    async fn list_objects(&self, schema: &NameIdent) -> Result<Vec<RwObject<ObjectPointer>>>;
    async fn soft_delete_object(
        &self,
        ident: &NameIdent,
        expected_version: u64,
        principal: &str,
    ) -> Result<()>;
    async fn purge_object(&self, ident: &NameIdent) -> Result<()>;

    /// Sweep the store: remove orphan rows left by a create that failed
    /// between writing the row and appending to the parent's child index,
    /// and report tombstones still pending purge. Idempotent.
    async fn reconcile(&self) -> Result<ReconcileReport>;
}
