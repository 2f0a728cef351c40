use std::future::Future;
use std::sync::Arc;

use strum::Display;
use tracing::{instrument, warn};

use crate::cache::{ConnectorCache, ConnectorLease};
use crate::config::CatalogConfig;
use crate::error::{self as catalog_err, Error, Result};
use crate::ident::NameIdent;
use crate::models::{
    Catalog, CatalogUpdate, EntityKind, Metalake, MetalakeUpdate, ObjectPointer, RwObject, Schema,
    SchemaUpdate, ANONYMOUS_PRINCIPAL,
};
use crate::registry::ProviderRegistry;
use crate::store::{EntityStore, ReconcileReport};

/// Stages of one dispatched operation, reported on failure so callers can
/// tell "nothing happened" from "backend changed, metadata did not".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStage {
    Resolving,
    BackendEnacting,
    MetadataCommitting,
}

fn not_found(kind: EntityKind, ident: &NameIdent) -> Error {
    catalog_err::NotFoundSnafu {
        type_name: kind.to_string(),
        name: ident.to_string(),
    }
    .build()
}

fn already_exists(kind: EntityKind, ident: &NameIdent) -> Error {
    catalog_err::AlreadyExistsSnafu {
        type_name: kind.to_string(),
        name: ident.to_string(),
    }
    .build()
}

/// Stale-version failures on alter commits surface as
/// `ConcurrentModification`: the caller must re-resolve and resubmit. When a
/// backend change already succeeded this also marks metadata/backend
/// divergence, which is why it is never auto-retried.
fn conflict_after_backend(err: Error) -> Error {
    match err {
        Error::VersionConflict {
            type_name, name, ..
        } => catalog_err::ConcurrentModificationSnafu { type_name, name }.build(),
        other => other,
    }
}

/// Uniform façade over the entity store and the connector layer.
///
/// Each operation runs the stage machine `Resolving -> BackendEnacting ->
/// MetadataCommitting`. Create and alter enact the backend change first and
/// commit metadata second; drop tombstones metadata first, then enacts
/// backend deletion, then purges the tombstone. A failure carries the stage
/// it surfaced from via `Error::OperationFailed`.
#[derive(Debug)]
pub struct CatalogDispatcher {
    store: Arc<dyn EntityStore>,
    registry: Arc<ProviderRegistry>,
    cache: ConnectorCache,
    config: CatalogConfig,
}

impl CatalogDispatcher {
    #[must_use]
    pub fn new(
        store: Arc<dyn EntityStore>,
        registry: Arc<ProviderRegistry>,
        config: CatalogConfig,
    ) -> Self {
        let cache = ConnectorCache::new(config.cache.max_connectors, config.idle_eviction());
        Self {
            store,
            registry,
            cache,
            config,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    #[must_use]
    pub fn cache(&self) -> &ConnectorCache {
        &self.cache
    }

    /// Sweep the store for orphan rows and pending tombstones.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        self.store.reconcile().await
    }

    fn principal<'a>(principal: Option<&'a str>) -> &'a str {
        principal.unwrap_or(ANONYMOUS_PRINCIPAL)
    }

    /// Run one metadata commit, retrying transient storage failures with a
    /// linear backoff. Version conflicts and every other error pass through
    /// on the first occurrence.
    async fn commit<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.config.dispatch.storage_retry_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < attempts => {
                    attempt += 1;
                    warn!(error = %err, attempt, "transient storage failure, retrying commit");
                    tokio::time::sleep(self.config.storage_retry_backoff() * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Run one backend-enacting call under the configured timeout. On expiry
    /// the operation is cancelled and metadata is never committed.
    async fn enact<T, Fut>(&self, operation: &str, call: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.backend_timeout(), call).await {
            Ok(result) => result,
            Err(_) => catalog_err::CancelledSnafu {
                operation: operation.to_string(),
            }
            .fail(),
        }
    }

    /// Lease the connector for a catalog, building it on first use. The
    /// build itself runs under the backend timeout.
    async fn connector_for(&self, catalog: &RwObject<Catalog>) -> Result<ConnectorLease> {
        let timeout = self.config.backend_timeout();
        let init = || {
            let registry = Arc::clone(&self.registry);
            let provider = catalog.provider.clone();
            let ident = catalog.ident.clone();
            let properties = catalog.properties.clone();
            async move {
                match tokio::time::timeout(timeout, registry.build(&provider, &ident, &properties))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => catalog_err::CancelledSnafu {
                        operation: "connector_build".to_string(),
                    }
                    .fail(),
                }
            }
        };
        self.cache
            .get_or_create(catalog.id, &catalog.provider, init)
            .await
    }

    async fn require_metalake(&self, ident: &NameIdent) -> Result<RwObject<Metalake>> {
        self.store
            .get_metalake(ident)
            .await?
            .ok_or_else(|| not_found(EntityKind::Metalake, ident))
    }

    async fn require_catalog(&self, ident: &NameIdent) -> Result<RwObject<Catalog>> {
        self.store
            .get_catalog(ident)
            .await?
            .ok_or_else(|| not_found(EntityKind::Catalog, ident))
    }

    async fn require_schema(&self, ident: &NameIdent) -> Result<RwObject<Schema>> {
        self.store
            .get_schema(ident)
            .await?
            .ok_or_else(|| not_found(EntityKind::Schema, ident))
    }

    // --- metalakes (metadata-only, no backend stage) ---

    #[instrument(name = "dispatcher.create_metalake", level = "debug", skip(self, metalake), err)]
    pub async fn create_metalake(
        &self,
        ident: &NameIdent,
        metalake: Metalake,
        principal: Option<&str>,
    ) -> Result<RwObject<Metalake>> {
        let name = ident.to_string();
        let resolve = async {
            ident.require_depth(EntityKind::Metalake.depth())?;
            if self.store.get_metalake(ident).await?.is_some() {
                return Err(already_exists(EntityKind::Metalake, ident));
            }
            Ok(())
        };
        resolve
            .await
            .map_err(|e: Error| e.at_stage(OperationStage::Resolving, &name))?;

        let principal = Self::principal(principal);
        self.commit(|| self.store.create_metalake(ident, metalake.clone(), principal))
            .await
            .map_err(|e| e.at_stage(OperationStage::MetadataCommitting, &name))
    }

    pub async fn load_metalake(&self, ident: &NameIdent) -> Result<RwObject<Metalake>> {
        let name = ident.to_string();
        let resolve = async {
            ident.require_depth(EntityKind::Metalake.depth())?;
            self.require_metalake(ident).await
        };
        resolve
            .await
            .map_err(|e| e.at_stage(OperationStage::Resolving, &name))
    }

    pub async fn list_metalakes(&self) -> Result<Vec<RwObject<Metalake>>> {
        self.store.list_metalakes().await
    }

    #[instrument(name = "dispatcher.alter_metalake", level = "debug", skip(self, update), err)]
    pub async fn alter_metalake(
        &self,
        ident: &NameIdent,
        update: MetalakeUpdate,
        expected_version: u64,
        principal: Option<&str>,
    ) -> Result<RwObject<Metalake>> {
        let name = ident.to_string();
        let resolve = async {
            ident.require_depth(EntityKind::Metalake.depth())?;
            let current = self.require_metalake(ident).await?;
            let next = update.apply(&current.data);
            let new_ident = match &update.new_name {
                Some(new_name) => ident.renamed(new_name)?,
                None => ident.clone(),
            };
            Ok((next, new_ident))
        };
        let (next, new_ident) = resolve
            .await
            .map_err(|e: Error| e.at_stage(OperationStage::Resolving, &name))?;

        let principal = Self::principal(principal);
        self.commit(|| {
            self.store
                .update_metalake(ident, &new_ident, next.clone(), expected_version, principal)
        })
        .await
        .map_err(conflict_after_backend)
        .map_err(|e| e.at_stage(OperationStage::MetadataCommitting, &name))
    }

    /// Drop a metalake. Refused while ACTIVE catalogs remain under it; this
    /// never cascades into backends.
    #[instrument(name = "dispatcher.drop_metalake", level = "debug", skip(self), err)]
    pub async fn drop_metalake(
        &self,
        ident: &NameIdent,
        expected_version: u64,
        principal: Option<&str>,
    ) -> Result<()> {
        let name = ident.to_string();
        let resolve = async {
            ident.require_depth(EntityKind::Metalake.depth())?;
            self.require_metalake(ident).await?;
            let catalogs = self.store.list_catalogs(ident).await?;
            if !catalogs.is_empty() {
                let children: Vec<String> =
                    catalogs.iter().map(|c| c.ident.name().to_string()).collect();
                return catalog_err::NonEmptySnafu {
                    type_name: EntityKind::Metalake.to_string(),
                    name: name.clone(),
                    children: children.join(", "),
                }
                .fail();
            }
            Ok(())
        };
        resolve
            .await
            .map_err(|e: Error| e.at_stage(OperationStage::Resolving, &name))?;

        let principal = Self::principal(principal);
        let commit = async {
            self.commit(|| self.store.soft_delete_metalake(ident, expected_version, principal))
                .await?;
            self.commit(|| self.store.purge_metalake(ident)).await
        };
        commit
            .await
            .map_err(|e| e.at_stage(OperationStage::MetadataCommitting, &name))
    }

    // --- catalogs ---

    /// Register a catalog. The provider token and required configuration are
    /// validated, but the connector is NOT built: metadata-only registration
    /// succeeds even when the backend is momentarily unreachable.
    #[instrument(name = "dispatcher.create_catalog", level = "debug", skip(self, catalog), err)]
    pub async fn create_catalog(
        &self,
        ident: &NameIdent,
        catalog: Catalog,
        principal: Option<&str>,
    ) -> Result<RwObject<Catalog>> {
        let name = ident.to_string();
        let resolve = async {
            ident.require_depth(EntityKind::Catalog.depth())?;
            let metalake_ident = ident
                .parent()
                .ok_or_else(|| not_found(EntityKind::Metalake, ident))?;
            self.require_metalake(&metalake_ident).await?;
            if self.store.get_catalog(ident).await?.is_some() {
                return Err(already_exists(EntityKind::Catalog, ident));
            }
            self.registry.validate(&catalog.provider, &catalog.properties)
        };
        resolve
            .await
            .map_err(|e| e.at_stage(OperationStage::Resolving, &name))?;

        let principal = Self::principal(principal);
        self.commit(|| self.store.create_catalog(ident, catalog.clone(), principal))
            .await
            .map_err(|e| e.at_stage(OperationStage::MetadataCommitting, &name))
    }

    pub async fn load_catalog(&self, ident: &NameIdent) -> Result<RwObject<Catalog>> {
        let name = ident.to_string();
        let resolve = async {
            ident.require_depth(EntityKind::Catalog.depth())?;
            self.require_catalog(ident).await
        };
        resolve
            .await
            .map_err(|e| e.at_stage(OperationStage::Resolving, &name))
    }

    pub async fn list_catalogs(&self, metalake: &NameIdent) -> Result<Vec<RwObject<Catalog>>> {
        let name = metalake.to_string();
        let resolve = async {
            metalake.require_depth(EntityKind::Metalake.depth())?;
            self.require_metalake(metalake).await?;
            self.store.list_catalogs(metalake).await
        };
        resolve
            .await
            .map_err(|e| e.at_stage(OperationStage::Resolving, &name))
    }

    /// Alter a catalog's name, comment or properties. The provider token is
    /// immutable. A property change invalidates the cached connector
    /// synchronously: after this returns, the next operation builds fresh.
    #[instrument(name = "dispatcher.alter_catalog", level = "debug", skip(self, update), err)]
    pub async fn alter_catalog(
        &self,
        ident: &NameIdent,
        update: CatalogUpdate,
        expected_version: u64,
        principal: Option<&str>,
    ) -> Result<RwObject<Catalog>> {
        let name = ident.to_string();
        let resolve = async {
            ident.require_depth(EntityKind::Catalog.depth())?;
            let current = self.require_catalog(ident).await?;
            let next = update.apply(ident.name(), &current.data)?;
            let new_ident = match &update.new_name {
                Some(new_name) => ident.renamed(new_name)?,
                None => ident.clone(),
            };
            Ok((current, next, new_ident))
        };
        let (current, next, new_ident) = resolve
            .await
            .map_err(|e: Error| e.at_stage(OperationStage::Resolving, &name))?;

        let principal = Self::principal(principal);
        let updated = self
            .commit(|| {
                self.store
                    .update_catalog(ident, &new_ident, next.clone(), expected_version, principal)
            })
            .await
            .map_err(conflict_after_backend)
            .map_err(|e| e.at_stage(OperationStage::MetadataCommitting, &name))?;

        if update.affects_connector() || update.new_name.is_some() {
            self.cache.invalidate(current.id).await;
        }
        Ok(updated)
    }

    /// Drop a catalog: tombstone (hides it from listings at once), evict any
    /// cached connector, run the connector-side cleanup hook, then purge the
    /// tombstone. A failed cleanup leaves the tombstone in place for retry.
    #[instrument(name = "dispatcher.drop_catalog", level = "debug", skip(self), err)]
    pub async fn drop_catalog(
        &self,
        ident: &NameIdent,
        expected_version: u64,
        principal: Option<&str>,
    ) -> Result<()> {
        let name = ident.to_string();
        let resolve = async {
            ident.require_depth(EntityKind::Catalog.depth())?;
            let current = self.require_catalog(ident).await?;
            let schemas = self.store.list_schemas(ident).await?;
            if !schemas.is_empty() {
                let children: Vec<String> =
                    schemas.iter().map(|s| s.ident.name().to_string()).collect();
                return catalog_err::NonEmptySnafu {
                    type_name: EntityKind::Catalog.to_string(),
                    name: name.clone(),
                    children: children.join(", "),
                }
                .fail();
            }
            Ok(current)
        };
        let current = resolve
            .await
            .map_err(|e: Error| e.at_stage(OperationStage::Resolving, &name))?;

        let principal = Self::principal(principal);
        self.commit(|| self.store.soft_delete_catalog(ident, expected_version, principal))
            .await
            .map_err(|e| e.at_stage(OperationStage::MetadataCommitting, &name))?;

        // The tombstone is committed; no caller may observe the old instance.
        self.cache.invalidate(current.id).await;

        // Cleanup runs on a fresh, uncached connector so the hook cannot
        // resurrect a cache entry for a dropped catalog.
        let cleanup = async {
            let connector = self
                .enact(
                    "connector_build",
                    self.registry
                        .build(&current.provider, ident, &current.properties),
                )
                .await?;
            let result = self.enact("drop_catalog", connector.drop_catalog(ident)).await;
            connector.close();
            result
        };
        cleanup
            .await
            .map_err(|e| e.at_stage(OperationStage::BackendEnacting, &name))?;

        self.commit(|| self.store.purge_catalog(ident))
            .await
            .map_err(|e| e.at_stage(OperationStage::MetadataCommitting, &name))
    }

    // --- schemas ---

    #[instrument(name = "dispatcher.create_schema", level = "debug", skip(self, schema), err)]
    pub async fn create_schema(
        &self,
        ident: &NameIdent,
        schema: Schema,
        principal: Option<&str>,
    ) -> Result<RwObject<Schema>> {
        let name = ident.to_string();
        let resolve = async {
            ident.require_depth(EntityKind::Schema.depth())?;
            let catalog_ident = ident.parent().ok_or_else(|| {
                not_found(EntityKind::Catalog, ident)
            })?;
            let catalog = self.require_catalog(&catalog_ident).await?;
            if self.store.get_schema(ident).await?.is_some() {
                return Err(already_exists(EntityKind::Schema, ident));
            }
            Ok(catalog)
        };
        let catalog = resolve
            .await
            .map_err(|e: Error| e.at_stage(OperationStage::Resolving, &name))?;

        let enact = async {
            let connector = self.connector_for(&catalog).await?;
            self.enact("create_schema", connector.create_schema(ident, &schema))
                .await
        };
        enact
            .await
            .map_err(|e| e.at_stage(OperationStage::BackendEnacting, &name))?;

        let principal = Self::principal(principal);
        self.commit(|| self.store.create_schema(ident, schema.clone(), principal))
            .await
            .map_err(conflict_after_backend)
            .map_err(|e| e.at_stage(OperationStage::MetadataCommitting, &name))
    }

    pub async fn load_schema(&self, ident: &NameIdent) -> Result<RwObject<Schema>> {
        let name = ident.to_string();
        let resolve = async {
            ident.require_depth(EntityKind::Schema.depth())?;
            self.require_schema(ident).await
        };
        resolve
            .await
            .map_err(|e| e.at_stage(OperationStage::Resolving, &name))
    }

    pub async fn list_schemas(&self, catalog: &NameIdent) -> Result<Vec<RwObject<Schema>>> {
        let name = catalog.to_string();
        let resolve = async {
            catalog.require_depth(EntityKind::Catalog.depth())?;
            self.require_catalog(catalog).await?;
            self.store.list_schemas(catalog).await
        };
        resolve
            .await
            .map_err(|e| e.at_stage(OperationStage::Resolving, &name))
    }

    #[instrument(name = "dispatcher.alter_schema", level = "debug", skip(self, update), err)]
    pub async fn alter_schema(
        &self,
        ident: &NameIdent,
        update: SchemaUpdate,
        expected_version: u64,
        principal: Option<&str>,
    ) -> Result<RwObject<Schema>> {
        let name = ident.to_string();
        let resolve = async {
            ident.require_depth(EntityKind::Schema.depth())?;
            let catalog_ident = ident.parent().ok_or_else(|| {
                not_found(EntityKind::Catalog, ident)
            })?;
            let catalog = self.require_catalog(&catalog_ident).await?;
            let current = self.require_schema(ident).await?;
            let next = update.apply(&current.data);
            let new_ident = match &update.new_name {
                Some(new_name) => ident.renamed(new_name)?,
                None => ident.clone(),
            };
            Ok((catalog, next, new_ident))
        };
        let (catalog, next, new_ident) = resolve
            .await
            .map_err(|e: Error| e.at_stage(OperationStage::Resolving, &name))?;

        let enact = async {
            let connector = self.connector_for(&catalog).await?;
            self.enact("alter_schema", connector.alter_schema(ident, &next))
                .await
        };
        enact
            .await
            .map_err(|e| e.at_stage(OperationStage::BackendEnacting, &name))?;

        let principal = Self::principal(principal);
        self.commit(|| {
            self.store
                .update_schema(ident, &new_ident, next.clone(), expected_version, principal)
        })
        .await
        .map_err(conflict_after_backend)
        .map_err(|e| e.at_stage(OperationStage::MetadataCommitting, &name))
    }

    #[instrument(name = "dispatcher.drop_schema", level = "debug", skip(self), err)]
    pub async fn drop_schema(
        &self,
        ident: &NameIdent,
        expected_version: u64,
        principal: Option<&str>,
    ) -> Result<()> {
        let name = ident.to_string();
        let resolve = async {
            ident.require_depth(EntityKind::Schema.depth())?;
            let catalog_ident = ident.parent().ok_or_else(|| {
                not_found(EntityKind::Catalog, ident)
            })?;
            let catalog = self.require_catalog(&catalog_ident).await?;
            self.require_schema(ident).await?;
            let objects = self.store.list_objects(ident).await?;
            if !objects.is_empty() {
                let children: Vec<String> =
                    objects.iter().map(|o| o.ident.name().to_string()).collect();
                return catalog_err::NonEmptySnafu {
                    type_name: EntityKind::Schema.to_string(),
                    name: name.clone(),
                    children: children.join(", "),
                }
                .fail();
            }
            Ok(catalog)
        };
        let catalog = resolve
            .await
            .map_err(|e: Error| e.at_stage(OperationStage::Resolving, &name))?;

        let principal = Self::principal(principal);
        self.commit(|| self.store.soft_delete_schema(ident, expected_version, principal))
            .await
            .map_err(|e| e.at_stage(OperationStage::MetadataCommitting, &name))?;

        let enact = async {
            let connector = self.connector_for(&catalog).await?;
            self.enact("drop_schema", connector.drop_schema(ident)).await
        };
        enact
            .await
            .map_err(|e| e.at_stage(OperationStage::BackendEnacting, &name))?;

        self.commit(|| self.store.purge_schema(ident))
            .await
            .map_err(|e| e.at_stage(OperationStage::MetadataCommitting, &name))
    }

    // --- objects (tables, filesets, topics) ---

    #[instrument(name = "dispatcher.create_object", level = "debug", skip(self, object), err)]
    pub async fn create_object(
        &self,
        ident: &NameIdent,
        object: ObjectPointer,
        principal: Option<&str>,
    ) -> Result<RwObject<ObjectPointer>> {
        let name = ident.to_string();
        let resolve = async {
            ident.require_depth(EntityKind::Object.depth())?;
            let schema_ident = ident.parent().ok_or_else(|| {
                not_found(EntityKind::Schema, ident)
            })?;
            self.require_schema(&schema_ident).await?;
            let catalog_ident = schema_ident.parent().ok_or_else(|| {
                not_found(EntityKind::Catalog, ident)
            })?;
            let catalog = self.require_catalog(&catalog_ident).await?;
            if self.store.get_object(ident).await?.is_some() {
                return Err(already_exists(EntityKind::Object, ident));
            }
            Ok(catalog)
        };
        let catalog = resolve
            .await
            .map_err(|e: Error| e.at_stage(OperationStage::Resolving, &name))?;

        let enact = async {
            let connector = self.connector_for(&catalog).await?;
            self.enact("create_object", connector.create_object(ident, &object))
                .await
        };
        enact
            .await
            .map_err(|e| e.at_stage(OperationStage::BackendEnacting, &name))?;

        let principal = Self::principal(principal);
        self.commit(|| self.store.create_object(ident, object.clone(), principal))
            .await
            .map_err(conflict_after_backend)
            .map_err(|e| e.at_stage(OperationStage::MetadataCommitting, &name))
    }

    pub async fn load_object(&self, ident: &NameIdent) -> Result<RwObject<ObjectPointer>> {
        let name = ident.to_string();
        let resolve = async {
            ident.require_depth(EntityKind::Object.depth())?;
            self.store
                .get_object(ident)
                .await?
                .ok_or_else(|| not_found(EntityKind::Object, ident))
        };
        resolve
            .await
            .map_err(|e| e.at_stage(OperationStage::Resolving, &name))
    }

    pub async fn list_objects(&self, schema: &NameIdent) -> Result<Vec<RwObject<ObjectPointer>>> {
        let name = schema.to_string();
        let resolve = async {
            schema.require_depth(EntityKind::Schema.depth())?;
            self.require_schema(schema).await?;
            self.store.list_objects(schema).await
        };
        resolve
            .await
            .map_err(|e| e.at_stage(OperationStage::Resolving, &name))
    }

    #[instrument(name = "dispatcher.drop_object", level = "debug", skip(self), err)]
    pub async fn drop_object(
        &self,
        ident: &NameIdent,
        expected_version: u64,
        principal: Option<&str>,
    ) -> Result<()> {
        let name = ident.to_string();
        let resolve = async {
            ident.require_depth(EntityKind::Object.depth())?;
            let current = self
                .store
                .get_object(ident)
                .await?
                .ok_or_else(|| not_found(EntityKind::Object, ident))?;
            let catalog_ident = ident
                .parent()
                .and_then(|schema| schema.parent())
                .ok_or_else(|| not_found(EntityKind::Catalog, ident))?;
            let catalog = self.require_catalog(&catalog_ident).await?;
            Ok((catalog, current.kind))
        };
        let (catalog, kind) = resolve
            .await
            .map_err(|e: Error| e.at_stage(OperationStage::Resolving, &name))?;

        let principal = Self::principal(principal);
        self.commit(|| self.store.soft_delete_object(ident, expected_version, principal))
            .await
            .map_err(|e| e.at_stage(OperationStage::MetadataCommitting, &name))?;

        let enact = async {
            let connector = self.connector_for(&catalog).await?;
            self.enact("drop_object", connector.drop_object(ident, kind)).await
        };
        enact
            .await
            .map_err(|e| e.at_stage(OperationStage::BackendEnacting, &name))?;

        self.commit(|| self.store.purge_object(ident))
            .await
            .map_err(|e| e.at_stage(OperationStage::MetadataCommitting, &name))
    }
}
