use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use snafu::ResultExt;
use tokio::sync::RwLock;
use tracing::instrument;

use super::{EntityStore, ReconcileReport};
use crate::error::{self as catalog_err, Result};
use crate::ident::NameIdent;
use crate::models::{
    Catalog, Entity, EntityKind, EntityStatus, Metalake, ObjectPointer, RwObject, Schema,
};

/// Synthetic parent id for metalakes (the namespace root).
const ROOT_ID: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IndexEntry {
    id: i64,
    parent_id: i64,
}

/// Row key: `<kind-short-name>/<parent-id>/<id>`.
fn row_key(kind: EntityKind, parent_id: i64, id: i64) -> String {
    format!("{}/{parent_id}/{id}", kind.short_name())
}

/// Name-index key: `<kind-short-name>/<parent-id>:<own-name>`.
///
/// Keyed per level, not by the full dotted path: an entry binds one segment
/// to its parent's id, so renaming a parent remaps every descendant without
/// touching their entries, and two paths whose dotted forms collide (a
/// segment may contain dots) never alias.
fn name_key(kind: EntityKind, parent_id: i64, name: &str) -> String {
    format!("{}/{parent_id}:{name}", kind.short_name())
}

/// Child-index key: `<kind-short-name>/<parent-id>`.
fn child_key(kind: EntityKind, parent_id: i64) -> String {
    format!("{}/{parent_id}", kind.short_name())
}

const fn kind_at_depth(depth: usize) -> EntityKind {
    match depth {
        1 => EntityKind::Metalake,
        2 => EntityKind::Catalog,
        3 => EntityKind::Schema,
        _ => EntityKind::Object,
    }
}

const fn child_kind_of(kind: EntityKind) -> Option<EntityKind> {
    match kind {
        EntityKind::Metalake => Some(EntityKind::Catalog),
        EntityKind::Catalog => Some(EntityKind::Schema),
        EntityKind::Schema => Some(EntityKind::Object),
        EntityKind::Object => None,
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    /// Primary rows, keyed `(kind, parent_id, id)`, holding serialized
    /// `RwObject<T>` values. Tombstoned rows stay here until purge.
    rows: BTreeMap<String, serde_json::Value>,
    /// Secondary index from `(kind, parent_id, own-name)` to the ACTIVE
    /// entity id. Tombstoning removes the entry, so a name is reusable while
    /// its old row awaits physical cleanup.
    name_index: HashMap<String, IndexEntry>,
    /// `(kind, parent_id)` to the set of child ids, appended to after the
    /// row write (two-phase create).
    child_index: HashMap<String, BTreeSet<i64>>,
}

/// In-memory `EntityStore` backend.
///
/// Writers take the inner write lock only for the metadata commit itself;
/// nothing slow happens under it, so unrelated namespace subtrees do not
/// contend in any observable way. Durable backends plug in behind the same
/// trait.
pub struct MemoryEntityStore {
    next_id: AtomicI64,
    inner: RwLock<StoreInner>,
}

impl std::fmt::Debug for MemoryEntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEntityStore").finish()
    }
}

impl Default for MemoryEntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            inner: RwLock::new(StoreInner::default()),
        }
    }

    /// Walk the parent chain from the root, one name-index hop per segment.
    /// Returns `None` as soon as any link is missing or tombstoned (presence
    /// in the name index implies ACTIVE: tombstoning removes the entry).
    fn lookup(inner: &StoreInner, ident: &NameIdent) -> Option<IndexEntry> {
        let mut parent_id = ROOT_ID;
        let mut entry = None;
        for (depth, segment) in (1..).zip(ident.segments()) {
            let found = inner
                .name_index
                .get(&name_key(kind_at_depth(depth), parent_id, segment))
                .copied()?;
            parent_id = found.id;
            entry = Some(found);
        }
        entry
    }

    /// Resolve the parent of `ident` to its id, requiring it to exist and be
    /// ACTIVE. Metalakes hang off the synthetic root.
    fn resolve_parent(inner: &StoreInner, ident: &NameIdent) -> Result<i64> {
        let Some(parent) = ident.parent() else {
            return Ok(ROOT_ID);
        };
        Self::lookup(inner, &parent)
            .map(|entry| entry.id)
            .ok_or_else(|| {
                catalog_err::NotFoundSnafu {
                    type_name: kind_at_depth(parent.depth()).to_string(),
                    name: parent.to_string(),
                }
                .build()
            })
    }

    fn load_row<T: Entity>(inner: &StoreInner, parent_id: i64, id: i64) -> Result<RwObject<T>> {
        let key = row_key(T::KIND, parent_id, id);
        let value = inner.rows.get(&key).ok_or_else(|| {
            catalog_err::StorageUnavailableSnafu {
                message: format!("index points at missing row {key}"),
            }
            .build()
        })?;
        serde_json::from_value(value.clone()).context(catalog_err::SerdeSnafu)
    }

    fn write_row<T: Entity>(inner: &mut StoreInner, parent_id: i64, rwo: &RwObject<T>) -> Result<()> {
        let value = serde_json::to_value(rwo).context(catalog_err::SerdeSnafu)?;
        inner
            .rows
            .insert(row_key(T::KIND, parent_id, rwo.id), value);
        Ok(())
    }

    fn append_child_index(
        inner: &mut StoreInner,
        kind: EntityKind,
        parent_id: i64,
        id: i64,
    ) -> Result<()> {
        inner
            .child_index
            .entry(child_key(kind, parent_id))
            .or_default()
            .insert(id);
        Ok(())
    }

    async fn create_entity<T: Entity>(
        &self,
        ident: &NameIdent,
        data: T,
        principal: &str,
    ) -> Result<RwObject<T>> {
        ident.require_depth(T::KIND.depth())?;
        let mut inner = self.inner.write().await;
        let parent_id = Self::resolve_parent(&inner, ident)?;
        let nkey = name_key(T::KIND, parent_id, ident.name());
        if inner.name_index.contains_key(&nkey) {
            return catalog_err::AlreadyExistsSnafu {
                type_name: T::KIND.to_string(),
                name: ident.to_string(),
            }
            .fail();
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let rwo = RwObject::new(data, id, ident.clone(), principal);
        Self::write_row(&mut inner, parent_id, &rwo)?;
        // Two-phase: the row exists before it becomes listable. A failed
        // index append must not leave a listed child, so compensate by
        // deleting the row; the reverse transient state (unlisted orphan
        // row) is swept by reconcile().
        if let Err(e) = Self::append_child_index(&mut inner, T::KIND, parent_id, id) {
            inner.rows.remove(&row_key(T::KIND, parent_id, id));
            return Err(e);
        }
        inner.name_index.insert(nkey, IndexEntry { id, parent_id });
        Ok(rwo)
    }

    async fn get_entity<T: Entity>(&self, ident: &NameIdent) -> Result<Option<RwObject<T>>> {
        ident.require_depth(T::KIND.depth())?;
        let inner = self.inner.read().await;
        let Some(entry) = Self::lookup(&inner, ident) else {
            return Ok(None);
        };
        Self::load_row(&inner, entry.parent_id, entry.id).map(Some)
    }

    async fn list_entities<T: Entity>(&self, parent: Option<&NameIdent>) -> Result<Vec<RwObject<T>>> {
        let inner = self.inner.read().await;
        let parent_id = match parent {
            None => ROOT_ID,
            Some(parent_ident) => {
                let parent_kind = kind_at_depth(T::KIND.depth() - 1);
                parent_ident.require_depth(parent_kind.depth())?;
                Self::lookup(&inner, parent_ident)
                    .map(|entry| entry.id)
                    .ok_or_else(|| {
                        catalog_err::NotFoundSnafu {
                            type_name: parent_kind.to_string(),
                            name: parent_ident.to_string(),
                        }
                        .build()
                    })?
            }
        };
        let mut result = Vec::new();
        if let Some(children) = inner.child_index.get(&child_key(T::KIND, parent_id)) {
            for id in children {
                // Tombstoned rows stay in the child index until purge and
                // are filtered here.
                if inner.rows.contains_key(&row_key(T::KIND, parent_id, *id)) {
                    let rwo: RwObject<T> = Self::load_row(&inner, parent_id, *id)?;
                    if rwo.is_active() {
                        result.push(rwo);
                    }
                }
            }
        }
        result.sort_by(|a, b| a.ident.to_string().cmp(&b.ident.to_string()));
        Ok(result)
    }

    async fn update_entity<T: Entity>(
        &self,
        ident: &NameIdent,
        new_ident: &NameIdent,
        data: T,
        expected_version: u64,
        principal: &str,
    ) -> Result<RwObject<T>> {
        ident.require_depth(T::KIND.depth())?;
        new_ident.require_depth(T::KIND.depth())?;
        if new_ident.parent() != ident.parent() {
            return catalog_err::MalformedIdentifierSnafu {
                ident: new_ident.to_string(),
                reason: "rename cannot move an entity to another parent".to_string(),
            }
            .fail();
        }
        let mut inner = self.inner.write().await;
        let entry = Self::lookup(&inner, ident).ok_or_else(|| {
            catalog_err::NotFoundSnafu {
                type_name: T::KIND.to_string(),
                name: ident.to_string(),
            }
            .build()
        })?;
        let mut rwo: RwObject<T> = Self::load_row(&inner, entry.parent_id, entry.id)?;
        if rwo.version != expected_version {
            return catalog_err::VersionConflictSnafu {
                type_name: T::KIND.to_string(),
                name: ident.to_string(),
                expected: expected_version,
                actual: rwo.version,
            }
            .fail();
        }
        if new_ident != ident {
            let new_nkey = name_key(T::KIND, entry.parent_id, new_ident.name());
            if inner.name_index.contains_key(&new_nkey) {
                return catalog_err::AlreadyExistsSnafu {
                    type_name: T::KIND.to_string(),
                    name: new_ident.to_string(),
                }
                .fail();
            }
            inner
                .name_index
                .remove(&name_key(T::KIND, entry.parent_id, ident.name()));
            inner.name_index.insert(new_nkey, entry);
            // Descendant index entries hang off this entity's id and need no
            // touch-up; the full paths stored in their rows do.
            Self::rewrite_descendant_idents(&mut inner, T::KIND, entry.id, new_ident)?;
        }
        rwo.update(data, new_ident.clone(), principal);
        Self::write_row(&mut inner, entry.parent_id, &rwo)?;
        Ok(rwo)
    }

    /// After a rename, refresh the `ident` recorded in every descendant row
    /// so loads and listings print the live path.
    fn rewrite_descendant_idents(
        inner: &mut StoreInner,
        kind: EntityKind,
        id: i64,
        new_prefix: &NameIdent,
    ) -> Result<()> {
        let Some(child_kind) = child_kind_of(kind) else {
            return Ok(());
        };
        let Some(children) = inner.child_index.get(&child_key(child_kind, id)).cloned() else {
            return Ok(());
        };
        for child_id in children {
            let key = row_key(child_kind, id, child_id);
            let Some(own_name) = inner
                .rows
                .get(&key)
                .and_then(|value| value.get("ident"))
                .and_then(|ident| ident.as_array())
                .and_then(|segments| segments.last())
                .and_then(|segment| segment.as_str())
                .map(str::to_string)
            else {
                continue;
            };
            let child_ident = new_prefix.child(&own_name)?;
            let ident_value = serde_json::to_value(&child_ident).context(catalog_err::SerdeSnafu)?;
            if let Some(row) = inner.rows.get_mut(&key).and_then(|v| v.as_object_mut()) {
                row.insert("ident".to_string(), ident_value);
            }
            Self::rewrite_descendant_idents(inner, child_kind, child_id, &child_ident)?;
        }
        Ok(())
    }

    async fn soft_delete_entity<T: Entity>(
        &self,
        ident: &NameIdent,
        expected_version: u64,
        principal: &str,
    ) -> Result<()> {
        ident.require_depth(T::KIND.depth())?;
        let mut inner = self.inner.write().await;
        let entry = Self::lookup(&inner, ident).ok_or_else(|| {
            catalog_err::NotFoundSnafu {
                type_name: T::KIND.to_string(),
                name: ident.to_string(),
            }
            .build()
        })?;
        let mut rwo: RwObject<T> = Self::load_row(&inner, entry.parent_id, entry.id)?;
        if rwo.version != expected_version {
            return catalog_err::VersionConflictSnafu {
                type_name: T::KIND.to_string(),
                name: ident.to_string(),
                expected: expected_version,
                actual: rwo.version,
            }
            .fail();
        }
        rwo.tombstone(principal);
        Self::write_row(&mut inner, entry.parent_id, &rwo)?;
        // The name becomes reusable immediately; the row and child-index
        // entry linger until purge.
        inner
            .name_index
            .remove(&name_key(T::KIND, entry.parent_id, ident.name()));
        Ok(())
    }

    /// Remove the tombstoned row named `ident`. A row recreated under the
    /// same name keeps its distinct id and is untouched.
    async fn purge_entity<T: Entity>(&self, ident: &NameIdent) -> Result<()> {
        ident.require_depth(T::KIND.depth())?;
        let mut inner = self.inner.write().await;
        let parent_id = Self::resolve_parent(&inner, ident)?;
        let ckey = child_key(T::KIND, parent_id);
        let Some(children) = inner.child_index.get(&ckey) else {
            return catalog_err::NotFoundSnafu {
                type_name: T::KIND.to_string(),
                name: ident.to_string(),
            }
            .fail();
        };
        let mut victim = None;
        for id in children {
            let key = row_key(T::KIND, parent_id, *id);
            if let Some(value) = inner.rows.get(&key) {
                let rwo: RwObject<T> =
                    serde_json::from_value(value.clone()).context(catalog_err::SerdeSnafu)?;
                if rwo.ident == *ident && rwo.status == EntityStatus::Dropped {
                    victim = Some((key, *id));
                    break;
                }
            }
        }
        let Some((key, id)) = victim else {
            return catalog_err::NotFoundSnafu {
                type_name: T::KIND.to_string(),
                name: ident.to_string(),
            }
            .fail();
        };
        inner.rows.remove(&key);
        if let Some(children) = inner.child_index.get_mut(&ckey) {
            children.remove(&id);
        }
        Ok(())
    }

    /// Test hook: perform only phase one of a create, leaving an unlisted
    /// orphan row for reconcile() to sweep.
    #[cfg(test)]
    pub(crate) async fn create_orphan_row_for_tests<T: Entity>(
        &self,
        ident: &NameIdent,
        data: T,
    ) -> Result<i64> {
        let mut inner = self.inner.write().await;
        let parent_id = Self::resolve_parent(&inner, ident)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let rwo = RwObject::new(data, id, ident.clone(), "test");
        Self::write_row(&mut inner, parent_id, &rwo)?;
        Ok(id)
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    #[instrument(name = "MemoryEntityStore::create_metalake", level = "debug", skip(self, metalake), err)]
    async fn create_metalake(
        &self,
        ident: &NameIdent,
        metalake: Metalake,
        principal: &str,
    ) -> Result<RwObject<Metalake>> {
        self.create_entity(ident, metalake, principal).await
    }

    async fn get_metalake(&self, ident: &NameIdent) -> Result<Option<RwObject<Metalake>>> {
        self.get_entity(ident).await
    }

    async fn list_metalakes(&self) -> Result<Vec<RwObject<Metalake>>> {
        self.list_entities(None).await
    }

    #[instrument(name = "MemoryEntityStore::update_metalake", level = "debug", skip(self, metalake), err)]
    async fn update_metalake(
        &self,
        ident: &NameIdent,
        new_ident: &NameIdent,
        metalake: Metalake,
        expected_version: u64,
        principal: &str,
    ) -> Result<RwObject<Metalake>> {
        self.update_entity(ident, new_ident, metalake, expected_version, principal)
            .await
    }

    #[instrument(name = "MemoryEntityStore::soft_delete_metalake", level = "debug", skip(self), err)]
    async fn soft_delete_metalake(
        &self,
        ident: &NameIdent,
        expected_version: u64,
        principal: &str,
    ) -> Result<()> {
        self.soft_delete_entity::<Metalake>(ident, expected_version, principal)
            .await
    }

    async fn purge_metalake(&self, ident: &NameIdent) -> Result<()> {
        self.purge_entity::<Metalake>(ident).await
    }

    #[instrument(name = "MemoryEntityStore::create_catalog", level = "debug", skip(self, catalog), err)]
    async fn create_catalog(
        &self,
        ident: &NameIdent,
        catalog: Catalog,
        principal: &str,
    ) -> Result<RwObject<Catalog>> {
        self.create_entity(ident, catalog, principal).await
    }

    async fn get_catalog(&self, ident: &NameIdent) -> Result<Option<RwObject<Catalog>>> {
        self.get_entity(ident).await
    }

    async fn list_catalogs(&self, metalake: &NameIdent) -> Result<Vec<RwObject<Catalog>>> {
        self.list_entities(Some(metalake)).await
    }

    #[instrument(name = "MemoryEntityStore::update_catalog", level = "debug", skip(self, catalog), err)]
    async fn update_catalog(
        &self,
        ident: &NameIdent,
        new_ident: &NameIdent,
        catalog: Catalog,
        expected_version: u64,
        principal: &str,
    ) -> Result<RwObject<Catalog>> {
        self.update_entity(ident, new_ident, catalog, expected_version, principal)
            .await
    }

    #[instrument(name = "MemoryEntityStore::soft_delete_catalog", level = "debug", skip(self), err)]
    async fn soft_delete_catalog(
        &self,
        ident: &NameIdent,
        expected_version: u64,
        principal: &str,
    ) -> Result<()> {
        self.soft_delete_entity::<Catalog>(ident, expected_version, principal)
            .await
    }

    async fn purge_catalog(&self, ident: &NameIdent) -> Result<()> {
        self.purge_entity::<Catalog>(ident).await
    }

    #[instrument(name = "MemoryEntityStore::create_schema", level = "debug", skip(self, schema), err)]
    async fn create_schema(
        &self,
        ident: &NameIdent,
        schema: Schema,
        principal: &str,
    ) -> Result<RwObject<Schema>> {
        self.create_entity(ident, schema, principal).await
    }

    async fn get_schema(&self, ident: &NameIdent) -> Result<Option<RwObject<Schema>>> {
        self.get_entity(ident).await
    }

    async fn list_schemas(&self, catalog: &NameIdent) -> Result<Vec<RwObject<Schema>>> {
        self.list_entities(Some(catalog)).await
    }

    #[instrument(name = "MemoryEntityStore::update_schema", level = "debug", skip(self, schema), err)]
    async fn update_schema(
        &self,
        ident: &NameIdent,
        new_ident: &NameIdent,
        schema: Schema,
        expected_version: u64,
        principal: &str,
    ) -> Result<RwObject<Schema>> {
        self.update_entity(ident, new_ident, schema, expected_version, principal)
            .await
    }

    #[instrument(name = "MemoryEntityStore::soft_delete_schema", level = "debug", skip(self), err)]
    async fn soft_delete_schema(
        &self,
        ident: &NameIdent,
        expected_version: u64,
        principal: &str,
    ) -> Result<()> {
        self.soft_delete_entity::<Schema>(ident, expected_version, principal)
            .await
    }

    async fn purge_schema(&self, ident: &NameIdent) -> Result<()> {
        self.purge_entity::<Schema>(ident).await
    }

    #[instrument(name = "MemoryEntityStore::create_object", level = "debug", skip(self, object), err)]
    async fn create_object(
        &self,
        ident: &NameIdent,
        object: ObjectPointer,
        principal: &str,
    ) -> Result<RwObject<ObjectPointer>> {
        self.create_entity(ident, object, principal).await
    }

    async fn get_object(&self, ident: &NameIdent) -> Result<Option<RwObject<ObjectPointer>>> {
        self.get_entity(ident).await
    }

    async fn list_objects(&self, schema: &NameIdent) -> Result<Vec<RwObject<ObjectPointer>>> {
        self.list_entities(Some(schema)).await
    }

    #[instrument(name = "MemoryEntityStore::soft_delete_object", level = "debug", skip(self), err)]
    async fn soft_delete_object(
        &self,
        ident: &NameIdent,
        expected_version: u64,
        principal: &str,
    ) -> Result<()> {
        self.soft_delete_entity::<ObjectPointer>(ident, expected_version, principal)
            .await
    }

    async fn purge_object(&self, ident: &NameIdent) -> Result<()> {
        self.purge_entity::<ObjectPointer>(ident).await
    }

    #[instrument(name = "MemoryEntityStore::reconcile", level = "debug", skip(self), err)]
    async fn reconcile(&self) -> Result<ReconcileReport> {
        let mut inner = self.inner.write().await;
        let mut report = ReconcileReport::default();
        let mut orphan_keys = Vec::new();
        for (key, value) in &inner.rows {
            let Some((ckey, id)) = key.rsplit_once('/') else {
                continue;
            };
            let Ok(id) = id.parse::<i64>() else {
                continue;
            };
            let listed = inner
                .child_index
                .get(ckey)
                .is_some_and(|children| children.contains(&id));
            let ident = value
                .get("ident")
                .and_then(|v| v.as_array())
                .map_or_else(
                    || "<unknown>".to_string(),
                    |segments| {
                        segments
                            .iter()
                            .filter_map(|s| s.as_str())
                            .collect::<Vec<_>>()
                            .join(".")
                    },
                );
            let status = value.get("status").and_then(|v| v.as_str());
            if !listed {
                report.removed_orphans.push(ident);
                orphan_keys.push(key.clone());
            } else if status == Some("DROPPED") {
                report.pending_purge.push(ident);
            }
        }
        for key in orphan_keys {
            inner.rows.remove(&key);
        }
        Ok(report)
    }
}
