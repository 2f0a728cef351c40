#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::CatalogConfig;
use crate::connector::CatalogConnector;
use crate::dispatcher::{CatalogDispatcher, OperationStage};
use crate::error::{self as catalog_err, Error, Result};
use crate::ident::NameIdent;
use crate::models::{
    Catalog, CatalogUpdate, Metalake, ObjectKind, ObjectPointer, RwObject, Schema, SchemaUpdate,
};
use crate::providers::memory::{MemoryConnector, MemoryConnectorFactory};
use crate::registry::{ConnectorFactory, ProviderRegistry};
use crate::store::memory::MemoryEntityStore;
use crate::store::{EntityStore, ReconcileReport};

fn ident(path: &str) -> NameIdent {
    NameIdent::parse(path).expect("valid ident")
}

/// Factory that counts constructions, used to observe lazy instantiation.
#[derive(Debug, Default)]
struct CountingFactory {
    builds: Arc<AtomicUsize>,
}

#[async_trait]
impl ConnectorFactory for CountingFactory {
    fn required_properties(&self) -> &[&str] {
        &["connection-url", "username", "password"]
    }

    async fn build(
        &self,
        ident: &NameIdent,
        _properties: &HashMap<String, String>,
    ) -> Result<Arc<dyn CatalogConnector>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemoryConnector::new(ident.clone())))
    }
}

/// Factory whose backend is unreachable: every build fails.
#[derive(Debug)]
struct UnreachableFactory;

#[async_trait]
impl ConnectorFactory for UnreachableFactory {
    async fn build(
        &self,
        _ident: &NameIdent,
        _properties: &HashMap<String, String>,
    ) -> Result<Arc<dyn CatalogConnector>> {
        catalog_err::BackendUnavailableSnafu {
            provider: "unreachable".to_string(),
            message: "connection refused".to_string(),
        }
        .fail()
    }
}

fn jdbc_properties() -> HashMap<String, String> {
    HashMap::from([
        ("connection-url".to_string(), "jdbc:mysql://db:3306".to_string()),
        ("username".to_string(), "root".to_string()),
        ("password".to_string(), "secret".to_string()),
    ])
}

fn dispatcher_with(
    store: Arc<dyn EntityStore>,
    registry: Arc<ProviderRegistry>,
) -> CatalogDispatcher {
    CatalogDispatcher::new(store, registry, CatalogConfig::default())
}

fn memory_dispatcher() -> CatalogDispatcher {
    let registry = ProviderRegistry::builder()
        .register("memory", Arc::new(MemoryConnectorFactory::default()))
        .build();
    dispatcher_with(Arc::new(MemoryEntityStore::new()), registry)
}

async fn seeded(dispatcher: &CatalogDispatcher) {
    dispatcher
        .create_metalake(&ident("m1"), Metalake::default(), Some("alice"))
        .await
        .expect("create metalake");
    dispatcher
        .create_catalog(&ident("m1.c1"), Catalog::new("memory"), Some("alice"))
        .await
        .expect("create catalog");
}

#[tokio::test]
async fn test_full_lifecycle_scenario() {
    let builds = Arc::new(AtomicUsize::new(0));
    let registry = ProviderRegistry::builder()
        .register(
            "jdbc-mysql",
            Arc::new(CountingFactory {
                builds: Arc::clone(&builds),
            }),
        )
        .build();
    let dispatcher = dispatcher_with(Arc::new(MemoryEntityStore::new()), registry);

    dispatcher
        .create_metalake(&ident("m1"), Metalake::default(), Some("alice"))
        .await
        .expect("create metalake");

    let catalog = dispatcher
        .create_catalog(
            &ident("m1.c1"),
            Catalog::new("jdbc-mysql").with_properties(jdbc_properties()),
            Some("alice"),
        )
        .await
        .expect("create catalog");
    assert_eq!(catalog.version, 1);
    // Registration is metadata-only; the connector is built on first use.
    assert_eq!(builds.load(Ordering::SeqCst), 0);

    dispatcher
        .create_schema(&ident("m1.c1.s1"), Schema::default(), Some("alice"))
        .await
        .expect("create schema");
    assert_eq!(builds.load(Ordering::SeqCst), 1);

    dispatcher
        .create_object(
            &ident("m1.c1.s1.t1"),
            ObjectPointer::new(ObjectKind::Table),
            Some("alice"),
        )
        .await
        .expect("create table");
    // Connector instance is reused across operations under the same catalog.
    assert_eq!(builds.load(Ordering::SeqCst), 1);

    let objects = dispatcher.list_objects(&ident("m1.c1.s1")).await.unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].ident.name(), "t1");

    // Alter with the current version succeeds and bumps the version by 1.
    let update = CatalogUpdate {
        set_properties: HashMap::from([("pool-size".to_string(), "4".to_string())]),
        ..Default::default()
    };
    let altered = dispatcher
        .alter_catalog(&ident("m1.c1"), update.clone(), catalog.version, Some("bob"))
        .await
        .expect("alter catalog");
    assert_eq!(altered.version, catalog.version + 1);
    assert_eq!(altered.updated_by, "bob");

    // Replaying the identical alter with the now-stale version is rejected.
    let err = dispatcher
        .alter_catalog(&ident("m1.c1"), update, catalog.version, Some("bob"))
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(OperationStage::MetadataCommitting));
    assert!(matches!(err.root(), Error::ConcurrentModification { .. }));
}

#[tokio::test]
async fn test_unknown_provider_persists_nothing() {
    let dispatcher = memory_dispatcher();
    dispatcher
        .create_metalake(&ident("m1"), Metalake::default(), None)
        .await
        .unwrap();

    let err = dispatcher
        .create_catalog(&ident("m1.c1"), Catalog::new("nope"), None)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(OperationStage::Resolving));
    assert!(matches!(err.root(), Error::UnknownProvider { .. }));
    assert!(dispatcher.list_catalogs(&ident("m1")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_configuration_rejected_before_construction() {
    let builds = Arc::new(AtomicUsize::new(0));
    let registry = ProviderRegistry::builder()
        .register(
            "jdbc-mysql",
            Arc::new(CountingFactory {
                builds: Arc::clone(&builds),
            }),
        )
        .build();
    let dispatcher = dispatcher_with(Arc::new(MemoryEntityStore::new()), registry);
    dispatcher
        .create_metalake(&ident("m1"), Metalake::default(), None)
        .await
        .unwrap();

    let err = dispatcher
        .create_catalog(&ident("m1.c1"), Catalog::new("jdbc-mysql"), None)
        .await
        .unwrap_err();
    assert!(matches!(err.root(), Error::InvalidConfiguration { .. }));
    assert_eq!(builds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_backend_failure_leaves_no_metadata() {
    let registry = ProviderRegistry::builder()
        .register("unreachable", Arc::new(UnreachableFactory))
        .build();
    let store = Arc::new(MemoryEntityStore::new());
    let dispatcher = dispatcher_with(store.clone(), registry);
    dispatcher
        .create_metalake(&ident("m1"), Metalake::default(), None)
        .await
        .unwrap();
    dispatcher
        .create_catalog(&ident("m1.c1"), Catalog::new("unreachable"), None)
        .await
        .expect("metadata-only registration succeeds with an unreachable backend");

    let err = dispatcher
        .create_schema(&ident("m1.c1.s1"), Schema::default(), None)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(OperationStage::BackendEnacting));
    assert!(matches!(err.root(), Error::BackendUnavailable { .. }));
    assert!(store.get_schema(&ident("m1.c1.s1")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_drop_catalog_hides_immediately_even_if_cleanup_fails() {
    let registry = ProviderRegistry::builder()
        .register("unreachable", Arc::new(UnreachableFactory))
        .build();
    let dispatcher = dispatcher_with(Arc::new(MemoryEntityStore::new()), registry);
    dispatcher
        .create_metalake(&ident("m1"), Metalake::default(), None)
        .await
        .unwrap();
    let catalog = dispatcher
        .create_catalog(&ident("m1.c1"), Catalog::new("unreachable"), None)
        .await
        .unwrap();

    let err = dispatcher
        .drop_catalog(&ident("m1.c1"), catalog.version, None)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(OperationStage::BackendEnacting));

    // Tombstoned: invisible to listings although backend cleanup failed.
    assert!(dispatcher.list_catalogs(&ident("m1")).await.unwrap().is_empty());
    let report = dispatcher.reconcile().await.unwrap();
    assert!(!report.pending_purge.is_empty());
}

#[tokio::test]
async fn test_drop_schema_full_path() {
    let dispatcher = memory_dispatcher();
    seeded(&dispatcher).await;
    let schema = dispatcher
        .create_schema(&ident("m1.c1.s1"), Schema::default(), None)
        .await
        .unwrap();

    dispatcher
        .drop_schema(&ident("m1.c1.s1"), schema.version, None)
        .await
        .expect("drop schema");
    assert!(dispatcher.list_schemas(&ident("m1.c1")).await.unwrap().is_empty());
    // Fully purged, nothing pending.
    let report = dispatcher.reconcile().await.unwrap();
    assert_eq!(report, ReconcileReport::default());

    // The name is reusable right away.
    dispatcher
        .create_schema(&ident("m1.c1.s1"), Schema::default(), None)
        .await
        .expect("recreate schema under the same name");
}

#[tokio::test]
async fn test_drop_with_stale_version_is_version_conflict() {
    let dispatcher = memory_dispatcher();
    seeded(&dispatcher).await;
    let schema = dispatcher
        .create_schema(&ident("m1.c1.s1"), Schema::default(), None)
        .await
        .unwrap();

    // The tombstone write happens before any backend call, so staleness
    // here is an ordinary version conflict, not a divergence.
    let err = dispatcher
        .drop_schema(&ident("m1.c1.s1"), schema.version + 7, None)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(OperationStage::MetadataCommitting));
    assert!(matches!(err.root(), Error::VersionConflict { .. }));
}

#[tokio::test]
async fn test_concurrent_alters_exactly_one_wins() {
    let dispatcher = Arc::new(memory_dispatcher());
    seeded(&dispatcher).await;
    let schema = dispatcher
        .create_schema(&ident("m1.c1.s1"), Schema::default(), None)
        .await
        .unwrap();

    let update_a = SchemaUpdate {
        comment: Some("a".to_string()),
        ..Default::default()
    };
    let update_b = SchemaUpdate {
        comment: Some("b".to_string()),
        ..Default::default()
    };
    let target = ident("m1.c1.s1");
    let (a, b) = tokio::join!(
        dispatcher.alter_schema(&target, update_a, schema.version, Some("a")),
        dispatcher.alter_schema(&target, update_b, schema.version, Some("b")),
    );
    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(matches!(loser.root(), Error::ConcurrentModification { .. }));
}

#[tokio::test]
async fn test_metalake_drop_refused_while_catalogs_remain() {
    let dispatcher = memory_dispatcher();
    seeded(&dispatcher).await;
    let metalake = dispatcher.load_metalake(&ident("m1")).await.unwrap();

    let err = dispatcher
        .drop_metalake(&ident("m1"), metalake.version, None)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(OperationStage::Resolving));
    match err.root() {
        Error::NonEmpty { children, .. } => assert_eq!(children, "c1"),
        other => panic!("unexpected error: {other:?}"),
    }

    let catalog = dispatcher.load_catalog(&ident("m1.c1")).await.unwrap();
    dispatcher
        .drop_catalog(&ident("m1.c1"), catalog.version, None)
        .await
        .unwrap();
    dispatcher
        .drop_metalake(&ident("m1"), metalake.version, None)
        .await
        .expect("drop empty metalake");
    assert!(dispatcher.list_metalakes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_catalog_rename_remaps_schemas() {
    let dispatcher = memory_dispatcher();
    seeded(&dispatcher).await;
    dispatcher
        .create_schema(&ident("m1.c1.s1"), Schema::default(), None)
        .await
        .unwrap();

    let update = CatalogUpdate {
        new_name: Some("c2".to_string()),
        ..Default::default()
    };
    dispatcher
        .alter_catalog(&ident("m1.c1"), update, 1, None)
        .await
        .unwrap();

    // The schema follows its renamed parent; the old path is dead.
    let schema = dispatcher.load_schema(&ident("m1.c2.s1")).await.unwrap();
    assert_eq!(schema.ident.to_string(), "m1.c2.s1");
    let err = dispatcher.load_schema(&ident("m1.c1.s1")).await.unwrap_err();
    assert!(matches!(err.root(), Error::NotFound { .. }));
    let err = dispatcher.list_schemas(&ident("m1.c1")).await.unwrap_err();
    assert!(matches!(err.root(), Error::NotFound { .. }));
    let schemas = dispatcher.list_schemas(&ident("m1.c2")).await.unwrap();
    assert_eq!(schemas.len(), 1);
    assert_eq!(schemas[0].ident.to_string(), "m1.c2.s1");
}

#[tokio::test]
async fn test_provider_change_rejected() {
    let dispatcher = memory_dispatcher();
    seeded(&dispatcher).await;

    let update = CatalogUpdate {
        set_properties: HashMap::from([("provider".to_string(), "jdbc".to_string())]),
        ..Default::default()
    };
    let err = dispatcher
        .alter_catalog(&ident("m1.c1"), update, 1, None)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(OperationStage::Resolving));
    assert!(matches!(err.root(), Error::ProviderImmutable { .. }));
}

#[tokio::test]
async fn test_property_alter_invalidates_cached_connector() {
    let builds = Arc::new(AtomicUsize::new(0));
    let registry = ProviderRegistry::builder()
        .register(
            "jdbc-mysql",
            Arc::new(CountingFactory {
                builds: Arc::clone(&builds),
            }),
        )
        .build();
    let dispatcher = dispatcher_with(Arc::new(MemoryEntityStore::new()), registry);
    dispatcher
        .create_metalake(&ident("m1"), Metalake::default(), None)
        .await
        .unwrap();
    let catalog = dispatcher
        .create_catalog(
            &ident("m1.c1"),
            Catalog::new("jdbc-mysql").with_properties(jdbc_properties()),
            None,
        )
        .await
        .unwrap();

    dispatcher
        .create_schema(&ident("m1.c1.s1"), Schema::default(), None)
        .await
        .unwrap();
    assert_eq!(builds.load(Ordering::SeqCst), 1);

    let update = CatalogUpdate {
        set_properties: HashMap::from([("pool-size".to_string(), "8".to_string())]),
        ..Default::default()
    };
    dispatcher
        .alter_catalog(&ident("m1.c1"), update, catalog.version, None)
        .await
        .unwrap();

    // The stale instance is gone; the next operation builds fresh.
    dispatcher
        .create_schema(&ident("m1.c1.s2"), Schema::default(), None)
        .await
        .unwrap();
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

/// Store wrapper that fails a bounded number of times before recovering,
/// simulating a transiently unavailable backend.
#[derive(Debug)]
struct FlakyStore {
    inner: MemoryEntityStore,
    remaining_failures: AtomicUsize,
}

impl FlakyStore {
    fn failing_once() -> Self {
        Self {
            inner: MemoryEntityStore::new(),
            remaining_failures: AtomicUsize::new(1),
        }
    }

    fn trip(&self) -> Result<()> {
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
            catalog_err::StorageUnavailableSnafu {
                message: "injected outage".to_string(),
            }
            .fail()
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EntityStore for FlakyStore {
    async fn create_metalake(
        &self,
        ident: &NameIdent,
        metalake: Metalake,
        principal: &str,
    ) -> Result<RwObject<Metalake>> {
        self.trip()?;
        self.inner.create_metalake(ident, metalake, principal).await
    }

    async fn get_metalake(&self, ident: &NameIdent) -> Result<Option<RwObject<Metalake>>> {
        self.inner.get_metalake(ident).await
    }

    async fn list_metalakes(&self) -> Result<Vec<RwObject<Metalake>>> {
        self.inner.list_metalakes().await
    }

    async fn update_metalake(
        &self,
        ident: &NameIdent,
        new_ident: &NameIdent,
        metalake: Metalake,
        expected_version: u64,
        principal: &str,
    ) -> Result<RwObject<Metalake>> {
        self.inner
            .update_metalake(ident, new_ident, metalake, expected_version, principal)
            .await
    }

    async fn soft_delete_metalake(
        &self,
        ident: &NameIdent,
        expected_version: u64,
        principal: &str,
    ) -> Result<()> {
        self.inner
            .soft_delete_metalake(ident, expected_version, principal)
            .await
    }

    async fn purge_metalake(&self, ident: &NameIdent) -> Result<()> {
        self.inner.purge_metalake(ident).await
    }

    async fn create_catalog(
        &self,
        ident: &NameIdent,
        catalog: Catalog,
        principal: &str,
    ) -> Result<RwObject<Catalog>> {
        self.trip()?;
        self.inner.create_catalog(ident, catalog, principal).await
    }

    async fn get_catalog(&self, ident: &NameIdent) -> Result<Option<RwObject<Catalog>>> {
        self.inner.get_catalog(ident).await
    }

    async fn list_catalogs(&self, metalake: &NameIdent) -> Result<Vec<RwObject<Catalog>>> {
        self.inner.list_catalogs(metalake).await
    }

    async fn update_catalog(
        &self,
        ident: &NameIdent,
        new_ident: &NameIdent,
        catalog: Catalog,
        expected_version: u64,
        principal: &str,
    ) -> Result<RwObject<Catalog>> {
        self.inner
            .update_catalog(ident, new_ident, catalog, expected_version, principal)
            .await
    }

    async fn soft_delete_catalog(
        &self,
        ident: &NameIdent,
        expected_version: u64,
        principal: &str,
    ) -> Result<()> {
        self.inner
            .soft_delete_catalog(ident, expected_version, principal)
            .await
    }

    async fn purge_catalog(&self, ident: &NameIdent) -> Result<()> {
        self.inner.purge_catalog(ident).await
    }

    async fn create_schema(
        &self,
        ident: &NameIdent,
        schema: Schema,
        principal: &str,
    ) -> Result<RwObject<Schema>> {
        self.trip()?;
        self.inner.create_schema(ident, schema, principal).await
    }

    async fn get_schema(&self, ident: &NameIdent) -> Result<Option<RwObject<Schema>>> {
        self.inner.get_schema(ident).await
    }

    async fn list_schemas(&self, catalog: &NameIdent) -> Result<Vec<RwObject<Schema>>> {
        self.inner.list_schemas(catalog).await
    }

    async fn update_schema(
        &self,
        ident: &NameIdent,
        new_ident: &NameIdent,
        schema: Schema,
        expected_version: u64,
        principal: &str,
    ) -> Result<RwObject<Schema>> {
        self.inner
            .update_schema(ident, new_ident, schema, expected_version, principal)
            .await
    }

    async fn soft_delete_schema(
        &self,
        ident: &NameIdent,
        expected_version: u64,
        principal: &str,
    ) -> Result<()> {
        self.inner
            .soft_delete_schema(ident, expected_version, principal)
            .await
    }

    async fn purge_schema(&self, ident: &NameIdent) -> Result<()> {
        self.inner.purge_schema(ident).await
    }

    async fn create_object(
        &self,
        ident: &NameIdent,
        object: ObjectPointer,
        principal: &str,
    ) -> Result<RwObject<ObjectPointer>> {
        self.trip()?;
        self.inner.create_object(ident, object, principal).await
    }

    async fn get_object(&self, ident: &NameIdent) -> Result<Option<RwObject<ObjectPointer>>> {
        self.inner.get_object(ident).await
    }

    async fn list_objects(&self, schema: &NameIdent) -> Result<Vec<RwObject<ObjectPointer>>> {
        self.inner.list_objects(schema).await
    }

    async fn soft_delete_object(
        &self,
        ident: &NameIdent,
        expected_version: u64,
        principal: &str,
    ) -> Result<()> {
        self.inner
            .soft_delete_object(ident, expected_version, principal)
            .await
    }

    async fn purge_object(&self, ident: &NameIdent) -> Result<()> {
        self.inner.purge_object(ident).await
    }

    async fn reconcile(&self) -> Result<ReconcileReport> {
        self.inner.reconcile().await
    }
}

#[tokio::test]
async fn test_transient_storage_failure_is_retried() {
    let store = Arc::new(FlakyStore::failing_once());
    let registry = ProviderRegistry::builder()
        .register("memory", Arc::new(MemoryConnectorFactory::default()))
        .build();
    let dispatcher = dispatcher_with(store.clone(), registry);

    dispatcher
        .create_metalake(&ident("m1"), Metalake::default(), None)
        .await
        .expect("commit retried past one transient failure");
    assert_eq!(store.remaining_failures.load(Ordering::SeqCst), 0);
    assert_eq!(dispatcher.list_metalakes().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_backend_timeout_is_cancelled_without_metadata() {
    /// Connector that hangs on every call.
    #[derive(Debug)]
    struct StuckConnector;

    #[async_trait]
    impl CatalogConnector for StuckConnector {
        fn provider(&self) -> &str {
            "stuck"
        }

        async fn create_schema(&self, _ident: &NameIdent, _schema: &Schema) -> Result<()> {
            futures::future::pending::<()>().await;
            Ok(())
        }
    }

    #[derive(Debug)]
    struct StuckFactory;

    #[async_trait]
    impl ConnectorFactory for StuckFactory {
        async fn build(
            &self,
            _ident: &NameIdent,
            _properties: &HashMap<String, String>,
        ) -> Result<Arc<dyn CatalogConnector>> {
            Ok(Arc::new(StuckConnector))
        }
    }

    let registry = ProviderRegistry::builder()
        .register("stuck", Arc::new(StuckFactory))
        .build();
    let store = Arc::new(MemoryEntityStore::new());
    let mut config = CatalogConfig::default();
    config.dispatch.backend_timeout_ms = 50;
    let dispatcher = CatalogDispatcher::new(store.clone(), registry, config);

    dispatcher
        .create_metalake(&ident("m1"), Metalake::default(), None)
        .await
        .unwrap();
    dispatcher
        .create_catalog(&ident("m1.c1"), Catalog::new("stuck"), None)
        .await
        .unwrap();

    let err = dispatcher
        .create_schema(&ident("m1.c1.s1"), Schema::default(), None)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(OperationStage::BackendEnacting));
    assert!(matches!(err.root(), Error::Cancelled { .. }));
    assert!(store.get_schema(&ident("m1.c1.s1")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_listings_are_lexicographic() {
    let dispatcher = memory_dispatcher();
    seeded(&dispatcher).await;
    for name in ["zeta", "alpha", "mid"] {
        dispatcher
            .create_schema(&ident(&format!("m1.c1.{name}")), Schema::default(), None)
            .await
            .unwrap();
    }
    let schemas = dispatcher.list_schemas(&ident("m1.c1")).await.unwrap();
    let names: Vec<&str> = schemas.iter().map(|s| s.ident.name()).collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);
}

#[tokio::test]
async fn test_single_flight_connector_for_one_catalog() {
    let builds = Arc::new(AtomicUsize::new(0));
    let registry = ProviderRegistry::builder()
        .register(
            "jdbc-mysql",
            Arc::new(CountingFactory {
                builds: Arc::clone(&builds),
            }),
        )
        .build();
    let dispatcher = Arc::new(dispatcher_with(Arc::new(MemoryEntityStore::new()), registry));
    dispatcher
        .create_metalake(&ident("m1"), Metalake::default(), None)
        .await
        .unwrap();
    dispatcher
        .create_catalog(
            &ident("m1.c1"),
            Catalog::new("jdbc-mysql").with_properties(jdbc_properties()),
            None,
        )
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for i in 0..8 {
        let dispatcher = Arc::clone(&dispatcher);
        tasks.push(tokio::spawn(async move {
            dispatcher
                .create_schema(&ident(&format!("m1.c1.s{i}")), Schema::default(), None)
                .await
        }));
    }
    for task in tasks {
        task.await.expect("join").expect("create schema");
    }
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}
