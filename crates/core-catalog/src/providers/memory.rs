use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::connector::CatalogConnector;
use crate::error::{self as catalog_err, Result};
use crate::ident::NameIdent;
use crate::models::{ObjectKind, ObjectPointer, Schema};
use crate::registry::ConnectorFactory;

use super::MEMORY_PROVIDER;

/// In-memory backend: holds schemas and objects in process memory. Useful
/// for metadata-only catalogs and as the reference connector in tests.
#[derive(Debug)]
pub struct MemoryConnector {
    catalog: NameIdent,
    schemas: DashMap<String, Schema>,
    objects: DashMap<String, ObjectPointer>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl MemoryConnector {
    #[must_use]
    pub fn new(catalog: NameIdent) -> Self {
        Self {
            catalog,
            schemas: DashMap::new(),
            objects: DashMap::new(),
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            catalog_err::BackendUnavailableSnafu {
                provider: MEMORY_PROVIDER.to_string(),
                message: format!("connector for {} is closed", self.catalog),
            }
            .fail()
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CatalogConnector for MemoryConnector {
    fn provider(&self) -> &str {
        MEMORY_PROVIDER
    }

    async fn create_schema(&self, ident: &NameIdent, schema: &Schema) -> Result<()> {
        self.check_open()?;
        let key = ident.to_string();
        if self.schemas.contains_key(&key) {
            return catalog_err::AlreadyExistsSnafu {
                type_name: "schema".to_string(),
                name: key,
            }
            .fail();
        }
        self.schemas.insert(key, schema.clone());
        Ok(())
    }

    async fn alter_schema(&self, ident: &NameIdent, schema: &Schema) -> Result<()> {
        self.check_open()?;
        let key = ident.to_string();
        if !self.schemas.contains_key(&key) {
            return catalog_err::NotFoundSnafu {
                type_name: "schema".to_string(),
                name: key,
            }
            .fail();
        }
        self.schemas.insert(key, schema.clone());
        Ok(())
    }

    async fn drop_schema(&self, ident: &NameIdent) -> Result<()> {
        self.check_open()?;
        let key = ident.to_string();
        if self.schemas.remove(&key).is_none() {
            return catalog_err::NotFoundSnafu {
                type_name: "schema".to_string(),
                name: key,
            }
            .fail();
        }
        // Objects under the schema go with it.
        let prefix = format!("{key}.");
        self.objects.retain(|object_key, _| !object_key.starts_with(&prefix));
        Ok(())
    }

    async fn list_schemas(&self, _catalog: &NameIdent) -> Result<Vec<String>> {
        self.check_open()?;
        let mut names: Vec<String> = self
            .schemas
            .iter()
            .filter_map(|entry| entry.key().rsplit('.').next().map(str::to_string))
            .collect();
        names.sort_unstable();
        Ok(names)
    }

    async fn create_object(&self, ident: &NameIdent, object: &ObjectPointer) -> Result<()> {
        self.check_open()?;
        let Some(schema) = ident.parent() else {
            return catalog_err::NotFoundSnafu {
                type_name: "schema".to_string(),
                name: String::new(),
            }
            .fail();
        };
        if !self.schemas.contains_key(&schema.to_string()) {
            return catalog_err::NotFoundSnafu {
                type_name: "schema".to_string(),
                name: schema.to_string(),
            }
            .fail();
        }
        let key = ident.to_string();
        if self.objects.contains_key(&key) {
            return catalog_err::AlreadyExistsSnafu {
                type_name: object.kind.to_string(),
                name: key,
            }
            .fail();
        }
        self.objects.insert(key, object.clone());
        Ok(())
    }

    async fn drop_object(&self, ident: &NameIdent, kind: ObjectKind) -> Result<()> {
        self.check_open()?;
        let key = ident.to_string();
        match self.objects.get(&key) {
            Some(entry) if entry.kind == kind => {}
            _ => {
                return catalog_err::NotFoundSnafu {
                    type_name: kind.to_string(),
                    name: key,
                }
                .fail();
            }
        }
        self.objects.remove(&key);
        Ok(())
    }

    async fn list_objects(&self, schema: &NameIdent, kind: ObjectKind) -> Result<Vec<String>> {
        self.check_open()?;
        let prefix = format!("{schema}.");
        let mut names: Vec<String> = self
            .objects
            .iter()
            .filter(|entry| entry.value().kind == kind && entry.key().starts_with(&prefix))
            .filter_map(|entry| entry.key().rsplit('.').next().map(str::to_string))
            .collect();
        names.sort_unstable();
        Ok(names)
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct MemoryConnectorFactory;

#[async_trait]
impl ConnectorFactory for MemoryConnectorFactory {
    async fn build(
        &self,
        ident: &NameIdent,
        _properties: &HashMap<String, String>,
    ) -> Result<Arc<dyn CatalogConnector>> {
        Ok(Arc::new(MemoryConnector::new(ident.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(path: &str) -> NameIdent {
        NameIdent::parse(path).expect("valid ident")
    }

    #[tokio::test]
    async fn test_schema_lifecycle() {
        let connector = MemoryConnector::new(ident("m1.c1"));
        connector
            .create_schema(&ident("m1.c1.s1"), &Schema::default())
            .await
            .unwrap();
        assert_eq!(
            connector.list_schemas(&ident("m1.c1")).await.unwrap(),
            vec!["s1"]
        );
        connector.drop_schema(&ident("m1.c1.s1")).await.unwrap();
        assert!(connector.list_schemas(&ident("m1.c1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_objects_require_schema() {
        let connector = MemoryConnector::new(ident("m1.c1"));
        let err = connector
            .create_object(&ident("m1.c1.s1.t1"), &ObjectPointer::new(ObjectKind::Table))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::NotFound { .. }));

        connector
            .create_schema(&ident("m1.c1.s1"), &Schema::default())
            .await
            .unwrap();
        connector
            .create_object(&ident("m1.c1.s1.t1"), &ObjectPointer::new(ObjectKind::Table))
            .await
            .unwrap();
        assert_eq!(
            connector
                .list_objects(&ident("m1.c1.s1"), ObjectKind::Table)
                .await
                .unwrap(),
            vec!["t1"]
        );
        // Kind is part of the object's identity.
        assert!(connector
            .list_objects(&ident("m1.c1.s1"), ObjectKind::Topic)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_close_is_recorded_and_guards_calls() {
        let connector = MemoryConnector::new(ident("m1.c1"));
        connector.close();
        connector.close();
        assert!(connector.is_closed());
        assert_eq!(connector.close_calls(), 2);
        let err = connector
            .create_schema(&ident("m1.c1.s1"), &Schema::default())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::BackendUnavailable { .. }));
    }
}
