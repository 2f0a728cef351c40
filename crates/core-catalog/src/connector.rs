use async_trait::async_trait;

use crate::error::{self as catalog_err, Error, Result};
use crate::ident::NameIdent;
use crate::models::{ObjectKind, ObjectPointer, Schema};

fn unsupported(provider: &str, operation: &str) -> Error {
    catalog_err::UnsupportedOperationSnafu {
        provider: provider.to_string(),
        operation: operation.to_string(),
    }
    .build()
}

/// Backend-side contract every catalog provider implements.
///
/// A provider need not support the full capability set: unimplemented
/// operations fail fast with `UnsupportedOperation` through the default
/// methods, never silently no-op. Implementations must be safe to call
/// concurrently; the dispatcher holds a lease on the instance for the
/// duration of each call.
#[async_trait]
pub trait CatalogConnector: Send + Sync + std::fmt::Debug {
    /// The provider token this connector was built for.
    fn provider(&self) -> &str;

    async fn create_schema(&self, _ident: &NameIdent, _schema: &Schema) -> Result<()> {
        Err(unsupported(self.provider(), "create_schema"))
    }

    async fn alter_schema(&self, _ident: &NameIdent, _schema: &Schema) -> Result<()> {
        Err(unsupported(self.provider(), "alter_schema"))
    }

    async fn drop_schema(&self, _ident: &NameIdent) -> Result<()> {
        Err(unsupported(self.provider(), "drop_schema"))
    }

    async fn list_schemas(&self, _catalog: &NameIdent) -> Result<Vec<String>> {
        Err(unsupported(self.provider(), "list_schemas"))
    }

    async fn create_object(&self, _ident: &NameIdent, _object: &ObjectPointer) -> Result<()> {
        Err(unsupported(self.provider(), "create_object"))
    }

    async fn drop_object(&self, _ident: &NameIdent, _kind: ObjectKind) -> Result<()> {
        Err(unsupported(self.provider(), "drop_object"))
    }

    async fn list_objects(&self, _schema: &NameIdent, _kind: ObjectKind) -> Result<Vec<String>> {
        Err(unsupported(self.provider(), "list_objects"))
    }

    /// Cleanup hook invoked after a catalog is tombstoned. Most backends
    /// manage schemas and objects, not the catalog shell, hence the no-op
    /// default.
    async fn drop_catalog(&self, _ident: &NameIdent) -> Result<()> {
        Ok(())
    }

    /// Release held resources (connection pools, file handles). Called once
    /// the instance is evicted or invalidated and its last lease dropped.
    /// Must be idempotent.
    fn close(&self) {}
}
