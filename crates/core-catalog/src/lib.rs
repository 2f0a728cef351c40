pub mod cache;
pub mod config;
pub mod connector;
pub mod dispatcher;
pub mod error;
pub mod ident;
pub mod models;
pub mod providers;
pub mod registry;
pub mod store;

#[cfg(test)]
pub mod tests;

pub use cache::{ConnectorCache, ConnectorLease};
pub use config::CatalogConfig;
pub use connector::CatalogConnector;
pub use dispatcher::{CatalogDispatcher, OperationStage};
pub use error::{Error, Result};
pub use ident::NameIdent;
pub use models::*;
pub use registry::{ConnectorFactory, ProviderRegistry, RegistryBuilder};
pub use store::{EntityStore, MemoryEntityStore, ReconcileReport};
