use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::connector::CatalogConnector;
use crate::error::{self as catalog_err, Result};
use crate::ident::NameIdent;

/// Builds connector instances for one provider token.
#[async_trait]
pub trait ConnectorFactory: Send + Sync + std::fmt::Debug {
    /// Configuration keys that must be present before construction is
    /// attempted.
    fn required_properties(&self) -> &[&str] {
        &[]
    }

    /// Construct a live connector for the given catalog. Only called after
    /// `ProviderRegistry::validate` has passed; may acquire resources.
    async fn build(
        &self,
        ident: &NameIdent,
        properties: &HashMap<String, String>,
    ) -> Result<Arc<dyn CatalogConnector>>;
}

/// Process-wide provider registry: populated once at startup, immutable
/// while serving. Pass it by `Arc` into the dispatcher so tests can supply
/// fake registries.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, Arc<dyn ConnectorFactory>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    #[must_use]
    pub fn providers(&self) -> Vec<&str> {
        let mut providers: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        providers.sort_unstable();
        providers
    }

    /// Check that the provider exists and its required configuration keys
    /// are present. Runs before any resource acquisition so misconfiguration
    /// never surfaces as a connection timeout.
    pub fn validate(&self, provider: &str, properties: &HashMap<String, String>) -> Result<()> {
        let factory = self.factory(provider)?;
        let missing: Vec<&str> = factory
            .required_properties()
            .iter()
            .filter(|key| !properties.contains_key(**key))
            .copied()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            catalog_err::InvalidConfigurationSnafu {
                provider: provider.to_string(),
                reason: format!("missing required properties: {}", missing.join(", ")),
            }
            .fail()
        }
    }

    /// Validate and construct a connector instance.
    pub async fn build(
        &self,
        provider: &str,
        ident: &NameIdent,
        properties: &HashMap<String, String>,
    ) -> Result<Arc<dyn CatalogConnector>> {
        self.validate(provider, properties)?;
        let factory = self.factory(provider)?;
        factory.build(ident, properties).await
    }

    fn factory(&self, provider: &str) -> Result<&Arc<dyn ConnectorFactory>> {
        self.factories.get(provider).ok_or_else(|| {
            catalog_err::UnknownProviderSnafu {
                provider: provider.to_string(),
            }
            .build()
        })
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    factories: HashMap<String, Arc<dyn ConnectorFactory>>,
}

impl RegistryBuilder {
    /// Register a provider under its token. Last registration wins, which
    /// lets tests shadow a built-in.
    #[must_use]
    pub fn register(mut self, provider: &str, factory: Arc<dyn ConnectorFactory>) -> Self {
        self.factories.insert(provider.to_string(), factory);
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<ProviderRegistry> {
        Arc::new(ProviderRegistry {
            factories: self.factories,
        })
    }
}
