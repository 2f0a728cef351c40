use snafu::prelude::*;

use crate::dispatcher::OperationStage;

#[derive(Snafu, Debug)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Malformed identifier '{ident}': {reason}"))]
    MalformedIdentifier { ident: String, reason: String },

    #[snafu(display("Identifier '{ident}' has depth {actual}, expected {expected}"))]
    InvalidDepth {
        ident: String,
        expected: usize,
        actual: usize,
    },

    #[snafu(display("{type_name} {name} not found"))]
    NotFound { type_name: String, name: String },

    #[snafu(display("{type_name} {name} already exists"))]
    AlreadyExists { type_name: String, name: String },

    #[snafu(display(
        "Version conflict on {type_name} {name}: expected version {expected}, current is {actual}"
    ))]
    VersionConflict {
        type_name: String,
        name: String,
        expected: u64,
        actual: u64,
    },

    #[snafu(display(
        "Concurrent modification of {type_name} {name}: metadata changed after the backend \
         action succeeded; re-resolve and resubmit"
    ))]
    ConcurrentModification { type_name: String, name: String },

    #[snafu(display("Catalog {name} provider is immutable; drop and recreate to change it"))]
    ProviderImmutable { name: String },

    #[snafu(display("{type_name} {name} is not empty, contains: {children}"))]
    NonEmpty {
        type_name: String,
        name: String,
        children: String,
    },

    #[snafu(display("Unknown provider: {provider}"))]
    UnknownProvider { provider: String },

    #[snafu(display("Invalid configuration for provider {provider}: {reason}"))]
    InvalidConfiguration { provider: String, reason: String },

    #[snafu(display("Provider {provider} does not support {operation}"))]
    UnsupportedOperation { provider: String, operation: String },

    #[snafu(display("Backend for provider {provider} unavailable: {message}"))]
    BackendUnavailable { provider: String, message: String },

    #[snafu(display("Entity storage unavailable: {message}"))]
    StorageUnavailable { message: String },

    #[snafu(display("Operation {operation} was cancelled"))]
    Cancelled { operation: String },

    #[snafu(display("Failed to build connector for provider {provider}: {message}"))]
    ConnectorBuild { provider: String, message: String },

    #[snafu(display("Serialization error: {source}"))]
    Serde { source: serde_json::Error },

    #[snafu(display("Failed to load configuration: {reason}"))]
    InvalidConfigFile { reason: String },

    #[snafu(display("{stage} failed for {ident}: {source}"))]
    OperationFailed {
        stage: OperationStage,
        ident: String,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },
}

impl Error {
    /// Tag an error with the dispatcher stage it surfaced from. Already-tagged
    /// errors keep their original stage.
    #[must_use]
    pub fn at_stage(self, stage: OperationStage, ident: &str) -> Self {
        match self {
            Self::OperationFailed { .. } => self,
            source => Self::OperationFailed {
                stage,
                ident: ident.to_string(),
                source: Box::new(source),
            },
        }
    }

    /// The stage a dispatcher operation reached before failing, if known.
    #[must_use]
    pub const fn stage(&self) -> Option<OperationStage> {
        match self {
            Self::OperationFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The causal error beneath any stage tagging.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::OperationFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether a retry may help (transient storage failures only).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
