pub mod memory;

pub use memory::{MemoryConnector, MemoryConnectorFactory};

/// Token the built-in in-memory provider registers under.
pub const MEMORY_PROVIDER: &str = "memory";
