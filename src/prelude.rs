//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits
//! from Appwire for convenient glob imports.
//!
//! # Example
//!
//! ```rust
//! use appwire::prelude::*;
//! ```

// Configuration
pub use crate::config::{Config, FileConfig, Hook, RuntimeConfig};
pub use crate::options::{AppOptions, AppOptionsExt, MapOptions};

// Core traits
pub use crate::engine::CommitStore;
pub use crate::module::{AppModule, AppModuleExt};

// Assembly
pub use crate::app::{AppCreator, CreatorState};
pub use crate::builder::{AppBuilder, KvStoreKey, MemoryStoreKey, StoreKey, TransientStoreKey};
pub use crate::container::{Dependency, ModuleKey, ProviderRegistry};
pub use crate::engine::{EngineHandle, MemCommitStore};
pub use crate::registry::ModuleRegistry;
pub use crate::runtime;

// Errors
pub use crate::error::{
    AppError, AppResult, ContainerError, ContainerResult, LoadError, RegistryError,
    RegistryResult,
};
