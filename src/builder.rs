//! The application builder: shared aggregation point for assembly.
//!
//! Every scoped store key factory appends to the builder, so once providers
//! are resolved the builder knows every store namespace the application
//! needs. It also owns the interface registry and both codecs, created
//! together with the builder and handed out by reference.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::codec::{InterfaceRegistry, LegacyAmino, ProtoCodec};
use crate::container::ModuleKey;
use crate::error::BuilderError;

/// Storage flavour of a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKind {
    /// Persisted, committed every block.
    Kv,
    /// Reset at the end of every block.
    Transient,
    /// In-memory only, never committed.
    Memory,
}

impl StoreKind {
    fn prefix(self) -> &'static str {
        match self {
            StoreKind::Kv => "",
            StoreKind::Transient => "transient_",
            StoreKind::Memory => "memory_",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreKind::Kv => "kv",
            StoreKind::Transient => "transient",
            StoreKind::Memory => "memory",
        })
    }
}

/// A named storage namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    name: String,
    kind: StoreKind,
}

impl StoreKey {
    pub fn new(kind: StoreKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// The namespace `module` owns for `kind`. Deterministic in both inputs,
    /// and distinct across kinds for the same module.
    pub fn for_module(kind: StoreKind, module: &ModuleKey) -> Self {
        Self::new(kind, format!("{}{}", kind.prefix(), module.name()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

macro_rules! typed_store_key {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(StoreKey);

        impl $name {
            pub fn for_module(module: &ModuleKey) -> Self {
                Self(StoreKey::for_module($kind, module))
            }

            pub fn store_key(&self) -> &StoreKey {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = StoreKey;

            fn deref(&self) -> &StoreKey {
                &self.0
            }
        }
    };
}

typed_store_key!(
    /// Key of a module's persisted store.
    KvStoreKey,
    StoreKind::Kv
);
typed_store_key!(
    /// Key of a module's per-block transient store.
    TransientStoreKey,
    StoreKind::Transient
);
typed_store_key!(
    /// Key of a module's in-memory store.
    MemoryStoreKey,
    StoreKind::Memory
);

#[derive(Debug, Default)]
struct Namespaces {
    keys: Vec<StoreKey>,
    frozen: bool,
}

/// Shared builder state for one assembly run.
#[derive(Debug)]
pub struct AppBuilder {
    namespaces: Mutex<Namespaces>,
    interface_registry: Arc<InterfaceRegistry>,
    codec: Arc<ProtoCodec>,
    amino: Arc<LegacyAmino>,
}

impl AppBuilder {
    pub fn new() -> Self {
        let interface_registry = Arc::new(InterfaceRegistry::new());
        let codec = Arc::new(ProtoCodec::new(Arc::clone(&interface_registry)));
        Self {
            namespaces: Mutex::new(Namespaces::default()),
            interface_registry,
            codec,
            amino: Arc::new(LegacyAmino::new()),
        }
    }

    /// Append a namespace. Appends are never deduplicated.
    pub fn register_store_key(&self, key: StoreKey) -> Result<(), BuilderError> {
        if key.name().is_empty() {
            return Err(BuilderError::EmptyName);
        }
        let mut namespaces = self.namespaces.lock();
        if namespaces.frozen {
            return Err(BuilderError::Frozen(key.name().to_string()));
        }
        debug!(store = %key, position = namespaces.keys.len(), "registered store key");
        namespaces.keys.push(key);
        Ok(())
    }

    /// All namespaces, in request order.
    pub fn store_keys(&self) -> Vec<StoreKey> {
        self.namespaces.lock().keys.clone()
    }

    pub fn store_key_count(&self) -> usize {
        self.namespaces.lock().keys.len()
    }

    /// Stop accepting namespaces and return the final list.
    pub fn freeze(&self) -> Vec<StoreKey> {
        let mut namespaces = self.namespaces.lock();
        namespaces.frozen = true;
        namespaces.keys.clone()
    }

    pub fn is_frozen(&self) -> bool {
        self.namespaces.lock().frozen
    }

    pub fn interface_registry(&self) -> &Arc<InterfaceRegistry> {
        &self.interface_registry
    }

    pub fn codec(&self) -> &Arc<ProtoCodec> {
        &self.codec
    }

    pub fn amino(&self) -> &Arc<LegacyAmino> {
        &self.amino
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_key_names() {
        let bank = ModuleKey::new("bank");

        assert_eq!(KvStoreKey::for_module(&bank).name(), "bank");
        assert_eq!(TransientStoreKey::for_module(&bank).name(), "transient_bank");
        assert_eq!(MemoryStoreKey::for_module(&bank).name(), "memory_bank");
        assert_eq!(MemoryStoreKey::for_module(&bank).kind(), StoreKind::Memory);
        assert_eq!(KvStoreKey::for_module(&bank), KvStoreKey::for_module(&bank));
    }

    #[test]
    fn test_register_keeps_order_and_duplicates() {
        let builder = AppBuilder::new();
        builder.register_store_key(StoreKey::new(StoreKind::Kv, "bank")).unwrap();
        builder.register_store_key(StoreKey::new(StoreKind::Kv, "auth")).unwrap();
        builder.register_store_key(StoreKey::new(StoreKind::Kv, "bank")).unwrap();

        let names: Vec<String> = builder
            .store_keys()
            .iter()
            .map(|k| k.name().to_string())
            .collect();
        assert_eq!(names, vec!["bank", "auth", "bank"]);
    }

    #[test]
    fn test_empty_name_rejected() {
        let builder = AppBuilder::new();
        assert_eq!(
            builder.register_store_key(StoreKey::new(StoreKind::Kv, "")),
            Err(BuilderError::EmptyName)
        );
        assert_eq!(builder.store_key_count(), 0);
    }

    #[test]
    fn test_frozen_builder() {
        let builder = AppBuilder::new();
        builder.register_store_key(StoreKey::new(StoreKind::Kv, "bank")).unwrap();

        let keys = builder.freeze();
        assert_eq!(keys.len(), 1);
        assert!(builder.is_frozen());
        assert_eq!(
            builder.register_store_key(StoreKey::new(StoreKind::Kv, "auth")),
            Err(BuilderError::Frozen("auth".to_string()))
        );
        assert_eq!(builder.store_key_count(), 1);
    }

    #[test]
    fn test_codec_bound_to_registry() {
        let builder = AppBuilder::new();
        assert!(Arc::ptr_eq(
            builder.codec().interface_registry(),
            builder.interface_registry()
        ));
    }
}
