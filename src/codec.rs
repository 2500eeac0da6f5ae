//! Serializer registries shared by every module of one application.
//!
//! The wire formats themselves live elsewhere. These types only track which
//! interfaces and concrete types modules declared, so that the engine and the
//! codecs agree on one view of the type universe.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::CodecError;

/// Registry of interfaces and their concrete implementations, keyed by type
/// URL (`/package.Type`).
#[derive(Debug, Default)]
pub struct InterfaceRegistry {
    interfaces: RwLock<BTreeMap<String, BTreeSet<String>>>,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an interface. Declaring it again is a no-op.
    pub fn register_interface(&self, interface: &str) {
        self.interfaces
            .write()
            .entry(type_url(interface))
            .or_default();
    }

    /// Declare implementations of `interface`, declaring the interface too if
    /// needed.
    ///
    /// A type URL may implement several interfaces, but only once each. A
    /// rejected call registers nothing.
    pub fn register_implementations(
        &self,
        interface: &str,
        implementations: &[&str],
    ) -> Result<(), CodecError> {
        let mut interfaces = self.interfaces.write();
        let interface = type_url(interface);

        let mut batch = BTreeSet::new();
        for implementation in implementations {
            let url = type_url(implementation);
            let known = interfaces
                .get(&interface)
                .is_some_and(|impls| impls.contains(&url));
            if known || batch.contains(&url) {
                return Err(CodecError::DuplicateImplementation {
                    interface,
                    implementation: url,
                });
            }
            batch.insert(url);
        }

        interfaces.entry(interface).or_default().extend(batch);
        Ok(())
    }

    pub fn list_all_interfaces(&self) -> Vec<String> {
        self.interfaces.read().keys().cloned().collect()
    }

    pub fn list_implementations(&self, interface: &str) -> Vec<String> {
        self.interfaces
            .read()
            .get(&type_url(interface))
            .map(|impls| impls.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether any interface accepts `type_url`.
    pub fn resolves(&self, url: &str) -> bool {
        let url = type_url(url);
        self.interfaces
            .read()
            .values()
            .any(|impls| impls.contains(&url))
    }
}

/// Primary binary codec, bound to the application's interface registry.
#[derive(Debug)]
pub struct ProtoCodec {
    interface_registry: Arc<InterfaceRegistry>,
}

impl ProtoCodec {
    pub fn new(interface_registry: Arc<InterfaceRegistry>) -> Self {
        Self { interface_registry }
    }

    pub fn interface_registry(&self) -> &Arc<InterfaceRegistry> {
        &self.interface_registry
    }
}

/// Legacy JSON codec kept for clients that still speak the old format.
#[derive(Debug, Default)]
pub struct LegacyAmino {
    // amino name -> concrete type
    concrete: RwLock<BTreeMap<String, String>>,
}

impl LegacyAmino {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a concrete type under its amino name. Names are unique.
    pub fn register_concrete(&self, type_name: &str, amino_name: &str) -> Result<(), CodecError> {
        let mut concrete = self.concrete.write();
        if concrete.contains_key(amino_name) {
            return Err(CodecError::DuplicateAminoName(amino_name.to_string()));
        }
        concrete.insert(amino_name.to_string(), type_name.to_string());
        Ok(())
    }

    pub fn concrete_type(&self, amino_name: &str) -> Option<String> {
        self.concrete.read().get(amino_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.concrete.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.concrete.read().is_empty()
    }
}

fn type_url(name: &str) -> String {
    if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_registry() {
        let registry = InterfaceRegistry::new();
        registry.register_interface("cosmos.auth.v1beta1.AccountI");
        registry
            .register_implementations(
                "cosmos.auth.v1beta1.AccountI",
                &["cosmos.auth.v1beta1.BaseAccount", "/cosmos.auth.v1beta1.ModuleAccount"],
            )
            .unwrap();

        assert_eq!(
            registry.list_all_interfaces(),
            vec!["/cosmos.auth.v1beta1.AccountI"]
        );
        assert_eq!(
            registry.list_implementations("/cosmos.auth.v1beta1.AccountI"),
            vec![
                "/cosmos.auth.v1beta1.BaseAccount",
                "/cosmos.auth.v1beta1.ModuleAccount"
            ]
        );
        assert!(registry.resolves("cosmos.auth.v1beta1.BaseAccount"));
        assert!(!registry.resolves("cosmos.bank.v1beta1.MsgSend"));
    }

    #[test]
    fn test_duplicate_implementation() {
        let registry = InterfaceRegistry::new();
        registry
            .register_implementations("sdk.Msg", &["cosmos.bank.v1beta1.MsgSend"])
            .unwrap();

        let err = registry
            .register_implementations("sdk.Msg", &["/cosmos.bank.v1beta1.MsgSend"])
            .unwrap_err();
        assert!(matches!(err, CodecError::DuplicateImplementation { .. }));
    }

    #[test]
    fn test_rejected_batch_registers_nothing() {
        let registry = InterfaceRegistry::new();
        registry
            .register_implementations("sdk.Msg", &["cosmos.bank.v1beta1.MsgSend"])
            .unwrap();

        let err = registry
            .register_implementations(
                "sdk.Msg",
                &["cosmos.gov.v1.MsgVote", "cosmos.bank.v1beta1.MsgSend"],
            )
            .unwrap_err();
        assert!(matches!(err, CodecError::DuplicateImplementation { .. }));
        assert!(!registry.resolves("cosmos.gov.v1.MsgVote"));

        assert!(registry
            .register_implementations("tx.Fee", &["cosmos.tx.Fee", "cosmos.tx.Fee"])
            .is_err());
        assert_eq!(registry.list_all_interfaces(), vec!["/sdk.Msg"]);
    }

    #[test]
    fn test_codec_shares_registry() {
        let registry = Arc::new(InterfaceRegistry::new());
        let codec = ProtoCodec::new(Arc::clone(&registry));

        codec.interface_registry().register_interface("sdk.Msg");
        assert_eq!(registry.list_all_interfaces(), vec!["/sdk.Msg"]);
    }

    #[test]
    fn test_legacy_amino() {
        let amino = LegacyAmino::new();
        assert!(amino.is_empty());

        amino
            .register_concrete("cosmos.bank.v1beta1.MsgSend", "cosmos-sdk/MsgSend")
            .unwrap();
        assert_eq!(
            amino.concrete_type("cosmos-sdk/MsgSend").as_deref(),
            Some("cosmos.bank.v1beta1.MsgSend")
        );
        assert_eq!(
            amino.register_concrete("other.MsgSend", "cosmos-sdk/MsgSend"),
            Err(CodecError::DuplicateAminoName("cosmos-sdk/MsgSend".to_string()))
        );
        assert_eq!(amino.len(), 1);
    }
}
