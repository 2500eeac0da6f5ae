//! Registry of application modules.
//!
//! The `ModuleRegistry` maps module names to their implementations. Names are
//! unique: the first registration under a name wins and is never replaced.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::module::AppModule;

/// A registry for application modules.
///
/// # Example
///
/// ```rust
/// use appwire::{AppModule, ModuleRegistry};
/// use std::any::Any;
///
/// #[derive(Debug)]
/// struct AuthModule;
///
/// impl AppModule for AuthModule {
///     fn name(&self) -> &str { "auth" }
///     fn as_any(&self) -> &dyn Any { self }
/// }
///
/// let mut registry = ModuleRegistry::new();
/// registry.register(Box::new(AuthModule)).unwrap();
///
/// assert!(registry.get("auth").is_some());
/// assert!(registry.register(Box::new(AuthModule)).is_err());
/// ```
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Box<dyn AppModule>>,
    ordered: Vec<String>,
}

impl ModuleRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module, returning an error if the name is taken.
    pub fn register(&mut self, module: Box<dyn AppModule>) -> RegistryResult<()> {
        let name = module.name().to_string();
        if self.modules.contains_key(&name) {
            return Err(RegistryError::DuplicateModule(name));
        }
        debug!(module = %name, "registered module");
        self.ordered.push(name.clone());
        self.modules.insert(name, module);
        Ok(())
    }

    /// Register every module in order, stopping at the first duplicate.
    ///
    /// Modules registered before the duplicate stay registered.
    pub fn register_all<I>(&mut self, modules: I) -> RegistryResult<()>
    where
        I: IntoIterator<Item = Box<dyn AppModule>>,
    {
        for module in modules {
            self.register(module)?;
        }
        Ok(())
    }

    /// Get a module by name.
    pub fn get(&self, name: &str) -> Option<&dyn AppModule> {
        self.modules.get(name).map(|m| m.as_ref())
    }

    /// Check if a module with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Names of all registered modules, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.ordered.iter().map(|s| s.as_str()).collect()
    }

    /// Get the number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Iterate over all modules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn AppModule> {
        self.ordered
            .iter()
            .filter_map(move |name| self.modules.get(name))
            .map(|m| m.as_ref())
    }
}
