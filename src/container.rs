//! Provider registry for dependency injection.
//!
//! Providers are factories registered under a [`ProviderKey`]: a type tag plus
//! an optional module scope. Each provider declares the keys it depends on up
//! front. Resolution walks those declarations depth first, builds every
//! dependency before the factory runs, and memoizes the result so each
//! distinct key is built exactly once.
//!
//! Two registration shapes exist:
//! - [`ProviderRegistry::register`] binds one exact key, global (`None`) or
//!   for a single module.
//! - [`ProviderRegistry::register_per_module`] binds a template that serves
//!   the type for *every* module scope. It is invoked once per distinct module
//!   that asks for it. An exact module-scoped registration for the same type
//!   takes precedence over the template.
//!
//! # Example
//!
//! ```rust
//! use appwire::{Dependency, ModuleKey, ProviderRegistry};
//! use std::sync::Arc;
//!
//! struct Prefix(String);
//! struct Greeting(String);
//!
//! let mut registry = ProviderRegistry::new();
//! registry.supply(Prefix("hello".to_string())).unwrap();
//! registry
//!     .register_per_module(vec![Dependency::global::<Prefix>()], |ctx| {
//!         let prefix = ctx.get::<Prefix>()?;
//!         let module = ctx.module_key()?;
//!         Ok(Arc::new(Greeting(format!("{} {}", prefix.0, module))))
//!     })
//!     .unwrap();
//!
//! let greeting = registry.resolve_for::<Greeting>(&ModuleKey::new("bank")).unwrap();
//! assert_eq!(greeting.0, "hello bank");
//! ```

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ContainerError, ContainerResult};

/// Identity of a module, used as a DI scope and as a namespace prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey(Arc<str>);

impl ModuleKey {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }
}

/// A requestable capability: type plus optional module scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderKey {
    tag: TypeTag,
    scope: Option<ModuleKey>,
}

impl ProviderKey {
    pub fn of<T: 'static>(scope: Option<ModuleKey>) -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            scope,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.tag.name
    }

    pub fn scope(&self) -> Option<&ModuleKey> {
        self.scope.as_ref()
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}[{}]", self.tag.name, scope),
            None => f.write_str(self.tag.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DependencyScope {
    Global,
    Inherit,
    Module(ModuleKey),
}

/// A declared input of a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    tag: TypeTag,
    scope: DependencyScope,
}

impl Dependency {
    /// The unscoped instance of `T`.
    pub fn global<T: 'static>() -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            scope: DependencyScope::Global,
        }
    }

    /// `T` in the same scope as the key being resolved.
    pub fn scoped<T: 'static>() -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            scope: DependencyScope::Inherit,
        }
    }

    /// `T` as provided to one specific module.
    pub fn in_module<T: 'static>(module: ModuleKey) -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            scope: DependencyScope::Module(module),
        }
    }

    fn key_for(&self, requester: Option<&ModuleKey>) -> ProviderKey {
        let scope = match &self.scope {
            DependencyScope::Global => None,
            DependencyScope::Inherit => requester.cloned(),
            DependencyScope::Module(module) => Some(module.clone()),
        };
        ProviderKey {
            tag: self.tag,
            scope,
        }
    }
}

type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&ResolveContext<'_>) -> ContainerResult<Instance> + Send + Sync>;

#[derive(Clone)]
struct ProviderEntry {
    dependencies: Vec<Dependency>,
    factory: Factory,
}

/// What a factory sees while it runs: its own key and its declared inputs.
pub struct ResolveContext<'a> {
    key: &'a ProviderKey,
    declared: &'a [ProviderKey],
    instances: &'a HashMap<ProviderKey, Instance>,
}

impl<'a> ResolveContext<'a> {
    /// The key being resolved.
    pub fn key(&self) -> &ProviderKey {
        self.key
    }

    /// The module scope of this resolution, if any.
    pub fn scope(&self) -> Option<&ModuleKey> {
        self.key.scope()
    }

    /// The module scope, failing when resolving globally.
    pub fn module_key(&self) -> ContainerResult<&ModuleKey> {
        self.key.scope().ok_or_else(|| ContainerError::MissingScope {
            key: self.key.to_string(),
        })
    }

    /// A declared global dependency.
    pub fn get<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>> {
        self.fetch(ProviderKey::of::<T>(None))
    }

    /// A declared dependency in this resolution's scope.
    pub fn get_scoped<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>> {
        self.fetch(ProviderKey::of::<T>(self.key.scope.clone()))
    }

    /// A declared dependency as provided to `module`.
    pub fn get_in<T: Any + Send + Sync>(&self, module: &ModuleKey) -> ContainerResult<Arc<T>> {
        self.fetch(ProviderKey::of::<T>(Some(module.clone())))
    }

    /// Wrap a factory failure with this resolution's key.
    pub fn fail(&self, reason: impl fmt::Display) -> ContainerError {
        ContainerError::ProviderFailed {
            key: self.key.to_string(),
            reason: reason.to_string(),
        }
    }

    fn fetch<T: Any + Send + Sync>(&self, key: ProviderKey) -> ContainerResult<Arc<T>> {
        if !self.declared.contains(&key) {
            return Err(ContainerError::UndeclaredDependency {
                key: key.to_string(),
            });
        }
        let instance = self
            .instances
            .get(&key)
            .cloned()
            .ok_or_else(|| ContainerError::MissingProvider {
                key: key.to_string(),
            })?;
        downcast(instance, &key)
    }
}

/// Registry of providers and their memoized instances.
///
/// One registry serves one assembly run. It is not meant to be shared between
/// concurrently assembled applications.
#[derive(Default)]
pub struct ProviderRegistry {
    exact: HashMap<ProviderKey, ProviderEntry>,
    per_module: HashMap<TypeTag, ProviderEntry>,
    instances: HashMap<ProviderKey, Instance>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for exactly `(T, scope)`.
    pub fn register<T, F>(
        &mut self,
        scope: Option<ModuleKey>,
        dependencies: Vec<Dependency>,
        factory: F,
    ) -> ContainerResult<()>
    where
        T: Any + Send + Sync,
        F: Fn(&ResolveContext<'_>) -> ContainerResult<Arc<T>> + Send + Sync + 'static,
    {
        let key = ProviderKey::of::<T>(scope);
        if self.exact.contains_key(&key) {
            return Err(ContainerError::DuplicateProvider {
                key: key.to_string(),
            });
        }
        debug!(provider = %key, deps = dependencies.len(), "registered provider");
        self.exact.insert(key, entry(dependencies, factory));
        Ok(())
    }

    /// Register a factory serving `T` for every module scope.
    pub fn register_per_module<T, F>(
        &mut self,
        dependencies: Vec<Dependency>,
        factory: F,
    ) -> ContainerResult<()>
    where
        T: Any + Send + Sync,
        F: Fn(&ResolveContext<'_>) -> ContainerResult<Arc<T>> + Send + Sync + 'static,
    {
        let tag = TypeTag::of::<T>();
        if self.per_module.contains_key(&tag) {
            return Err(ContainerError::DuplicateProvider {
                key: format!("{}[*]", tag.name),
            });
        }
        debug!(provider = tag.name, deps = dependencies.len(), "registered per-module provider");
        self.per_module.insert(tag, entry(dependencies, factory));
        Ok(())
    }

    /// Register an already-built global value.
    pub fn supply<T: Any + Send + Sync>(&mut self, value: T) -> ContainerResult<()> {
        self.supply_arc(Arc::new(value))
    }

    /// Register an already-built, already-shared global value.
    pub fn supply_arc<T: Any + Send + Sync>(&mut self, value: Arc<T>) -> ContainerResult<()> {
        self.register(None, Vec::new(), move |_| Ok(Arc::clone(&value)))
    }

    /// Check whether any factory can serve `(T, scope)`.
    pub fn contains<T: 'static>(&self, scope: Option<&ModuleKey>) -> bool {
        let key = ProviderKey::of::<T>(scope.cloned());
        self.exact.contains_key(&key)
            || (scope.is_some() && self.per_module.contains_key(&key.tag))
    }

    /// Check whether `(T, scope)` has already been built.
    pub fn is_resolved<T: 'static>(&self, scope: Option<&ModuleKey>) -> bool {
        self.instances
            .contains_key(&ProviderKey::of::<T>(scope.cloned()))
    }

    /// Resolve the global instance of `T`.
    pub fn resolve_global<T: Any + Send + Sync>(&mut self) -> ContainerResult<Arc<T>> {
        self.resolve(None)
    }

    /// Resolve `T` for one module.
    pub fn resolve_for<T: Any + Send + Sync>(
        &mut self,
        module: &ModuleKey,
    ) -> ContainerResult<Arc<T>> {
        self.resolve(Some(module))
    }

    /// Resolve `(T, scope)`, building it and its dependencies if needed.
    pub fn resolve<T: Any + Send + Sync>(
        &mut self,
        scope: Option<&ModuleKey>,
    ) -> ContainerResult<Arc<T>> {
        let key = ProviderKey::of::<T>(scope.cloned());
        let mut in_progress = Vec::new();
        let instance = self.resolve_key(&key, &mut in_progress)?;
        downcast(instance, &key)
    }

    fn resolve_key(
        &mut self,
        key: &ProviderKey,
        in_progress: &mut Vec<ProviderKey>,
    ) -> ContainerResult<Instance> {
        if let Some(instance) = self.instances.get(key) {
            return Ok(Arc::clone(instance));
        }
        if let Some(start) = in_progress.iter().position(|k| k == key) {
            let mut path: Vec<String> =
                in_progress[start..].iter().map(ToString::to_string).collect();
            path.push(key.to_string());
            return Err(ContainerError::CyclicDependency { path });
        }

        let provider = self.lookup(key)?;
        let declared: Vec<ProviderKey> = provider
            .dependencies
            .iter()
            .map(|dep| dep.key_for(key.scope()))
            .collect();

        in_progress.push(key.clone());
        for dep in &declared {
            self.resolve_key(dep, in_progress)?;
        }
        in_progress.pop();

        let ctx = ResolveContext {
            key,
            declared: &declared,
            instances: &self.instances,
        };
        let instance = (provider.factory)(&ctx)?;
        debug!(provider = %key, "resolved provider");
        self.instances.insert(key.clone(), Arc::clone(&instance));
        Ok(instance)
    }

    fn lookup(&self, key: &ProviderKey) -> ContainerResult<ProviderEntry> {
        if let Some(provider) = self.exact.get(key) {
            return Ok(provider.clone());
        }
        match (key.scope(), self.per_module.get(&key.tag)) {
            (Some(_), Some(provider)) => Ok(provider.clone()),
            (None, Some(_)) => Err(ContainerError::MissingScope {
                key: key.to_string(),
            }),
            (_, None) => Err(ContainerError::MissingProvider {
                key: key.to_string(),
            }),
        }
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut exact: Vec<String> = self.exact.keys().map(ToString::to_string).collect();
        exact.sort();
        let mut per_module: Vec<&str> = self.per_module.keys().map(|t| t.name).collect();
        per_module.sort_unstable();
        f.debug_struct("ProviderRegistry")
            .field("exact", &exact)
            .field("per_module", &per_module)
            .field("resolved", &self.instances.len())
            .finish()
    }
}

fn entry<T, F>(dependencies: Vec<Dependency>, factory: F) -> ProviderEntry
where
    T: Any + Send + Sync,
    F: Fn(&ResolveContext<'_>) -> ContainerResult<Arc<T>> + Send + Sync + 'static,
{
    ProviderEntry {
        dependencies,
        factory: Arc::new(move |ctx: &ResolveContext<'_>| {
            let instance: Instance = factory(ctx)?;
            Ok(instance)
        }),
    }
}

fn downcast<T: Any + Send + Sync>(
    instance: Instance,
    key: &ProviderKey,
) -> ContainerResult<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| ContainerError::TypeMismatch {
            key: key.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Counter(usize);

    #[derive(Debug)]
    struct Name(String);

    #[derive(Debug)]
    struct A;

    #[derive(Debug)]
    struct B;

    #[test]
    fn test_duplicate_provider() {
        let mut registry = ProviderRegistry::new();
        registry.supply(Counter(1)).unwrap();

        let err = registry.supply(Counter(2)).unwrap_err();
        assert!(matches!(err, ContainerError::DuplicateProvider { .. }));

        // Same type, different scope is a different key.
        registry
            .register(Some(ModuleKey::new("bank")), vec![], |_| Ok(Arc::new(Counter(3))))
            .unwrap();
        let err = registry
            .register(Some(ModuleKey::new("bank")), vec![], |_| Ok(Arc::new(Counter(4))))
            .unwrap_err();
        assert!(err.to_string().contains("[bank]"));

        registry
            .register_per_module(vec![], |_| Ok(Arc::new(Counter(5))))
            .unwrap();
        assert!(registry
            .register_per_module(vec![], |_| Ok(Arc::new(Counter(6))))
            .is_err());
    }

    #[test]
    fn test_factory_runs_once_per_key() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let mut registry = ProviderRegistry::new();
        registry
            .register(None, vec![], move |_| {
                Ok(Arc::new(Counter(seen.fetch_add(1, Ordering::SeqCst))))
            })
            .unwrap();

        let first = registry.resolve_global::<Counter>().unwrap();
        let second = registry.resolve_global::<Counter>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_resolved::<Counter>(None));
    }

    #[test]
    fn test_dependencies_resolved_first() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(None, vec![Dependency::global::<Counter>()], |ctx| {
                let counter = ctx.get::<Counter>()?;
                Ok(Arc::new(Name(format!("n{}", counter.0))))
            })
            .unwrap();
        registry.supply(Counter(7)).unwrap();

        assert!(!registry.is_resolved::<Counter>(None));
        let name = registry.resolve_global::<Name>().unwrap();
        assert_eq!(name.0, "n7");
        assert!(registry.is_resolved::<Counter>(None));
    }

    #[test]
    fn test_cycle_detected() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(None, vec![Dependency::global::<B>()], |_| Ok(Arc::new(A)))
            .unwrap();
        registry
            .register(None, vec![Dependency::global::<A>()], |_| Ok(Arc::new(B)))
            .unwrap();

        match registry.resolve_global::<A>() {
            Err(ContainerError::CyclicDependency { path }) => {
                assert_eq!(path.len(), 3);
                assert_eq!(path.first(), path.last());
                assert!(path[1].ends_with("::B"));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
        assert!(!registry.is_resolved::<A>(None));
    }

    #[test]
    fn test_self_cycle_detected() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(None, vec![Dependency::global::<A>()], |_| Ok(Arc::new(A)))
            .unwrap();

        assert!(matches!(
            registry.resolve_global::<A>(),
            Err(ContainerError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_missing_provider() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(None, vec![Dependency::global::<Counter>()], |_| Ok(Arc::new(A)))
            .unwrap();

        let err = registry.resolve_global::<A>().unwrap_err();
        assert!(matches!(
            err,
            ContainerError::MissingProvider { ref key } if key.ends_with("Counter")
        ));
    }

    #[test]
    fn test_undeclared_dependency() {
        let mut registry = ProviderRegistry::new();
        registry.supply(Counter(1)).unwrap();
        registry
            .register(None, vec![], |ctx| {
                let counter = ctx.get::<Counter>()?;
                Ok(Arc::new(Name(counter.0.to_string())))
            })
            .unwrap();

        assert!(matches!(
            registry.resolve_global::<Name>(),
            Err(ContainerError::UndeclaredDependency { .. })
        ));
    }

    #[test]
    fn test_per_module_provider() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let mut registry = ProviderRegistry::new();
        registry
            .register_per_module(vec![], move |ctx| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(Name(ctx.module_key()?.to_string())))
            })
            .unwrap();

        let bank = ModuleKey::new("bank");
        let auth = ModuleKey::new("auth");
        assert_eq!(registry.resolve_for::<Name>(&bank).unwrap().0, "bank");
        assert_eq!(registry.resolve_for::<Name>(&auth).unwrap().0, "auth");
        assert_eq!(registry.resolve_for::<Name>(&bank).unwrap().0, "bank");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(matches!(
            registry.resolve_global::<Name>(),
            Err(ContainerError::MissingScope { .. })
        ));
    }

    #[test]
    fn test_exact_scope_overrides_template() {
        let mut registry = ProviderRegistry::new();
        registry
            .register_per_module(vec![], |ctx| Ok(Arc::new(Name(ctx.module_key()?.to_string()))))
            .unwrap();
        registry
            .register(Some(ModuleKey::new("gov")), vec![], |_| {
                Ok(Arc::new(Name("governance".to_string())))
            })
            .unwrap();

        assert_eq!(registry.resolve_for::<Name>(&"gov".into()).unwrap().0, "governance");
        assert_eq!(registry.resolve_for::<Name>(&"mint".into()).unwrap().0, "mint");
    }

    #[test]
    fn test_scoped_dependency_inherits_scope() {
        let mut registry = ProviderRegistry::new();
        registry
            .register_per_module(vec![], |ctx| Ok(Arc::new(Name(ctx.module_key()?.to_string()))))
            .unwrap();
        registry
            .register_per_module(vec![Dependency::scoped::<Name>()], |ctx| {
                Ok(Arc::new(Counter(ctx.get_scoped::<Name>()?.0.len())))
            })
            .unwrap();
        registry
            .register(None, vec![Dependency::in_module::<Name>("staking".into())], |ctx| {
                let name = ctx.get_in::<Name>(&"staking".into())?;
                assert_eq!(name.0, "staking");
                Ok(Arc::new(A))
            })
            .unwrap();

        assert_eq!(registry.resolve_for::<Counter>(&"distribution".into()).unwrap().0, 12);
        assert!(registry.is_resolved::<Name>(Some(&"distribution".into())));
        registry.resolve_global::<A>().unwrap();
    }

    #[test]
    fn test_factory_failure() {
        let mut registry = ProviderRegistry::new();
        registry
            .register::<A, _>(None, vec![], |ctx| Err(ctx.fail("disk on fire")))
            .unwrap();

        let err = registry.resolve_global::<A>().unwrap_err();
        assert!(err.to_string().contains("disk on fire"));
        assert!(!registry.is_resolved::<A>(None));
    }
}
