//! Runtime wiring: the providers every application needs.
//!
//! [`register_providers`] installs the builder, its shared codec exports and
//! the three per-module store key factories into a [`ProviderRegistry`].
//! Modules then resolve their store keys by scope, and [`assemble`] turns the
//! populated registry into an [`AppCreator`].

use std::sync::Arc;

use tracing::debug;

use crate::app::AppCreator;
use crate::builder::{AppBuilder, KvStoreKey, MemoryStoreKey, TransientStoreKey};
use crate::config::{Config, RuntimeConfig};
use crate::container::{Dependency, ModuleKey, ProviderRegistry};
use crate::error::{AppError, AppResult, BuilderError, ContainerResult};

fn require_module_name(module: &ModuleKey) -> Result<(), BuilderError> {
    if module.name().is_empty() {
        return Err(BuilderError::EmptyName);
    }
    Ok(())
}

/// Allocate `module`'s persisted store key and record it on `builder`.
///
/// Each call appends, even for a module that already has a key.
pub fn provide_kv_store_key(
    module: &ModuleKey,
    builder: &AppBuilder,
) -> Result<KvStoreKey, BuilderError> {
    require_module_name(module)?;
    let key = KvStoreKey::for_module(module);
    builder.register_store_key(key.store_key().clone())?;
    Ok(key)
}

/// Allocate `module`'s transient store key and record it on `builder`.
pub fn provide_transient_store_key(
    module: &ModuleKey,
    builder: &AppBuilder,
) -> Result<TransientStoreKey, BuilderError> {
    require_module_name(module)?;
    let key = TransientStoreKey::for_module(module);
    builder.register_store_key(key.store_key().clone())?;
    Ok(key)
}

/// Allocate `module`'s in-memory store key and record it on `builder`.
pub fn provide_memory_store_key(
    module: &ModuleKey,
    builder: &AppBuilder,
) -> Result<MemoryStoreKey, BuilderError> {
    require_module_name(module)?;
    let key = MemoryStoreKey::for_module(module);
    builder.register_store_key(key.store_key().clone())?;
    Ok(key)
}

/// Install the runtime providers.
pub fn register_providers(registry: &mut ProviderRegistry) -> ContainerResult<()> {
    registry.register(None, Vec::new(), |_| Ok(Arc::new(AppBuilder::new())))?;

    registry.register(None, vec![Dependency::global::<AppBuilder>()], |ctx| {
        Ok(Arc::clone(ctx.get::<AppBuilder>()?.interface_registry()))
    })?;
    registry.register(None, vec![Dependency::global::<AppBuilder>()], |ctx| {
        Ok(Arc::clone(ctx.get::<AppBuilder>()?.codec()))
    })?;
    registry.register(None, vec![Dependency::global::<AppBuilder>()], |ctx| {
        Ok(Arc::clone(ctx.get::<AppBuilder>()?.amino()))
    })?;

    registry.register_per_module(vec![Dependency::global::<AppBuilder>()], |ctx| {
        let builder = ctx.get::<AppBuilder>()?;
        provide_kv_store_key(ctx.module_key()?, &builder)
            .map(Arc::new)
            .map_err(|e| ctx.fail(e))
    })?;
    registry.register_per_module(vec![Dependency::global::<AppBuilder>()], |ctx| {
        let builder = ctx.get::<AppBuilder>()?;
        provide_transient_store_key(ctx.module_key()?, &builder)
            .map(Arc::new)
            .map_err(|e| ctx.fail(e))
    })?;
    registry.register_per_module(vec![Dependency::global::<AppBuilder>()], |ctx| {
        let builder = ctx.get::<AppBuilder>()?;
        provide_memory_store_key(ctx.module_key()?, &builder)
            .map(Arc::new)
            .map_err(|e| ctx.fail(e))
    })?;

    debug!("registered runtime providers");
    Ok(())
}

/// Resolve the runtime configuration and builder into an [`AppCreator`].
///
/// The registry must carry a [`RuntimeConfig`], usually via
/// [`ProviderRegistry::supply`].
pub fn assemble(registry: &mut ProviderRegistry) -> AppResult<AppCreator> {
    let config = registry.resolve_global::<RuntimeConfig>()?;
    config.validate().map_err(AppError::InvalidConfig)?;
    let builder = registry.resolve_global::<AppBuilder>()?;
    debug!(
        app = %config.app_name,
        store_keys = builder.store_key_count(),
        "assembled app creator"
    );
    Ok(AppCreator::new(config, builder))
}
