//! # Appwire
//!
//! **Appwire** assembles one application out of independently written feature
//! modules. Modules declare the resources they need (store keys, codecs,
//! configuration), a provider registry builds and deduplicates them, and a
//! two-phase creator turns the result into a running engine.
//!
//! ## Overview
//!
//! ```text
//! ProviderRegistry  - typed factories keyed by (type, optional module scope)
//! AppBuilder        - collects every store key and owns the shared codecs
//! ModuleRegistry    - module name -> module, names unique
//! AppCreator        - create (build engine) then finish (validate + load)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use appwire::prelude::*;
//!
//! let mut providers = ProviderRegistry::new();
//! runtime::register_providers(&mut providers)?;
//! providers.supply(RuntimeConfig::new("simapp").with_begin_blockers(["auth", "bank"]))?;
//!
//! // Each module asks for its own store key.
//! let bank_key = providers.resolve_for::<KvStoreKey>(&ModuleKey::new("bank"))?;
//!
//! let mut creator = runtime::assemble(&mut providers)?;
//! creator.register_modules(modules)?;
//! let engine = creator.create(Box::new(MemCommitStore::new()), None, &opts, vec![])?;
//! creator.finish(true)?;
//! ```

mod app;
mod builder;
mod codec;
mod config;
mod container;
mod engine;
mod error;
mod module;
mod options;
mod pruning;
mod registry;
mod snapshot;
pub mod runtime;

pub mod prelude;

pub use app::{derive_engine_options, AppCreator, CreatorState};
pub use builder::{AppBuilder, KvStoreKey, MemoryStoreKey, StoreKey, StoreKind, TransientStoreKey};
pub use codec::{InterfaceRegistry, LegacyAmino, ProtoCodec};
pub use config::{
    Config, FileConfig, Hook, RuntimeConfig, BEGIN_BLOCKER, END_BLOCKER, INIT_GENESIS,
};
pub use container::{Dependency, ModuleKey, ProviderKey, ProviderRegistry, ResolveContext};
pub use engine::{
    parse_dec_coins, set_chain_id, set_halt_height, set_halt_time, set_index_events,
    set_inter_block_cache, set_min_gas_prices, set_min_retain_blocks, set_pruning,
    set_skip_upgrade_heights, set_snapshot, set_trace, CommitStore, DecCoin, Engine, EngineConfig,
    EngineHandle, EngineOption, HookOrder, MemCommitStore, SnapshotSettings, TraceSink,
};
pub use error::{
    AppError, AppResult, BuilderError, CodecError, ContainerError, ContainerResult, GasPriceError,
    LoadError, PruningError, RegistryError, RegistryResult, StoreOpenError,
};
pub use module::{has_hook, AppModule, AppModuleExt};
pub use options::{cast, AppOptions, AppOptionsExt, MapOptions};
pub use pruning::{PruningOptions, PruningStrategy};
pub use registry::ModuleRegistry;
pub use snapshot::{SnapshotOptions, SnapshotStore};

/// Documented option keys.
pub mod flags {
    pub use crate::options::{
        FLAG_APP_DB_BACKEND, FLAG_HALT_HEIGHT, FLAG_HALT_TIME, FLAG_HOME, FLAG_INDEX_EVENTS,
        FLAG_INTER_BLOCK_CACHE, FLAG_MIN_GAS_PRICES, FLAG_MIN_RETAIN_BLOCKS, FLAG_PRUNING,
        FLAG_PRUNING_INTERVAL, FLAG_PRUNING_KEEP_RECENT, FLAG_SNAPSHOT_INTERVAL,
        FLAG_SNAPSHOT_KEEP_RECENT, FLAG_TRACE, FLAG_UNSAFE_SKIP_UPGRADES,
    };
    pub use crate::snapshot::DEFAULT_DB_BACKEND;
}
