//! Two-phase application assembly.
//!
//! An [`AppCreator`] collects modules, constructs the engine once from the
//! application options (`create`), then validates the module wiring and
//! optionally loads persisted state (`finish`).
//!
//! ```text
//! Empty -> ModulesRegistering -> EngineConstructed -> Finished
//!   \__________ create ___________/
//! ```
//!
//! Modules may still be registered after `create`; `finish` only needs them
//! present by the time it runs. A failed `finish` leaves the creator in
//! `EngineConstructed`, so it can be called again once the cause is fixed.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::builder::AppBuilder;
use crate::config::RuntimeConfig;
use crate::engine::{
    self, CommitStore, Engine, EngineHandle, EngineOption, HookOrder, TraceSink,
};
use crate::error::{AppError, AppResult};
use crate::module::{has_hook, AppModule};
use crate::options::{
    AppOptions, AppOptionsExt, FLAG_HALT_HEIGHT, FLAG_HALT_TIME, FLAG_INDEX_EVENTS,
    FLAG_INTER_BLOCK_CACHE, FLAG_MIN_GAS_PRICES, FLAG_MIN_RETAIN_BLOCKS, FLAG_TRACE,
    FLAG_UNSAFE_SKIP_UPGRADES,
};
use crate::pruning::PruningOptions;
use crate::registry::ModuleRegistry;
use crate::snapshot::{self, SnapshotOptions, SnapshotStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatorState {
    Empty,
    ModulesRegistering,
    EngineConstructed,
    Finished,
}

/// Derive the engine settings carried by `opts`.
///
/// Opens the snapshot store as a side effect. Any error here means no engine
/// may be built from these options.
pub fn derive_engine_options(opts: &dyn AppOptions) -> AppResult<Vec<EngineOption>> {
    let pruning = PruningOptions::from_options(opts)?;
    let min_gas_prices = engine::parse_dec_coins(&opts.get_string(FLAG_MIN_GAS_PRICES))?;

    let snapshot_dir = snapshot::snapshot_dir(opts);
    let snapshot_store = SnapshotStore::open(&snapshot::db_backend(opts), &snapshot_dir)?;

    Ok(vec![
        engine::set_pruning(pruning),
        engine::set_min_gas_prices(min_gas_prices),
        engine::set_halt_height(opts.get_u64(FLAG_HALT_HEIGHT)),
        engine::set_halt_time(opts.get_u64(FLAG_HALT_TIME)),
        engine::set_min_retain_blocks(opts.get_u64(FLAG_MIN_RETAIN_BLOCKS)),
        engine::set_inter_block_cache(opts.get_bool(FLAG_INTER_BLOCK_CACHE)),
        engine::set_trace(opts.get_bool(FLAG_TRACE)),
        engine::set_index_events(opts.get_string_list(FLAG_INDEX_EVENTS)),
        engine::set_skip_upgrade_heights(opts.get_int_list(FLAG_UNSAFE_SKIP_UPGRADES)),
        engine::set_snapshot(
            Arc::new(snapshot_store),
            SnapshotOptions::from_options(opts),
        ),
    ])
}

/// Lifecycle controller for one application.
#[derive(Debug)]
pub struct AppCreator {
    config: Arc<RuntimeConfig>,
    builder: Arc<AppBuilder>,
    modules: ModuleRegistry,
    app: Option<EngineHandle>,
    state: CreatorState,
}

impl AppCreator {
    pub fn new(config: Arc<RuntimeConfig>, builder: Arc<AppBuilder>) -> Self {
        Self {
            config,
            builder,
            modules: ModuleRegistry::new(),
            app: None,
            state: CreatorState::Empty,
        }
    }

    pub fn state(&self) -> CreatorState {
        self.state
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn builder(&self) -> &Arc<AppBuilder> {
        &self.builder
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    /// The engine, once constructed.
    pub fn engine(&self) -> Option<&EngineHandle> {
        self.app.as_ref()
    }

    /// Register modules in order. The first duplicate name aborts the call;
    /// modules before it remain registered.
    pub fn register_modules<I>(&mut self, modules: I) -> AppResult<()>
    where
        I: IntoIterator<Item = Box<dyn AppModule>>,
    {
        if self.state == CreatorState::Finished {
            return Err(AppError::AlreadyFinished);
        }
        for module in modules {
            self.modules.register(module)?;
            if self.state == CreatorState::Empty {
                self.state = CreatorState::ModulesRegistering;
            }
        }
        Ok(())
    }

    /// Construct the engine. Valid once.
    ///
    /// Caller `engine_options` run before the options derived from `opts`, so
    /// derived settings win where both touch the same field. On error nothing
    /// is retained: the builder stays open and the state is unchanged.
    pub fn create(
        &mut self,
        store: Box<dyn CommitStore>,
        trace: Option<TraceSink>,
        opts: &dyn AppOptions,
        engine_options: Vec<EngineOption>,
    ) -> AppResult<EngineHandle> {
        match self.state {
            CreatorState::EngineConstructed => return Err(AppError::AlreadyCreated),
            CreatorState::Finished => return Err(AppError::AlreadyFinished),
            CreatorState::Empty | CreatorState::ModulesRegistering => {}
        }

        let derived = derive_engine_options(opts).map_err(|err| {
            warn!(app = %self.config.app_name, error = %err, "engine construction failed");
            err
        })?;

        let store_keys = self.builder.freeze();
        let mut engine = Engine::new(
            self.config.app_name.clone(),
            store,
            engine_options.into_iter().chain(derived),
        );
        engine.set_commit_store_tracer(trace);
        engine.set_version(env!("CARGO_PKG_VERSION"));
        engine.set_interface_registry(Arc::clone(self.builder.interface_registry()));
        engine.mount_stores(&store_keys);

        let handle = Arc::new(Mutex::new(engine));
        self.app = Some(Arc::clone(&handle));
        self.state = CreatorState::EngineConstructed;
        Ok(handle)
    }

    /// Validate hook wiring, optionally load the latest state, and seal.
    pub fn finish(&mut self, load_latest: bool) -> AppResult<()> {
        match self.state {
            CreatorState::Finished => return Err(AppError::AlreadyFinished),
            CreatorState::Empty | CreatorState::ModulesRegistering => {
                return Err(AppError::NotCreated)
            }
            CreatorState::EngineConstructed => {}
        }
        let app = self.app.as_ref().ok_or(AppError::NotCreated)?;

        for (hook, names) in self.config.hooks() {
            for name in names {
                let module = self.modules.get(name).ok_or_else(|| AppError::UnknownModule {
                    name: name.clone(),
                    hook: hook.phase(),
                })?;
                if !has_hook(module, hook) {
                    return Err(AppError::MissingHook {
                        name: name.clone(),
                        hook: hook.phase(),
                    });
                }
                debug!(module = %name, %hook, "resolved lifecycle hook");
            }
        }

        let mut engine = app.lock();
        if load_latest {
            engine.load_latest_version()?;
        }
        engine.set_hook_order(HookOrder {
            begin_blockers: self.config.begin_blockers.clone(),
            end_blockers: self.config.end_blockers.clone(),
            init_genesis: self.config.init_genesis.clone(),
        });
        drop(engine);

        self.state = CreatorState::Finished;
        info!(app = %self.config.app_name, modules = self.modules.len(), "app finished");
        Ok(())
    }
}
