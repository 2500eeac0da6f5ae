//! The runtime engine as seen by the assembler.
//!
//! The engine's state machine and storage live elsewhere. The assembler
//! derives its configuration record, hands it the storage handle, mounts the
//! namespaces collected by the builder, and binds the interface registry.
//! Configuration is applied through [`EngineOption`] closures so callers can
//! add their own settings next to the derived ones.

use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use regex::Regex;
use tracing::{debug, info};

use crate::builder::StoreKey;
use crate::codec::InterfaceRegistry;
use crate::error::{GasPriceError, LoadError};
use crate::pruning::PruningOptions;
use crate::snapshot::{SnapshotOptions, SnapshotStore};

/// Storage backend the engine commits through.
pub trait CommitStore: Send {
    /// Make a namespace available.
    fn mount_store(&mut self, key: &StoreKey);

    /// Load the most recent committed version, returning its height.
    fn load_latest_version(&mut self) -> Result<u64, LoadError>;
}

/// A commit store that keeps nothing on disk.
#[derive(Debug, Default)]
pub struct MemCommitStore {
    mounted: Vec<StoreKey>,
    version: u64,
}

impl MemCommitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `version` is the last committed height.
    pub fn at_version(version: u64) -> Self {
        Self {
            mounted: Vec::new(),
            version,
        }
    }

    pub fn mounted(&self) -> &[StoreKey] {
        &self.mounted
    }
}

impl CommitStore for MemCommitStore {
    fn mount_store(&mut self, key: &StoreKey) {
        self.mounted.push(key.clone());
    }

    fn load_latest_version(&mut self) -> Result<u64, LoadError> {
        Ok(self.version)
    }
}

/// A decimal amount of one denomination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecCoin {
    pub denom: String,
    pub amount: String,
}

impl fmt::Display for DecCoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

fn dec_coin_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-9]+(?:\.[0-9]+)?)([a-zA-Z][a-zA-Z0-9/:._-]{2,127})$")
            .expect("dec coin pattern is valid")
    })
}

/// Parse a comma separated list such as `0.025uatom,0stake`.
pub fn parse_dec_coins(text: &str) -> Result<Vec<DecCoin>, GasPriceError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split(',')
        .map(|part| {
            let part = part.trim();
            let caps = dec_coin_pattern()
                .captures(part)
                .ok_or_else(|| GasPriceError(part.to_string()))?;
            Ok(DecCoin {
                amount: caps[1].to_string(),
                denom: caps[2].to_string(),
            })
        })
        .collect()
}

/// Snapshot store plus its schedule.
#[derive(Debug, Clone)]
pub struct SnapshotSettings {
    pub store: Arc<SnapshotStore>,
    pub options: SnapshotOptions,
}

/// Everything the engine is configured with.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub chain_id: Option<String>,
    pub pruning: PruningOptions,
    pub min_gas_prices: Vec<DecCoin>,
    pub halt_height: u64,
    /// Unix seconds; 0 never halts.
    pub halt_time: u64,
    pub min_retain_blocks: u64,
    pub inter_block_cache: bool,
    pub trace: bool,
    pub index_events: BTreeSet<String>,
    pub skip_upgrade_heights: BTreeSet<i64>,
    pub snapshot: Option<SnapshotSettings>,
}

/// A deferred change to the engine configuration.
pub type EngineOption = Box<dyn FnOnce(&mut EngineConfig) + Send>;

pub fn set_chain_id(chain_id: impl Into<String>) -> EngineOption {
    let chain_id = chain_id.into();
    Box::new(move |c: &mut EngineConfig| c.chain_id = Some(chain_id))
}

pub fn set_pruning(pruning: PruningOptions) -> EngineOption {
    Box::new(move |c: &mut EngineConfig| c.pruning = pruning)
}

pub fn set_min_gas_prices(prices: Vec<DecCoin>) -> EngineOption {
    Box::new(move |c: &mut EngineConfig| c.min_gas_prices = prices)
}

pub fn set_halt_height(height: u64) -> EngineOption {
    Box::new(move |c: &mut EngineConfig| c.halt_height = height)
}

pub fn set_halt_time(time: u64) -> EngineOption {
    Box::new(move |c: &mut EngineConfig| c.halt_time = time)
}

pub fn set_min_retain_blocks(blocks: u64) -> EngineOption {
    Box::new(move |c: &mut EngineConfig| c.min_retain_blocks = blocks)
}

pub fn set_inter_block_cache(enabled: bool) -> EngineOption {
    Box::new(move |c: &mut EngineConfig| c.inter_block_cache = enabled)
}

pub fn set_trace(enabled: bool) -> EngineOption {
    Box::new(move |c: &mut EngineConfig| c.trace = enabled)
}

pub fn set_index_events(events: Vec<String>) -> EngineOption {
    Box::new(move |c: &mut EngineConfig| c.index_events = events.into_iter().collect())
}

pub fn set_skip_upgrade_heights(heights: Vec<i64>) -> EngineOption {
    Box::new(move |c: &mut EngineConfig| c.skip_upgrade_heights = heights.into_iter().collect())
}

pub fn set_snapshot(store: Arc<SnapshotStore>, options: SnapshotOptions) -> EngineOption {
    Box::new(move |c: &mut EngineConfig| c.snapshot = Some(SnapshotSettings { store, options }))
}

/// Ordered module names for each lifecycle phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookOrder {
    pub begin_blockers: Vec<String>,
    pub end_blockers: Vec<String>,
    pub init_genesis: Vec<String>,
}

/// Sink for store operation traces.
pub type TraceSink = Box<dyn Write + Send>;

/// Shared handle to a constructed engine.
pub type EngineHandle = Arc<Mutex<Engine>>;

pub struct Engine {
    name: String,
    version: String,
    config: EngineConfig,
    store: Box<dyn CommitStore>,
    tracer: Option<TraceSink>,
    interface_registry: Option<Arc<InterfaceRegistry>>,
    store_keys: Vec<StoreKey>,
    hooks: HookOrder,
    loaded_version: Option<u64>,
}

impl Engine {
    /// Build an engine, applying `options` in order.
    pub fn new(
        name: impl Into<String>,
        store: Box<dyn CommitStore>,
        options: impl IntoIterator<Item = EngineOption>,
    ) -> Self {
        let mut config = EngineConfig::default();
        for option in options {
            option(&mut config);
        }
        let name = name.into();
        info!(
            app = %name,
            pruning = %config.pruning.strategy,
            halt_height = config.halt_height,
            snapshots = config.snapshot.is_some(),
            "constructed engine"
        );
        Self {
            name,
            version: String::new(),
            config,
            store,
            tracer: None,
            interface_registry: None,
            store_keys: Vec::new(),
            hooks: HookOrder::default(),
            loaded_version: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_commit_store_tracer(&mut self, tracer: Option<TraceSink>) {
        self.tracer = tracer;
    }

    /// Write one trace line, if a tracer is set.
    pub fn trace(&mut self, line: &str) -> std::io::Result<()> {
        match self.tracer.as_mut() {
            Some(tracer) => writeln!(tracer, "{line}"),
            None => Ok(()),
        }
    }

    pub fn has_tracer(&self) -> bool {
        self.tracer.is_some()
    }

    pub fn set_interface_registry(&mut self, registry: Arc<InterfaceRegistry>) {
        self.interface_registry = Some(registry);
    }

    pub fn interface_registry(&self) -> Option<&Arc<InterfaceRegistry>> {
        self.interface_registry.as_ref()
    }

    pub fn mount_stores(&mut self, keys: &[StoreKey]) {
        for key in keys {
            debug!(store = %key, "mounting store");
            self.store.mount_store(key);
            self.store_keys.push(key.clone());
        }
    }

    pub fn store_keys(&self) -> &[StoreKey] {
        &self.store_keys
    }

    pub fn set_hook_order(&mut self, hooks: HookOrder) {
        self.hooks = hooks;
    }

    pub fn hook_order(&self) -> &HookOrder {
        &self.hooks
    }

    pub fn load_latest_version(&mut self) -> Result<u64, LoadError> {
        let version = self.store.load_latest_version()?;
        info!(app = %self.name, version, "loaded latest version");
        self.loaded_version = Some(version);
        Ok(version)
    }

    pub fn loaded_version(&self) -> Option<u64> {
        self.loaded_version
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("config", &self.config)
            .field("store_keys", &self.store_keys)
            .field("hooks", &self.hooks)
            .field("loaded_version", &self.loaded_version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StoreKind;
    use crate::pruning::PruningStrategy;

    #[test]
    fn test_parse_dec_coins() {
        assert_eq!(
            parse_dec_coins("0stake").unwrap(),
            vec![DecCoin {
                denom: "stake".to_string(),
                amount: "0".to_string()
            }]
        );

        let coins = parse_dec_coins("0.025uatom, 1ibc/27394FB092D2").unwrap();
        assert_eq!(coins.len(), 2);
        assert_eq!(coins[0].to_string(), "0.025uatom");
        assert_eq!(coins[1].denom, "ibc/27394FB092D2");

        assert!(parse_dec_coins("").unwrap().is_empty());
        assert_eq!(
            parse_dec_coins("stake0"),
            Err(GasPriceError("stake0".to_string()))
        );
        assert!(parse_dec_coins("1x").is_err());
    }

    #[test]
    fn test_options_apply_in_order() {
        let engine = Engine::new(
            "simapp",
            Box::new(MemCommitStore::new()),
            vec![
                set_halt_height(10),
                set_pruning(PruningOptions::new(PruningStrategy::Nothing)),
                set_halt_height(20),
                set_index_events(vec!["tx.height".to_string(), "tx.height".to_string()]),
            ],
        );

        assert_eq!(engine.config().halt_height, 20);
        assert_eq!(engine.config().pruning.strategy, PruningStrategy::Nothing);
        assert_eq!(engine.config().index_events.len(), 1);
        assert!(engine.config().snapshot.is_none());
    }

    #[test]
    fn test_mount_and_load() {
        let mut engine = Engine::new("simapp", Box::new(MemCommitStore::at_version(42)), vec![]);
        engine.mount_stores(&[
            StoreKey::new(StoreKind::Kv, "bank"),
            StoreKey::new(StoreKind::Transient, "transient_bank"),
        ]);

        assert_eq!(engine.store_keys().len(), 2);
        assert_eq!(engine.loaded_version(), None);
        assert_eq!(engine.load_latest_version(), Ok(42));
        assert_eq!(engine.loaded_version(), Some(42));
    }

    #[test]
    fn test_tracer() {
        let mut engine = Engine::new("simapp", Box::new(MemCommitStore::new()), vec![]);
        assert!(engine.trace("ignored").is_ok());

        engine.set_commit_store_tracer(Some(Box::new(Vec::<u8>::new())));
        assert!(engine.has_tracer());
        assert!(engine.trace("write bank/balances").is_ok());
    }
}
