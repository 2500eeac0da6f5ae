//! Pruning policy for historical application state.

use std::fmt;

use crate::error::PruningError;
use crate::options::{
    AppOptions, AppOptionsExt, FLAG_PRUNING, FLAG_PRUNING_INTERVAL, FLAG_PRUNING_KEEP_RECENT,
};

const DEFAULT_KEEP_RECENT: u64 = 362_880;
const EVERYTHING_KEEP_RECENT: u64 = 2;
const PRUNING_INTERVAL: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruningStrategy {
    /// Keep recent states, prune the rest every 10 blocks.
    Default,
    /// Keep only the last 2 states.
    Everything,
    /// Keep every state.
    Nothing,
    /// Operator-supplied keep-recent and interval.
    Custom,
}

impl PruningStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PruningStrategy::Default => "default",
            PruningStrategy::Everything => "everything",
            PruningStrategy::Nothing => "nothing",
            PruningStrategy::Custom => "custom",
        }
    }
}

impl fmt::Display for PruningStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruningOptions {
    pub strategy: PruningStrategy,
    /// Number of recent heights kept on disk.
    pub keep_recent: u64,
    /// Height interval between pruning runs; 0 disables pruning.
    pub interval: u64,
}

impl PruningOptions {
    pub fn new(strategy: PruningStrategy) -> Self {
        match strategy {
            PruningStrategy::Default | PruningStrategy::Custom => Self {
                strategy,
                keep_recent: DEFAULT_KEEP_RECENT,
                interval: PRUNING_INTERVAL,
            },
            PruningStrategy::Everything => Self {
                strategy,
                keep_recent: EVERYTHING_KEEP_RECENT,
                interval: PRUNING_INTERVAL,
            },
            PruningStrategy::Nothing => Self {
                strategy,
                keep_recent: 0,
                interval: 0,
            },
        }
    }

    pub fn custom(keep_recent: u64, interval: u64) -> Self {
        Self {
            strategy: PruningStrategy::Custom,
            keep_recent,
            interval,
        }
    }

    /// Parse a strategy name. An empty name selects the default strategy.
    pub fn from_name(name: &str) -> Result<Self, PruningError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "default" => Ok(Self::new(PruningStrategy::Default)),
            "everything" => Ok(Self::new(PruningStrategy::Everything)),
            "nothing" => Ok(Self::new(PruningStrategy::Nothing)),
            "custom" => Ok(Self::new(PruningStrategy::Custom)),
            other => Err(PruningError::UnknownStrategy(other.to_string())),
        }
    }

    /// Read the strategy and, for `custom`, its parameters from `opts`.
    pub fn from_options(opts: &dyn AppOptions) -> Result<Self, PruningError> {
        let options = match Self::from_name(&opts.get_string(FLAG_PRUNING))? {
            PruningOptions {
                strategy: PruningStrategy::Custom,
                ..
            } => Self::custom(
                opts.get_u64(FLAG_PRUNING_KEEP_RECENT),
                opts.get_u64(FLAG_PRUNING_INTERVAL),
            ),
            options => options,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), PruningError> {
        if self.strategy != PruningStrategy::Custom {
            return Ok(());
        }
        if self.interval == 0 {
            return Err(PruningError::IntervalZero);
        }
        if self.interval < PRUNING_INTERVAL {
            return Err(PruningError::IntervalTooSmall(self.interval));
        }
        if self.keep_recent < EVERYTHING_KEEP_RECENT {
            return Err(PruningError::KeepRecentTooSmall(self.keep_recent));
        }
        Ok(())
    }
}

impl Default for PruningOptions {
    fn default() -> Self {
        Self::new(PruningStrategy::Default)
    }
}
