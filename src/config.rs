//! Configuration traits and the runtime configuration record.
//!
//! The runtime configuration names the application and declares which modules
//! take part in each engine lifecycle phase.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Base trait for configuration types.
///
/// # Example
///
/// ```rust
/// use appwire::Config;
///
/// #[derive(Debug, Clone)]
/// struct MyConfig {
///     name: String,
///     workers: u32,
/// }
///
/// impl Config for MyConfig {
///     fn name(&self) -> &str {
///         &self.name
///     }
///
///     fn validate(&self) -> Result<(), String> {
///         if self.workers == 0 {
///             return Err("workers must be greater than 0".to_string());
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Config: Send + Sync {
    /// Returns the configuration name/identifier.
    fn name(&self) -> &str {
        "default"
    }

    /// Validates the configuration.
    ///
    /// Returns Ok(()) if valid, or an error message describing the issue.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Trait for configurations that support file-based loading.
pub trait FileConfig: Config {
    /// Load configuration from a file path.
    fn from_file(path: &Path) -> Result<Self, String>
    where
        Self: Sized;

    /// Save configuration to a file path.
    fn to_file(&self, path: &Path) -> Result<(), String>;
}

/// Hook phase names, used in error messages and logs.
pub const BEGIN_BLOCKER: &str = "begin blocker";
pub const END_BLOCKER: &str = "end blocker";
pub const INIT_GENESIS: &str = "init genesis participant";

/// Engine lifecycle phase a module can take part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    BeginBlock,
    EndBlock,
    InitGenesis,
}

impl Hook {
    pub const ALL: [Hook; 3] = [Hook::BeginBlock, Hook::EndBlock, Hook::InitGenesis];

    pub fn phase(self) -> &'static str {
        match self {
            Hook::BeginBlock => BEGIN_BLOCKER,
            Hook::EndBlock => END_BLOCKER,
            Hook::InitGenesis => INIT_GENESIS,
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phase())
    }
}

/// Runtime module configuration.
///
/// Each hook list is ordered: the engine invokes the named modules in the
/// order they appear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub app_name: String,
    pub begin_blockers: Vec<String>,
    pub end_blockers: Vec<String>,
    pub init_genesis: Vec<String>,
}

impl RuntimeConfig {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Self::default()
        }
    }

    pub fn with_begin_blockers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.begin_blockers = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_end_blockers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.end_blockers = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_init_genesis<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.init_genesis = names.into_iter().map(Into::into).collect();
        self
    }

    /// Every hook list paired with its phase, in validation order.
    pub fn hooks(&self) -> [(Hook, &[String]); 3] {
        [
            (Hook::BeginBlock, self.begin_blockers.as_slice()),
            (Hook::EndBlock, self.end_blockers.as_slice()),
            (Hook::InitGenesis, self.init_genesis.as_slice()),
        ]
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(text).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }
}

impl Config for RuntimeConfig {
    fn name(&self) -> &str {
        &self.app_name
    }

    fn validate(&self) -> Result<(), String> {
        if self.app_name.trim().is_empty() {
            return Err("app_name must not be empty".to_string());
        }
        for (hook, names) in self.hooks() {
            let mut seen = HashSet::new();
            for name in names {
                if !seen.insert(name.as_str()) {
                    return Err(format!("module {name:?} listed twice as a {hook}"));
                }
            }
        }
        Ok(())
    }
}

impl FileConfig for RuntimeConfig {
    fn from_file(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
        Self::from_toml(&text)
    }

    fn to_file(&self, path: &Path) -> Result<(), String> {
        let text = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, text).map_err(|e| format!("{}: {e}", path.display()))
    }
}
