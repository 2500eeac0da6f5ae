//! Error types for Appwire.

use std::path::PathBuf;

use thiserror::Error;

/// Root error type for application assembly.
#[derive(Error, Debug)]
pub enum AppError {
    /// `finish` was called before `create`
    #[error("app not created yet, can't finish")]
    NotCreated,

    /// `create` was called a second time
    #[error("app already created")]
    AlreadyCreated,

    /// The creator reached its terminal state
    #[error("app already finished")]
    AlreadyFinished,

    /// A lifecycle hook names a module nobody registered
    #[error("can't find module named {name:?} registered as a {hook}")]
    UnknownModule { name: String, hook: &'static str },

    /// A lifecycle hook names a module that does not implement that hook
    #[error("module {name:?} is registered as a {hook} but does not implement it")]
    MissingHook { name: String, hook: &'static str },

    /// The runtime configuration failed validation
    #[error("invalid runtime config: {0}")]
    InvalidConfig(String),

    /// The engine failed to load persisted state
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Module registry errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Builder errors
    #[error("Builder error: {0}")]
    Builder(#[from] BuilderError),

    /// Provider resolution errors
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// Invalid pruning configuration
    #[error("Pruning error: {0}")]
    Pruning(#[from] PruningError),

    /// Invalid minimum gas prices
    #[error("Gas price error: {0}")]
    GasPrice(#[from] GasPriceError),

    /// Snapshot store could not be opened
    #[error(transparent)]
    StoreOpen(#[from] StoreOpenError),
}

/// Errors raised while registering or resolving providers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// A factory already exists for the key
    #[error("duplicate provider for {key}")]
    DuplicateProvider { key: String },

    /// Resolution walked back onto a key that is still being built
    #[error("cyclic dependency: {}", path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    /// No factory can produce the key
    #[error("no provider for {key}")]
    MissingProvider { key: String },

    /// A factory read a value it never declared as a dependency
    #[error("undeclared dependency {key}")]
    UndeclaredDependency { key: String },

    /// A module-scoped factory was resolved without a scope
    #[error("{key} requires a module scope")]
    MissingScope { key: String },

    /// A stored instance did not downcast to the requested type
    #[error("type mismatch for {key}")]
    TypeMismatch { key: String },

    /// The factory itself returned an error
    #[error("provider for {key} failed: {reason}")]
    ProviderFailed { key: String, reason: String },
}

/// Errors that can occur in module registry operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Module already registered with this name
    #[error("module named {0:?} already exists")]
    DuplicateModule(String),
}

/// Errors raised by the application builder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuilderError {
    #[error("store key name must not be empty")]
    EmptyName,

    /// The builder was frozen by engine construction
    #[error("builder is frozen, can't register store key {0:?}")]
    Frozen(String),
}

/// Conflicting codec registrations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("{implementation} already registered for interface {interface}")]
    DuplicateImplementation {
        interface: String,
        implementation: String,
    },

    #[error("amino name {0:?} already registered")]
    DuplicateAminoName(String),
}

/// The snapshot store could not be opened.
#[derive(Error, Debug)]
#[error("failed to open snapshot store at {}: {reason}", path.display())]
pub struct StoreOpenError {
    pub path: PathBuf,
    pub reason: String,
}

/// The engine could not load its latest persisted version.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to load latest version: {0}")]
pub struct LoadError(pub String);

/// Invalid pruning strategy or parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PruningError {
    #[error("unknown pruning strategy {0:?}")]
    UnknownStrategy(String),

    #[error("pruning interval must not be set to 0")]
    IntervalZero,

    #[error("pruning interval {0} is too small, must be at least 10")]
    IntervalTooSmall(u64),

    #[error("pruning keep-recent {0} is too small, must be at least 2")]
    KeepRecentTooSmall(u64),
}

/// Malformed `minimum-gas-prices` value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid decimal coin expression {0:?}")]
pub struct GasPriceError(pub String);

/// Result type alias for provider registry operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Result type alias for module registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type alias for application assembly.
pub type AppResult<T> = Result<T, AppError>;
