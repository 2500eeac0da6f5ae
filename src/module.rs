//! The capability set the assembler needs from a feature module.
//!
//! Feature modules carry their own keepers, messages and state transitions.
//! None of that is visible here: the assembler only needs a stable name to key
//! the module registry, and the lifecycle hooks the module implements so that
//! hook declarations can be checked against them.

use std::any::Any;
use std::fmt::Debug;

use crate::config::Hook;

/// Base trait for all application modules.
///
/// # Example
///
/// ```rust
/// use appwire::{AppModule, Hook};
/// use std::any::Any;
///
/// #[derive(Debug)]
/// struct BankModule;
///
/// impl AppModule for BankModule {
///     fn name(&self) -> &str {
///         "bank"
///     }
///
///     fn hooks(&self) -> &[Hook] {
///         &[Hook::BeginBlock]
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
/// ```
pub trait AppModule: Send + Sync + Debug {
    /// Returns the unique name of this module.
    ///
    /// This name is used for registration, store key namespacing and
    /// lifecycle hook lookup.
    fn name(&self) -> &str;

    /// Lifecycle hooks this module implements. None by default.
    fn hooks(&self) -> &[Hook] {
        &[]
    }

    /// Downcast to concrete type for advanced usage.
    fn as_any(&self) -> &dyn Any;
}

/// Extension trait for module type checking.
pub trait AppModuleExt: AppModule {
    /// Check if this module is of type T.
    fn is<T: AppModule + 'static>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Downcast to type T.
    fn downcast_ref<T: AppModule + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl<M: AppModule + ?Sized> AppModuleExt for M {}

/// Whether `module` implements `hook`.
pub fn has_hook(module: &dyn AppModule, hook: Hook) -> bool {
    module.hooks().contains(&hook)
}
