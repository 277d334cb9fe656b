//! Architectural import boundaries, enforced while tests run.
//!
//! Modules resolve their dependencies through a [`ModuleRegistry`]. A test
//! suite for a shared library declares which application prefixes it must not
//! depend on; for the duration of the suite those modules are replaced by
//! stand-ins that fail every import with a descriptive [`ImportError`].
//!
//! ```
//! use edxkit_boundary::{ForbiddenDependencies, Module, ModuleRegistry};
//!
//! let registry = ModuleRegistry::new();
//! registry.register(Module::new("lms").with_export("VERSION", 1_u32));
//!
//! let guard = ForbiddenDependencies::platform().install(&registry);
//! assert!(registry.import("lms").unwrap_err().is_forbidden());
//! drop(guard);
//! assert!(registry.import("lms").is_ok());
//! ```

pub mod config;
mod error;
pub mod forbidden;
mod registry;

pub use config::{Boundary, BoundaryConfig};
pub use error::{BoundaryError, ImportError};
pub use forbidden::{
    ForbiddenDependencies, ForbiddenDependencyModule, IsolationGuard, ModuleSetup, ModuleTeardown,
    PLATFORM_FORBIDDEN, module_setup_teardown, module_setup_teardown_in,
};
pub use registry::{Module, ModuleEntry, ModuleRegistry};
