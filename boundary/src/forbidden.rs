//! Forbidden-dependency isolation for test runs.
//!
//! Library code shared between applications must not reach back into those
//! applications. The rule is enforced while tests run: before a test module
//! executes, every loaded module under a forbidden prefix is swapped for a
//! [`ForbiddenDependencyModule`], which fails any import or attribute access
//! with a message naming the module. After the test module finishes the
//! originals go back, so other suites see the registry as it was.
//!
//! Two entry points share the same substitution logic:
//!
//! - [`ForbiddenDependencies::install`] returns an [`IsolationGuard`] that
//!   restores on drop.
//! - [`module_setup_teardown`] returns a pair of lifecycle hooks for runners
//!   that call setup and teardown separately.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{BoundaryError, ImportError};
use crate::registry::{Module, ModuleEntry, ModuleRegistry, is_same_or_submodule};

/// Prefixes that shared platform libraries must never import.
pub const PLATFORM_FORBIDDEN: [&str; 3] = ["lms", "cms", "common"];

/// Stand-in placed in the registry in place of a forbidden module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForbiddenDependencyModule {
    name: String,
}

impl ForbiddenDependencyModule {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The error every import from, or attribute access on, the stand-in
    /// produces. Logged at `error` level.
    #[must_use]
    pub fn forbidden_error(&self, attr: Option<&str>) -> ImportError {
        let err = ImportError::Forbidden {
            module: self.name.clone(),
        };
        tracing::error!(module = %self.name, attr, "{err}");
        err
    }
}

/// Validated set of forbidden module-name prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForbiddenDependencies {
    prefixes: BTreeSet<String>,
}

impl ForbiddenDependencies {
    /// Duplicates collapse; blank names and names that could never match a
    /// dotted module name (`lms.`, `.lms`, `lms..foo`, `lms foo`) are rejected.
    pub fn new<I, S>(prefixes: I) -> Result<Self, BoundaryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes = prefixes
            .into_iter()
            .map(|prefix| validate_prefix(prefix.into()))
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { prefixes })
    }

    /// The [`PLATFORM_FORBIDDEN`] set.
    #[must_use]
    pub fn platform() -> Self {
        Self {
            prefixes: PLATFORM_FORBIDDEN.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.prefixes.iter().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Whether `module_name` falls under one of the prefixes.
    #[must_use]
    pub fn covers(&self, module_name: &str) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| is_same_or_submodule(module_name, prefix))
    }

    /// Substitute stand-ins now; the returned guard restores the originals.
    #[must_use = "dropping the guard restores the forbidden modules immediately"]
    pub fn install<'r>(&self, registry: &'r ModuleRegistry) -> IsolationGuard<'r> {
        IsolationGuard {
            registry,
            snapshot: Some(substitute(registry, self)),
        }
    }
}

fn validate_prefix(prefix: String) -> Result<String, BoundaryError> {
    let trimmed = prefix.trim();
    if trimmed.is_empty() {
        return Err(BoundaryError::EmptyPrefix);
    }
    let malformed =
        trimmed.contains(char::is_whitespace) || trimmed.split('.').any(str::is_empty);
    if malformed {
        return Err(BoundaryError::InvalidPrefix {
            prefix: trimmed.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Originals captured by one setup, keyed by full module name.
#[derive(Debug, Default)]
struct Snapshot {
    originals: BTreeMap<String, Arc<Module>>,
}

/// Capture every loaded module under each prefix, then replace them all.
///
/// Submodules are captured too: leaving `lms.foo` in place while `lms` is
/// replaced would let an already-loaded submodule be imported directly.
fn substitute(registry: &ModuleRegistry, forbidden: &ForbiddenDependencies) -> Snapshot {
    let mut snapshot = Snapshot::default();
    for prefix in forbidden.prefixes() {
        let loaded = registry.loaded_under(prefix);
        tracing::debug!(prefix, modules = loaded.len(), "capturing forbidden modules");
        snapshot.originals.extend(loaded);
    }

    for name in snapshot.originals.keys() {
        registry.insert(
            name.clone(),
            ModuleEntry::Forbidden(ForbiddenDependencyModule::new(name.clone())),
        );
    }
    snapshot
}

fn restore(registry: &ModuleRegistry, snapshot: Snapshot) {
    let restored = snapshot.originals.len();
    for (name, module) in snapshot.originals {
        registry.insert(name, ModuleEntry::Loaded(module));
    }
    tracing::debug!(restored, "restored forbidden modules");
}

/// Keeps forbidden modules replaced until dropped or [`restore`](Self::restore)d.
#[derive(Debug)]
pub struct IsolationGuard<'r> {
    registry: &'r ModuleRegistry,
    snapshot: Option<Snapshot>,
}

impl IsolationGuard<'_> {
    /// Names currently replaced by stand-ins.
    pub fn substituted(&self) -> impl Iterator<Item = &str> {
        self.snapshot
            .iter()
            .flat_map(|snapshot| snapshot.originals.keys().map(String::as_str))
    }

    pub fn restore(mut self) {
        self.restore_now();
    }

    fn restore_now(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            restore(self.registry, snapshot);
        }
    }
}

impl Drop for IsolationGuard<'_> {
    fn drop(&mut self) {
        self.restore_now();
    }
}

#[derive(Debug)]
struct HookState {
    registry: ModuleRegistry,
    forbidden: ForbiddenDependencies,
    snapshot: Mutex<Option<Snapshot>>,
}

/// Setup hook returned by [`module_setup_teardown`].
#[derive(Debug, Clone)]
pub struct ModuleSetup {
    state: Arc<HookState>,
}

/// Teardown hook returned by [`module_setup_teardown`].
#[derive(Debug, Clone)]
pub struct ModuleTeardown {
    state: Arc<HookState>,
}

impl ModuleSetup {
    /// Replace forbidden modules with stand-ins.
    ///
    /// Does nothing while a previous setup is still waiting for its teardown,
    /// since capturing again would record stand-ins as originals.
    pub fn call(&self) {
        let mut slot = self
            .state
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            tracing::warn!("forbidden dependency setup called twice without teardown");
            return;
        }
        *slot = Some(substitute(&self.state.registry, &self.state.forbidden));
    }
}

impl ModuleTeardown {
    /// Put back every module the matching setup replaced.
    pub fn call(&self) {
        let snapshot = self
            .state
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(snapshot) = snapshot {
            restore(&self.state.registry, snapshot);
        }
    }
}

/// Setup and teardown hooks guarding the [global](ModuleRegistry::global)
/// registry.
///
/// ```
/// use edxkit_boundary::{ForbiddenDependencies, module_setup_teardown};
///
/// let (setup, teardown) = module_setup_teardown(ForbiddenDependencies::platform());
/// setup.call();
/// // ... run the test module ...
/// teardown.call();
/// ```
#[must_use]
pub fn module_setup_teardown(forbidden: ForbiddenDependencies) -> (ModuleSetup, ModuleTeardown) {
    module_setup_teardown_in(ModuleRegistry::global(), forbidden)
}

/// Like [`module_setup_teardown`], for a specific registry.
#[must_use]
pub fn module_setup_teardown_in(
    registry: &ModuleRegistry,
    forbidden: ForbiddenDependencies,
) -> (ModuleSetup, ModuleTeardown) {
    let state = Arc::new(HookState {
        registry: registry.clone(),
        forbidden,
        snapshot: Mutex::new(None),
    });
    (
        ModuleSetup {
            state: Arc::clone(&state),
        },
        ModuleTeardown { state },
    )
}
