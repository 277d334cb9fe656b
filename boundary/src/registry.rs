//! Named modules and the registry that resolves imports against them.
//!
//! The registry plays the role of a language runtime's module table: code
//! resolves its dependencies through [`ModuleRegistry::import`] and
//! [`ModuleRegistry::import_from`], and test harnesses may temporarily replace
//! entries with stand-ins (see [`crate::forbidden`]).

use std::any::{self, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::ImportError;
use crate::forbidden::ForbiddenDependencyModule;

type Export = Arc<dyn Any + Send + Sync>;

/// A named module and the values it exports.
pub struct Module {
    name: String,
    exports: BTreeMap<String, Export>,
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("exports", &self.exports.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Module {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exports: BTreeMap::new(),
        }
    }

    /// Add (or replace) an exported attribute.
    pub fn with_export<T>(mut self, attr: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.exports.insert(attr.into(), Arc::new(value));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.exports.keys().map(String::as_str)
    }

    /// Look up an exported attribute by name and type.
    pub fn getattr<T>(&self, attr: &str) -> Result<Arc<T>, ImportError>
    where
        T: Any + Send + Sync,
    {
        let export = self
            .exports
            .get(attr)
            .ok_or_else(|| ImportError::MissingAttribute {
                module: self.name.clone(),
                attr: attr.to_string(),
            })?;
        Arc::clone(export)
            .downcast::<T>()
            .map_err(|_| ImportError::TypeMismatch {
                module: self.name.clone(),
                attr: attr.to_string(),
                expected: any::type_name::<T>(),
            })
    }
}

/// What a registry holds under a module name.
#[derive(Debug, Clone)]
pub enum ModuleEntry {
    Loaded(Arc<Module>),
    Forbidden(ForbiddenDependencyModule),
}

impl ModuleEntry {
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    #[must_use]
    pub fn as_loaded(&self) -> Option<&Arc<Module>> {
        match self {
            Self::Loaded(module) => Some(module),
            Self::Forbidden(_) => None,
        }
    }

    /// Attribute access. Always fails on a stand-in.
    pub fn getattr<T>(&self, attr: &str) -> Result<Arc<T>, ImportError>
    where
        T: Any + Send + Sync,
    {
        match self {
            Self::Loaded(module) => module.getattr(attr),
            Self::Forbidden(stand_in) => Err(stand_in.forbidden_error(Some(attr))),
        }
    }
}

/// Module table keyed by fully qualified, dot-separated names.
///
/// Cloning yields another handle to the same table.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    entries: Arc<RwLock<BTreeMap<String, ModuleEntry>>>,
}

impl ModuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    #[must_use]
    pub fn global() -> &'static ModuleRegistry {
        static GLOBAL: OnceLock<ModuleRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ModuleRegistry::new)
    }

    /// Load `module` under its own name. Returns whatever was there before.
    pub fn register(&self, module: impl Into<Arc<Module>>) -> Option<ModuleEntry> {
        let module = module.into();
        let name = module.name().to_string();
        self.insert(name, ModuleEntry::Loaded(module))
    }

    pub fn remove(&self, name: &str) -> Option<ModuleEntry> {
        self.write().remove(name)
    }

    #[must_use]
    pub fn entry(&self, name: &str) -> Option<ModuleEntry> {
        self.read().get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// All registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// `import name`
    ///
    /// Fails as forbidden when `name` or any package above it is a stand-in,
    /// whether or not `name` itself is loaded.
    pub fn import(&self, name: &str) -> Result<Arc<Module>, ImportError> {
        match self.resolve(name)? {
            ModuleEntry::Loaded(module) => Ok(module),
            ModuleEntry::Forbidden(stand_in) => Err(stand_in.forbidden_error(None)),
        }
    }

    /// `from name import attr`
    pub fn import_from<T>(&self, name: &str, attr: &str) -> Result<Arc<T>, ImportError>
    where
        T: Any + Send + Sync,
    {
        self.resolve(name)?.getattr(attr)
    }

    /// Entry for `name`, checked against forbidden parent packages.
    ///
    /// A stand-in under `name` itself is returned as is so the caller reports
    /// the access; a stand-in at `lms` blocks `lms.late` and unloaded
    /// `lms.bar` alike.
    fn resolve(&self, name: &str) -> Result<ModuleEntry, ImportError> {
        let entries = self.read();
        let entry = entries.get(name);
        if !entry.is_some_and(ModuleEntry::is_forbidden) {
            let blocking = parent_packages(name).find_map(|parent| match entries.get(parent) {
                Some(ModuleEntry::Forbidden(stand_in)) => Some(stand_in),
                _ => None,
            });
            if let Some(stand_in) = blocking {
                return Err(stand_in.forbidden_error(None));
            }
        }
        entry.cloned().ok_or_else(|| ImportError::NotFound {
            module: name.to_string(),
        })
    }

    pub(crate) fn insert(&self, name: String, entry: ModuleEntry) -> Option<ModuleEntry> {
        self.write().insert(name, entry)
    }

    /// Loaded modules named `prefix` or living under `prefix.`.
    pub(crate) fn loaded_under(&self, prefix: &str) -> Vec<(String, Arc<Module>)> {
        self.read()
            .iter()
            .filter(|(name, _)| is_same_or_submodule(name, prefix))
            .filter_map(|(name, entry)| entry.as_loaded().map(|m| (name.clone(), Arc::clone(m))))
            .collect()
    }

    // The map is never left half-updated, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, ModuleEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, ModuleEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `lms.foo.bar` yields `lms`, then `lms.foo`.
fn parent_packages(name: &str) -> impl Iterator<Item = &str> {
    name.match_indices('.').map(move |(idx, _)| &name[..idx])
}

/// `lms` covers `lms` and `lms.djangoapps`, but not `lmsx`.
pub(crate) fn is_same_or_submodule(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}
