//! Forbidden-dependency isolation as a test suite would use it.

use std::fs;
use std::panic;
use std::sync::Arc;

use edxkit_boundary::{
    BoundaryConfig, BoundaryError, ForbiddenDependencies, ImportError, Module, ModuleEntry,
    ModuleRegistry, module_setup_teardown, module_setup_teardown_in,
};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Modules {
    registry: ModuleRegistry,
    lms: Arc<Module>,
    lms_foo: Arc<Module>,
    lmsx: Arc<Module>,
}

fn loaded_modules() -> Modules {
    let registry = ModuleRegistry::new();
    let lms = Arc::new(Module::new("lms").with_export("VERSION", 2_u32));
    let lms_foo = Arc::new(Module::new("lms.foo").with_export("helper", String::from("h")));
    let lmsx = Arc::new(Module::new("lmsx"));
    registry.register(Arc::clone(&lms));
    registry.register(Arc::clone(&lms_foo));
    registry.register(Arc::clone(&lmsx));
    registry.register(Module::new("openedx.core.djangolib"));
    Modules {
        registry,
        lms,
        lms_foo,
        lmsx,
    }
}

fn assert_forbidden(err: &ImportError, module: &str) {
    assert_eq!(
        err,
        &ImportError::Forbidden {
            module: module.to_string()
        }
    );
}

#[test]
fn setup_poisons_module_and_submodules_then_teardown_restores_identity() {
    init_tracing();
    let modules = loaded_modules();
    let forbidden = ForbiddenDependencies::new(["lms"]).unwrap();
    let (setup, teardown) = module_setup_teardown_in(&modules.registry, forbidden);

    setup.call();

    assert_forbidden(&modules.registry.import("lms").unwrap_err(), "lms");
    assert_forbidden(&modules.registry.import("lms.foo").unwrap_err(), "lms.foo");
    assert_forbidden(
        &modules
            .registry
            .import_from::<u32>("lms", "VERSION")
            .unwrap_err(),
        "lms",
    );
    assert_forbidden(
        &modules
            .registry
            .import_from::<String>("lms.foo", "helper")
            .unwrap_err(),
        "lms.foo",
    );
    assert!(modules.registry.entry("lms").unwrap().is_forbidden());

    // Names that merely share the prefix text stay loaded.
    let lmsx = modules.registry.import("lmsx").unwrap();
    assert!(Arc::ptr_eq(&lmsx, &modules.lmsx));
    assert!(modules.registry.import("openedx.core.djangolib").is_ok());

    teardown.call();

    let lms = modules.registry.import("lms").unwrap();
    let lms_foo = modules.registry.import("lms.foo").unwrap();
    assert!(Arc::ptr_eq(&lms, &modules.lms));
    assert!(Arc::ptr_eq(&lms_foo, &modules.lms_foo));
    assert_eq!(
        *modules.registry.import_from::<u32>("lms", "VERSION").unwrap(),
        2
    );
}

#[test]
fn registry_names_are_unchanged_by_a_full_cycle() {
    let modules = loaded_modules();
    let before = modules.registry.names();

    let (setup, teardown) =
        module_setup_teardown_in(&modules.registry, ForbiddenDependencies::platform());
    setup.call();
    assert_eq!(modules.registry.names(), before);
    teardown.call();

    assert_eq!(modules.registry.names(), before);
    for name in &before {
        assert!(matches!(
            modules.registry.entry(name),
            Some(ModuleEntry::Loaded(_))
        ));
    }
}

#[test]
fn modules_loaded_during_the_run_are_not_touched_by_teardown() {
    let modules = loaded_modules();
    let (setup, teardown) =
        module_setup_teardown_in(&modules.registry, ForbiddenDependencies::platform());

    setup.call();
    modules.registry.register(Module::new("cms.late"));
    teardown.call();

    assert!(modules.registry.import("cms.late").is_ok());
}

#[test]
fn unloaded_submodule_of_a_forbidden_package_is_forbidden() {
    let modules = loaded_modules();
    let (setup, teardown) =
        module_setup_teardown_in(&modules.registry, ForbiddenDependencies::new(["lms"]).unwrap());

    setup.call();
    assert_forbidden(&modules.registry.import("lms.bar").unwrap_err(), "lms");
    assert_forbidden(
        &modules
            .registry
            .import_from::<u32>("lms.bar.baz", "x")
            .unwrap_err(),
        "lms",
    );
    teardown.call();

    assert!(matches!(
        modules.registry.import("lms.bar"),
        Err(ImportError::NotFound { .. })
    ));
}

#[test]
fn submodule_registered_during_the_run_is_forbidden_until_teardown() {
    let modules = loaded_modules();
    let (setup, teardown) =
        module_setup_teardown_in(&modules.registry, ForbiddenDependencies::new(["lms"]).unwrap());

    setup.call();
    let late = Arc::new(Module::new("lms.late").with_export("x", 1_u32));
    modules.registry.register(Arc::clone(&late));
    assert_forbidden(&modules.registry.import("lms.late").unwrap_err(), "lms");
    assert_forbidden(
        &modules
            .registry
            .import_from::<u32>("lms.late", "x")
            .unwrap_err(),
        "lms",
    );
    assert!(modules.registry.import("lmsx").is_ok());
    teardown.call();

    let restored = modules.registry.import("lms.late").unwrap();
    assert!(Arc::ptr_eq(&restored, &late));
    assert_eq!(
        *modules.registry.import_from::<u32>("lms.late", "x").unwrap(),
        1
    );
}

#[test]
fn guard_restores_on_drop_even_when_the_test_panics() {
    let modules = loaded_modules();
    let registry = modules.registry.clone();

    let result = panic::catch_unwind(move || {
        let _guard = ForbiddenDependencies::platform().install(&registry);
        registry.import("lms").unwrap();
    });
    assert!(result.is_err());

    let lms = modules.registry.import("lms").unwrap();
    assert!(Arc::ptr_eq(&lms, &modules.lms));
}

#[test]
fn hooks_guard_the_global_registry() {
    let global = ModuleRegistry::global();
    let module = Arc::new(Module::new("common.djangoapps.hooks_test"));
    global.register(Arc::clone(&module));

    let (setup, teardown) = module_setup_teardown(ForbiddenDependencies::platform());
    setup.call();
    assert!(
        global
            .import("common.djangoapps.hooks_test")
            .unwrap_err()
            .is_forbidden()
    );
    teardown.call();

    let restored = global.import("common.djangoapps.hooks_test").unwrap();
    assert!(Arc::ptr_eq(&restored, &module));
    global.remove("common.djangoapps.hooks_test");
}

#[test]
fn boundary_file_drives_the_guard() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("boundaries.toml");
    fs::write(
        &path,
        r#"
[[boundary]]
path = "openedx/core/djangolib"
forbidden = ["lms", "cms", "common"]
"#,
    )
    .unwrap();

    let config = BoundaryConfig::load(&path).unwrap();
    let forbidden = config
        .forbidden_for("openedx/core/djangolib/tests")
        .unwrap()
        .clone();

    let modules = loaded_modules();
    let guard = forbidden.install(&modules.registry);
    assert!(modules.registry.import("lms.foo").unwrap_err().is_forbidden());
    guard.restore();
    assert!(modules.registry.import("lms.foo").is_ok());
}

#[test]
fn missing_boundary_file_reports_its_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    let err = BoundaryConfig::load(&path).unwrap_err();
    assert!(matches!(err, BoundaryError::Read { .. }));
    assert!(err.to_string().contains("absent.toml"));
}
