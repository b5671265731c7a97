//! Process-wide transfer runtime.
//!
//! Initialized once, on the first client construction or an explicit [`init`],
//! no matter how many threads race to it. Applications that want a defined
//! teardown point hold the [`GlobalGuard`] returned by [`init`] in `main`.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;
use tracing::{debug, info};

/// Overrides CA bundle discovery.
pub const CA_BUNDLE_ENV: &str = "PULITH_CA_BUNDLE";
const CA_BUNDLE_FILE: &str = "ca-bundle.crt";

static RUNTIME: OnceCell<Runtime> = OnceCell::new();
static TORN_DOWN: AtomicBool = AtomicBool::new(false);

/// Shared state every client reads at construction.
#[derive(Debug)]
pub struct Runtime {
    ca_bundle: Option<PathBuf>,
}

impl Runtime {
    fn load() -> Self {
        let exe_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        let explicit = env::var_os(CA_BUNDLE_ENV).map(PathBuf::from);
        let ca_bundle = discover_ca_bundle(explicit, exe_dir.as_deref());

        match &ca_bundle {
            Some(path) => info!(path = %path.display(), "using CA bundle"),
            None => debug!("no CA bundle found, using the system trust store"),
        }
        Self { ca_bundle }
    }

    /// CA bundle handed to every new client, unless its config names one.
    pub fn ca_bundle(&self) -> Option<&Path> {
        self.ca_bundle.as_deref()
    }
}

/// Initialize the runtime if no one has yet.
pub fn ensure_initialized() -> &'static Runtime {
    RUNTIME.get_or_init(Runtime::load)
}

pub fn is_initialized() -> bool {
    RUNTIME.get().is_some()
}

/// Initialize the runtime and tie its teardown to the returned guard.
#[must_use = "teardown runs when the guard is dropped"]
pub fn init() -> GlobalGuard {
    ensure_initialized();
    GlobalGuard { _private: () }
}

/// Release process-wide resources. Only the first call does anything.
pub fn teardown() {
    if TORN_DOWN.swap(true, Ordering::AcqRel) {
        return;
    }
    if is_initialized() {
        debug!("transfer runtime torn down");
    }
}

/// Runs [`teardown`] on drop.
#[derive(Debug)]
pub struct GlobalGuard {
    _private: (),
}

impl Drop for GlobalGuard {
    fn drop(&mut self) {
        teardown();
    }
}

/// An explicit path wins when it exists; otherwise a bundle next to the executable.
fn discover_ca_bundle(explicit: Option<PathBuf>, exe_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit.filter(|p| p.is_file()) {
        return Some(path);
    }
    exe_dir
        .map(|dir| dir.join(CA_BUNDLE_FILE))
        .filter(|p| p.is_file())
}
