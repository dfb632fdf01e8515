// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use modfold_format::Module;

use crate::{Error, embedded_resource_name, merged_resource_name};

/// A module resolution hook: given a requested identity and the module that
/// originated the request (if known), either produce the module or decline
/// with `None` so the next hook can try.
pub type ResolveHook = Box<dyn Fn(&str, Option<&Module>) -> Option<Module> + Send + Sync>;

/// Process-scoped resolution state: an installation marker and the ordered
/// hook list. One instance lives behind [`global`]; tests construct their
/// own.
pub struct Registry {
    installed: AtomicBool,
    hooks: RwLock<Vec<ResolveHook>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            installed: AtomicBool::new(false),
            hooks: RwLock::new(Vec::new()),
        }
    }

    /// Installs the resolution hook for the given host module.
    ///
    /// Idempotent: the first call wins the installation marker and registers
    /// the hook, every later call returns immediately. Safe to call from
    /// multiple threads.
    pub fn setup(&self, host: Arc<Module>) {
        if self
            .installed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.register(Box::new(move |identity, requesting| {
            resolve_in(&host, identity)
                .or_else(|| requesting.and_then(|m| resolve_in(m, identity)))
        }));
    }

    /// Appends a hook to the resolution chain.
    pub fn register(&self, hook: ResolveHook) {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
    }

    /// Asks every registered hook, in registration order, to produce the
    /// module with the given identity.
    pub fn resolve(&self, identity: &str, requesting: Option<&Module>) -> Option<Module> {
        let hooks = self.hooks.read().unwrap_or_else(PoisonError::into_inner);
        hooks.iter().find_map(|hook| hook(identity, requesting))
    }

    /// Number of currently installed hooks.
    pub fn installed_hooks(&self) -> usize {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-default registry.
pub fn global() -> &'static Registry {
    static GLOBAL: OnceLock<Registry> = OnceLock::new();
    GLOBAL.get_or_init(Registry::new)
}

/// [`Registry::setup`] on the process-default registry. This is what the
/// loader type injected into a linked host ends up invoking.
pub fn setup(host: Arc<Module>) {
    global().setup(host);
}

/// [`Registry::resolve`] on the process-default registry.
pub fn resolve(identity: &str, requesting: Option<&Module>) -> Option<Module> {
    global().resolve(identity, requesting)
}

/// Looks for the requested identity inside one module's resource table:
/// first as an embedded compressed payload, then as a merge marker (in which
/// case the module itself satisfies the request).
pub fn resolve_in(module: &Module, identity: &str) -> Option<Module> {
    if let Some(blob) = module.resource(&embedded_resource_name(identity)) {
        return match load_embedded(blob) {
            Ok(loaded) => {
                log::debug!("loaded embedded module {identity} from {}", module.identity());
                Some(loaded)
            }
            Err(e) => {
                log::error!(
                    "embedded payload for {identity} in {} is unusable: {e}",
                    module.identity()
                );
                None
            }
        };
    }
    if module.has_resource(&merged_resource_name(identity)) {
        return Some(module.clone());
    }
    None
}

fn load_embedded(blob: &[u8]) -> Result<Module, Error> {
    let bytes = crate::decompress(blob)?;
    Ok(Module::from_bytes(&bytes)?)
}
