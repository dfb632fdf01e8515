// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The top-level pass: evaluate the policy per dependency, apply the chosen
//! action, and — if anything changed — inject the runtime loader.

use std::fs;
use std::path::{Path, PathBuf};

use modfold_format::{
    Body, Instruction, MemberRef, Method, MethodFlags, MethodSig, Module, QualifiedName, TypeDef,
    TypeFlags, TypeSig,
};
use modfold_runtime::{LOADER_TYPE, RUNTIME_IDENTITY, SETUP_METHOD};

use crate::directive::{self, Action, Directive};
use crate::embed::embed;
use crate::error::Error;
use crate::merge::merge;

/// Name of the synthetic loader type injected into a linked host.
pub const LOADER_TYPE_NAME: &str = "<loader>";

/// One dependency of the host, as reported by the build pipeline.
#[derive(Debug, Clone)]
pub struct DependencyDescriptor {
    /// Short name the policy globs match against.
    pub simple_name: String,
    /// Whether the dependency is copy-local, i.e. not meant to be referenced
    /// by consumers of the host.
    pub private: bool,
    /// Where the compiled dependency lives on disk.
    pub path: PathBuf,
    /// The identity the dependency claims; cross-checked against the loaded
    /// module.
    pub identity: String,
    /// Set when the build pipeline already failed to load this dependency.
    pub load_error: Option<String>,
}

/// What happened to one dependency during the pass. Diagnostic output, not a
/// control-flow contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyStatus {
    Merged,
    Embedded,
    /// No rule matched at all, not even the implicit default.
    ExcludedNoRule,
    /// A rule matched and said `None`.
    ExcludedByRule,
    Failed,
}

#[derive(Debug)]
pub struct DependencyReport {
    pub name: String,
    pub status: DependencyStatus,
    pub detail: Option<String>,
}

/// Result of one linker pass over a host module.
#[derive(Debug, Default)]
pub struct LinkOutcome {
    /// Whether the host was mutated; the caller writes it out only if so.
    pub changed: bool,
    pub reports: Vec<DependencyReport>,
    /// Merged dependency files, to be deleted only after the host has
    /// actually been written.
    pub delete_after_write: Vec<PathBuf>,
}

/// A dependency file as found on disk, preferring the copy-local duplicate
/// sitting next to the host artifact over the original reference path.
struct DependencyFile {
    path: PathBuf,
    local: bool,
}

impl DependencyFile {
    fn locate(reference_path: &Path, host_path: &Path) -> Self {
        if let (Some(dir), Some(file_name)) = (host_path.parent(), reference_path.file_name()) {
            let local = dir.join(file_name);
            if local.exists() {
                return Self {
                    path: local,
                    local: true,
                };
            }
        }
        Self {
            path: reference_path.to_path_buf(),
            local: false,
        }
    }

    fn delete_if_local(&self) {
        if !self.local {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("could not delete local copy {}: {e}", self.path.display());
        }
    }
}

/// The pass itself: a policy pinned to one build configuration.
pub struct Linker {
    configuration: String,
    directives: Vec<Directive>,
}

impl Linker {
    pub fn new(configuration: &str, directives: Vec<Directive>) -> Self {
        Self {
            configuration: configuration.to_string(),
            directives,
        }
    }

    /// Runs the pass: dependencies strictly in declaration order, host
    /// mutated in place. Per-dependency failures are reported and skipped;
    /// they never abort the pass.
    pub fn process(
        &self,
        host: &mut Module,
        host_path: &Path,
        dependencies: &[DependencyDescriptor],
    ) -> LinkOutcome {
        let mut outcome = LinkOutcome::default();

        for dep in dependencies {
            let action = directive::evaluate(
                &self.directives,
                &dep.simple_name,
                dep.private,
                &self.configuration,
            );
            let scope = if dep.private { "private" } else { "non-private" };
            let report = match action {
                None => {
                    log::debug!("excluded {} ({scope}): no matching rule at all", dep.simple_name);
                    report(dep, DependencyStatus::ExcludedNoRule, None)
                }
                Some(Action::None) => {
                    log::debug!("excluded {} ({scope})", dep.simple_name);
                    report(dep, DependencyStatus::ExcludedByRule, None)
                }
                Some(action @ (Action::Merge | Action::Embed)) => {
                    if let Some(err) = &dep.load_error {
                        log::error!("cannot load dependency {}: {err}", dep.simple_name);
                        report(dep, DependencyStatus::Failed, Some(err.clone()))
                    } else {
                        match self.apply(host, host_path, dep, action, &mut outcome) {
                            Ok(status) => {
                                outcome.changed = true;
                                report(dep, status, None)
                            }
                            Err(e) => {
                                log::error!("failed to process {}: {e}", dep.simple_name);
                                report(dep, DependencyStatus::Failed, Some(e.to_string()))
                            }
                        }
                    }
                }
            };
            outcome.reports.push(report);
        }

        if outcome.changed
            && let Err(e) = inject_loader(host)
        {
            log::error!("could not inject the runtime loader: {e}");
        }
        outcome
    }

    fn apply(
        &self,
        host: &mut Module,
        host_path: &Path,
        dep: &DependencyDescriptor,
        action: Action,
        outcome: &mut LinkOutcome,
    ) -> Result<DependencyStatus, Error> {
        let file = DependencyFile::locate(&dep.path, host_path);
        let bytes = fs::read(&file.path)?;
        let module = Module::from_bytes(&bytes)?;

        let identity = module.identity();
        if identity != dep.identity {
            log::warn!(
                "{}: descriptor says {} but the module reports {identity}",
                dep.simple_name,
                dep.identity
            );
        }

        match action {
            Action::Embed => {
                embed(host, &identity, &bytes);
                file.delete_if_local();
                Ok(DependencyStatus::Embedded)
            }
            Action::Merge => {
                merge(host, module)?;
                // merged inputs go away only once the host is safely written
                if file.local {
                    outcome.delete_after_write.push(file.path.clone());
                }
                Ok(DependencyStatus::Merged)
            }
            Action::None => Ok(DependencyStatus::ExcludedByRule),
        }
    }
}

fn report(
    dep: &DependencyDescriptor,
    status: DependencyStatus,
    detail: Option<String>,
) -> DependencyReport {
    DependencyReport {
        name: dep.simple_name.clone(),
        status,
        detail,
    }
}

/// Inserts the synthetic loader type and prepends the setup call to the
/// host's module initializer, so the resolution hook is installed before any
/// merged or embedded code runs. Idempotent: a host that already carries the
/// loader is left alone.
///
/// # Errors
///
/// Propagates type-insertion failures, which cannot occur after the
/// idempotence check.
pub fn inject_loader(host: &mut Module) -> Result<(), Error> {
    let loader_name = QualifiedName::global(LOADER_TYPE_NAME);
    if host.find_type(&loader_name).is_some() {
        return Ok(());
    }
    log::debug!("injecting runtime loader into {}", host.identity());

    let mut loader = TypeDef::new(loader_name.clone());
    loader.flags = TypeFlags::SYNTHETIC | TypeFlags::SEALED;
    loader.add_method(
        Method::new(
            SETUP_METHOD,
            MethodFlags::PUBLIC | MethodFlags::STATIC,
            MethodSig::empty(),
        )
        .with_body(Body::new(vec![
            Instruction::call(MemberRef::method(
                TypeSig::named(RUNTIME_IDENTITY, QualifiedName::global(LOADER_TYPE)),
                SETUP_METHOD,
                MethodSig::empty(),
            )),
            Instruction::ret(),
        ])),
    );
    host.insert_type(loader)?;

    let host_identity = host.identity();
    let init_idx = host.module_init_or_create();
    let ty = host.type_mut(init_idx);
    let cctor = ty.static_initializer_or_create();
    let call = Instruction::call(MemberRef::method(
        TypeSig::named(&host_identity, loader_name),
        SETUP_METHOD,
        MethodSig::empty(),
    ));
    ty.methods[cctor].body.get_or_insert_default().insert(0, call);
    Ok(())
}
