// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Merging: physically re-owning a dependency's definitions and rewiring the
//! host around them.
//!
//! The steps run as a staged pipeline — extract, rename, chain the module
//! initializer, commit, relocate — with every fallible check done before the
//! host is touched, so a failed merge leaves the host exactly as it was.

use std::collections::HashSet;

use modfold_format::{
    INIT_METHOD, Instruction, MODULE_INIT_TYPE, MemberRef, MethodFlags, MethodSig, Module,
    QualifiedName, TypeDef, TypeSig,
};
use modfold_runtime::merged_resource_name;

use crate::error::Error;
use crate::relocate::GraphRelocator;
use crate::resolver::MergeResolver;

/// Folds `dependency` into `host`, consuming it.
///
/// On return every definition the dependency owned lives in the host, every
/// reference in the host that named the dependency has been rewritten, the
/// initializer chain runs the dependency's initializer first, and a
/// zero-length merge marker records the folded identity for the runtime
/// loader.
///
/// # Errors
///
/// Fails without mutating the host if the same identity was already merged,
/// or if a collision rename would itself collide.
pub fn merge(host: &mut Module, mut dependency: Module) -> Result<(), Error> {
    let identity = dependency.identity();
    log::info!("merging {identity} into {}", host.identity());

    if host.has_resource(&merged_resource_name(&identity)) {
        return Err(Error::AlreadyMerged(identity));
    }

    // extract: the dependency must stop owning its definitions before the
    // host starts to
    let mut types = dependency.take_types();
    drop(dependency);

    let init_ty = types
        .iter()
        .position(TypeDef::is_module_init)
        .map(|at| types.remove(at));

    // compute collision renames before touching the host at all
    let mut staged = HashSet::with_capacity(types.len());
    for ty in &mut types {
        if host.find_type(&ty.name).is_some() {
            let alias = ty.name.merged_alias(&identity);
            if host.find_type(&alias).is_some() || staged.contains(&alias) {
                return Err(Error::Collision(alias));
            }
            log::debug!("{} is already defined in the host, renaming incoming type to {alias}", ty.name);
            ty.name = alias;
        }
        if !staged.insert(ty.name.clone()) {
            return Err(Error::Collision(ty.name.clone()));
        }
    }

    if let Some(init_ty) = init_ty {
        merge_module_init(host, init_ty, &identity)?;
    }

    // commit
    host.add_resource(merged_resource_name(&identity), Vec::new());
    for ty in types {
        host.insert_type(ty)?;
    }

    // rewrite the entire host, not just the freshly inserted types: existing
    // host code referenced the dependency too
    let resolver = MergeResolver::pin(&identity, host);
    GraphRelocator::new(&resolver).relocate_module(host);

    Ok(())
}

/// Chains the dependency's static initializer into the host's.
///
/// The incoming initializer is renamed, demoted to an ordinary method, and
/// *prepended* as a call to the host initializer, so the dependency is
/// initialized before any host code that may rely on it — while everything
/// the host initializer already did (including previously chained
/// initializers) keeps its order afterwards.
fn merge_module_init(
    host: &mut Module,
    mut init_ty: TypeDef,
    dep_identity: &str,
) -> Result<(), Error> {
    let Some(cctor_idx) = init_ty.static_initializer() else {
        return Ok(());
    };
    if init_ty.methods[cctor_idx].body.is_none() {
        return Ok(());
    }

    let Some(host_init_idx) = host.module_init() else {
        // no host module-init yet: the dependency's becomes the host's
        host.insert_type(init_ty)?;
        return Ok(());
    };

    let renamed = format!("{INIT_METHOD}/{dep_identity}");
    {
        let cctor = &mut init_ty.methods[cctor_idx];
        cctor.name = renamed.clone();
        cctor.flags.remove(MethodFlags::SPECIAL_NAME);
    }

    let host_identity = host.identity();
    let host_ty = host.type_mut(host_init_idx);

    // move the dependency's module-init members across; plain methods left
    // behind by the dependency's own earlier merges come along so nested
    // chains stay callable
    let mut chained_sig = MethodSig::empty();
    for (_, method) in init_ty.methods {
        if method.name == renamed {
            chained_sig = method.sig.clone();
        }
        host_ty.add_method(method);
    }
    for (_, field) in init_ty.fields {
        host_ty.add_field(field);
    }

    let cctor = host_ty.static_initializer_or_create();
    let call = Instruction::call(MemberRef::method(
        TypeSig::named(&host_identity, QualifiedName::global(MODULE_INIT_TYPE)),
        &renamed,
        chained_sig,
    ));
    host_ty.methods[cctor]
        .body
        .get_or_insert_default()
        .insert(0, call);

    Ok(())
}

#[cfg(test)]
mod tests {
    use modfold_format::{Body, Method, Opcode, Operand};

    use super::*;

    fn dep_with_init(name: &str) -> Module {
        let mut dep = Module::new(name, "1.0.0");
        let init_idx = dep.module_init_or_create();
        let ty = dep.type_mut(init_idx);
        let cctor = ty.static_initializer_or_create();
        ty.methods[cctor].body = Some(Body::new(vec![
            Instruction::new(Opcode::Nop, Operand::None),
            Instruction::ret(),
        ]));
        dep
    }

    #[test]
    fn adopts_init_type_when_host_has_none() {
        let mut host = Module::new("host", "1.0.0");
        merge(&mut host, dep_with_init("dep")).unwrap();

        let init_idx = host.module_init().expect("init type adopted");
        let ty = host.type_(init_idx);
        let cctor = ty.static_initializer().expect("initializer kept as-is");
        assert!(ty.methods[cctor].is_static_initializer());
    }

    #[test]
    fn double_merge_is_rejected_before_mutation() {
        let mut host = Module::new("host", "1.0.0");
        merge(&mut host, dep_with_init("dep")).unwrap();
        let before = host.to_bytes().unwrap();

        let err = merge(&mut host, dep_with_init("dep")).unwrap_err();
        assert!(matches!(err, Error::AlreadyMerged(identity) if identity == "dep/1.0.0"));
        assert_eq!(host.to_bytes().unwrap(), before, "host must be untouched");
    }

    #[test]
    fn collision_renames_incoming_and_keeps_host_type() {
        let mut host = Module::new("host", "1.0.0");
        let mut host_widget = TypeDef::new(QualifiedName::global("Widget"));
        host_widget.add_method(Method::new("host_method", MethodFlags::PUBLIC, MethodSig::empty()));
        host.insert_type(host_widget).unwrap();

        let mut dep = Module::new("dep", "1.0.0");
        dep.insert_type(TypeDef::new(QualifiedName::global("Widget"))).unwrap();
        merge(&mut host, dep).unwrap();

        let original = host.find_type(&QualifiedName::global("Widget")).unwrap();
        assert!(host.type_(original).find_method("host_method").is_some());

        let alias = QualifiedName::global("Widget@dep/1.0.0");
        assert!(host.find_type(&alias).is_some());
        assert_eq!(host.type_count(), 2);
    }

    #[test]
    fn bodyless_initializer_chains_nothing() {
        let mut host = Module::new("host", "1.0.0");
        let mut dep = Module::new("dep", "1.0.0");
        dep.module_init_or_create();

        merge(&mut host, dep).unwrap();
        assert!(host.module_init().is_none(), "no initializer, nothing to adopt");
        assert!(host.has_resource(&merged_resource_name("dep/1.0.0")));
    }
}
