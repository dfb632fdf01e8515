#![allow(dead_code)]

use std::cell::RefCell;

use modfold_format::{
    Body, Instruction, MemberRef, MethodSig, Module, QualifiedName, TypeRef, TypeSig,
};
use modfold_linker::{GraphRelocator, TypeResolver};

pub fn module(name: &str) -> Module {
    Module::new(name, "1.0.0")
}

pub fn call_to(scope: &str, ty: &str, method: &str) -> Instruction {
    Instruction::call(MemberRef::method(
        TypeSig::named(scope, QualifiedName::global(ty)),
        method,
        MethodSig::empty(),
    ))
}

/// Gives `module` a static initializer with the given body.
pub fn set_init_body(module: &mut Module, instructions: Vec<Instruction>) {
    let idx = module.module_init_or_create();
    let ty = module.type_mut(idx);
    let cctor = ty.static_initializer_or_create();
    ty.methods[cctor].body = Some(Body::new(instructions));
}

/// A resolver that never relocates anything but records every reference
/// scoped to one identity, by riding along on the relocator's exhaustive
/// traversal.
struct ScopeProbe {
    identity: String,
    hits: RefCell<Vec<String>>,
}

impl TypeResolver for ScopeProbe {
    fn try_relocate(&self, reference: &TypeRef) -> Option<TypeRef> {
        if reference.belongs_to(&self.identity) {
            self.hits.borrow_mut().push(reference.name.to_string());
        }
        None
    }
}

/// Every type reference in `module` that still resolves into `identity`.
pub fn refs_into(module: &Module, identity: &str) -> Vec<String> {
    let probe = ScopeProbe {
        identity: identity.to_string(),
        hits: RefCell::new(Vec::new()),
    };
    let mut scratch = module.clone();
    GraphRelocator::new(&probe).relocate_module(&mut scratch);
    probe.hits.into_inner()
}
