// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::collections::{HashMap, HashSet};

use modfold_format::{Module, QualifiedName, TypeRef};

/// Decides whether a type reference originates in the module being merged
/// away and, if so, where it lives now.
///
/// Returning `None` means "leave the reference exactly as it is" — the
/// expected outcome for anything outside the merge set (platform and
/// base-library types included), never an error.
pub trait TypeResolver {
    fn try_relocate(&self, reference: &TypeRef) -> Option<TypeRef>;

    /// Whether the destination type has a method with this name and arity.
    /// Used to double-check call sites whose declaring type was relocated.
    fn has_method(&self, ty: &QualifiedName, name: &str, arity: usize) -> bool {
        let _ = (ty, name, arity);
        true
    }
}

/// The resolver used during a merge, pinned to one (source, destination)
/// module pair.
///
/// It snapshots the destination's qualified names and method tables at
/// construction (after the dependency's types have been inserted), so the
/// relocation pass is free to mutate the destination arena while resolving
/// against a consistent view.
pub struct MergeResolver {
    source: String,
    dest: String,
    names: HashSet<QualifiedName>,
    methods: HashMap<QualifiedName, Vec<(String, usize)>>,
}

impl MergeResolver {
    pub fn pin(source_identity: &str, dest: &Module) -> Self {
        let mut names = HashSet::with_capacity(dest.type_count());
        let mut methods = HashMap::with_capacity(dest.type_count());
        for (_, ty) in dest.types() {
            names.insert(ty.name.clone());
            methods.insert(
                ty.name.clone(),
                ty.methods
                    .values()
                    .map(|m| (m.name.clone(), m.sig.arity()))
                    .collect(),
            );
        }
        Self {
            source: source_identity.to_string(),
            dest: dest.identity(),
            names,
            methods,
        }
    }
}

impl TypeResolver for MergeResolver {
    fn try_relocate(&self, reference: &TypeRef) -> Option<TypeRef> {
        if !reference.belongs_to(&self.source) {
            return None;
        }
        // the collision address space takes precedence: when the merge
        // renamed the incoming type, its old name now denotes an unrelated
        // host type, and binding to that would change program behavior
        let alias = reference.name.merged_alias(&self.source);
        if self.names.contains(&alias) {
            return Some(TypeRef::new(&self.dest, alias));
        }
        if self.names.contains(&reference.name) {
            return Some(TypeRef::new(&self.dest, reference.name.clone()));
        }
        None
    }

    fn has_method(&self, ty: &QualifiedName, name: &str, arity: usize) -> bool {
        self.methods
            .get(ty)
            .is_some_and(|methods| methods.iter().any(|(n, a)| n == name && *a == arity))
    }
}
