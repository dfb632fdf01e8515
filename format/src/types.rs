// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Namespace-qualified type name, unique within a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    pub namespace: Option<String>,
    pub name: String,
}

impl QualifiedName {
    pub fn new(namespace: Option<&str>, name: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        }
    }

    /// A name in the global (empty) namespace.
    pub fn global(name: &str) -> Self {
        Self::new(None, name)
    }

    /// The deterministic collision-resolution name a type assumes when it is
    /// merged into a module that already defines its original name.
    ///
    /// The short name is suffixed with the identity of the module the type
    /// came from, keeping aliases from two different dependencies distinct.
    pub fn merged_alias(&self, source_identity: &str) -> Self {
        Self {
            namespace: self.namespace.clone(),
            name: format!("{}@{source_identity}", self.name),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A named pointer to a type definition, possibly in another module.
///
/// `scope` is the identity string of the module the reference believes owns
/// the definition. Relocation works entirely on these: a reference belongs to
/// the merge set iff its scope equals the discarded module's identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    pub scope: String,
    pub name: QualifiedName,
}

impl TypeRef {
    pub fn new(scope: &str, name: QualifiedName) -> Self {
        Self {
            scope: scope.to_string(),
            name,
        }
    }

    /// Whether this reference resolves into the module with the given
    /// identity string.
    pub fn belongs_to(&self, identity: &str) -> bool {
        self.scope == identity
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}", self.scope, self.name)
    }
}

/// A type signature: a plain reference or one of the composite wrappers
/// around it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeSig {
    /// A direct reference to a (possibly foreign) type definition.
    Named(TypeRef),
    /// Single-dimension, zero-based array of the element type.
    Vector(Box<TypeSig>),
    /// Multi-dimensional array with the given rank.
    Array(Box<TypeSig>, u32),
    /// By-reference passing wrapper.
    ByRef(Box<TypeSig>),
    /// Unmanaged pointer wrapper.
    Ptr(Box<TypeSig>),
    /// Instantiation of a generic type with concrete arguments.
    Generic { head: TypeRef, args: Vec<TypeSig> },
}

impl TypeSig {
    pub fn named(scope: &str, name: QualifiedName) -> Self {
        Self::Named(TypeRef::new(scope, name))
    }

    pub fn as_named(&self) -> Option<&TypeRef> {
        match self {
            Self::Named(r) => Some(r),
            _ => None,
        }
    }
}

/// Signature of a callable: parameter types and an optional return type
/// (`None` meaning the method returns nothing).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSig {
    pub params: Vec<TypeSig>,
    pub ret: Option<TypeSig>,
}

impl MethodSig {
    /// `() -> ()`
    pub fn empty() -> Self {
        Self {
            params: Vec::new(),
            ret: None,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// What kind of member a [`MemberRef`] names, with the matching signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberSig {
    Method(MethodSig),
    Field(TypeSig),
}

/// A reference to a method or field through its declaring type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRef {
    pub parent: TypeSig,
    pub name: String,
    pub sig: MemberSig,
}

impl MemberRef {
    pub fn method(parent: TypeSig, name: &str, sig: MethodSig) -> Self {
        Self {
            parent,
            name: name.to_string(),
            sig: MemberSig::Method(sig),
        }
    }

    pub fn field(parent: TypeSig, name: &str, ty: TypeSig) -> Self {
        Self {
            parent,
            name: name.to_string(),
            sig: MemberSig::Field(ty),
        }
    }
}

/// A generic method instantiation: the referenced member plus the concrete
/// generic arguments of the call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub member: MemberRef,
    pub generic_args: Vec<TypeSig>,
}
