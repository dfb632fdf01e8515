// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::mem;
use std::path::Path;

use bitflags::bitflags;
use cranelift_entity::{EntityRef, PrimaryMap};
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::indices::{FieldIdx, InstIdx, LocalIdx, MethodIdx, PropertyIdx, TypeIdx};
use crate::types::{MemberRef, MethodSig, MethodSpec, QualifiedName, TypeSig};

/// Qualified name of the distinguished pseudo-type that owns the module's
/// static initializer.
pub const MODULE_INIT_TYPE: &str = "<module-init>";

/// Name of the static initializer method inside the module-init type.
pub const INIT_METHOD: &str = ".init";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TypeFlags: u32 {
        const PUBLIC = 1 << 0;
        const INTERFACE = 1 << 1;
        const ABSTRACT = 1 << 2;
        const SEALED = 1 << 3;
        /// Inserted by tooling rather than produced by a compiler front-end.
        const SYNTHETIC = 1 << 4;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MethodFlags: u32 {
        const PUBLIC = 1 << 0;
        const STATIC = 1 << 1;
        const VIRTUAL = 1 << 2;
        /// The method has a runtime-recognized name (such as the static
        /// initializer) and is invoked by the runtime, not by user code.
        const SPECIAL_NAME = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    Nop,
    Ret,
    Call,
    CallVirt,
    CallIndirect,
    NewObj,
    NewArr,
    LdLoc,
    StLoc,
    LdArg,
    StArg,
    LdFld,
    StFld,
    LdSFld,
    StSFld,
    LdToken,
    LdInt,
    Br,
    BrIf,
    Switch,
    CastClass,
    IsInst,
    InitObj,
    SizeOf,
    Pop,
    Dup,
}

/// Instruction operand, a closed sum over every payload shape the format
/// supports. The variant an instruction uses is fixed at build time;
/// relocation rewrites the symbol *inside* a variant, never the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    None,
    /// Immediate integer payload.
    Int(i64),
    /// Branch target, as a position in the same body.
    Target(InstIdx),
    /// Switch table of branch targets.
    Switch(Vec<InstIdx>),
    /// Method or field reference through its declaring type.
    Member(MemberRef),
    /// A bare type reference (cast, `newarr`, `initobj`, ...).
    Type(TypeSig),
    /// Generic method instantiation.
    Spec(MethodSpec),
    /// Call-site signature of an indirect call.
    Signature(MethodSig),
    /// Raw metadata token, opaque to relocation.
    Token(u32),
    /// Local variable slot in the current body.
    Local(LocalIdx),
    /// Parameter slot of the current method.
    Param(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: Operand,
}

impl Instruction {
    pub fn new(opcode: Opcode, operand: Operand) -> Self {
        Self { opcode, operand }
    }

    /// A `call` to the given member.
    pub fn call(member: MemberRef) -> Self {
        Self::new(Opcode::Call, Operand::Member(member))
    }

    pub fn ret() -> Self {
        Self::new(Opcode::Ret, Operand::None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Local {
    pub name: Option<String>,
    pub ty: TypeSig,
}

/// A method body: local variable declarations plus the instruction sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub locals: PrimaryMap<LocalIdx, Local>,
    pub instructions: Vec<Instruction>,
}

impl Body {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            locals: PrimaryMap::new(),
            instructions,
        }
    }

    pub fn push(&mut self, inst: Instruction) -> InstIdx {
        let idx = InstIdx::new(self.instructions.len());
        self.instructions.push(inst);
        idx
    }

    /// Inserts an instruction at `at`, shifting the rest of the sequence.
    ///
    /// Every branch-target operand pointing at or past the insertion point is
    /// fixed up, so control flow is preserved.
    ///
    /// # Panics
    ///
    /// Panics if `at > self.instructions.len()`.
    pub fn insert(&mut self, at: usize, inst: Instruction) {
        assert!(at <= self.instructions.len());
        let shift = |idx: &mut InstIdx| {
            if idx.index() >= at {
                *idx = InstIdx::new(idx.index() + 1);
            }
        };
        for existing in &mut self.instructions {
            match &mut existing.operand {
                Operand::Target(t) => shift(t),
                Operand::Switch(ts) => ts.iter_mut().for_each(shift),
                _ => {}
            }
        }
        self.instructions.insert(at, inst);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub flags: MethodFlags,
    pub sig: MethodSig,
    pub body: Option<Body>,
}

impl Method {
    pub fn new(name: &str, flags: MethodFlags, sig: MethodSig) -> Self {
        Self {
            name: name.to_string(),
            flags,
            sig,
            body: None,
        }
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    pub fn is_static_initializer(&self) -> bool {
        self.name == INIT_METHOD
            && self.flags.contains(MethodFlags::STATIC | MethodFlags::SPECIAL_NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: TypeSig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySig {
    pub ret: TypeSig,
    pub params: Vec<TypeSig>,
}

/// A property: signature plus handles to its accessors inside the owning
/// type's method arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub sig: PropertySig,
    pub getter: Option<MethodIdx>,
    pub setter: Option<MethodIdx>,
}

/// A type owned by a module: base/interface signatures plus member arenas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: QualifiedName,
    pub flags: TypeFlags,
    pub base: Option<TypeSig>,
    pub interfaces: Vec<TypeSig>,
    pub fields: PrimaryMap<FieldIdx, Field>,
    pub methods: PrimaryMap<MethodIdx, Method>,
    pub properties: PrimaryMap<PropertyIdx, Property>,
}

impl TypeDef {
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            flags: TypeFlags::empty(),
            base: None,
            interfaces: Vec::new(),
            fields: PrimaryMap::new(),
            methods: PrimaryMap::new(),
            properties: PrimaryMap::new(),
        }
    }

    /// The empty module-init pseudo-type.
    pub fn module_init() -> Self {
        let mut ty = Self::new(QualifiedName::global(MODULE_INIT_TYPE));
        ty.flags = TypeFlags::SYNTHETIC;
        ty
    }

    pub fn is_module_init(&self) -> bool {
        self.name.namespace.is_none() && self.name.name == MODULE_INIT_TYPE
    }

    pub fn add_method(&mut self, method: Method) -> MethodIdx {
        self.methods.push(method)
    }

    pub fn add_field(&mut self, field: Field) -> FieldIdx {
        self.fields.push(field)
    }

    pub fn add_property(&mut self, property: Property) -> PropertyIdx {
        self.properties.push(property)
    }

    pub fn find_method(&self, name: &str) -> Option<MethodIdx> {
        self.methods
            .iter()
            .find(|(_, m)| m.name == name)
            .map(|(idx, _)| idx)
    }

    pub fn find_method_with_arity(&self, name: &str, arity: usize) -> Option<MethodIdx> {
        self.methods
            .iter()
            .find(|(_, m)| m.name == name && m.sig.arity() == arity)
            .map(|(idx, _)| idx)
    }

    /// The static initializer, if this type has one.
    pub fn static_initializer(&self) -> Option<MethodIdx> {
        self.methods
            .iter()
            .find(|(_, m)| m.is_static_initializer())
            .map(|(idx, _)| idx)
    }

    /// The static initializer, created empty (a lone `ret`) if missing.
    pub fn static_initializer_or_create(&mut self) -> MethodIdx {
        if let Some(idx) = self.static_initializer() {
            return idx;
        }
        let method = Method::new(
            INIT_METHOD,
            MethodFlags::STATIC | MethodFlags::SPECIAL_NAME,
            MethodSig::empty(),
        )
        .with_body(Body::new(vec![Instruction::ret()]));
        self.add_method(method)
    }
}

/// A compiled module: an arena of type definitions, a resource table, and an
/// identity used for cross-module symbol matching.
///
/// The qualified-name lookup index is maintained by the mutation API
/// ([`insert_type`], [`rename_type`], [`take_types`]) and rebuilt after
/// deserialization; it is never persisted.
///
/// [`insert_type`]: Module::insert_type
/// [`rename_type`]: Module::rename_type
/// [`take_types`]: Module::take_types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    name: String,
    version: String,
    types: PrimaryMap<TypeIdx, TypeDef>,
    resources: BTreeMap<String, Vec<u8>>,
    #[serde(skip)]
    by_name: HashMap<QualifiedName, TypeIdx>,
}

impl Module {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            types: PrimaryMap::new(),
            resources: BTreeMap::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The identity string other modules use to refer to this one.
    pub fn identity(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }

    pub fn type_indices(&self) -> impl Iterator<Item = TypeIdx> + use<> {
        self.types.keys()
    }

    pub fn types(&self) -> impl Iterator<Item = (TypeIdx, &TypeDef)> {
        self.types.iter()
    }

    pub fn type_(&self, idx: TypeIdx) -> &TypeDef {
        &self.types[idx]
    }

    pub fn type_mut(&mut self, idx: TypeIdx) -> &mut TypeDef {
        &mut self.types[idx]
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn find_type(&self, name: &QualifiedName) -> Option<TypeIdx> {
        self.by_name.get(name).copied()
    }

    /// Inserts a type definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateType`] if the module already defines the
    /// qualified name; callers are expected to have resolved collisions
    /// beforehand.
    pub fn insert_type(&mut self, ty: TypeDef) -> Result<TypeIdx, Error> {
        if self.by_name.contains_key(&ty.name) {
            return Err(Error::DuplicateType(ty.name));
        }
        let name = ty.name.clone();
        let idx = self.types.push(ty);
        self.by_name.insert(name, idx);
        Ok(idx)
    }

    /// Renames a type, keeping the lookup index consistent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateType`] if the new name is already taken.
    pub fn rename_type(&mut self, idx: TypeIdx, new_name: QualifiedName) -> Result<(), Error> {
        if let Some(&existing) = self.by_name.get(&new_name) {
            if existing != idx {
                return Err(Error::DuplicateType(new_name));
            }
            return Ok(());
        }
        let old = mem::replace(&mut self.types[idx].name, new_name.clone());
        self.by_name.remove(&old);
        self.by_name.insert(new_name, idx);
        Ok(())
    }

    /// Drains every type definition out of this module, leaving it empty.
    ///
    /// Used by the merge step to re-own a dependency's types without ever
    /// having two modules claim the same definition.
    pub fn take_types(&mut self) -> Vec<TypeDef> {
        self.by_name.clear();
        mem::take(&mut self.types)
            .into_iter()
            .map(|(_, ty)| ty)
            .collect()
    }

    /// The module-init pseudo-type, if present.
    pub fn module_init(&self) -> Option<TypeIdx> {
        self.find_type(&QualifiedName::global(MODULE_INIT_TYPE))
    }

    /// The module-init pseudo-type, created if missing.
    ///
    /// # Panics
    ///
    /// Never panics; insertion of a fresh module-init type cannot collide
    /// because the lookup just failed.
    pub fn module_init_or_create(&mut self) -> TypeIdx {
        match self.module_init() {
            Some(idx) => idx,
            None => self.insert_type(TypeDef::module_init()).unwrap(),
        }
    }

    pub fn resources(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn add_resource(&mut self, name: String, bytes: Vec<u8>) {
        self.resources.insert(name, bytes);
    }

    pub fn resource(&self, name: &str) -> Option<&[u8]> {
        self.resources.get(name).map(Vec::as_slice)
    }

    pub fn has_resource(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    /// Rebuilds the qualified-name index from the type arena.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateType`] if two definitions share a name,
    /// which can only happen with a corrupt container.
    pub(crate) fn rebuild_index(&mut self) -> Result<(), Error> {
        self.by_name.clear();
        for (idx, ty) in self.types.iter() {
            if self.by_name.insert(ty.name.clone(), idx).is_some() {
                return Err(Error::DuplicateType(ty.name.clone()));
            }
        }
        Ok(())
    }

    /// Parses a module from container bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the container header or payload is invalid.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        crate::container::decode(bytes)
    }

    /// Serializes this module into container bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if payload encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        crate::container::encode(self)
    }

    /// Reads a module from a container file.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or an invalid container.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let bytes = std::fs::read(path)?;
        let module = Self::from_bytes(&bytes)?;
        log::debug!("loaded {} from {}", module.identity(), path.display());
        Ok(module)
    }

    /// Writes this module as a container file.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or if payload encoding fails.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        log::debug!("wrote {} to {}", self.identity(), path.display());
        Ok(())
    }
}
