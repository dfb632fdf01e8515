// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Object model and binary container for compiled modules.
//!
//! A [`Module`] owns an arena of [`TypeDef`]s addressed by [`TypeIdx`]
//! handles, a resource table, and an identity string used for cross-module
//! symbol matching. Everything that points *across* modules does so by name
//! through [`TypeRef`]; everything local is an entity index.

mod container;
mod error;
mod indices;
mod module;
mod types;

pub use error::Error;
pub use indices::{FieldIdx, InstIdx, LocalIdx, MethodIdx, PropertyIdx, TypeIdx};
pub use module::{
    Body, Field, INIT_METHOD, Instruction, Local, MODULE_INIT_TYPE, Method, MethodFlags, Module,
    Opcode, Operand, Property, PropertySig, TypeDef, TypeFlags,
};
pub use types::{MemberRef, MemberSig, MethodSig, MethodSpec, QualifiedName, TypeRef, TypeSig};
