// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Graph relocation: the exhaustive walk over a module's type, member, and
//! instruction graph that rewrites every reference the resolver claims.
//!
//! The walk is total: every base and interface signature, every method
//! parameter, return, local, and instruction operand (unreachable code
//! included), every field type, and every property signature. A reference
//! the resolver declines is left untouched — [`Relocated::Unchanged`] is the
//! normal outcome for everything outside the merge set, and the whole pass
//! is idempotent: running it again after nothing new was inserted changes
//! nothing.

use modfold_format::{
    Instruction, MemberRef, MemberSig, Method, MethodSig, MethodSpec, Module, Operand, TypeDef,
    TypeSig,
};

use crate::resolver::TypeResolver;

/// Outcome of relocating one signature: either a rebuilt value or an
/// explicit "nothing to do".
#[derive(Debug, PartialEq)]
#[must_use]
pub enum Relocated<T> {
    Changed(T),
    Unchanged,
}

impl<T> Relocated<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Relocated<U> {
        match self {
            Self::Changed(value) => Relocated::Changed(f(value)),
            Self::Unchanged => Relocated::Unchanged,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Changed(value) => Some(value),
            Self::Unchanged => None,
        }
    }
}

/// Applies a [`TypeResolver`] across an entire module graph.
pub struct GraphRelocator<'a, R> {
    resolver: &'a R,
}

impl<'a, R: TypeResolver> GraphRelocator<'a, R> {
    pub fn new(resolver: &'a R) -> Self {
        Self { resolver }
    }

    /// Relocates every reference in the module. Returns whether anything
    /// changed.
    pub fn relocate_module(&self, module: &mut Module) -> bool {
        let mut changed = false;
        let indices: Vec<_> = module.type_indices().collect();
        for idx in indices {
            changed |= self.relocate_type(module.type_mut(idx));
        }
        changed
    }

    fn relocate_type(&self, ty: &mut TypeDef) -> bool {
        let mut changed = false;
        if let Some(base) = &mut ty.base {
            changed |= self.relocate_sig_in_place(base);
        }
        for interface in &mut ty.interfaces {
            changed |= self.relocate_sig_in_place(interface);
        }
        for method in ty.methods.values_mut() {
            changed |= self.relocate_method(method);
        }
        for field in ty.fields.values_mut() {
            changed |= self.relocate_sig_in_place(&mut field.ty);
        }
        for property in ty.properties.values_mut() {
            changed |= self.relocate_sig_in_place(&mut property.sig.ret);
            for param in &mut property.sig.params {
                changed |= self.relocate_sig_in_place(param);
            }
        }
        changed
    }

    fn relocate_method(&self, method: &mut Method) -> bool {
        let mut changed = self.relocate_method_sig(&mut method.sig);
        if let Some(body) = &mut method.body {
            for local in body.locals.values_mut() {
                changed |= self.relocate_sig_in_place(&mut local.ty);
            }
            for inst in &mut body.instructions {
                changed |= self.relocate_instruction(inst);
            }
        }
        changed
    }

    fn relocate_instruction(&self, inst: &mut Instruction) -> bool {
        match &mut inst.operand {
            // branch targets are positions in the body being swept; the
            // sweep itself visits every instruction, so there is no symbol
            // left to rewrite behind them
            Operand::Switch(_) | Operand::Target(_) => false,
            Operand::Member(member) => self.relocate_member(member),
            Operand::Type(sig) => self.relocate_sig_in_place(sig),
            Operand::Spec(spec) => self.relocate_spec(spec),
            Operand::Signature(sig) => self.relocate_method_sig(sig),
            // local to the already-relocated method, or no symbol at all
            Operand::Token(_)
            | Operand::Local(_)
            | Operand::Param(_)
            | Operand::Int(_)
            | Operand::None => false,
        }
    }

    fn relocate_member(&self, member: &mut MemberRef) -> bool {
        let mut changed = self.relocate_sig_in_place(&mut member.parent);
        changed |= match &mut member.sig {
            MemberSig::Method(sig) => self.relocate_method_sig(sig),
            MemberSig::Field(ty) => self.relocate_sig_in_place(ty),
        };
        changed
    }

    fn relocate_spec(&self, spec: &mut MethodSpec) -> bool {
        let parent_changed = self.relocate_sig_in_place(&mut spec.member.parent);
        let mut changed = parent_changed;
        changed |= match &mut spec.member.sig {
            MemberSig::Method(sig) => self.relocate_method_sig(sig),
            MemberSig::Field(ty) => self.relocate_sig_in_place(ty),
        };
        for arg in &mut spec.generic_args {
            changed |= self.relocate_sig_in_place(arg);
        }

        if parent_changed
            && let Some(parent) = spec.member.parent.as_named()
        {
            let arity = match &spec.member.sig {
                MemberSig::Method(sig) => sig.arity(),
                MemberSig::Field(_) => 0,
            };
            if !self.resolver.has_method(&parent.name, &spec.member.name, arity) {
                log::debug!(
                    "call site {}::{} did not re-resolve against the relocated type",
                    parent.name,
                    spec.member.name
                );
            }
        }
        changed
    }

    fn relocate_method_sig(&self, sig: &mut MethodSig) -> bool {
        let mut changed = false;
        for param in &mut sig.params {
            changed |= self.relocate_sig_in_place(param);
        }
        if let Some(ret) = &mut sig.ret {
            changed |= self.relocate_sig_in_place(ret);
        }
        changed
    }

    fn relocate_sig_in_place(&self, sig: &mut TypeSig) -> bool {
        match self.relocate_sig(sig) {
            Relocated::Changed(new) => {
                *sig = new;
                true
            }
            Relocated::Unchanged => false,
        }
    }

    /// Relocates one signature bottom-up, rebuilding composite wrappers only
    /// when the wrapped type actually moved.
    fn relocate_sig(&self, sig: &TypeSig) -> Relocated<TypeSig> {
        match sig {
            TypeSig::Named(reference) => match self.resolver.try_relocate(reference) {
                Some(new) => Relocated::Changed(TypeSig::Named(new)),
                None => Relocated::Unchanged,
            },
            TypeSig::Vector(elem) => self
                .relocate_sig(elem)
                .map(|new| TypeSig::Vector(Box::new(new))),
            TypeSig::Array(elem, rank) => self
                .relocate_sig(elem)
                .map(|new| TypeSig::Array(Box::new(new), *rank)),
            TypeSig::ByRef(inner) => self
                .relocate_sig(inner)
                .map(|new| TypeSig::ByRef(Box::new(new))),
            TypeSig::Ptr(inner) => self
                .relocate_sig(inner)
                .map(|new| TypeSig::Ptr(Box::new(new))),
            TypeSig::Generic { head, args } => {
                let new_head = self.resolver.try_relocate(head);
                let new_args: Vec<_> = args
                    .iter()
                    .map(|arg| self.relocate_sig(arg).into_option())
                    .collect();

                if new_head.is_none() && new_args.iter().all(Option::is_none) {
                    return Relocated::Unchanged;
                }
                Relocated::Changed(TypeSig::Generic {
                    head: new_head.unwrap_or_else(|| head.clone()),
                    args: args
                        .iter()
                        .zip(new_args)
                        .map(|(old, new)| new.unwrap_or_else(|| old.clone()))
                        .collect(),
                })
            }
        }
    }
}
