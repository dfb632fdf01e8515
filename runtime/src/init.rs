// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::collections::HashSet;

use modfold_format::{MemberRef, Method, Module, Opcode, Operand, TypeDef};

/// Linearizes the call order of a module's static initializer.
///
/// Each entry is `Type::method` in the order the runtime would invoke it.
/// Calls to methods of the module-init type itself (the chained dependency
/// initializers a merge leaves behind) are followed into their bodies, so
/// the sequence reflects the full initialization order across any number of
/// merges. Used for diagnostics and the initializer-ordering tests.
pub fn init_sequence(module: &Module) -> Vec<String> {
    let mut out = Vec::new();
    let Some(init_idx) = module.module_init() else {
        return out;
    };
    let init_ty = module.type_(init_idx);
    let Some(midx) = init_ty.static_initializer() else {
        return out;
    };

    let mut seen = HashSet::new();
    seen.insert(init_ty.methods[midx].name.clone());
    walk(module, init_ty, &init_ty.methods[midx], &mut seen, &mut out);
    out
}

fn walk(
    module: &Module,
    init_ty: &TypeDef,
    method: &Method,
    seen: &mut HashSet<String>,
    out: &mut Vec<String>,
) {
    let Some(body) = &method.body else {
        return;
    };
    for inst in &body.instructions {
        if inst.opcode != Opcode::Call {
            continue;
        }
        let Operand::Member(member) = &inst.operand else {
            continue;
        };
        out.push(display(member));

        if let Some(parent) = member.parent.as_named()
            && parent.belongs_to(&module.identity())
            && parent.name == init_ty.name
            && let Some(next) = init_ty.find_method(&member.name)
            && seen.insert(member.name.clone())
        {
            walk(module, init_ty, &init_ty.methods[next], seen, out);
        }
    }
}

fn display(member: &MemberRef) -> String {
    match member.parent.as_named() {
        Some(parent) => format!("{}::{}", parent.name.name, member.name),
        None => member.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use modfold_format::{
        Body, Instruction, MethodSig, QualifiedName, TypeSig,
    };

    use super::*;

    fn call_to(scope: &str, ty: &str, method: &str) -> Instruction {
        Instruction::call(MemberRef::method(
            TypeSig::named(scope, QualifiedName::global(ty)),
            method,
            MethodSig::empty(),
        ))
    }

    #[test]
    fn empty_module_has_empty_sequence() {
        let m = Module::new("host", "1.0.0");
        assert!(init_sequence(&m).is_empty());
    }

    #[test]
    fn follows_chained_initializers() {
        let mut m = Module::new("host", "1.0.0");
        let init_idx = m.module_init_or_create();
        let identity = m.identity();

        let init_ty = m.type_mut(init_idx);
        let chained = Method::new(
            ".init/dep/1.0.0",
            modfold_format::MethodFlags::STATIC,
            MethodSig::empty(),
        )
        .with_body(Body::new(vec![
            call_to("other/1.0.0", "Helper", "prime"),
            Instruction::ret(),
        ]));
        init_ty.add_method(chained);

        let cctor = init_ty.static_initializer_or_create();
        let body = Body::new(vec![
            call_to(&identity, "<module-init>", ".init/dep/1.0.0"),
            call_to(&identity, "App", "boot"),
            Instruction::ret(),
        ]);
        init_ty.methods[cctor].body = Some(body);

        assert_eq!(
            init_sequence(&m),
            vec![
                "<module-init>::.init/dep/1.0.0",
                "Helper::prime",
                "App::boot",
            ]
        );
    }

    #[test]
    fn self_recursive_chain_terminates() {
        let mut m = Module::new("host", "1.0.0");
        let init_idx = m.module_init_or_create();
        let identity = m.identity();

        let init_ty = m.type_mut(init_idx);
        let cctor = init_ty.static_initializer_or_create();
        init_ty.methods[cctor].body = Some(Body::new(vec![
            call_to(&identity, "<module-init>", ".init"),
            Instruction::ret(),
        ]));

        assert_eq!(init_sequence(&m), vec!["<module-init>::.init"]);
    }
}
