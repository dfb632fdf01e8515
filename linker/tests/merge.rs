//! End-to-end merge behavior: initializer chaining, collision renaming,
//! reference closure, and relocation idempotence.

mod common;

use common::{call_to, module, refs_into, set_init_body};
use modfold_format::{
    Field, Instruction, MemberRef, Method, MethodFlags, MethodSig, MethodSpec, Module, Opcode,
    Operand, QualifiedName, TypeDef, TypeRef, TypeSig,
};
use modfold_linker::{GraphRelocator, MergeResolver, merge};
use modfold_runtime::init_sequence;
use proptest::prelude::*;

const DEP: &str = "dep/1.0.0";

fn dep_sig(name: &str) -> TypeSig {
    TypeSig::named(DEP, QualifiedName::global(name))
}

/// A dependency with two types and code that references both, plus an
/// initializer that calls into its own `Boot` type.
fn sample_dep() -> Module {
    let mut dep = module("dep");

    let mut widget = TypeDef::new(QualifiedName::global("Widget"));
    widget.add_method(Method::new("run", MethodFlags::PUBLIC, MethodSig::empty()));
    dep.insert_type(widget).unwrap();

    let mut boot = TypeDef::new(QualifiedName::global("Boot"));
    boot.add_method(Method::new("run", MethodFlags::STATIC, MethodSig::empty()));
    dep.insert_type(boot).unwrap();

    set_init_body(&mut dep, vec![call_to(DEP, "Boot", "run"), Instruction::ret()]);
    dep
}

#[test]
fn initializer_ordering_last_merged_runs_first() {
    let mut host = module("host");
    set_init_body(
        &mut host,
        vec![call_to("host/1.0.0", "App", "boot"), Instruction::ret()],
    );

    let mut dep_a = module("depA");
    let mut boot_a = TypeDef::new(QualifiedName::global("BootA"));
    boot_a.add_method(Method::new("run", MethodFlags::STATIC, MethodSig::empty()));
    dep_a.insert_type(boot_a).unwrap();
    set_init_body(
        &mut dep_a,
        vec![call_to("depA/1.0.0", "BootA", "run"), Instruction::ret()],
    );

    let mut dep_b = module("depB");
    let mut boot_b = TypeDef::new(QualifiedName::global("BootB"));
    boot_b.add_method(Method::new("run", MethodFlags::STATIC, MethodSig::empty()));
    dep_b.insert_type(boot_b).unwrap();
    set_init_body(
        &mut dep_b,
        vec![call_to("depB/1.0.0", "BootB", "run"), Instruction::ret()],
    );

    merge(&mut host, dep_a).unwrap();
    merge(&mut host, dep_b).unwrap();

    assert_eq!(
        init_sequence(&host),
        vec![
            "<module-init>::.init/depB/1.0.0",
            "BootB::run",
            "<module-init>::.init/depA/1.0.0",
            "BootA::run",
            "App::boot",
        ]
    );
}

#[test]
fn nested_merges_keep_the_whole_chain_runnable() {
    // c is merged into b, then b (carrying c) into the host
    let mut b = module("b");
    set_init_body(&mut b, vec![Instruction::ret()]);

    let mut c = module("c");
    set_init_body(&mut c, vec![Instruction::ret()]);

    merge(&mut b, c).unwrap();

    let mut host = module("host");
    set_init_body(
        &mut host,
        vec![call_to("host/1.0.0", "App", "boot"), Instruction::ret()],
    );
    merge(&mut host, b).unwrap();

    assert_eq!(
        init_sequence(&host),
        vec![
            "<module-init>::.init/b/1.0.0",
            "<module-init>::.init/c/1.0.0",
            "App::boot",
        ]
    );
}

#[test]
fn reference_closure_no_reference_survives_into_the_discarded_module() {
    let mut host = module("host");

    // host code that references the dependency in every shape the format has
    let mut consumer = TypeDef::new(QualifiedName::global("Consumer"));
    consumer.base = Some(dep_sig("Widget"));
    consumer.interfaces.push(dep_sig("Boot"));
    consumer.add_field(Field {
        name: "widgets".to_string(),
        ty: TypeSig::Vector(Box::new(dep_sig("Widget"))),
    });
    let mut method = Method::new(
        "use_widget",
        MethodFlags::PUBLIC,
        MethodSig {
            params: vec![TypeSig::Generic {
                head: TypeRef::new("corelib/4.0.0", QualifiedName::global("List")),
                args: vec![dep_sig("Widget")],
            }],
            ret: Some(dep_sig("Widget")),
        },
    );
    let mut body = modfold_format::Body::default();
    body.locals.push(modfold_format::Local {
        name: None,
        ty: dep_sig("Boot"),
    });
    body.push(Instruction::new(Opcode::CastClass, Operand::Type(dep_sig("Widget"))));
    body.push(Instruction::call(MemberRef::method(
        dep_sig("Widget"),
        "run",
        MethodSig::empty(),
    )));
    body.push(Instruction::new(
        Opcode::Call,
        Operand::Spec(MethodSpec {
            member: MemberRef::method(dep_sig("Boot"), "run", MethodSig::empty()),
            generic_args: vec![dep_sig("Widget")],
        }),
    ));
    body.push(Instruction::ret());
    method.body = Some(body);
    consumer.add_method(method);
    host.insert_type(consumer).unwrap();

    assert!(!refs_into(&host, DEP).is_empty(), "sanity: host references the dep");

    merge(&mut host, sample_dep()).unwrap();

    let leftovers = refs_into(&host, DEP);
    assert!(leftovers.is_empty(), "unrelocated references remain: {leftovers:?}");

    // unrelated references were left exactly as they were
    let corelib = refs_into(&host, "corelib/4.0.0");
    assert!(!corelib.is_empty());
}

#[test]
fn relocation_is_idempotent() {
    let mut host = module("host");
    let mut user = TypeDef::new(QualifiedName::global("User"));
    user.add_field(Field {
        name: "w".to_string(),
        ty: dep_sig("Widget"),
    });
    host.insert_type(user).unwrap();

    merge(&mut host, sample_dep()).unwrap();
    let after_merge = host.to_bytes().unwrap();

    let resolver = MergeResolver::pin(DEP, &host);
    let changed = GraphRelocator::new(&resolver).relocate_module(&mut host);

    assert!(!changed, "second relocation pass must be a no-op");
    assert_eq!(host.to_bytes().unwrap(), after_merge);
}

#[test]
fn collision_references_bind_to_the_alias_not_the_host_type() {
    let mut host = module("host");
    host.insert_type(TypeDef::new(QualifiedName::global("Widget")))
        .unwrap();

    let mut dep = module("dep");
    dep.insert_type(TypeDef::new(QualifiedName::global("Widget")))
        .unwrap();
    let mut user = TypeDef::new(QualifiedName::global("User"));
    user.add_field(Field {
        name: "w".to_string(),
        ty: dep_sig("Widget"),
    });
    dep.insert_type(user).unwrap();

    merge(&mut host, dep).unwrap();

    let alias = QualifiedName::global("Widget@dep/1.0.0");
    assert!(host.find_type(&alias).is_some(), "incoming type renamed");
    assert!(host.find_type(&QualifiedName::global("Widget")).is_some());

    let user_idx = host.find_type(&QualifiedName::global("User")).unwrap();
    let field = host.type_(user_idx).fields.values().next().unwrap();
    assert_eq!(
        field.ty,
        TypeSig::named("host/1.0.0", alias),
        "dependency code must keep pointing at the dependency's own type"
    );
}

proptest! {
    #[test]
    fn initializer_order_is_reverse_merge_order(
        names in proptest::collection::btree_set("[a-z]{3,8}", 1..6usize),
    ) {
        let names: Vec<String> = names.into_iter().collect();

        let mut host = module("host");
        set_init_body(
            &mut host,
            vec![call_to("host/1.0.0", "App", "boot"), Instruction::ret()],
        );

        for name in &names {
            let mut dep = Module::new(name, "1.0.0");
            set_init_body(&mut dep, vec![Instruction::ret()]);
            merge(&mut host, dep).unwrap();
        }

        let sequence = init_sequence(&host);
        let inits: Vec<String> = sequence
            .iter()
            .filter(|entry| entry.contains("::.init/"))
            .cloned()
            .collect();
        let expected: Vec<String> = names
            .iter()
            .rev()
            .map(|name| format!("<module-init>::.init/{name}/1.0.0"))
            .collect();

        prop_assert_eq!(inits, expected);
        prop_assert_eq!(sequence.last().unwrap().as_str(), "App::boot");
    }
}
