// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Embedding: storing a dependency as an opaque compressed payload.
//!
//! No graph rewriting happens here — the dependency keeps its identity and
//! every internal reference stays valid. Only resolution changes, at
//! runtime, through the hook installed by the injected loader.

use modfold_format::Module;
use modfold_runtime::{compress, embedded_resource_name};

/// Stores the dependency's raw container bytes, compressed, under the
/// deterministic resource name derived from its identity.
pub fn embed(host: &mut Module, identity: &str, bytes: &[u8]) {
    log::info!("embedding {identity} into {}", host.identity());
    host.add_resource(embedded_resource_name(identity), compress(bytes));
}

#[cfg(test)]
mod tests {
    use modfold_format::{QualifiedName, TypeDef};
    use modfold_runtime::resolve_in;

    use super::*;

    #[test]
    fn embedded_payload_round_trips_through_the_runtime() {
        let mut dep = Module::new("dep", "2.0.0");
        dep.insert_type(TypeDef::new(QualifiedName::global("Widget")))
            .unwrap();
        let bytes = dep.to_bytes().unwrap();

        let mut host = Module::new("host", "1.0.0");
        embed(&mut host, &dep.identity(), &bytes);

        let loaded = resolve_in(&host, "dep/2.0.0").expect("embedded module resolves");
        assert_eq!(loaded.identity(), "dep/2.0.0");
        assert!(loaded.find_type(&QualifiedName::global("Widget")).is_some());

        // exactly that payload and no other
        assert!(resolve_in(&host, "dep/2.0.1").is_none());
    }
}
