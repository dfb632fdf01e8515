// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Build-time module linker: folds compiled dependency modules into a host
//! module, either by physically merging their definitions (rewriting every
//! reference in the process) or by embedding them as compressed payloads the
//! injected runtime loader resolves on demand.
//!
//! The pass is single-threaded and strictly ordered: the host is the one
//! mutable resource, each dependency is read, consumed, and discarded, and
//! later merges depend on what earlier ones inserted.

mod directive;
mod driver;
mod embed;
mod error;
mod merge;
mod relocate;
mod resolver;

pub use directive::{Action, Directive, evaluate, parse_directive, parse_directives};
pub use driver::{
    DependencyDescriptor, DependencyReport, DependencyStatus, LOADER_TYPE_NAME, LinkOutcome,
    Linker, inject_loader,
};
pub use embed::embed;
pub use error::Error;
pub use merge::merge;
pub use relocate::{GraphRelocator, Relocated};
pub use resolver::{MergeResolver, TypeResolver};
