// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Runtime half of the embedding protocol: the deterministic resource naming
//! scheme, payload compression, and the process-wide module resolution
//! registry a linked host installs its hook into.
//!
//! The naming functions here are shared with the build-time linker; embed
//! time and load time must agree on them byte for byte, or an embedded
//! dependency becomes unreachable at runtime.

mod error;
mod init;
mod registry;

pub use error::Error;
pub use init::init_sequence;
pub use registry::{Registry, ResolveHook, global, resolve, resolve_in, setup};

/// Marker prefix every resource written by the linker starts with. Chosen so
/// it cannot collide with a compiler-produced resource name.
const MARKER: char = '\u{2299}';

/// Identity of the well-known runtime symbol the injected loader calls.
pub const RUNTIME_IDENTITY: &str = "modfold-runtime/0";
/// Type name of the well-known runtime symbol.
pub const LOADER_TYPE: &str = "Loader";
/// Method name of the well-known runtime symbol.
pub const SETUP_METHOD: &str = "setup";

/// Resource name under which a dependency's compressed payload is embedded.
pub fn embedded_resource_name(identity: &str) -> String {
    format!("{MARKER}.lz4:{identity}")
}

/// Resource name of the zero-length marker recording a merged dependency.
pub fn merged_resource_name(identity: &str) -> String {
    format!("{MARKER}:{identity}")
}

/// Compresses a dependency payload for embedding.
pub fn compress(bytes: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(bytes)
}

/// Decompresses an embedded dependency payload.
///
/// # Errors
///
/// Returns an error if the blob is not a valid size-prepended lz4 block.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    Ok(lz4_flex::decompress_size_prepended(bytes)?)
}
