// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The on-disk container: a fixed header (magic, format version, payload
//! checksum) followed by the bincode-encoded module.

use crate::Error;
use crate::module::Module;

const MAGIC: &[u8; 4] = b"MFLD";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 32;

pub(crate) fn encode(module: &Module) -> Result<Vec<u8>, Error> {
    let payload = bincode::serialize(module)?;
    let checksum = blake3::hash(&payload);

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(checksum.as_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Module, Error> {
    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Err(Error::BadMagic);
    }

    let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    if version != VERSION {
        return Err(Error::VersionMismatch(version));
    }

    let stored: [u8; 32] = bytes[8..HEADER_LEN].try_into().unwrap();
    let payload = &bytes[HEADER_LEN..];
    if *blake3::hash(payload).as_bytes() != stored {
        return Err(Error::ChecksumMismatch);
    }

    let mut module: Module = bincode::deserialize(payload)?;
    module.rebuild_index()?;
    Ok(module)
}
