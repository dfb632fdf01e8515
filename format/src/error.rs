// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt;

use crate::types::QualifiedName;

/// Error type for the crate.
#[derive(Debug)]
pub enum Error {
    /// Reading or writing a container file failed.
    Io(std::io::Error),
    /// The input does not start with the container magic.
    BadMagic,
    /// The container was written by an incompatible format version.
    VersionMismatch(u32),
    /// The payload does not match its recorded checksum.
    ChecksumMismatch,
    /// Payload encoding or decoding failed.
    Codec(bincode::Error),
    /// A qualified name is defined twice within one module.
    DuplicateType(QualifiedName),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "i/o error: {e}"),
            Self::BadMagic => f.write_str("not a module container (bad magic)"),
            Self::VersionMismatch(v) => {
                write!(f, "unsupported container format version {v}")
            }
            Self::ChecksumMismatch => f.write_str("container payload checksum mismatch"),
            Self::Codec(e) => write!(f, "container payload is malformed: {e}"),
            Self::DuplicateType(name) => {
                write!(f, "type {name} is defined more than once")
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Self::Codec(e)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Codec(e) => Some(e),
            _ => None,
        }
    }
}
