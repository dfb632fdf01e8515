// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt;

/// Error type for the crate.
#[derive(Debug)]
pub enum Error {
    /// An embedded payload is not a valid lz4 block.
    Decompress(lz4_flex::block::DecompressError),
    /// A decompressed payload is not a valid module container.
    Format(modfold_format::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decompress(e) => write!(f, "embedded payload is corrupt: {e}"),
            Self::Format(e) => write!(f, "embedded payload is not a module: {e}"),
        }
    }
}

impl From<lz4_flex::block::DecompressError> for Error {
    fn from(e: lz4_flex::block::DecompressError) -> Self {
        Self::Decompress(e)
    }
}

impl From<modfold_format::Error> for Error {
    fn from(e: modfold_format::Error) -> Self {
        Self::Format(e)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decompress(e) => Some(e),
            Self::Format(e) => Some(e),
        }
    }
}
