// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt;

use modfold_format::QualifiedName;

/// Error type for the crate.
#[derive(Debug)]
pub enum Error {
    /// Reading or parsing a module container failed.
    Format(modfold_format::Error),
    /// Reading a dependency file failed.
    Io(std::io::Error),
    /// The host already carries the merge marker for this identity.
    AlreadyMerged(String),
    /// A collision rename would itself collide, so the merge cannot proceed.
    Collision(QualifiedName),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format(e) => write!(f, "invalid module: {e}"),
            Self::Io(e) => write!(f, "i/o error: {e}"),
            Self::AlreadyMerged(identity) => {
                write!(f, "{identity} has already been merged into this host")
            }
            Self::Collision(name) => {
                write!(f, "collision alias {name} is already defined in the host")
            }
        }
    }
}

impl From<modfold_format::Error> for Error {
    fn from(e: modfold_format::Error) -> Self {
        Self::Format(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Format(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}
