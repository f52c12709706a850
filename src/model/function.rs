// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::call_site::{CallSite, InstantiationSite};
use crate::newtype_index;

newtype_index! {
    /// The unique identifier for each function of the program.
    pub struct FuncId;
}

newtype_index! {
    /// The identifier of an interned call signature.
    pub struct SigId;
}

/// A call signature. Methods carry their signature without the receiver, so that a
/// method and the interface method it satisfies share the same interned `SigId`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Signature {
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub results: Vec<String>,
}

impl Signature {
    pub fn new<P, R>(params: P, results: R) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Signature {
            params: params.into_iter().map(Into::into).collect(),
            results: results.into_iter().map(Into::into).collect(),
        }
    }

    /// `func()`
    pub fn nullary() -> Self {
        Signature::default()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func({})", self.params.join(", "))?;
        match self.results.len() {
            0 => Ok(()),
            1 => write!(f, " {}", self.results[0]),
            _ => write!(f, " ({})", self.results.join(", ")),
        }
    }
}

/// A function of the analyzed program together with the facts the analysis needs
/// about its body.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub signature: SigId,
    /// Generated wrapper, e.g. a promoted method or a pointer-receiver adapter.
    pub synthetic: bool,
    /// Part of the externally visible API.
    pub exported: bool,
    /// Call sites in declaration order.
    pub call_sites: Vec<CallSite>,
    /// Instantiation sites in declaration order.
    pub instantiations: Vec<InstantiationSite>,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
