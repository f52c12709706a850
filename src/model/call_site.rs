// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

use super::function::{FuncId, SigId};
use super::types::{InterfaceId, TypeId};

/// The kind of a call graph edge.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum CallType {
    StaticFunction,
    StaticMethod,
    // Interface method calls resolved against instantiated types
    DynamicMethod,
    // Calls through function values resolved against address-taken functions
    DynamicFunction,
}

impl CallType {
    pub const ALL: [CallType; 4] = [
        CallType::StaticFunction,
        CallType::StaticMethod,
        CallType::DynamicMethod,
        CallType::DynamicFunction,
    ];

    #[inline]
    pub fn is_dynamic(self) -> bool {
        matches!(self, CallType::DynamicMethod | CallType::DynamicFunction)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallType::StaticFunction => "static function call",
            CallType::StaticMethod => "static method call",
            CallType::DynamicMethod => "dynamic method call",
            CallType::DynamicFunction => "dynamic function call",
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a call site by its enclosing function and its position in that
/// function's call-site list.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct BaseCallSite {
    pub func: FuncId,
    pub ordinal: u32,
}

impl BaseCallSite {
    pub fn new(func: FuncId, ordinal: usize) -> Self {
        BaseCallSite {
            func,
            ordinal: ordinal as u32,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallSite {
    /// A call naming its target directly.
    Static { callee: FuncId, method: bool },
    /// A method call on an interface value. `method` indexes the interface's
    /// sorted method list.
    Invoke { interface: InterfaceId, method: u32 },
    /// A call through a function value of the given signature.
    Indirect { signature: SigId },
}

impl CallSite {
    /// Returns the dispatch key of a dynamic call site, `None` for static calls.
    pub fn dispatch_key(&self) -> Option<DispatchKey> {
        match *self {
            CallSite::Static { .. } => None,
            CallSite::Invoke { interface, method } => Some(DispatchKey::Invoke { interface, method }),
            CallSite::Indirect { signature } => Some(DispatchKey::Signature(signature)),
        }
    }
}

/// The key under which dynamic call sites wait for candidate targets.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum DispatchKey {
    Invoke { interface: InterfaceId, method: u32 },
    Signature(SigId),
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum InstantiationSite {
    /// A value of the concrete type is constructed (allocation, composite literal,
    /// conversion to an interface).
    Type(TypeId),
    /// The function's address is taken and flows somewhere as a value.
    FuncValue(FuncId),
}
