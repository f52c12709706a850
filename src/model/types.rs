// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use super::function::{FuncId, SigId};
use crate::newtype_index;

newtype_index! {
    /// The unique identifier for each concrete type.
    pub struct TypeId;
}

newtype_index! {
    /// The unique identifier for each interface type.
    pub struct InterfaceId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Named,
    Pointer(TypeId),
    Struct,
    Basic,
    Func,
    Other,
}

/// An entry of a method set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    pub func: FuncId,
}

#[derive(Clone, Debug)]
pub struct ConcreteType {
    pub name: String,
    pub kind: TypeKind,
    /// Methods declared on (or already promoted into) this type, in declaration order.
    pub methods: Vec<Method>,
    /// Embedded field types, in declaration order. Their methods are promoted.
    pub embeds: Vec<TypeId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceMethod {
    pub name: String,
    pub signature: SigId,
}

#[derive(Clone, Debug)]
pub struct InterfaceType {
    pub name: String,
    /// Required methods, sorted by name.
    pub methods: Vec<InterfaceMethod>,
}

impl InterfaceType {
    pub fn method_index(&self, name: &str) -> Option<usize> {
        self.methods
            .binary_search_by(|m| m.name.as_str().cmp(name))
            .ok()
    }
}
