// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use crate::model::{FuncId, TypeId};
use crate::util::bit_vec::BitVec;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Observation {
    /// A value of the concrete type is constructed.
    Instantiated(TypeId),
    /// The function's address is taken.
    AddressTaken(FuncId),
}

/// Records the instantiated types and address-taken functions seen so far.
/// Entries are never removed.
#[derive(Debug, Default)]
pub struct InstantiationTracker {
    types: BitVec<TypeId>,
    funcs: BitVec<FuncId>,
    /// Instantiated types in observation order.
    type_order: Vec<TypeId>,
    /// Address-taken functions in observation order.
    func_order: Vec<FuncId>,
}

impl InstantiationTracker {
    pub fn new(num_types: usize, num_funcs: usize) -> Self {
        InstantiationTracker {
            types: BitVec::with_capacity(num_types),
            funcs: BitVec::with_capacity(num_funcs),
            type_order: Vec::new(),
            func_order: Vec::new(),
        }
    }

    /// Returns `true` only the first time `event`'s type or function is observed.
    pub fn observe(&mut self, event: Observation) -> bool {
        match event {
            Observation::Instantiated(ty) => {
                let new = self.types.insert(ty);
                if new {
                    self.type_order.push(ty);
                }
                new
            }
            Observation::AddressTaken(func) => {
                let new = self.funcs.insert(func);
                if new {
                    self.func_order.push(func);
                }
                new
            }
        }
    }

    #[inline]
    pub fn is_instantiated(&self, ty: TypeId) -> bool {
        self.types.contains(ty)
    }

    #[inline]
    pub fn is_address_taken(&self, func: FuncId) -> bool {
        self.funcs.contains(func)
    }

    pub fn instantiated_types(&self) -> &[TypeId] {
        &self.type_order
    }

    pub fn address_taken_funcs(&self) -> &[FuncId] {
        &self.func_order
    }

    pub(crate) fn into_sets(self) -> (BitVec<TypeId>, BitVec<FuncId>) {
        (self.types, self.funcs)
    }
}
