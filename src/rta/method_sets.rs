// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Structural interface satisfaction with memoization.
//!
//! The effective method set of a type is its declared methods plus the methods
//! promoted from its directly embedded types. A declared method shadows a promoted
//! one. Two embedded types promoting different functions under the same name make
//! that name ambiguous, and an ambiguous name satisfies nothing.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use log::*;

use crate::model::{FuncId, InterfaceId, Program, TypeId};
use crate::util::index::Idx;

/// Effective method set of one type. `None` marks an ambiguous promotion.
#[derive(Debug, Default)]
pub struct MethodSet<'p> {
    methods: HashMap<&'p str, Option<FuncId>>,
}

impl<'p> MethodSet<'p> {
    pub fn lookup(&self, name: &str) -> Option<FuncId> {
        self.methods.get(name).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.methods.values().filter(|m| m.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unambiguous methods, sorted by name.
    pub fn methods(&self) -> Vec<(&'p str, FuncId)> {
        let mut methods: Vec<_> = self
            .methods
            .iter()
            .filter_map(|(name, f)| f.map(|f| (*name, f)))
            .collect();
        methods.sort_unstable();
        methods
    }
}

fn compute_method_set<'p>(program: &'p Program, ty: TypeId) -> MethodSet<'p> {
    let concrete = program.concrete_type(ty);
    let mut methods: HashMap<&'p str, Option<FuncId>> = concrete
        .methods
        .iter()
        .map(|m| (m.name.as_str(), Some(m.func)))
        .collect();

    let mut promoted: HashMap<&'p str, Option<FuncId>> = HashMap::new();
    for embedded in &concrete.embeds {
        for m in &program.concrete_type(*embedded).methods {
            if methods.contains_key(m.name.as_str()) {
                continue;
            }
            match promoted.entry(m.name.as_str()) {
                Entry::Vacant(v) => {
                    v.insert(Some(m.func));
                }
                Entry::Occupied(mut o) => {
                    // The same function through two paths is fine, the first path wins.
                    if *o.get() != Some(m.func) {
                        debug!(
                            "Ambiguous promotion of `{}` into `{}`",
                            m.name, concrete.name
                        );
                        o.insert(None);
                    }
                }
            }
        }
    }
    methods.extend(promoted);
    MethodSet { methods }
}

pub struct MethodSetResolver<'p> {
    program: &'p Program,
    method_sets: Vec<Option<MethodSet<'p>>>,
    /// For each (type, interface) pair: the implementing methods in the order of the
    /// interface's methods, or `None` when the type does not implement it.
    implements_cache: HashMap<(TypeId, InterfaceId), Option<Box<[FuncId]>>>,
    pub num_queries: usize,
    pub num_cache_hits: usize,
}

impl<'p> MethodSetResolver<'p> {
    pub fn new(program: &'p Program) -> Self {
        let mut method_sets = Vec::with_capacity(program.num_types());
        method_sets.resize_with(program.num_types(), || None);
        MethodSetResolver {
            program,
            method_sets,
            implements_cache: HashMap::new(),
            num_queries: 0,
            num_cache_hits: 0,
        }
    }

    /// Returns the effective method set of `ty`, computing it on first use.
    pub fn method_set(&mut self, ty: TypeId) -> &MethodSet<'p> {
        let program = self.program;
        self.method_sets[ty.index()].get_or_insert_with(|| compute_method_set(program, ty))
    }

    /// Returns the methods of `ty` that satisfy each method of `iface`, in the order
    /// of the interface's (sorted) methods, or `None` if `ty` does not implement it.
    pub fn implements(&mut self, ty: TypeId, iface: InterfaceId) -> Option<&[FuncId]> {
        self.num_queries += 1;
        if self.implements_cache.contains_key(&(ty, iface)) {
            self.num_cache_hits += 1;
        } else {
            let result = self.compute_implements(ty, iface);
            self.implements_cache.insert((ty, iface), result);
        }
        self.implements_cache[&(ty, iface)].as_deref()
    }

    /// The method of `ty` selected by the `method`-th method of `iface`.
    pub fn method_of(&mut self, ty: TypeId, iface: InterfaceId, method: u32) -> Option<FuncId> {
        self.implements(ty, iface)
            .and_then(|methods| methods.get(method as usize).copied())
    }

    fn compute_implements(&mut self, ty: TypeId, iface: InterfaceId) -> Option<Box<[FuncId]>> {
        let program = self.program;
        let interface = program.interface(iface);
        let method_set = self.method_set(ty);
        interface
            .methods
            .iter()
            .map(|required| {
                method_set
                    .lookup(&required.name)
                    .filter(|f| program.function(*f).signature == required.signature)
            })
            .collect::<Option<Vec<FuncId>>>()
            .map(Vec::into_boxed_slice)
    }

    /// Exported methods of `ty`'s effective method set, sorted by name.
    pub fn exported_methods(&mut self, ty: TypeId) -> Vec<FuncId> {
        let program = self.program;
        self.method_set(ty)
            .methods()
            .into_iter()
            .map(|(_, f)| f)
            .filter(|f| program.function(*f).exported)
            .collect()
    }
}
