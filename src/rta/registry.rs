// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The dynamic-dispatch registry.
//!
//! Dynamic call sites are kept forever under their dispatch key. A call site is
//! matched against every candidate observed before its registration, and every
//! candidate observed later is matched against all sites registered so far, so
//! the outcome does not depend on which of the two was seen first.

use std::collections::{HashMap, HashSet};

use log::*;

use super::method_sets::MethodSetResolver;
use super::tracker::InstantiationTracker;
use crate::model::{BaseCallSite, CallType, DispatchKey, FuncId, InterfaceId, SigId, TypeId};

/// A dynamic call site resolved to one of its targets.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Resolution {
    pub callsite: BaseCallSite,
    pub callee: FuncId,
    pub kind: CallType,
}

#[derive(Debug, Default)]
pub struct DispatchRegistry {
    /// Invoke sites for each interface, with the index of the invoked method.
    invoke_sites: HashMap<InterfaceId, Vec<(BaseCallSite, u32)>>,
    /// Interfaces with at least one invoke site, in first-registration order.
    interfaces: Vec<InterfaceId>,
    /// Instantiated types found to implement each interface in `interfaces`.
    implementations: HashMap<InterfaceId, Vec<TypeId>>,
    /// Calls through function values, per signature.
    dyn_call_sites: HashMap<SigId, Vec<BaseCallSite>>,
    /// Address-taken functions, per signature.
    addr_taken_funcs: HashMap<SigId, Vec<FuncId>>,
    registered: HashSet<BaseCallSite>,
}

impl DispatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `callsite` under `key` and resolves it against the candidates known so
    /// far. Registering a call site again is a no-op.
    pub fn register(
        &mut self,
        key: DispatchKey,
        callsite: BaseCallSite,
        tracker: &InstantiationTracker,
        resolver: &mut MethodSetResolver<'_>,
    ) -> Vec<Resolution> {
        if !self.registered.insert(callsite) {
            return Vec::new();
        }
        let mut resolutions = Vec::new();
        match key {
            DispatchKey::Invoke { interface, method } => {
                if !self.implementations.contains_key(&interface) {
                    // First site for this interface: collect the implementations
                    // among the types instantiated so far.
                    let impls: Vec<TypeId> = tracker
                        .instantiated_types()
                        .iter()
                        .copied()
                        .filter(|ty| resolver.implements(*ty, interface).is_some())
                        .collect();
                    self.implementations.insert(interface, impls);
                    self.interfaces.push(interface);
                }
                self.invoke_sites
                    .entry(interface)
                    .or_default()
                    .push((callsite, method));
                for ty in &self.implementations[&interface] {
                    push_invoke_resolution(&mut resolutions, resolver, callsite, *ty, interface, method);
                }
            }
            DispatchKey::Signature(sig) => {
                debug!("Add dynamic function callsite: {:?} -> {:?}", callsite, sig);
                self.dyn_call_sites.entry(sig).or_default().push(callsite);
                if let Some(targets) = self.addr_taken_funcs.get(&sig) {
                    resolutions.extend(targets.iter().map(|callee| Resolution {
                        callsite,
                        callee: *callee,
                        kind: CallType::DynamicFunction,
                    }));
                }
            }
        }
        resolutions
    }

    /// Matches a newly instantiated type against every registered invoke site.
    pub fn resolve_new_type(&mut self, ty: TypeId, resolver: &mut MethodSetResolver<'_>) -> Vec<Resolution> {
        let mut resolutions = Vec::new();
        for interface in &self.interfaces {
            if resolver.implements(ty, *interface).is_none() {
                continue;
            }
            if let Some(impls) = self.implementations.get_mut(interface) {
                impls.push(ty);
            }
            for (callsite, method) in self.invoke_sites.get(interface).into_iter().flatten() {
                push_invoke_resolution(&mut resolutions, resolver, *callsite, ty, *interface, *method);
            }
        }
        resolutions
    }

    /// Matches a newly address-taken function against the indirect call sites of
    /// the same signature.
    pub fn resolve_new_func(&mut self, func: FuncId, sig: SigId) -> Vec<Resolution> {
        self.addr_taken_funcs.entry(sig).or_default().push(func);
        self.dyn_call_sites
            .get(&sig)
            .into_iter()
            .flatten()
            .map(|callsite| Resolution {
                callsite: *callsite,
                callee: func,
                kind: CallType::DynamicFunction,
            })
            .collect()
    }

    pub fn num_registered(&self) -> usize {
        self.registered.len()
    }

    pub fn is_registered(&self, callsite: &BaseCallSite) -> bool {
        self.registered.contains(callsite)
    }
}

fn push_invoke_resolution(
    resolutions: &mut Vec<Resolution>,
    resolver: &mut MethodSetResolver<'_>,
    callsite: BaseCallSite,
    ty: TypeId,
    interface: InterfaceId,
    method: u32,
) {
    match resolver.method_of(ty, interface, method) {
        Some(callee) => resolutions.push(Resolution {
            callsite,
            callee,
            kind: CallType::DynamicMethod,
        }),
        None => unreachable!("{:?} implements {:?} but lacks method #{}", ty, interface, method),
    }
}
