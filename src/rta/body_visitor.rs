// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use log::*;

use crate::model::{BaseCallSite, CallSite, CallType, DispatchKey, FuncId, Function, InstantiationSite};

use super::rta::RapidTypeAnalysis;

/// Scans the body of one reachable function.
pub struct BodyVisitor<'rta, 'p> {
    pub(crate) rta: &'rta mut RapidTypeAnalysis<'p>,
    pub(crate) func_id: FuncId,
    func: &'p Function,
}

impl<'rta, 'p> BodyVisitor<'rta, 'p> {
    pub fn new(rta: &'rta mut RapidTypeAnalysis<'p>, func_id: FuncId) -> BodyVisitor<'rta, 'p> {
        let func = rta.program.function(func_id);
        debug!("Processing function {:?} {}", func_id, func);
        BodyVisitor { rta, func_id, func }
    }

    /// Instantiation sites are visited before call sites, each in declared order.
    pub fn visit_body(&mut self) {
        let func = self.func;
        for site in &func.instantiations {
            self.visit_instantiation(site);
        }
        for (ordinal, site) in func.call_sites.iter().enumerate() {
            let callsite = BaseCallSite::new(self.func_id, ordinal);
            self.visit_call_site(callsite, site);
        }
    }

    fn visit_instantiation(&mut self, site: &InstantiationSite) {
        match *site {
            InstantiationSite::Type(ty) => self.rta.observe_type(ty),
            InstantiationSite::FuncValue(func) => self.rta.observe_func_value(func),
        }
    }

    fn visit_call_site(&mut self, callsite: BaseCallSite, site: &CallSite) {
        match *site {
            CallSite::Static { callee, method } => {
                let kind = if method {
                    CallType::StaticMethod
                } else {
                    CallType::StaticFunction
                };
                self.rta.add_static_callsite(callsite, callee, kind);
            }
            CallSite::Invoke { interface, method } => {
                debug!(
                    "Add invoke callsite: {:?} -> {}.{}",
                    callsite,
                    self.rta.program.interface(interface).name,
                    self.rta.program.interface(interface).methods[method as usize].name
                );
                let key = DispatchKey::Invoke { interface, method };
                self.rta.add_dyn_callsite(callsite, key, CallType::DynamicMethod);
            }
            CallSite::Indirect { signature } => {
                debug!(
                    "Add function value callsite: {:?} -> {}",
                    callsite,
                    self.rta.program.signature(signature)
                );
                let key = DispatchKey::Signature(signature);
                self.rta.add_dyn_callsite(callsite, key, CallType::DynamicFunction);
            }
        }
    }
}
