// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use log::*;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::graph::call_graph::CallGraph;
use crate::model::{BaseCallSite, CallType, DispatchKey, FuncId, Program, TypeId};
use crate::util::bit_vec::BitVec;
use crate::util::index::Idx;

use super::body_visitor::BodyVisitor;
use super::method_sets::MethodSetResolver;
use super::registry::{DispatchRegistry, Resolution};
use super::tracker::{InstantiationTracker, Observation};
use super::{AnalysisError, AnalysisStats, CancellationToken, RootSet, RtaOptions, RtaResult};

/// Per-function progress through the worklist.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FuncState {
    Unvisited,
    Queued,
    Processed,
}

/// Working state of a single analysis run.
pub struct RapidTypeAnalysis<'p> {
    pub(crate) program: &'p Program,
    options: RtaOptions,
    /// Call graph
    pub call_graph: CallGraph,

    states: Vec<FuncState>,
    /// Functions that became reachable but have not been scanned yet
    worklist: VecDeque<FuncId>,
    reachable: BitVec<FuncId>,

    resolver: MethodSetResolver<'p>,
    tracker: InstantiationTracker,
    registry: DispatchRegistry,

    cancel: Option<CancellationToken>,

    pub num_static_callsites: usize,
    pub num_dyn_callsites: usize,
    pub analysis_time: Duration,
}

impl<'p> RapidTypeAnalysis<'p> {
    pub fn new(program: &'p Program, options: RtaOptions) -> Self {
        let num_funcs = program.num_functions();
        RapidTypeAnalysis {
            program,
            options,
            call_graph: CallGraph::new(),
            states: vec![FuncState::Unvisited; num_funcs],
            worklist: VecDeque::new(),
            reachable: BitVec::with_capacity(num_funcs),
            resolver: MethodSetResolver::new(program),
            tracker: InstantiationTracker::new(program.num_types(), num_funcs),
            registry: DispatchRegistry::new(),
            cancel: None,
            num_static_callsites: 0,
            num_dyn_callsites: 0,
            analysis_time: Duration::ZERO,
        }
    }

    /// Polls `token` once per worklist iteration.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[inline]
    pub fn state(&self, func: FuncId) -> FuncState {
        self.states[func.index()]
    }

    /// Runs the analysis to its fixpoint from `roots`.
    pub fn analyze(mut self, roots: &RootSet) -> Result<RtaResult, AnalysisError> {
        let now = Instant::now();

        let roots = self.seed_roots(roots)?;
        info!("Start Rapid Type Analysis from {} root(s)", roots.len());

        self.iteratively_process_reachable_functions()?;

        self.analysis_time = now.elapsed();
        info!(
            "Rapid Type Analysis completed in {}: {} reachable functions, {} runtime types",
            humantime::format_duration(self.analysis_time),
            self.reachable.count(),
            self.tracker.instantiated_types().len()
        );
        Ok(self.finish(roots))
    }

    fn seed_roots(&mut self, roots: &RootSet) -> Result<Vec<FuncId>, AnalysisError> {
        let mut roots = match roots {
            RootSet::Explicit(funcs) => funcs.clone(),
            RootSet::ExportedApi => self.program.exported_functions(),
        };
        if let Some(unknown) = roots.iter().find(|f| f.index() >= self.program.num_functions()) {
            return Err(AnalysisError::UnknownRoot(*unknown));
        }
        roots.sort_unstable();
        roots.dedup();
        for root in &roots {
            if self.options.build_call_graph {
                self.call_graph.add_node(*root);
            }
            self.add_reachable(*root);
        }
        Ok(roots)
    }

    fn iteratively_process_reachable_functions(&mut self) -> Result<(), AnalysisError> {
        loop {
            if self.cancel.as_ref().is_some_and(|token| token.is_cancelled()) {
                warn!("Rapid Type Analysis cancelled");
                return Err(AnalysisError::Cancelled);
            }
            let Some(func_id) = self.worklist.pop_front() else {
                return Ok(());
            };
            debug_assert_eq!(self.states[func_id.index()], FuncState::Queued);
            self.states[func_id.index()] = FuncState::Processed;
            BodyVisitor::new(self, func_id).visit_body();
        }
    }

    /// Marks `func` reachable. Returns true if it was not reachable before.
    pub(crate) fn add_reachable(&mut self, func: FuncId) -> bool {
        let state = &mut self.states[func.index()];
        if *state != FuncState::Unvisited {
            return false;
        }
        *state = FuncState::Queued;
        self.reachable.insert(func);
        self.worklist.push_back(func);
        true
    }

    /// Records the edge first, then makes the callee reachable.
    pub(crate) fn add_call_edge(&mut self, callsite: BaseCallSite, callee: FuncId, kind: CallType) {
        if self.options.build_call_graph {
            self.call_graph.add_edge(callsite, callsite.func, callee, kind);
        }
        self.add_reachable(callee);
    }

    pub(crate) fn add_static_callsite(&mut self, callsite: BaseCallSite, callee: FuncId, kind: CallType) {
        self.num_static_callsites += 1;
        self.add_call_edge(callsite, callee, kind);
    }

    pub(crate) fn add_dyn_callsite(&mut self, callsite: BaseCallSite, key: DispatchKey, kind: CallType) {
        self.num_dyn_callsites += 1;
        if self.options.build_call_graph {
            self.call_graph.set_callsite_type(callsite, kind);
        }
        let resolutions = self
            .registry
            .register(key, callsite, &self.tracker, &mut self.resolver);
        self.apply_resolutions(resolutions);
    }

    pub(crate) fn observe_type(&mut self, ty: TypeId) {
        if !self.tracker.observe(Observation::Instantiated(ty)) {
            return;
        }
        debug!("New runtime type: {}", self.program.type_name(ty));
        let resolutions = self.registry.resolve_new_type(ty, &mut self.resolver);
        self.apply_resolutions(resolutions);

        if self.options.reflection {
            // Exported methods may be called reflectively.
            for method in self.resolver.exported_methods(ty) {
                if self.add_reachable(method) {
                    debug!("Method {} reachable via reflection", self.program.func_name(method));
                }
            }
        }
    }

    pub(crate) fn observe_func_value(&mut self, func: FuncId) {
        if !self.tracker.observe(Observation::AddressTaken(func)) {
            return;
        }
        debug!("Address taken: {}", self.program.func_name(func));
        let sig = self.program.function(func).signature;
        let resolutions = self.registry.resolve_new_func(func, sig);
        self.apply_resolutions(resolutions);
    }

    fn apply_resolutions(&mut self, resolutions: Vec<Resolution>) {
        for Resolution { callsite, callee, kind } in resolutions {
            self.add_call_edge(callsite, callee, kind);
        }
    }

    fn finish(self, roots: Vec<FuncId>) -> RtaResult {
        debug_assert!(self.states.iter().all(|s| *s != FuncState::Queued));
        let stats = AnalysisStats {
            num_processed: self.states.iter().filter(|s| **s == FuncState::Processed).count(),
            num_static_callsites: self.num_static_callsites,
            num_dyn_callsites: self.num_dyn_callsites,
            num_registered_callsites: self.registry.num_registered(),
            num_implements_queries: self.resolver.num_queries,
            num_implements_cache_hits: self.resolver.num_cache_hits,
        };
        let (runtime_types, address_taken) = self.tracker.into_sets();
        RtaResult {
            reachable: self.reachable,
            runtime_types,
            address_taken,
            call_graph: self.call_graph,
            roots,
            stats,
            analysis_time: self.analysis_time,
        }
    }
}
