// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Rapid Type Analysis.
//!
//! Reachable functions and instantiated types are discovered together: a function
//! is scanned once when it first becomes reachable, and dynamic call sites are
//! resolved against the concrete types and function values observed so far, or
//! observed later, by the dispatch registry.

pub mod body_visitor;
pub mod entry_points;
pub mod method_sets;
pub mod registry;
pub mod rta;
pub mod tracker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::graph::call_graph::CallGraph;
use crate::model::{FuncId, Program, TypeId};
use crate::util::bit_vec::BitVec;
use crate::util::options::AnalysisOptions;

pub use self::rta::RapidTypeAnalysis;

/// The functions the analysis starts from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RootSet {
    Explicit(Vec<FuncId>),
    /// Every exported function of the program.
    ExportedApi,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RtaOptions {
    /// Record call graph edges. When off, only reachability is computed.
    pub build_call_graph: bool,
    /// Treat the exported methods of every runtime type as reachable.
    pub reflection: bool,
}

impl Default for RtaOptions {
    fn default() -> Self {
        RtaOptions {
            build_call_graph: true,
            reflection: false,
        }
    }
}

impl From<&AnalysisOptions> for RtaOptions {
    fn from(options: &AnalysisOptions) -> Self {
        RtaOptions {
            build_call_graph: options.build_call_graph,
            reflection: options.reflection,
        }
    }
}

/// A shared flag for abandoning a long-running analysis from another thread.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("analysis cancelled")]
    Cancelled,
    #[error("root {0:?} is not a function of the program")]
    UnknownRoot(FuncId),
    #[error("entry function `{0}` not found")]
    UnknownEntry(String),
    #[error("no function matches entry pattern `{0}`")]
    NoEntryMatched(String),
    #[error("invalid entry pattern")]
    InvalidEntryPattern(#[from] regex::Error),
}

/// An element of the runtime-type set.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum RuntimeType {
    /// An instantiated concrete type.
    Type(TypeId),
    /// A function whose address was taken.
    Func(FuncId),
}

impl RuntimeType {
    pub fn name(self, program: &Program) -> &str {
        match self {
            RuntimeType::Type(ty) => program.type_name(ty),
            RuntimeType::Func(func) => program.func_name(func),
        }
    }
}

/// Counters collected during a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnalysisStats {
    pub num_processed: usize,
    pub num_static_callsites: usize,
    pub num_dyn_callsites: usize,
    pub num_registered_callsites: usize,
    pub num_implements_queries: usize,
    pub num_implements_cache_hits: usize,
}

/// The frozen outcome of a run.
#[derive(Debug)]
pub struct RtaResult {
    pub(crate) reachable: BitVec<FuncId>,
    pub(crate) runtime_types: BitVec<TypeId>,
    pub(crate) address_taken: BitVec<FuncId>,
    pub(crate) call_graph: CallGraph,
    pub(crate) roots: Vec<FuncId>,
    pub(crate) stats: AnalysisStats,
    pub(crate) analysis_time: Duration,
}

impl RtaResult {
    /// Reachable functions in index order.
    pub fn reachable(&self) -> impl Iterator<Item = FuncId> + '_ {
        self.reachable.iter()
    }

    #[inline]
    pub fn is_reachable(&self, func: FuncId) -> bool {
        self.reachable.contains(func)
    }

    pub fn num_reachable(&self) -> usize {
        self.reachable.count()
    }

    /// Instantiated types followed by address-taken functions.
    pub fn runtime_types(&self) -> impl Iterator<Item = RuntimeType> + '_ {
        self.runtime_types
            .iter()
            .map(RuntimeType::Type)
            .chain(self.address_taken.iter().map(RuntimeType::Func))
    }

    pub fn instantiated_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.runtime_types.iter()
    }

    #[inline]
    pub fn is_instantiated(&self, ty: TypeId) -> bool {
        self.runtime_types.contains(ty)
    }

    pub fn address_taken_funcs(&self) -> impl Iterator<Item = FuncId> + '_ {
        self.address_taken.iter()
    }

    #[inline]
    pub fn is_address_taken(&self, func: FuncId) -> bool {
        self.address_taken.contains(func)
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    /// The deduplicated roots the run started from.
    pub fn roots(&self) -> &[FuncId] {
        &self.roots
    }

    pub fn stats(&self) -> &AnalysisStats {
        &self.stats
    }

    pub fn analysis_time(&self) -> Duration {
        self.analysis_time
    }
}
