// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DefaultIx, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::{Direction, Graph};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::model::{BaseCallSite, CallType, FuncId, Program};

/// Unique identifiers for call graph nodes.
pub type CGNodeId = NodeIndex<DefaultIx>;
/// Unique identifiers for call graph edges.
pub type CGEdgeId = EdgeIndex<DefaultIx>;

#[derive(Debug)]
pub struct CallGraphNode {
    pub(crate) func: FuncId,
}

#[derive(Debug)]
pub struct CallGraphEdge {
    pub(crate) callsite: BaseCallSite,
    pub(crate) kind: CallType,
}

impl CallGraphEdge {
    pub fn callsite(&self) -> BaseCallSite {
        self.callsite
    }

    pub fn kind(&self) -> CallType {
        self.kind
    }
}

/// Call graph stored as an index arena: nodes are functions, edges are index pairs
/// tagged with the call kind, so recursion never creates reference cycles.
#[derive(Debug, Default)]
pub struct CallGraph {
    /// The graph structure capturing call relationships.
    pub graph: Graph<CallGraphNode, CallGraphEdge>,
    /// A map from functions to their corresponding call graph nodes.
    pub func_nodes: HashMap<FuncId, CGNodeId>,
    /// A map from call sites to call graph edges.
    pub callsite_to_edges: HashMap<BaseCallSite, HashSet<CGEdgeId>>,
    /// Record the type of each call.
    pub(crate) callsite_to_type: HashMap<BaseCallSite, CallType>,
    /// Edges already present, keyed by (caller, callee, kind).
    edge_keys: HashMap<(FuncId, FuncId, CallType), CGEdgeId>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the call graph if it is not there yet.
    pub fn add_node(&mut self, func: FuncId) -> CGNodeId {
        match self.func_nodes.entry(func) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => *v.insert(self.graph.add_node(CallGraphNode { func })),
        }
    }

    pub fn set_callsite_type(&mut self, callsite: BaseCallSite, call_type: CallType) {
        self.callsite_to_type.insert(callsite, call_type);
    }

    pub fn get_callsite_type(&self, callsite: &BaseCallSite) -> Option<CallType> {
        self.callsite_to_type.get(callsite).copied()
    }

    /// Returns all the functions called from `callsite`.
    pub fn get_callees(&self, callsite: &BaseCallSite) -> HashSet<FuncId> {
        self.callsite_to_edges
            .get(callsite)
            .map(|edges| {
                edges
                    .iter()
                    .filter_map(|edge_id| self.graph.edge_endpoints(*edge_id))
                    .map(|(_, target)| self.graph[target].func)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_edge(&self, caller: FuncId, callee: FuncId, kind: CallType) -> bool {
        self.edge_keys.contains_key(&(caller, callee, kind))
    }

    /// Adds a call from `caller` to `callee` found at `callsite`.
    /// Returns false if an edge with the same caller, callee and kind already existed,
    /// in which case `callsite` is mapped to that edge.
    pub fn add_edge(&mut self, callsite: BaseCallSite, caller: FuncId, callee: FuncId, kind: CallType) -> bool {
        debug_assert_eq!(callsite.func, caller);
        self.set_callsite_type(callsite, kind);
        let (edge_id, is_new) = match self.edge_keys.get(&(caller, callee, kind)) {
            Some(edge_id) => (*edge_id, false),
            None => {
                let caller_node = self.add_node(caller);
                let callee_node = self.add_node(callee);
                let edge_id = self.graph.add_edge(caller_node, callee_node, CallGraphEdge { callsite, kind });
                self.edge_keys.insert((caller, callee, kind), edge_id);
                (edge_id, true)
            }
        };
        self.callsite_to_edges.entry(callsite).or_default().insert(edge_id);
        is_new
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All edges as sorted `(caller, callee, kind)` triples.
    pub fn edges(&self) -> Vec<(FuncId, FuncId, CallType)> {
        let mut edges: Vec<_> = self.edge_keys.keys().copied().collect();
        edges.sort_unstable();
        edges
    }

    /// Direct callees of `func`, sorted and deduplicated.
    pub fn callees_of(&self, func: FuncId) -> Vec<(FuncId, CallType)> {
        self.neighbors(func, Direction::Outgoing)
    }

    /// Direct callers of `func`, sorted and deduplicated.
    pub fn callers_of(&self, func: FuncId) -> Vec<(FuncId, CallType)> {
        self.neighbors(func, Direction::Incoming)
    }

    fn neighbors(&self, func: FuncId, dir: Direction) -> Vec<(FuncId, CallType)> {
        let Some(node) = self.func_nodes.get(&func) else {
            return Vec::new();
        };
        let mut result: Vec<_> = self
            .graph
            .edges_directed(*node, dir)
            .map(|e| {
                let other = match dir {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (self.graph[other].func, e.weight().kind)
            })
            .collect();
        result.sort_unstable();
        result.dedup();
        result
    }

    /// Produce a dot representation of the call graph for displaying with Graphviz.
    pub fn to_dot(&self, program: &Program) -> String {
        format!(
            "{:?}",
            Dot::with_attr_getters(
                &self.graph,
                &[Config::NodeNoLabel, Config::EdgeNoLabel],
                &|_, edge| {
                    let weight = edge.weight();
                    let style = if weight.kind.is_dynamic() { "dashed" } else { "solid" };
                    format!("label = {:?}, style = {}", weight.kind.as_str(), style)
                },
                &|_, (_, node)| format!("label = {:?}", program.func_name(node.func)),
            )
        )
    }
}
