// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::io::{self, Write};

use crate::model::{CallType, Program};
use crate::rta::RtaResult;

pub fn call_graph_stat<W: Write>(program: &Program, result: &RtaResult, stat_writer: &mut W) -> io::Result<()> {
    let call_graph = result.call_graph();
    let stats = result.stats();

    let mut num_resolved_calls = [0usize; 4];
    let mut num_call_edges = [0usize; 4];
    for (callsite, call_edges) in &call_graph.callsite_to_edges {
        if let Some(kind) = call_graph.get_callsite_type(callsite) {
            num_resolved_calls[kind as usize] += 1;
            num_call_edges[kind as usize] += call_edges.len();
        }
    }
    // Dynamic call sites that never met a matching candidate.
    let num_unresolved_calls = call_graph
        .callsite_to_type
        .iter()
        .filter(|(callsite, kind)| kind.is_dynamic() && !call_graph.callsite_to_edges.contains_key(*callsite))
        .count();

    let num_types = result.instantiated_types().count();
    let num_addr_taken = result.address_taken_funcs().count();

    writeln!(stat_writer, "Call Graph Statistics: ")?;
    writeln!(stat_writer, "#Functions: {}", program.num_functions())?;
    writeln!(stat_writer, "#Roots: {}", result.roots().len())?;
    writeln!(stat_writer, "#Reachable functions: {}", result.num_reachable())?;
    writeln!(stat_writer, "#Processed functions: {}", stats.num_processed)?;
    writeln!(stat_writer, "#Call graph edges: {}", call_graph.edge_count())?;
    writeln!(stat_writer, "#Static call sites: {}", stats.num_static_callsites)?;
    writeln!(stat_writer, "#Dynamic call sites: {}", stats.num_dyn_callsites)?;
    for kind in CallType::ALL {
        writeln!(
            stat_writer,
            "\t#Resolved {}s: {}, #call graph edges: {}",
            kind,
            num_resolved_calls[kind as usize],
            num_call_edges[kind as usize]
        )?;
    }
    writeln!(stat_writer, "\t#Unresolved dynamic calls: {}", num_unresolved_calls)?;
    writeln!(
        stat_writer,
        "#Runtime types: {} ({} concrete types, {} address-taken functions)",
        num_types + num_addr_taken,
        num_types,
        num_addr_taken
    )?;
    writeln!(
        stat_writer,
        "#Implements queries: {}, #cache hits: {}",
        stats.num_implements_queries, stats.num_implements_cache_hits
    )?;
    writeln!(
        stat_writer,
        "Analysis time: {}",
        humantime::format_duration(result.analysis_time())
    )?;
    Ok(())
}
