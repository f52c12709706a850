// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Context;
use itertools::Itertools;
use log::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::model::Program;
use crate::rta::RtaResult;
use crate::util::call_graph_stat;
use crate::util::options::AnalysisOptions;

/// Writes every dump requested by `options`.
pub fn dump_results(program: &Program, result: &RtaResult, options: &AnalysisOptions) -> anyhow::Result<()> {
    let listing = results_listing(program, result);
    match options.results_output.as_deref() {
        None | Some("stdout") => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            out.write_all(listing.as_bytes())?;
            out.flush()?;
        }
        Some(path) => {
            info!("Dumping results listing...");
            std::fs::write(path, listing).with_context(|| format!("failed to write results to {}", path))?;
        }
    }

    // dump call graph
    if let Some(cg_output) = &options.call_graph_output {
        info!("Dumping call graph...");
        dump_call_graph(program, result, Path::new(cg_output))?;
    }

    if options.dump_stats {
        let stderr = io::stderr();
        let mut stat_writer = BufWriter::new(stderr.lock());
        call_graph_stat::call_graph_stat(program, result, &mut stat_writer)?;
        stat_writer.flush()?;
    }
    Ok(())
}

/// The sorted textual form of a result, one fact per line.
///
/// Categories come in a fixed order (edges, reachable, unreachable, runtime types,
/// types never instantiated), and lines are sorted within each category, so the
/// listing does not depend on discovery order.
pub fn results_listing(program: &Program, result: &RtaResult) -> String {
    let edges = result
        .call_graph()
        .edges()
        .into_iter()
        .map(|(caller, callee, kind)| {
            format!(
                "edge {} --{}--> {}",
                program.func_name(caller),
                kind,
                program.func_name(callee)
            )
        })
        .sorted();

    let (reachable, unreachable): (Vec<_>, Vec<_>) = program
        .functions()
        .partition(|(id, _)| result.is_reachable(*id));
    let reachable = reachable.into_iter().map(|(_, f)| format!("reachable {}", f.name)).sorted();
    let unreachable = unreachable
        .into_iter()
        .map(|(_, f)| format!("!reachable {}", f.name))
        .sorted();

    let rtypes = result
        .runtime_types()
        .map(|rt| format!("rtype {}", rt.name(program)))
        .sorted();
    let not_rtypes = program
        .concrete_types()
        .filter(|(id, _)| !result.is_instantiated(*id))
        .map(|(_, t)| format!("!rtype {}", t.name))
        .sorted();

    let mut listing = String::new();
    for line in edges
        .chain(reachable)
        .chain(unreachable)
        .chain(rtypes)
        .chain(not_rtypes)
    {
        listing.push_str(&line);
        listing.push('\n');
    }
    listing
}

pub fn dump_call_graph(program: &Program, result: &RtaResult, dot_path: &Path) -> anyhow::Result<()> {
    let file = File::create(dot_path).with_context(|| format!("failed to create {}", dot_path.display()))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(result.call_graph().to_dot(program).as_bytes())?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProgramBuilder, Signature, TypeKind};
    use crate::rta::{RapidTypeAnalysis, RootSet, RtaOptions};

    #[test]
    fn listing_is_grouped_and_sorted() {
        let mut b = ProgramBuilder::new();
        let main = b.add_function("main", Signature::nullary());
        let zeta = b.add_function("zeta", Signature::nullary());
        let alpha = b.add_function("alpha", Signature::nullary());
        b.add_function("dead", Signature::nullary());
        let cb = b.add_function("cb", Signature::nullary());
        let t = b.add_type("T", TypeKind::Named);
        b.add_type("U", TypeKind::Struct);
        b.static_call(main, zeta)
            .static_call(main, alpha)
            .instantiate(main, t)
            .take_address(main, cb);
        let program = b.build().unwrap();
        let result = RapidTypeAnalysis::new(&program, RtaOptions::default())
            .analyze(&RootSet::Explicit(vec![main]))
            .unwrap();

        let expected = "\
edge main --static function call--> alpha
edge main --static function call--> zeta
reachable alpha
reachable main
reachable zeta
!reachable cb
!reachable dead
rtype T
rtype cb
!rtype U
";
        assert_eq!(results_listing(&program, &result), expected);
    }

    #[test]
    fn call_graph_dumps_as_dot() {
        let mut b = ProgramBuilder::new();
        let main = b.add_function("main", Signature::nullary());
        let helper = b.add_function("helper", Signature::nullary());
        b.static_call(main, helper);
        let program = b.build().unwrap();
        let result = RapidTypeAnalysis::new(&program, RtaOptions::default())
            .analyze(&RootSet::Explicit(vec![main]))
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cg.dot");
        dump_call_graph(&program, &result, &path).unwrap();
        let dot = std::fs::read_to_string(&path).unwrap();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("label = \"main\""));
        assert!(dot.contains("label = \"static function call\", style = solid"));
    }
}
