// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

use rta_cg::model::loader::{load_program, ProgramDesc};
use rta_cg::model::{BaseCallSite, CallSite, CallType, DispatchKey, Program, ProgramBuilder, Signature, TypeKind};
use rta_cg::rta::entry_points::select_roots;
use rta_cg::rta::method_sets::MethodSetResolver;
use rta_cg::rta::{
    AnalysisError, CancellationToken, RapidTypeAnalysis, RootSet, RtaOptions, RtaResult, RuntimeType,
};
use rta_cg::util::options::AnalysisOptions;
use rta_cg::util::results_dumper::results_listing;

const FIXTURES: [&str; 4] = ["iface", "func_values", "recursion", "embedding"];

fn fixture_path(name: &str, ext: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(format!("{}.{}", name, ext))
}

fn analyze(program: &Program) -> RtaResult {
    let roots = select_roots(program, &AnalysisOptions::default()).unwrap();
    RapidTypeAnalysis::new(program, RtaOptions::default())
        .analyze(&roots)
        .unwrap()
}

fn reachable_names(program: &Program, result: &RtaResult) -> BTreeSet<String> {
    result.reachable().map(|f| program.func_name(f).to_string()).collect()
}

fn runtime_type_names(program: &Program, result: &RtaResult) -> BTreeSet<String> {
    result.runtime_types().map(|rt| rt.name(program).to_string()).collect()
}

#[test]
fn golden_listings() {
    for name in FIXTURES {
        let program = load_program(&fixture_path(name, "json")).unwrap();
        let expected = std::fs::read_to_string(fixture_path(name, "golden")).unwrap();
        let result = analyze(&program);
        assert_eq!(results_listing(&program, &result), expected, "fixture `{}`", name);
    }
}

/// Reverses every ordered list of a fixture: functions, types, call sites and
/// instantiation sites.
fn reversed(name: &str) -> Program {
    let json = std::fs::read_to_string(fixture_path(name, "json")).unwrap();
    let mut desc = ProgramDesc::from_json(&json).unwrap();
    desc.functions.reverse();
    for func in &mut desc.functions {
        func.calls.reverse();
        func.instantiates.reverse();
    }
    desc.types.reverse();
    desc.interfaces.reverse();
    desc.into_program().unwrap()
}

#[test]
fn scan_order_does_not_change_the_results() {
    for name in FIXTURES {
        let program = load_program(&fixture_path(name, "json")).unwrap();
        let shuffled = reversed(name);
        let expected = results_listing(&program, &analyze(&program));
        assert_eq!(results_listing(&shuffled, &analyze(&shuffled)), expected, "fixture `{}`", name);
    }
}

#[test]
fn runs_are_deterministic() {
    let program = load_program(&fixture_path("iface", "json")).unwrap();
    let first = results_listing(&program, &analyze(&program));
    for _ in 0..3 {
        assert_eq!(results_listing(&program, &analyze(&program)), first);
    }
}

#[test]
fn static_calls_of_reachable_functions_are_sound() {
    for name in FIXTURES {
        let program = load_program(&fixture_path(name, "json")).unwrap();
        let result = analyze(&program);
        let cg = result.call_graph();
        for caller in result.reachable() {
            for site in &program.function(caller).call_sites {
                if let CallSite::Static { callee, method } = *site {
                    let kind = if method { CallType::StaticMethod } else { CallType::StaticFunction };
                    assert!(result.is_reachable(callee));
                    assert!(cg.has_edge(caller, callee, kind));
                }
            }
        }
    }
}

#[test]
fn dynamic_calls_of_reachable_functions_are_sound() {
    for name in FIXTURES {
        let program = load_program(&fixture_path(name, "json")).unwrap();
        let result = analyze(&program);
        let cg = result.call_graph();
        let mut resolver = MethodSetResolver::new(&program);
        for caller in result.reachable() {
            for site in &program.function(caller).call_sites {
                match site.dispatch_key() {
                    Some(DispatchKey::Invoke { interface, method }) => {
                        for ty in result.instantiated_types() {
                            if let Some(callee) = resolver.method_of(ty, interface, method) {
                                assert!(result.is_reachable(callee));
                                assert!(cg.has_edge(caller, callee, CallType::DynamicMethod));
                            }
                        }
                    }
                    Some(DispatchKey::Signature(sig)) => {
                        for callee in result.address_taken_funcs() {
                            if program.function(callee).signature == sig {
                                assert!(result.is_reachable(callee));
                                assert!(cg.has_edge(caller, callee, CallType::DynamicFunction));
                            }
                        }
                    }
                    None => {}
                }
            }
        }
    }
}

#[test]
fn unreachable_functions_have_no_edges() {
    for name in FIXTURES {
        let program = load_program(&fixture_path(name, "json")).unwrap();
        let result = analyze(&program);
        for (func, _) in program.functions() {
            if !result.is_reachable(func) {
                assert!(result.call_graph().callers_of(func).is_empty());
                assert!(result.call_graph().callees_of(func).is_empty());
            }
        }
        // Every edge starts at a reachable caller and ends at a reachable callee.
        for (caller, callee, _) in result.call_graph().edges() {
            assert!(result.is_reachable(caller) && result.is_reachable(callee));
        }
    }
}

/// The interface scenario, optionally with an extra function called from `main`
/// that instantiates one more implementation.
fn growing_program(extended: bool) -> Program {
    let mut b = ProgramBuilder::new();
    let main = b.add_function("main", Signature::nullary());
    let a_f = b.add_function("A.F", Signature::nullary());
    let a = b.add_type("A", TypeKind::Struct);
    b.add_method(a, "F", a_f);
    let e_f = b.add_function("E.F", Signature::nullary());
    let e = b.add_type("E", TypeKind::Struct);
    b.add_method(e, "F", e_f);
    let iface = b.add_interface("I", vec![("F", Signature::nullary())]);
    b.instantiate(main, a).invoke(main, iface, "F").add_root(main);
    if extended {
        let more = b.add_function("more", Signature::nullary());
        b.instantiate(more, e).static_call(main, more);
    }
    b.build().unwrap()
}

#[test]
fn results_grow_monotonically_with_the_program() {
    let small = growing_program(false);
    let large = growing_program(true);
    let small_result = analyze(&small);
    let large_result = analyze(&large);

    let small_reachable = reachable_names(&small, &small_result);
    let large_reachable = reachable_names(&large, &large_result);
    assert!(small_reachable.is_subset(&large_reachable));
    assert!(large_reachable.contains("E.F"));
    assert!(!small_reachable.contains("E.F"));

    assert!(runtime_type_names(&small, &small_result).is_subset(&runtime_type_names(&large, &large_result)));
}

#[test]
fn repeated_sites_produce_one_edge() {
    let mut b = ProgramBuilder::new();
    let main = b.add_function("main", Signature::nullary());
    let t_f = b.add_function("T.F", Signature::nullary());
    let t = b.add_type("T", TypeKind::Named);
    b.add_method(t, "F", t_f);
    let iface = b.add_interface("I", vec![("F", Signature::nullary())]);
    b.instantiate(main, t)
        .instantiate(main, t)
        .invoke(main, iface, "F")
        .invoke(main, iface, "F");
    let program = b.build().unwrap();

    let result = RapidTypeAnalysis::new(&program, RtaOptions::default())
        .analyze(&RootSet::Explicit(vec![main, main]))
        .unwrap();
    assert_eq!(result.roots(), &[main]);
    assert_eq!(result.call_graph().edges(), vec![(main, t_f, CallType::DynamicMethod)]);
    for ordinal in 0..2 {
        let site = BaseCallSite::new(main, ordinal);
        assert_eq!(result.call_graph().get_callees(&site), HashSet::from([t_f]));
    }
    assert_eq!(result.runtime_types().collect::<Vec<_>>(), vec![RuntimeType::Type(t)]);
    assert_eq!(result.stats().num_dyn_callsites, 2);
    assert_eq!(result.stats().num_registered_callsites, 2);
}

#[test]
fn late_instantiation_resolves_earlier_invoke() {
    // `main` registers the invoke before `make` is ever scanned.
    let mut b = ProgramBuilder::new();
    let main = b.add_function("main", Signature::nullary());
    let make = b.add_function("make", Signature::nullary());
    let t_f = b.add_function("T.F", Signature::nullary());
    let t = b.add_type("T", TypeKind::Named);
    b.add_method(t, "F", t_f);
    let iface = b.add_interface("I", vec![("F", Signature::nullary())]);
    b.invoke(main, iface, "F").static_call(main, make).instantiate(make, t);
    let program = b.build().unwrap();

    let result = RapidTypeAnalysis::new(&program, RtaOptions::default())
        .analyze(&RootSet::Explicit(vec![main]))
        .unwrap();
    assert!(result.is_reachable(t_f));
    assert!(result.call_graph().has_edge(main, t_f, CallType::DynamicMethod));
}

#[test]
fn exported_api_roots() {
    let mut b = ProgramBuilder::new();
    let api = b.add_function("Api", Signature::nullary());
    let internal = b.add_function("internal", Signature::nullary());
    let unused = b.add_function("unused", Signature::nullary());
    b.set_exported(api, true).static_call(api, internal);
    let program = b.build().unwrap();

    let result = RapidTypeAnalysis::new(&program, RtaOptions::default())
        .analyze(&RootSet::ExportedApi)
        .unwrap();
    assert_eq!(result.roots(), &[api]);
    assert!(result.is_reachable(internal));
    assert!(!result.is_reachable(unused));
}

#[test]
fn cancelled_run_returns_no_result() {
    let program = load_program(&fixture_path("iface", "json")).unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let roots = RootSet::Explicit(vec![program.func_id("main").unwrap()]);
    let outcome = RapidTypeAnalysis::new(&program, RtaOptions::default())
        .with_cancellation(token)
        .analyze(&roots);
    assert!(matches!(outcome, Err(AnalysisError::Cancelled)));
}

#[test]
fn unknown_root_fails_fast() {
    let program = load_program(&fixture_path("recursion", "json")).unwrap();
    let bogus = rta_cg::model::FuncId::from_usize(program.num_functions() + 3);
    let outcome = RapidTypeAnalysis::new(&program, RtaOptions::default()).analyze(&RootSet::Explicit(vec![bogus]));
    assert!(matches!(outcome, Err(AnalysisError::UnknownRoot(f)) if f == bogus));
}

#[test]
fn frozen_result_is_shared_between_threads() {
    let program = load_program(&fixture_path("iface", "json")).unwrap();
    let result = analyze(&program);
    let expected = results_listing(&program, &result);
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| results_listing(&program, &result)))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn independent_runs_over_one_program() {
    let program = load_program(&fixture_path("func_values", "json")).unwrap();
    let main = program.func_id("main").unwrap();
    let setup = program.func_id("setup").unwrap();
    let from_main = RapidTypeAnalysis::new(&program, RtaOptions::default())
        .analyze(&RootSet::Explicit(vec![main]))
        .unwrap();
    let from_setup = RapidTypeAnalysis::new(&program, RtaOptions::default())
        .analyze(&RootSet::Explicit(vec![setup]))
        .unwrap();
    assert!(from_main.is_reachable(program.func_id("late").unwrap()));
    // `late` has its address taken but nothing calls through it.
    assert!(!from_setup.is_reachable(program.func_id("late").unwrap()));
    assert!(from_setup.is_address_taken(program.func_id("late").unwrap()));
}
