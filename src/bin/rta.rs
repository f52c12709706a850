// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The main routine of `rta`.
//!
//! Loads a program description, runs Rapid Type Analysis from the selected roots and
//! dumps the results.

use anyhow::{anyhow, Context};
use log::*;
use std::env;

use rta_cg::model::loader::load_program;
use rta_cg::rta::entry_points::select_roots;
use rta_cg::rta::{RapidTypeAnalysis, RtaOptions};
use rta_cg::util::options::AnalysisOptions;
use rta_cg::util::results_dumper;

fn main() {
    // Initialize loggers.
    if env::var("RTA_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("RTA_LOG")
            .write_style("RTA_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    // Get any options specified via the RTA_FLAGS environment variable
    let mut options = AnalysisOptions::default();
    let rta_flags = env::var("RTA_FLAGS").unwrap_or_default();
    if let Err(e) = options.parse_from_env_value(&rta_flags) {
        e.exit();
    }

    // Let arguments supplied on the command line override the environment variable.
    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(e) = options.parse_from_args(&args) {
        e.exit();
    }
    info!("RTA Options: {:?}", options);

    let exit_code = match run(&options) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {:#}", e);
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(options: &AnalysisOptions) -> anyhow::Result<()> {
    let input = options
        .input
        .as_ref()
        .ok_or_else(|| anyhow!("no input program given"))?;
    let program = load_program(input)?;
    debug!(
        "Loaded {} functions, {} types, {} interfaces",
        program.num_functions(),
        program.num_types(),
        program.num_interfaces()
    );

    let roots = select_roots(&program, options).context("failed to select the analysis roots")?;
    let result = RapidTypeAnalysis::new(&program, RtaOptions::from(options)).analyze(&roots)?;
    results_dumper::dump_results(&program, &result, options)
}
