// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Analysis options.

use std::path::PathBuf;

use clap::{Arg, Command};

const RTA_USAGE: &str = r#"rta [OPTIONS] INPUT"#;

/// Creates the clap::Command metadata for argument parsing.
fn make_options_parser() -> Command<'static> {
    Command::new("rta")
        .no_binary_name(true)
        .override_usage(RTA_USAGE)
        .version(env!("CARGO_PKG_VERSION"))
        .arg(Arg::new("entry-func-name")
            .long("entry-func")
            .takes_value(true)
            .multiple_occurrences(true)
            .help("The name of an entry function from which the analysis begins.")
            .long_help("May be given several times. Without any entry option the roots declared \
                by the program are used, or else the function named `main`."))
        .arg(Arg::new("entry-regex")
            .long("entry-regex")
            .takes_value(true)
            .help("Use every function whose name matches the regular expression as an entry."))
        .arg(Arg::new("exported-api")
            .long("exported-api")
            .takes_value(false)
            .help("Analyze from every exported function of the program."))
        .arg(Arg::new("reflection")
            .long("reflection")
            .takes_value(false)
            .help("Treat the exported methods of every runtime type as reachable."))
        .arg(Arg::new("no-call-graph")
            .long("no-call-graph")
            .takes_value(false)
            .help("Only compute reachability, do not record call graph edges."))
        .arg(Arg::new("results-output")
            .long("output")
            .short('o')
            .takes_value(true)
            .help("Write the sorted results listing to this file, or to `stdout` (default)."))
        .arg(Arg::new("call-graph-output")
            .long("dump-call-graph")
            .takes_value(true)
            .help("Dump the call graph in DOT format to the output file."))
        .arg(Arg::new("dump-stats")
            .long("dump-stats")
            .takes_value(false)
            .help("Dump the statistics of the analysis results."))
        .arg(Arg::new("INPUT")
            .value_parser(clap::value_parser!(PathBuf))
            .help("The program to be analyzed, in JSON form."))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub input: Option<PathBuf>,
    pub entry_funcs: Vec<String>,
    pub entry_regex: Option<String>,
    pub exported_api: bool,
    pub reflection: bool,
    pub build_call_graph: bool,

    pub dump_stats: bool,
    pub results_output: Option<String>,
    pub call_graph_output: Option<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            input: None,
            entry_funcs: Vec::new(),
            entry_regex: None,
            exported_api: false,
            reflection: false,
            build_call_graph: true,
            dump_stats: false,
            results_output: None,
            call_graph_output: None,
        }
    }
}

impl AnalysisOptions {
    /// Parses options from a list of strings, without the binary name.
    ///
    /// Only the options present in `args` are updated, so a second call overrides the
    /// options set by the first one.
    pub fn parse_from_args(&mut self, args: &[String]) -> Result<(), clap::Error> {
        let matches = make_options_parser().try_get_matches_from(args.iter())?;

        if let Some(input) = matches.get_one::<PathBuf>("INPUT") {
            self.input = Some(input.clone());
        }
        if let Some(names) = matches.get_many::<String>("entry-func-name") {
            self.entry_funcs = names.cloned().collect();
        }
        if let Some(re) = matches.get_one::<String>("entry-regex") {
            self.entry_regex = Some(re.clone());
        }

        self.exported_api |= matches.contains_id("exported-api");
        self.reflection |= matches.contains_id("reflection");
        if matches.contains_id("no-call-graph") {
            self.build_call_graph = false;
        }
        self.dump_stats |= matches.contains_id("dump-stats");

        if let Some(path) = matches.get_one::<String>("results-output") {
            self.results_output = Some(path.clone());
        }
        if let Some(path) = matches.get_one::<String>("call-graph-output") {
            self.call_graph_output = Some(path.clone());
        }
        Ok(())
    }

    /// Parses the JSON array of strings held by an environment variable such as `RTA_FLAGS`.
    pub fn parse_from_env_value(&mut self, value: &str) -> Result<(), clap::Error> {
        let args: Vec<String> = serde_json::from_str(value).unwrap_or_default();
        self.parse_from_args(&args)
    }
}
