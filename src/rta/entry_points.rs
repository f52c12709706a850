// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Root selection from the analysis options.

use log::*;
use regex::Regex;

use crate::model::{FuncId, Program};
use crate::util::options::AnalysisOptions;

use super::{AnalysisError, RootSet};

const DEFAULT_ENTRY: &str = "main";

/// Chooses the root set of a run.
///
/// `--exported-api` wins over everything else. Otherwise the roots are the named
/// entry functions together with every function matching the entry pattern. With
/// neither given, the program's declared roots are used, then a function named
/// `main`.
pub fn select_roots(program: &Program, options: &AnalysisOptions) -> Result<RootSet, AnalysisError> {
    if options.exported_api {
        info!("Analyzing from the exported API");
        return Ok(RootSet::ExportedApi);
    }

    let mut roots = Vec::new();
    for name in &options.entry_funcs {
        roots.push(lookup(program, name)?);
    }
    if let Some(pattern) = &options.entry_regex {
        let re = Regex::new(pattern)?;
        let matched: Vec<FuncId> = program
            .functions()
            .filter(|(_, f)| re.is_match(&f.name))
            .map(|(id, _)| id)
            .collect();
        if matched.is_empty() {
            return Err(AnalysisError::NoEntryMatched(pattern.clone()));
        }
        debug!("Entry pattern `{}` matched {} function(s)", pattern, matched.len());
        roots.extend(matched);
    }

    if roots.is_empty() {
        if program.declared_roots().is_empty() {
            roots.push(lookup(program, DEFAULT_ENTRY)?);
        } else {
            roots.extend_from_slice(program.declared_roots());
        }
    }
    roots.sort_unstable();
    roots.dedup();
    Ok(RootSet::Explicit(roots))
}

fn lookup(program: &Program, name: &str) -> Result<FuncId, AnalysisError> {
    program
        .func_id(name)
        .ok_or_else(|| AnalysisError::UnknownEntry(name.to_string()))
}
