// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run-level configuration shared by every executor backend.

use crate::error::WorkflowError;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `jobid -> line -> (source file, source line)` lookup used to attribute
/// a rule exception back to the snakefile location that defined the rule,
/// mirroring the Python `linemaps` dict walked by `get_exception_origin`
/// (original source, `executors.py` lines 728-732).
#[derive(Debug, Clone, Default)]
pub struct LineMaps {
    maps: HashMap<PathBuf, BTreeMap<u32, (PathBuf, u32)>>,
}

impl LineMaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: PathBuf, line: u32, origin: (PathBuf, u32)) {
        self.maps.entry(file).or_default().insert(line, origin);
    }

    /// Resolve `(file, line)` to the original rule definition site, if
    /// this file has a recorded mapping.
    pub fn locate(&self, file: &Path, line: u32) -> Option<(PathBuf, u32)> {
        self.maps.get(file)?.get(&line).cloned()
    }
}

/// Configuration surface for every executor backend: engine binary path,
/// snakefile and workdir overrides, job-script template, and shared
/// timing knobs. Built with [`WorkflowConfig`] rather than a dedicated
/// config-file format — spec.md defines no on-disk format for this layer.
#[derive(Debug, Clone)]
pub struct Workflow {
    pub snakemakepath: PathBuf,
    pub snakefile: PathBuf,
    pub workdir_init: PathBuf,
    pub overwrite_workdir: Option<PathBuf>,
    pub overwrite_configfile: Option<PathBuf>,
    pub config_args: Vec<String>,
    pub jobscript: Option<PathBuf>,
    pub debug: bool,
    pub printshellcmds: bool,
    pub latency_wait: Duration,
    pub benchmark_repeats: u32,
    pub linemaps: LineMaps,
    local_rules: Vec<String>,
}

impl Workflow {
    pub fn builder(snakemakepath: impl Into<PathBuf>, snakefile: impl Into<PathBuf>) -> WorkflowConfig {
        WorkflowConfig {
            snakemakepath: snakemakepath.into(),
            snakefile: snakefile.into(),
            workdir_init: PathBuf::from("."),
            overwrite_workdir: None,
            overwrite_configfile: None,
            config_args: Vec::new(),
            jobscript: None,
            debug: false,
            printshellcmds: false,
            latency_wait: Duration::from_secs(5),
            benchmark_repeats: 1,
            linemaps: LineMaps::new(),
            local_rules: Vec::new(),
        }
    }

    /// Whether `rule_name` was declared local (via `localrules`), meaning
    /// it must never be routed to a remote backend.
    pub fn is_local(&self, rule_name: &str) -> bool {
        self.local_rules.iter().any(|r| r == rule_name)
    }

    pub fn workdir(&self) -> &Path {
        self.overwrite_workdir.as_deref().unwrap_or(&self.workdir_init)
    }
}

pub struct WorkflowConfig {
    snakemakepath: PathBuf,
    snakefile: PathBuf,
    workdir_init: PathBuf,
    overwrite_workdir: Option<PathBuf>,
    overwrite_configfile: Option<PathBuf>,
    config_args: Vec<String>,
    jobscript: Option<PathBuf>,
    debug: bool,
    printshellcmds: bool,
    latency_wait: Duration,
    benchmark_repeats: u32,
    linemaps: LineMaps,
    local_rules: Vec<String>,
}

impl WorkflowConfig {
    crate::setters! {
        set {
            workdir_init: PathBuf,
            config_args: Vec<String>,
            debug: bool,
            printshellcmds: bool,
            latency_wait: Duration,
            benchmark_repeats: u32,
            linemaps: LineMaps,
            local_rules: Vec<String>,
        }
        option {
            overwrite_workdir: PathBuf,
            overwrite_configfile: PathBuf,
            jobscript: PathBuf,
        }
    }

    pub fn build(self) -> Workflow {
        Workflow {
            snakemakepath: self.snakemakepath,
            snakefile: self.snakefile,
            workdir_init: self.workdir_init,
            overwrite_workdir: self.overwrite_workdir,
            overwrite_configfile: self.overwrite_configfile,
            config_args: self.config_args,
            jobscript: self.jobscript,
            debug: self.debug,
            printshellcmds: self.printshellcmds,
            latency_wait: self.latency_wait,
            benchmark_repeats: self.benchmark_repeats,
            linemaps: self.linemaps,
            local_rules: self.local_rules,
        }
    }
}

/// Expand `{name}` placeholders in `template` using `resolve`. Fails with
/// [`WorkflowError::MissingPlaceholder`] rather than substituting an empty
/// string when a name can't be resolved (spec.md §9), except for the
/// literal `{properties}` token embedded in the bundled job-script
/// template, which callers resolve like any other name (§4.6 — it is
/// *filled*, just always with `job.json()`, never left as a raw marker
/// requiring special-case skipping here).
pub fn expand_placeholders(
    template: &str,
    mut resolve: impl FnMut(&str) -> Option<String>,
) -> Result<String, WorkflowError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push('{');
            rest = after;
            continue;
        };
        let name = &after[..end];
        match resolve(name) {
            Some(value) => out.push_str(&value),
            None => {
                return Err(WorkflowError::MissingPlaceholder {
                    path: PathBuf::new(),
                    placeholder: name.to_string(),
                })
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
