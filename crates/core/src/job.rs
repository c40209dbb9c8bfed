// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job passed from the DAG to an executor.

use crate::error::RuleError;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

crate::define_id! {
    /// Unique identifier for a single job instance within a run.
    pub struct JobId("job-");
}

impl JobId {
    /// Sentinel priority value the scheduler uses to mean "run first no
    /// matter what" — printed in job-info logs as the literal `"highest"`
    /// rather than a number (spec.md §4.1).
    pub const HIGHEST_PRIORITY: i64 = i64::MAX;
}

/// The arguments forwarded into an in-process rule body, mirroring the
/// positional parameters `run_wrapper` passes to the Python `run` function.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub input: Vec<PathBuf>,
    pub output: Vec<PathBuf>,
    pub params: serde_json::Value,
    pub wildcards: IndexMap<String, String>,
    pub threads: u32,
    pub resources: IndexMap<String, i64>,
    pub log: Vec<PathBuf>,
    pub version: Option<String>,
}

/// The in-process rule body. Implemented by the surrounding scheduler;
/// the execution layer only ever calls it through `run_wrapper`.
pub trait RunFunc: Send + Sync {
    fn call(&self, ctx: &RunContext) -> Result<(), RuleError>;
}

impl<F> RunFunc for F
where
    F: Fn(&RunContext) -> Result<(), RuleError> + Send + Sync,
{
    fn call(&self, ctx: &RunContext) -> Result<(), RuleError> {
        self(ctx)
    }
}

/// Configuration for constructing a new [`Job`].
#[derive(Clone)]
pub struct JobConfig {
    pub id: JobId,
    pub rule_name: String,
    pub local: bool,
    pub input: Vec<PathBuf>,
    pub output: Vec<PathBuf>,
    pub log: Vec<PathBuf>,
    pub params: serde_json::Value,
    pub wildcards: IndexMap<String, String>,
    pub threads: u32,
    pub resources: IndexMap<String, i64>,
    pub benchmark: Option<PathBuf>,
    pub benchmark_repeats: u32,
    pub shellcmd: Option<String>,
    pub run_func: Option<Arc<dyn RunFunc>>,
    pub dynamic_input: HashSet<PathBuf>,
    pub dynamic_output: HashSet<PathBuf>,
    pub rule_version: Option<String>,
    pub message: Option<String>,
    pub priority: i64,
}

impl fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobConfig")
            .field("id", &self.id)
            .field("rule_name", &self.rule_name)
            .field("shellcmd", &self.shellcmd)
            .field("has_run_func", &self.run_func.is_some())
            .finish()
    }
}

impl JobConfig {
    pub fn builder(rule_name: impl Into<String>) -> JobConfigBuilder {
        JobConfigBuilder {
            id: JobId::new(),
            rule_name: rule_name.into(),
            local: false,
            input: Vec::new(),
            output: Vec::new(),
            log: Vec::new(),
            params: serde_json::Value::Null,
            wildcards: IndexMap::new(),
            threads: 1,
            resources: IndexMap::new(),
            benchmark: None,
            benchmark_repeats: 1,
            shellcmd: None,
            run_func: None,
            dynamic_input: HashSet::new(),
            dynamic_output: HashSet::new(),
            rule_version: None,
            message: None,
            priority: 0,
        }
    }
}

pub struct JobConfigBuilder {
    id: JobId,
    rule_name: String,
    local: bool,
    input: Vec<PathBuf>,
    output: Vec<PathBuf>,
    log: Vec<PathBuf>,
    params: serde_json::Value,
    wildcards: IndexMap<String, String>,
    threads: u32,
    resources: IndexMap<String, i64>,
    benchmark: Option<PathBuf>,
    benchmark_repeats: u32,
    shellcmd: Option<String>,
    run_func: Option<Arc<dyn RunFunc>>,
    dynamic_input: HashSet<PathBuf>,
    dynamic_output: HashSet<PathBuf>,
    rule_version: Option<String>,
    message: Option<String>,
    priority: i64,
}

impl JobConfigBuilder {
    crate::setters! {
        set {
            id: JobId,
            local: bool,
            input: Vec<PathBuf>,
            output: Vec<PathBuf>,
            log: Vec<PathBuf>,
            params: serde_json::Value,
            wildcards: IndexMap<String, String>,
            threads: u32,
            resources: IndexMap<String, i64>,
            benchmark_repeats: u32,
            run_func: Option<Arc<dyn RunFunc>>,
            priority: i64,
        }
        option {
            benchmark: PathBuf,
            shellcmd: String,
            rule_version: String,
            message: String,
        }
    }

    pub fn dynamic_input(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.dynamic_input = paths.into_iter().collect();
        self
    }

    pub fn dynamic_output(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.dynamic_output = paths.into_iter().collect();
        self
    }

    pub fn build(self) -> JobConfig {
        JobConfig {
            id: self.id,
            rule_name: self.rule_name,
            local: self.local,
            input: self.input,
            output: self.output,
            log: self.log,
            params: self.params,
            wildcards: self.wildcards,
            threads: self.threads,
            resources: self.resources,
            benchmark: self.benchmark,
            benchmark_repeats: self.benchmark_repeats,
            shellcmd: self.shellcmd,
            run_func: self.run_func,
            dynamic_input: self.dynamic_input,
            dynamic_output: self.dynamic_output,
            rule_version: self.rule_version,
            message: self.message,
            priority: self.priority,
        }
    }
}

/// A single rule application with concrete input/output paths and
/// resolved wildcards, ready for dispatch to an executor backend.
#[derive(Clone)]
pub struct Job {
    pub id: JobId,
    pub rule_name: String,
    /// Whether `workflow.is_local(rule)` was true when this job was built.
    pub local: bool,
    pub input: Vec<PathBuf>,
    pub output: Vec<PathBuf>,
    pub log: Vec<PathBuf>,
    pub params: serde_json::Value,
    pub wildcards: IndexMap<String, String>,
    pub threads: u32,
    pub resources: IndexMap<String, i64>,
    pub benchmark: Option<PathBuf>,
    pub benchmark_repeats: u32,
    pub shellcmd: Option<String>,
    pub run_func: Option<Arc<dyn RunFunc>>,
    pub dynamic_input: HashSet<PathBuf>,
    pub dynamic_output: HashSet<PathBuf>,
    pub rule_version: Option<String>,
    pub message: Option<String>,
    pub priority: i64,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("rule_name", &self.rule_name)
            .field("output", &self.output)
            .finish()
    }
}

impl Job {
    pub fn new(config: JobConfig) -> Self {
        Self {
            id: config.id,
            rule_name: config.rule_name,
            local: config.local,
            input: config.input,
            output: config.output,
            log: config.log,
            params: config.params,
            wildcards: config.wildcards,
            threads: config.threads,
            resources: config.resources,
            benchmark: config.benchmark,
            benchmark_repeats: config.benchmark_repeats,
            shellcmd: config.shellcmd,
            run_func: config.run_func,
            dynamic_input: config.dynamic_input,
            dynamic_output: config.dynamic_output,
            rule_version: config.rule_version,
            message: config.message,
            priority: config.priority,
        }
    }

    /// The outputs this job is expected to produce, expanded to concrete
    /// paths (identical to `output` here — dynamic expansion is a DAG
    /// concern, this is the set the executor touches/checks).
    pub fn expanded_output(&self) -> &[PathBuf] {
        &self.output
    }

    /// `true` if `priority` equals the sentinel highest-priority value.
    pub fn is_highest_priority(&self) -> bool {
        self.priority == JobId::HIGHEST_PRIORITY
    }

    /// Returns the first output path that is already present on disk and
    /// marked read-only (mode without any write bit), or `None` if every
    /// declared output is writable or absent.
    #[cfg(unix)]
    pub fn protected_output(&self) -> Option<&Path> {
        use std::os::unix::fs::PermissionsExt;
        self.output.iter().find(|path| {
            std::fs::metadata(path)
                .map(|meta| meta.permissions().mode() & 0o222 == 0)
                .unwrap_or(false)
        }).map(|p| p.as_path())
    }

    #[cfg(not(unix))]
    pub fn protected_output(&self) -> Option<&Path> {
        None
    }

    /// Check all declared outputs for the read-only protection marker.
    pub fn check_protected_output(&self) -> Result<(), crate::error::ProtectedOutputError> {
        if let Some(path) = self.protected_output() {
            return Err(crate::error::ProtectedOutputError {
                job_id: self.id,
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Ensure every output's parent directory exists.
    pub fn prepare(&self) -> std::io::Result<()> {
        for path in &self.output {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
        Ok(())
    }

    /// Remove outputs left behind by a failed attempt.
    pub fn cleanup(&self) {
        for path in &self.output {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::warn!(job_id = %self.id, path = %path.display(), error = %e, "failed to clean up partial output");
                }
            }
        }
    }

    /// Update the mtime of every declared output (and the benchmark file,
    /// if any) to the current time, as the touch executor does.
    pub fn touch_outputs(&self) -> std::io::Result<()> {
        let now = filetime::FileTime::now();
        for path in self.expanded_output() {
            touch_one(path, now)?;
        }
        if let Some(benchmark) = &self.benchmark {
            touch_one(benchmark, now)?;
        }
        Ok(())
    }

    /// Serialize this job's properties to the JSON blob embedded in
    /// rendered job scripts (`{properties}`).
    pub fn json(&self) -> serde_json::Value {
        serde_json::json!({
            "rule": self.rule_name,
            "local": self.local,
            "input": self.plainstrings(&self.input),
            "output": self.plainstrings(&self.output),
            "log": self.plainstrings(&self.log),
            "params": self.params,
            "wildcards": self.wildcards,
            "threads": self.threads,
            "resources": self.resources,
            "jobid": self.id.as_str(),
        })
    }

    /// Render path lists as plain strings (the Rust analogue of
    /// `job.input.plainstrings()`).
    pub fn plainstrings(&self, paths: &[PathBuf]) -> Vec<String> {
        paths.iter().map(|p| p.display().to_string()).collect()
    }

    pub fn plainstrings_input(&self) -> Vec<String> {
        self.plainstrings(&self.input)
    }

    pub fn plainstrings_output(&self) -> Vec<String> {
        self.plainstrings(&self.output)
    }

    pub fn plainstrings_log(&self) -> Vec<String> {
        self.plainstrings(&self.log)
    }

    /// Expand `{job.*}`-style placeholders plus any caller-supplied extras
    /// in `template`. Fails with a `WorkflowError` if the template
    /// references a name not present in `extra` or the job's own field set
    /// (spec.md §9: "must fail... rather than substituting empty").
    pub fn format_wildcards(
        &self,
        template: &str,
        extra: &IndexMap<String, String>,
    ) -> Result<String, crate::error::WorkflowError> {
        crate::workflow::expand_placeholders(template, |name| {
            if let Some(v) = extra.get(name) {
                return Some(v.clone());
            }
            match name {
                "jobid" => Some(self.id.to_string()),
                "rulename" => Some(self.rule_name.clone()),
                _ => self.wildcards.get(name).cloned(),
            }
        })
    }
}

fn touch_one(path: &Path, time: filetime::FileTime) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::File::create(path)?;
    }
    filetime::set_file_times(path, time, time)
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            rule_name: String = "test_rule",
        }
        set {
            id: JobId = JobId::new(),
            local: bool = false,
            input: Vec<PathBuf> = Vec::new(),
            output: Vec<PathBuf> = Vec::new(),
            log: Vec<PathBuf> = Vec::new(),
            params: serde_json::Value = serde_json::Value::Null,
            wildcards: IndexMap<String, String> = IndexMap::new(),
            threads: u32 = 1,
            resources: IndexMap<String, i64> = IndexMap::new(),
            benchmark_repeats: u32 = 1,
            run_func: Option<Arc<dyn RunFunc>> = None,
            dynamic_input: HashSet<PathBuf> = HashSet::new(),
            dynamic_output: HashSet<PathBuf> = HashSet::new(),
            priority: i64 = 0,
        }
        option {
            benchmark: PathBuf = None,
            shellcmd: String = None,
            rule_version: String = None,
            message: String = None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
