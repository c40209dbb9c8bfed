// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared machinery for the three remote cluster backends: rendering a
//! per-job executable script from a template, a lazily-created temp
//! workspace, and a background completion poller running under a single
//! cancellation flag.
//!
//! The Python original hangs all of this on a `ClusterExecutor` base
//! class every backend subclasses. Here it is a shared struct
//! (`ClusterExecutorBase`) plus free-standing poller plumbing
//! (`PollerGuard`) that each backend composes, per spec.md §9's
//! redesign guidance: shared logic as helpers a variant calls, not a
//! base-class method it "supers" into.

pub mod drmaa;
pub mod generic;
pub mod synchronous;

use crate::executor::ExecContext;
use indexmap::IndexMap;
use oj_core::{Dag, Job, Workflow, WorkflowError};
use parking_lot::Mutex;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How often the background poller re-checks in-flight jobs (spec.md
/// §4.6: "sleep 1 s"). Tests construct executors with a shorter interval
/// so assertions don't wait a full second per sweep.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const TMPDIR_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S',
    'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// The jobname template, per-rule submit/DRMAA-args overlay, and core
/// count shared by every cluster backend.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub jobname: String,
    pub cores: u32,
    pub cluster_config: IndexMap<String, IndexMap<String, String>>,
}

impl ClusterConfig {
    pub fn new(cores: u32) -> Self {
        Self {
            jobname: "snakejob.{rulename}.{jobid}.sh".to_string(),
            cores,
            cluster_config: IndexMap::new(),
        }
    }

    pub fn jobname(mut self, jobname: impl Into<String>) -> Self {
        self.jobname = jobname.into();
        self
    }

    pub fn cluster_config(mut self, cfg: IndexMap<String, IndexMap<String, String>>) -> Self {
        self.cluster_config = cfg;
        self
    }

    /// `jobname` must contain the literal placeholder `{jobid}` (spec.md
    /// §4.6 "Jobname rule").
    fn validate(&self) -> Result<(), WorkflowError> {
        if !self.jobname.contains("{jobid}") {
            return Err(WorkflowError::InvalidJobname {
                jobname: self.jobname.clone(),
            });
        }
        Ok(())
    }

    /// `cluster_config["__default__"]` overlaid with
    /// `cluster_config[rule_name]`, flattened to `cluster.<key>` entries
    /// for `Job::format_wildcards`'s `extra` map (spec.md §4.6 "Cluster
    /// wildcards" — two layers only, no nested profiles, by design).
    fn cluster_wildcards(&self, rule_name: &str) -> IndexMap<String, String> {
        let mut merged = self
            .cluster_config
            .get("__default__")
            .cloned()
            .unwrap_or_default();
        if let Some(overlay) = self.cluster_config.get(rule_name) {
            for (k, v) in overlay {
                merged.insert(k.clone(), v.clone());
            }
        }
        merged
            .into_iter()
            .map(|(k, v)| (format!("cluster.{k}"), v))
            .collect()
    }
}

/// Shared state every cluster backend builds on: the rendered job-script
/// template, the lazily-created tmp workspace, and wildcard expansion
/// helpers. Backend-specific submission and completion detection live in
/// `generic`/`synchronous`/`drmaa`.
pub struct ClusterExecutorBase<D: Dag> {
    pub ctx: ExecContext<D>,
    pub workflow: Workflow,
    pub config: ClusterConfig,
    template: String,
    tmpdir: Mutex<Option<PathBuf>>,
    pub poll_interval: Duration,
}

impl<D: Dag> ClusterExecutorBase<D> {
    pub fn new(
        ctx: ExecContext<D>,
        workflow: Workflow,
        config: ClusterConfig,
    ) -> Result<Self, WorkflowError> {
        config.validate()?;
        let template = match &workflow.jobscript {
            Some(path) => std::fs::read_to_string(path)?,
            None => oj_shell::default_jobscript().to_string(),
        };
        Ok(Self {
            ctx,
            workflow,
            config,
            template,
            tmpdir: Mutex::new(None),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// `./.snakemake/tmp.<6 random upper+digits>`, created on first use
    /// and reused for the lifetime of the executor (single-writer: only
    /// the submit path constructs it, per spec.md §5).
    fn tmpdir(&self) -> std::io::Result<PathBuf> {
        let mut guard = self.tmpdir.lock();
        if let Some(path) = guard.as_ref() {
            return Ok(path.clone());
        }
        let base = PathBuf::from("./.snakemake");
        std::fs::create_dir_all(&base)?;
        loop {
            let candidate = base.join(format!(
                "tmp.{}",
                nanoid::nanoid!(6, TMPDIR_ALPHABET)
            ));
            if !candidate.exists() {
                std::fs::create_dir(&candidate)?;
                *guard = Some(candidate.clone());
                return Ok(candidate);
            }
        }
    }

    fn remove_tmpdir(&self) {
        if let Some(path) = self.tmpdir.lock().take() {
            if let Err(e) = std::fs::remove_dir_all(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove cluster tmpdir");
            }
        }
    }

    /// Render and write the per-job executable script, returning its
    /// path. `dag_jobid` is the DAG's numeric jobid (not `Job::id`) —
    /// the value the `{jobid}` placeholder in `jobname` resolves to.
    pub(crate) fn write_jobscript(
        &self,
        job: &Job,
        dag_jobid: u64,
        any_dynamic_output_jobs: bool,
        suffix: Option<&str>,
    ) -> Result<PathBuf, WorkflowError> {
        let tmpdir = self.tmpdir()?;

        let mut extra = self.config.cluster_wildcards(&job.rule_name);
        extra.insert("jobid".to_string(), dag_jobid.to_string());
        let filename = job.format_wildcards(&self.config.jobname, &extra)?;
        let path = tmpdir.join(filename);

        let target = oj_shell::render_target(job);
        let exec_job = oj_shell::render_exec_job(
            job,
            &self.workflow,
            self.config.cores,
            &target,
            any_dynamic_output_jobs,
            suffix,
        );
        let rendered = oj_shell::render_jobscript(&self.template, job, &exec_job)?;
        std::fs::write(&path, rendered)?;
        make_executable(&path)?;
        Ok(path)
    }

    /// Expand `{dependencies}` and `{cluster.<key>}` placeholders in a
    /// submit-command template.
    pub(crate) fn render_submit_command(
        &self,
        job: &Job,
        template: &str,
        dependencies: &str,
    ) -> Result<String, WorkflowError> {
        let mut extra = self.config.cluster_wildcards(&job.rule_name);
        extra.insert("dependencies".to_string(), dependencies.to_string());
        job.format_wildcards(template, &extra)
    }

    /// Expand `{cluster.<key>}` placeholders in a `drmaa_args` template
    /// (no `{dependencies}` — DRMAA submission carries no dependency
    /// string in the original either).
    pub(crate) fn render_drmaa_args(
        &self,
        job: &Job,
        template: &str,
    ) -> Result<String, WorkflowError> {
        let extra = self.config.cluster_wildcards(&job.rule_name);
        job.format_wildcards(template, &extra)
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o100);
    std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

pub(crate) fn remove_best_effort(path: &Path, what: &'static str) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %e, what, "failed to remove cluster artifact");
        }
    }
}

/// Outcome of one poller sweep over a single in-flight job.
pub(crate) enum PollOutcome<T> {
    StillRunning(T),
    Done,
}

fn spawn_poller<T, F, Fut>(
    active: Arc<Mutex<Vec<T>>>,
    wait: Arc<AtomicBool>,
    poll_interval: Duration,
    mut poll_one: F,
) -> tokio::task::JoinHandle<()>
where
    T: Send + 'static,
    F: FnMut(T) -> Fut + Send + 'static,
    Fut: Future<Output = PollOutcome<T>> + Send,
{
    tokio::spawn(async move {
        loop {
            if !wait.load(Ordering::Acquire) {
                return;
            }
            let sweep: Vec<T> = std::mem::take(&mut *active.lock());
            for item in sweep {
                match poll_one(item).await {
                    PollOutcome::StillRunning(item) => active.lock().push(item),
                    PollOutcome::Done => {}
                }
            }
            tokio::time::sleep(poll_interval).await;
        }
    })
}

/// Owns a backend's active-job list, the `wait` cancellation flag, and
/// the poller task's `JoinHandle` — the Rust analogue of spec.md §3's
/// `active_jobs` / `lock` / `wait` triple, generalized across the three
/// cluster backends (spec.md §9's "poller" design note: a cancellation
/// channel plus a background task, not literally a thread and a lock).
pub(crate) struct PollerGuard<T> {
    active: Arc<Mutex<Vec<T>>>,
    wait: Arc<AtomicBool>,
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl<T: Send + 'static> PollerGuard<T> {
    pub fn spawn<F, Fut>(poll_interval: Duration, poll_one: F) -> Self
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = PollOutcome<T>> + Send,
    {
        let active = Arc::new(Mutex::new(Vec::new()));
        let wait = Arc::new(AtomicBool::new(true));
        let handle = spawn_poller(active.clone(), wait.clone(), poll_interval, poll_one);
        Self {
            active,
            wait,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn push(&self, item: T) {
        self.active.lock().push(item);
    }

    /// Stop the poller and wait for it to exit. Idempotent.
    pub async fn shutdown(&self) {
        self.wait.store(false, Ordering::Release);
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

/// Test-only helpers shared by the cluster backends' own test modules.
#[cfg(test)]
pub(crate) mod test_util {
    /// Restores the process working directory on drop, so a panicked
    /// assertion doesn't leave later tests in this binary running from a
    /// deleted tempdir. `ClusterExecutorBase::tmpdir` is CWD-relative,
    /// matching the original's `.snakemake/tmp.xxx`.
    pub struct CwdGuard(std::path::PathBuf);

    impl CwdGuard {
        pub fn enter(dir: &std::path::Path) -> Self {
            let original = std::env::current_dir().expect("current dir");
            std::env::set_current_dir(dir).expect("chdir into tempdir");
            Self(original)
        }
    }

    impl Drop for CwdGuard {
        fn drop(&mut self) {
            let _ = std::env::set_current_dir(&self.0);
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
