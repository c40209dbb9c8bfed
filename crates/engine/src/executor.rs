// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The uniform executor contract, plus the pre/post-run protocols every
//! backend calls into as free functions rather than base-class methods —
//! a deliberate redesign from the Python original, which hangs these on
//! `RealExecutor`: a systems implementation models backends as variants
//! behind a shared capability set, and shared logic belongs in helpers
//! the variant calls.

use async_trait::async_trait;
use oj_core::{Dag, Job, WorkflowError};
use oj_storage::{Persistence, Stats};
use std::sync::Arc;

pub type Callback = Arc<dyn Fn(Job) + Send + Sync>;
pub type ErrCallback = Arc<dyn Fn(Job) + Send + Sync>;

/// Uniform submit/callback contract every backend implements.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Accept a job; may complete synchronously (dry-run, touch) or
    /// schedule asynchronous completion (CPU, cluster backends).
    async fn run(
        &self,
        job: Job,
        on_success: Callback,
        on_submit: Option<Callback>,
        on_error: ErrCallback,
    ) -> Result<(), WorkflowError>;

    /// Release resources. Idempotent with respect to completion.
    async fn shutdown(&self);

    /// Request early termination of in-flight jobs if supported;
    /// otherwise equivalent to `shutdown` after in-flight drain.
    async fn cancel(&self) {
        self.shutdown().await;
    }
}

/// Shared collaborators every executor backend needs for the pre/post-run
/// protocols, grouped so constructors don't carry five separate
/// parameters.
pub struct ExecContext<D: Dag> {
    pub dag: Arc<D>,
    pub persistence: Arc<dyn Persistence>,
    pub stats: Arc<Stats>,
    pub latency_wait: std::time::Duration,
}

impl<D: Dag> Clone for ExecContext<D> {
    fn clone(&self) -> Self {
        Self {
            dag: self.dag.clone(),
            persistence: self.persistence.clone(),
            stats: self.stats.clone(),
            latency_wait: self.latency_wait,
        }
    }
}

/// Pre-run protocol: protection check, structured job-info log, dynamic
/// output notice. Called by every backend, including dry-run, before
/// doing any work.
pub mod prerun {
    use super::*;

    pub fn protect_and_log<D: Dag>(ctx: &ExecContext<D>, job: &Job, reason: &str) -> Result<(), WorkflowError> {
        job.check_protected_output()?;

        if !ctx.dag.is_dynamic(job) {
            let priority = ctx.dag.priority(job);
            let priority_display: String = if priority == oj_core::JobId::HIGHEST_PRIORITY {
                "highest".to_string()
            } else {
                priority.to_string()
            };

            tracing::info!(
                jobid = %job.id,
                rule = %job.rule_name,
                local = job.local,
                input = ?job.plainstrings_input(),
                output = ?job.plainstrings_output(),
                log = ?job.plainstrings_log(),
                benchmark = ?job.benchmark,
                reason = %reason,
                resources = ?job.resources,
                priority = %priority_display,
                threads = job.threads,
                "job_info"
            );
        }

        if !job.dynamic_output.is_empty() {
            tracing::info!(jobid = %job.id, "job has dynamic output, not all expected files may be present yet");
        }

        Ok(())
    }

    /// Starts wall-clock accounting and writes the `started` persistence
    /// marker. Called by every backend that actually executes a job
    /// (touch, CPU, cluster) but not by dry-run, which never touches
    /// stats or persistence.
    pub fn start_tracking<D: Dag>(ctx: &ExecContext<D>, job: &Job) {
        ctx.stats.report_job_start(job);
        if let Err(e) = ctx.persistence.started(job) {
            tracing::info!(
                jobid = %job.id,
                error = %e,
                path = %ctx.persistence.path().display(),
                "failed to set marker file for job started; Snakemake will work, \
                 but cannot ensure that output files are complete in case of a \
                 kill signal or power loss"
            );
        }
    }
}

/// Post-run protocol (success path) and error protocol, shared verbatim
/// by every backend.
pub mod postrun {
    use super::*;

    /// `dag.handle_touch` -> `dag.check_output` -> `dag.handle_protected`
    /// -> `dag.handle_temp` -> `stats.report_job_end` ->
    /// `persistence.finished` (IO failure here is logged, not propagated).
    pub fn finish_job<D: Dag>(ctx: &ExecContext<D>, job: &Job) -> Result<(), WorkflowError> {
        ctx.dag.handle_touch(job);
        ctx.dag.check_output(job, ctx.latency_wait)?;
        ctx.dag.handle_protected(job);
        ctx.dag.handle_temp(job);
        ctx.stats.report_job_end(job);
        if let Err(e) = ctx.persistence.finished(job) {
            tracing::warn!(jobid = %job.id, error = %e, "failed to record finished marker");
        }
        Ok(())
    }

    /// Logs the failure with the job's output file list, removes partial
    /// outputs, and clears persistence markers. Never propagates —
    /// callers invoke `on_error` themselves after this returns.
    pub fn fail_job<D: Dag>(ctx: &ExecContext<D>, job: &Job, error: &dyn std::fmt::Display) {
        tracing::error!(
            jobid = %job.id,
            rule = %job.rule_name,
            output = ?job.plainstrings_output(),
            error = %error,
            "job failed"
        );
        job.cleanup();
        ctx.persistence.cleanup(job);
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
