// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submits via a configurable submit command and detects completion by
//! the presence of sentinel files the remote job-script writes — the
//! backend that fits any batch system reachable through a shell command
//! (`qsub`, `sbatch`, ...) without a native client library.

use super::{remove_best_effort, ClusterConfig, ClusterExecutorBase, PollOutcome, PollerGuard};
use crate::executor::{postrun, prerun, Callback, ErrCallback, ExecContext, Executor};
use async_trait::async_trait;
use oj_core::{ClusterJobError, Dag, Job, WorkflowError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;

struct GenericActiveJob {
    job: Job,
    on_success: Callback,
    on_error: ErrCallback,
    jobscript: PathBuf,
    jobfinished: PathBuf,
    jobfailed: PathBuf,
}

pub struct GenericClusterExecutor<D: Dag> {
    base: ClusterExecutorBase<D>,
    submitcmd: String,
    poller: PollerGuard<GenericActiveJob>,
    /// Output path -> external jobid of the submission that will produce
    /// it, so a downstream job's submit command can declare a dependency
    /// on it (spec.md §3 "external_jobid").
    external_jobid: Mutex<HashMap<PathBuf, String>>,
}

impl<D: Dag + 'static> GenericClusterExecutor<D> {
    pub fn new(
        ctx: ExecContext<D>,
        workflow: oj_core::Workflow,
        config: ClusterConfig,
        submitcmd: impl Into<String>,
    ) -> Result<Self, WorkflowError> {
        let base = ClusterExecutorBase::new(ctx, workflow, config)?;
        let poll_ctx = base.ctx.clone();
        let poller = PollerGuard::spawn(base.poll_interval, move |item: GenericActiveJob| {
            let ctx = poll_ctx.clone();
            async move { poll_one(&ctx, item) }
        });
        Ok(Self {
            base,
            submitcmd: submitcmd.into(),
            poller,
            external_jobid: Mutex::new(HashMap::new()),
        })
    }
}

fn poll_one<D: Dag>(
    ctx: &ExecContext<D>,
    item: GenericActiveJob,
) -> PollOutcome<GenericActiveJob> {
    if item.jobfinished.exists() {
        remove_best_effort(&item.jobfinished, "jobfinished sentinel");
        remove_best_effort(&item.jobscript, "job script");
        match postrun::finish_job(ctx, &item.job) {
            Ok(()) => (item.on_success)(item.job),
            Err(e) => {
                postrun::fail_job(ctx, &item.job, &e);
                (item.on_error)(item.job);
            }
        }
        PollOutcome::Done
    } else if item.jobfailed.exists() {
        remove_best_effort(&item.jobfailed, "jobfailed sentinel");
        remove_best_effort(&item.jobscript, "job script");
        let err = ClusterJobError::new(item.job.id, item.jobscript.clone());
        postrun::fail_job(ctx, &item.job, &err);
        (item.on_error)(item.job);
        PollOutcome::Done
    } else {
        PollOutcome::StillRunning(item)
    }
}

#[async_trait]
impl<D: Dag + 'static> Executor for GenericClusterExecutor<D> {
    async fn run(
        &self,
        job: Job,
        on_success: Callback,
        on_submit: Option<Callback>,
        on_error: ErrCallback,
    ) -> Result<(), WorkflowError> {
        let reason = self.base.ctx.dag.reason(&job);
        prerun::protect_and_log(&self.base.ctx, &job, &reason)?;
        prerun::start_tracking(&self.base.ctx, &job);

        let dag_jobid = self.base.ctx.dag.jobid(&job);
        let any_dynamic = self.base.ctx.dag.has_dynamic_output_jobs();

        let tmpdir = self.base.tmpdir()?;
        let jobfinished = tmpdir.join(format!("{dag_jobid}.jobfinished"));
        let jobfailed = tmpdir.join(format!("{dag_jobid}.jobfailed"));
        let suffix = format!(
            "&& touch \"{}\" || touch \"{}\"",
            jobfinished.display(),
            jobfailed.display()
        );

        let jobscript =
            self.base
                .write_jobscript(&job, dag_jobid, any_dynamic, Some(&suffix))?;

        let deps = {
            let external = self.external_jobid.lock();
            job.input
                .iter()
                .filter_map(|p| external.get(p))
                .cloned()
                .collect::<Vec<_>>()
                .join(" ")
        };

        let submitcmd = self
            .base
            .render_submit_command(&job, &self.submitcmd, &deps)?;

        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c")
            .arg(format!("{submitcmd} \"{}\"", jobscript.display()));

        let output = oj_shell::run_captured(cmd, oj_shell::SUBMIT_COMMAND_TIMEOUT, &job.rule_name)
            .await
            .map_err(|e| WorkflowError::SubmitFailed {
                status: -1,
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(WorkflowError::SubmitFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: output.stderr_string(),
            });
        }

        if let Some(ext_id) = output.first_nonempty_stdout_line() {
            tracing::debug!(jobid = %job.id, external_jobid = %ext_id, "submitted job");
            let mut external = self.external_jobid.lock();
            for out in &job.output {
                external.insert(out.clone(), ext_id.clone());
            }
        }

        if let Some(cb) = &on_submit {
            cb(job.clone());
        }

        self.poller.push(GenericActiveJob {
            job,
            on_success,
            on_error,
            jobscript,
            jobfinished,
            jobfailed,
        });

        Ok(())
    }

    async fn shutdown(&self) {
        self.poller.shutdown().await;
        self.base.remove_tmpdir();
    }

    async fn cancel(&self) {
        tracing::info!("will exit after finishing currently running jobs");
        self.shutdown().await;
    }
}

#[cfg(test)]
#[path = "generic_tests.rs"]
mod tests;
