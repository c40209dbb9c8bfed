// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submits a blocking submit process (e.g. `qsub -sync y`, `bsub -K`)
//! and detects completion by the submit process's own exit code rather
//! than a sentinel file.

use super::{remove_best_effort, ClusterConfig, ClusterExecutorBase, PollOutcome, PollerGuard};
use crate::executor::{postrun, prerun, Callback, ErrCallback, ExecContext, Executor};
use async_trait::async_trait;
use oj_core::{ClusterJobError, Dag, Job, WorkflowError};
use std::path::PathBuf;

struct SynchronousActiveJob {
    job: Job,
    on_success: Callback,
    on_error: ErrCallback,
    jobscript: PathBuf,
    child: tokio::process::Child,
}

pub struct SynchronousClusterExecutor<D: Dag> {
    base: ClusterExecutorBase<D>,
    submitcmd: String,
    poller: PollerGuard<SynchronousActiveJob>,
}

impl<D: Dag + 'static> SynchronousClusterExecutor<D> {
    pub fn new(
        ctx: ExecContext<D>,
        workflow: oj_core::Workflow,
        config: ClusterConfig,
        submitcmd: impl Into<String>,
    ) -> Result<Self, WorkflowError> {
        let base = ClusterExecutorBase::new(ctx, workflow, config)?;
        let poll_ctx = base.ctx.clone();
        let poller = PollerGuard::spawn(base.poll_interval, move |mut item: SynchronousActiveJob| {
            let ctx = poll_ctx.clone();
            async move {
                match item.child.try_wait() {
                    Ok(Some(status)) => {
                        remove_best_effort(&item.jobscript, "job script");
                        if status.success() {
                            match postrun::finish_job(&ctx, &item.job) {
                                Ok(()) => (item.on_success)(item.job),
                                Err(e) => {
                                    postrun::fail_job(&ctx, &item.job, &e);
                                    (item.on_error)(item.job);
                                }
                            }
                        } else {
                            let err = ClusterJobError::new(item.job.id, item.jobscript.clone())
                                .with_detail(format!("submit process exited with {status}"));
                            postrun::fail_job(&ctx, &item.job, &err);
                            (item.on_error)(item.job);
                        }
                        PollOutcome::Done
                    }
                    Ok(None) => PollOutcome::StillRunning(item),
                    Err(e) => {
                        remove_best_effort(&item.jobscript, "job script");
                        postrun::fail_job(&ctx, &item.job, &e);
                        (item.on_error)(item.job);
                        PollOutcome::Done
                    }
                }
            }
        });
        Ok(Self {
            base,
            submitcmd: submitcmd.into(),
            poller,
        })
    }
}

#[async_trait]
impl<D: Dag + 'static> Executor for SynchronousClusterExecutor<D> {
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
        let jobscript = self.base.write_jobscript(&job, dag_jobid, any_dynamic, None)?;

        // This backend has no external jobid to read back (the submit
        // process blocks until remote completion and only ever yields an
        // exit code), so `{dependencies}` always expands empty here —
        // matching the original, which tracks an `external_jobid` map on
        // this backend too but never populates it.
        let submitcmd = self.base.render_submit_command(&job, &self.submitcmd, "")?;

        let child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(format!("{submitcmd} \"{}\"", jobscript.display()))
            .spawn()?;

        if let Some(cb) = &on_submit {
            cb(job.clone());
        }

        self.poller.push(SynchronousActiveJob {
            job,
            on_success,
            on_error,
            jobscript,
            child,
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
#[path = "synchronous_tests.rs"]
mod tests;
