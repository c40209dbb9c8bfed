// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Renders the job without executing it.

use crate::executor::{prerun, Callback, ErrCallback, ExecContext, Executor};
use async_trait::async_trait;
use oj_core::{Dag, Job, WorkflowError};
use oj_shell::{render_exec_job, render_target};

/// Emits the job-info log and the rendered shell command. Never spawns a
/// child, never mutates persistence, never modifies outputs. Always
/// invokes `on_success` synchronously.
pub struct DryRunExecutor<D: Dag> {
    ctx: ExecContext<D>,
    workflow: oj_core::Workflow,
    cores: u32,
}

impl<D: Dag> DryRunExecutor<D> {
    pub fn new(ctx: ExecContext<D>, workflow: oj_core::Workflow, cores: u32) -> Self {
        Self { ctx, workflow, cores }
    }
}

#[async_trait]
impl<D: Dag> Executor for DryRunExecutor<D> {
    async fn run(
        &self,
        job: Job,
        on_success: Callback,
        _on_submit: Option<Callback>,
        _on_error: ErrCallback,
    ) -> Result<(), WorkflowError> {
        let reason = self.ctx.dag.reason(&job);
        prerun::protect_and_log(&self.ctx, &job, &reason)?;

        if let Some(shellcmd) = &job.shellcmd {
            tracing::info!(jobid = %job.id, shellcmd = %shellcmd, "would run shell command");
        } else {
            let target = render_target(&job);
            let any_dynamic = self.ctx.dag.has_dynamic_output_jobs();
            let exec_job = render_exec_job(&job, &self.workflow, self.cores, &target, any_dynamic, None);
            tracing::info!(jobid = %job.id, exec_job = %exec_job, "would run");
        }

        on_success(job);
        Ok(())
    }

    async fn shutdown(&self) {}
}

#[cfg(test)]
#[path = "dryrun_tests.rs"]
mod tests;
