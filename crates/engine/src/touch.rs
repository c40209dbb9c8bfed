// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Updates timestamps on declared outputs without running the rule body.

use crate::executor::{postrun, prerun, Callback, ErrCallback, ExecContext, Executor};
use async_trait::async_trait;
use oj_core::{Dag, Job, WorkflowError};
use std::time::Duration;

/// Sleep briefly after touching outputs to ensure mtime ordering on
/// low-resolution filesystems (spec.md §4.3).
const TOUCH_SETTLE: Duration = Duration::from_millis(100);

pub struct TouchExecutor<D: Dag> {
    ctx: ExecContext<D>,
}

impl<D: Dag> TouchExecutor<D> {
    pub fn new(ctx: ExecContext<D>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl<D: Dag> Executor for TouchExecutor<D> {
    async fn run(
        &self,
        job: Job,
        on_success: Callback,
        _on_submit: Option<Callback>,
        on_error: ErrCallback,
    ) -> Result<(), WorkflowError> {
        let reason = self.ctx.dag.reason(&job);
        prerun::protect_and_log(&self.ctx, &job, &reason)?;
        prerun::start_tracking(&self.ctx, &job);

        if let Err(e) = job.touch_outputs() {
            postrun::fail_job(&self.ctx, &job, &e);
            on_error(job);
            return Ok(());
        }

        tokio::time::sleep(TOUCH_SETTLE).await;

        if let Err(e) = postrun::finish_job(&self.ctx, &job) {
            postrun::fail_job(&self.ctx, &job, &e);
            on_error(job);
            return Ok(());
        }

        on_success(job);
        Ok(())
    }

    async fn shutdown(&self) {}
}

#[cfg(test)]
#[path = "touch_tests.rs"]
mod tests;
