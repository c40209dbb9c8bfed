// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs jobs on a local worker pool: shell jobs on a
//! `tokio::task::spawn_blocking`-backed thread pool, in-process jobs via
//! `tokio::task::spawn` — the Rust analogue of the Python original's
//! `ThreadPoolExecutor` / `ProcessPoolExecutor` split, sized to `workers`
//! permits on a shared semaphore rather than two distinct pool objects.

use crate::executor::{postrun, prerun, Callback, ErrCallback, ExecContext, Executor};
use crate::run_wrapper::run_wrapper;
use async_trait::async_trait;
use oj_core::{Dag, Job, LineMaps, WorkflowError};
use std::process::Command;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub struct CpuExecutor<D: Dag> {
    ctx: ExecContext<D>,
    semaphore: Arc<Semaphore>,
    workers: u32,
    linemaps: Arc<LineMaps>,
    /// Retained for parity with the Python constructor; routing of
    /// in-process jobs is fixed to `tokio::task::spawn` regardless, since
    /// there is no Rust equivalent of a separate OS process pool here
    /// (see SPEC_FULL.md §2).
    #[allow(dead_code)]
    use_threads: bool,
}

impl<D: Dag + 'static> CpuExecutor<D> {
    pub fn new(ctx: ExecContext<D>, workers: u32, use_threads: bool, linemaps: LineMaps) -> Self {
        let workers = workers.max(1);
        Self {
            ctx,
            semaphore: Arc::new(Semaphore::new(workers as usize)),
            workers,
            linemaps: Arc::new(linemaps),
            use_threads,
        }
    }
}

#[async_trait]
impl<D: Dag + 'static> Executor for CpuExecutor<D> {
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
        job.prepare()?;

        let semaphore = self.semaphore.clone();
        let ctx = self.ctx.clone();
        let linemaps = self.linemaps.clone();

        tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                // Pool torn down: silently clean up, no error callback.
                job.cleanup();
                ctx.persistence.cleanup(&job);
                return;
            };

            let result = if let Some(shellcmd) = job.shellcmd.clone() {
                run_shell_blocking(shellcmd).await
            } else if let Some(run_func) = job.run_func.clone() {
                run_inprocess(job.clone(), run_func, linemaps).await
            } else {
                Ok(())
            };

            match result {
                Ok(()) => match postrun::finish_job(&ctx, &job) {
                    Ok(()) => on_success(job),
                    Err(e) => {
                        postrun::fail_job(&ctx, &job, &e);
                        on_error(job);
                    }
                },
                Err(PoolOutcome::Interrupted) => {
                    job.cleanup();
                    ctx.persistence.cleanup(&job);
                }
                Err(PoolOutcome::Failed(e)) => {
                    postrun::fail_job(&ctx, &job, &e);
                    on_error(job);
                }
            }
        });

        Ok(())
    }

    async fn shutdown(&self) {
        // Drain: acquire every permit, proving no in-flight task still holds one.
        let _ = self.semaphore.acquire_many(self.workers).await;
    }
}

enum PoolOutcome {
    Interrupted,
    Failed(String),
}

async fn run_shell_blocking(shellcmd: String) -> Result<(), PoolOutcome> {
    let outcome = tokio::task::spawn_blocking(move || {
        Command::new("sh").arg("-c").arg(&shellcmd).status()
    })
    .await;

    match outcome {
        Err(_join_err) => Err(PoolOutcome::Interrupted),
        Ok(Err(e)) => Err(PoolOutcome::Failed(e.to_string())),
        Ok(Ok(status)) if status.success() => Ok(()),
        Ok(Ok(status)) => Err(PoolOutcome::Failed(format!("shell command exited with {status}"))),
    }
}

async fn run_inprocess(
    job: Job,
    run_func: Arc<dyn oj_core::RunFunc>,
    linemaps: Arc<LineMaps>,
) -> Result<(), PoolOutcome> {
    match run_wrapper(&job, run_func.as_ref(), &linemaps) {
        Ok(()) => Ok(()),
        Err(e) => Err(PoolOutcome::Failed(e.to_string())),
    }
}

#[cfg(test)]
#[path = "cpu_tests.rs"]
mod tests;
