// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submits through a DRMAA 1.0 session: a job template carrying the
//! rendered job-script as its remote command, polled non-blockingly for
//! exit status. The native binding loads `libdrmaa.so` dynamically via
//! `libloading` (see `native` submodule) behind the [`DrmaaSession`]
//! trait, so the backend itself, and its tests, never touch a C session
//! handle directly.

mod native;

pub use native::NativeDrmaaSession;

use super::{remove_best_effort, ClusterConfig, ClusterExecutorBase, PollOutcome, PollerGuard};
use crate::executor::{postrun, prerun, Callback, ErrCallback, ExecContext, Executor};
use async_trait::async_trait;
use oj_core::{ClusterJobError, Dag, Job, WorkflowError};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome of a non-blocking wait on one submitted DRMAA job.
#[derive(Debug, Clone, Copy)]
pub enum DrmaaWaitOutcome {
    StillRunning,
    Exited { has_exited: bool, exit_status: i32 },
}

/// Errors a DRMAA session call can raise, distinct from the ones a
/// session simply can't answer yet (`DrmaaWaitOutcome::StillRunning`).
#[derive(Debug, thiserror::Error)]
pub enum DrmaaError {
    #[error("DRMAA error: {0}")]
    Internal(String),
    #[error("DRMAA error: invalid attribute value: {0}")]
    InvalidAttribute(String),
}

/// The safe seam between the backend and a DRMAA 1.0 session, so the
/// executor can be tested without the native library
/// ([`FakeDrmaaSession`]) and production runs through [`NativeDrmaaSession`].
pub trait DrmaaSession: Send + Sync {
    /// Submit `jobscript` as the remote command with `native_specification`
    /// set from `drmaa_args`, returning the DRMAA job id.
    fn run_job(&self, jobscript: &str, native_specification: &str) -> Result<String, DrmaaError>;

    /// Non-blocking poll of one submitted job.
    fn wait_no_block(&self, jobid: &str) -> Result<DrmaaWaitOutcome, DrmaaError>;

    /// Request termination of a submitted job.
    fn terminate(&self, jobid: &str) -> Result<(), DrmaaError>;

    /// Close the session. Idempotent.
    fn exit(&self);
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeDrmaaSession;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;

    /// Records every call it receives, for assertions in executor tests —
    /// the DRMAA analogue of [`oj_core::test_support::FakeDag`]. Wait
    /// outcomes for a given jobid are consumed off a programmable queue
    /// (default: immediately exits with status 0), so a test can model a
    /// job that stays `StillRunning` for N polls before completing.
    #[derive(Default)]
    pub struct FakeDrmaaSession {
        calls: Mutex<Vec<String>>,
        submitted: Mutex<Vec<(String, String)>>,
        wait_queue: Mutex<std::collections::HashMap<String, Vec<DrmaaWaitOutcome>>>,
        terminated: Mutex<Vec<String>>,
        exited: Mutex<bool>,
        next_jobid: Mutex<u64>,
        submit_error: Mutex<Option<String>>,
    }

    impl FakeDrmaaSession {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        pub fn submitted(&self) -> Vec<(String, String)> {
            self.submitted.lock().clone()
        }

        pub fn terminated(&self) -> Vec<String> {
            self.terminated.lock().clone()
        }

        pub fn has_exited(&self) -> bool {
            *self.exited.lock()
        }

        /// Queue wait outcomes a given jobid will yield, in order, one per
        /// `wait_no_block` call; once exhausted, further calls default to
        /// an immediate successful exit.
        pub fn push_wait_outcome(&self, jobid: impl Into<String>, outcome: DrmaaWaitOutcome) {
            self.wait_queue
                .lock()
                .entry(jobid.into())
                .or_default()
                .push(outcome);
        }

        /// Make the next `run_job` call fail with the given message.
        pub fn fail_next_submit(&self, message: impl Into<String>) {
            *self.submit_error.lock() = Some(message.into());
        }

        fn record(&self, name: &str) {
            self.calls.lock().push(name.to_string());
        }
    }

    impl DrmaaSession for FakeDrmaaSession {
        fn run_job(&self, jobscript: &str, native_specification: &str) -> Result<String, DrmaaError> {
            self.record("run_job");
            if let Some(message) = self.submit_error.lock().take() {
                return Err(DrmaaError::Internal(message));
            }
            let mut counter = self.next_jobid.lock();
            *counter += 1;
            let jobid = counter.to_string();
            self.submitted
                .lock()
                .push((jobscript.to_string(), native_specification.to_string()));
            Ok(jobid)
        }

        fn wait_no_block(&self, jobid: &str) -> Result<DrmaaWaitOutcome, DrmaaError> {
            self.record("wait_no_block");
            let mut queue = self.wait_queue.lock();
            match queue.get_mut(jobid).and_then(|q| {
                if q.is_empty() {
                    None
                } else {
                    Some(q.remove(0))
                }
            }) {
                Some(outcome) => Ok(outcome),
                None => Ok(DrmaaWaitOutcome::Exited {
                    has_exited: true,
                    exit_status: 0,
                }),
            }
        }

        fn terminate(&self, jobid: &str) -> Result<(), DrmaaError> {
            self.record("terminate");
            self.terminated.lock().push(jobid.to_string());
            Ok(())
        }

        fn exit(&self) {
            self.record("exit");
            *self.exited.lock() = true;
        }
    }
}

struct DrmaaActiveJob {
    job: Job,
    on_success: Callback,
    on_error: ErrCallback,
    jobscript: PathBuf,
    drmaa_jobid: String,
}

pub struct DrmaaExecutor<D: Dag> {
    base: ClusterExecutorBase<D>,
    drmaa_args: String,
    session: Arc<dyn DrmaaSession>,
    poller: PollerGuard<DrmaaActiveJob>,
    submitted: Mutex<Vec<String>>,
}

impl<D: Dag + 'static> DrmaaExecutor<D> {
    pub fn new(
        ctx: ExecContext<D>,
        workflow: oj_core::Workflow,
        config: ClusterConfig,
        drmaa_args: impl Into<String>,
        session: Arc<dyn DrmaaSession>,
    ) -> Result<Self, WorkflowError> {
        let base = ClusterExecutorBase::new(ctx, workflow, config)?;
        let poll_ctx = base.ctx.clone();
        let poll_session = session.clone();
        let poller = PollerGuard::spawn(base.poll_interval, move |item: DrmaaActiveJob| {
            let ctx = poll_ctx.clone();
            let session = poll_session.clone();
            async move { poll_one(&ctx, session.as_ref(), item) }
        });
        Ok(Self {
            base,
            drmaa_args: drmaa_args.into(),
            session,
            poller,
            submitted: Mutex::new(Vec::new()),
        })
    }
}

fn poll_one<D: Dag>(
    ctx: &ExecContext<D>,
    session: &dyn DrmaaSession,
    item: DrmaaActiveJob,
) -> PollOutcome<DrmaaActiveJob> {
    match session.wait_no_block(&item.drmaa_jobid) {
        Ok(DrmaaWaitOutcome::StillRunning) => PollOutcome::StillRunning(item),
        Ok(DrmaaWaitOutcome::Exited { has_exited, exit_status }) => {
            remove_best_effort(&item.jobscript, "job script");
            if has_exited && exit_status == 0 {
                match postrun::finish_job(ctx, &item.job) {
                    Ok(()) => (item.on_success)(item.job),
                    Err(e) => {
                        postrun::fail_job(ctx, &item.job, &e);
                        (item.on_error)(item.job);
                    }
                }
            } else {
                let err = ClusterJobError::new(item.job.id, item.jobscript.clone())
                    .with_detail(format!("DRMAA exit status {exit_status}"));
                postrun::fail_job(ctx, &item.job, &err);
                (item.on_error)(item.job);
            }
            PollOutcome::Done
        }
        Err(e) => {
            remove_best_effort(&item.jobscript, "job script");
            postrun::fail_job(ctx, &item.job, &e);
            (item.on_error)(item.job);
            PollOutcome::Done
        }
    }
}

#[async_trait]
impl<D: Dag + 'static> Executor for DrmaaExecutor<D> {
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

        let native_spec = self.base.render_drmaa_args(&job, &self.drmaa_args)?;

        let jobscript_str = jobscript.display().to_string();
        let submitted = self.session.run_job(&jobscript_str, &native_spec);

        let drmaa_jobid = match submitted {
            Ok(id) => id,
            Err(e) => {
                // Mirrors the original: a submit-time DRMAA error is
                // logged and reported through the error callback, not
                // propagated to the caller of `run` (unlike a non-zero
                // submit exit in the other two backends).
                tracing::error!(jobid = %job.id, error = %e, "DRMAA submit failed");
                remove_best_effort(&jobscript, "job script");
                on_error(job);
                return Ok(());
            }
        };

        tracing::info!(jobid = %job.id, drmaa_jobid = %drmaa_jobid, "submitted DRMAA job");
        self.submitted.lock().push(drmaa_jobid.clone());

        if let Some(cb) = &on_submit {
            cb(job.clone());
        }

        self.poller.push(DrmaaActiveJob {
            job,
            on_success,
            on_error,
            jobscript,
            drmaa_jobid,
        });

        Ok(())
    }

    async fn shutdown(&self) {
        self.poller.shutdown().await;
        self.base.remove_tmpdir();
        self.session.exit();
    }

    async fn cancel(&self) {
        for jobid in self.submitted.lock().iter() {
            if let Err(e) = self.session.terminate(jobid) {
                tracing::warn!(drmaa_jobid = %jobid, error = %e, "failed to terminate DRMAA job");
            }
        }
        self.shutdown().await;
    }
}

#[cfg(test)]
#[path = "drmaa_tests.rs"]
mod tests;
