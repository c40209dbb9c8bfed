// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Dag` collaborator trait: everything an executor needs to ask the
//! surrounding scheduler about a job's place in the dependency graph.
//!
//! DAG construction, rule parsing, and scheduling policy are out of scope
//! here (spec.md §9); this crate only defines the seam a real DAG
//! implementation plugs into.

use crate::job::Job;
use crate::error::WorkflowError;
use std::time::Duration;

/// Supplied by the surrounding scheduler. An executor never constructs a
/// DAG, only asks it questions about jobs it has already been given.
pub trait Dag: Send + Sync {
    /// Stable numeric id used in job-info logs (distinct from `JobId`,
    /// which is the across-run-unique identity).
    fn jobid(&self, job: &Job) -> u64;

    fn priority(&self, job: &Job) -> i64;

    /// Human-readable reason this job is being run (e.g. "missing output").
    fn reason(&self, job: &Job) -> String;

    fn is_dynamic(&self, job: &Job) -> bool;

    fn has_dynamic_output_jobs(&self) -> bool;

    /// Touch-executor completion hook: the DAG updates its bookkeeping for
    /// a job that was touched rather than actually run.
    fn handle_touch(&self, job: &Job);

    /// Verify every expanded output exists, waiting up to `wait` for
    /// filesystem latency before declaring it missing.
    fn check_output(&self, job: &Job, wait: Duration) -> Result<(), WorkflowError>;

    /// Apply the read-only protection marker to a job's outputs, if the
    /// rule requested it.
    fn handle_protected(&self, job: &Job);

    /// Remove temporary outputs no longer needed once downstream rules
    /// have consumed them.
    fn handle_temp(&self, job: &Job);
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeDag;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;

    /// Records every call it receives as a no-op, for assertions in
    /// executor tests — the `Dag` analogue of the teacher's
    /// `FakeNotifyAdapter`.
    #[derive(Default)]
    pub struct FakeDag {
        calls: Mutex<Vec<String>>,
        pub jobid: u64,
        pub priority: i64,
        pub reason: String,
        pub dynamic: bool,
        pub dynamic_output_jobs: bool,
        pub check_output_result: Mutex<Option<Result<(), WorkflowError>>>,
    }

    impl FakeDag {
        pub fn new() -> Self {
            Self::default()
        }

        /// The ordered list of method names invoked so far.
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn record(&self, name: &str) {
            self.calls.lock().push(name.to_string());
        }
    }

    impl Dag for FakeDag {
        fn jobid(&self, _job: &Job) -> u64 {
            self.record("jobid");
            self.jobid
        }

        fn priority(&self, _job: &Job) -> i64 {
            self.record("priority");
            self.priority
        }

        fn reason(&self, _job: &Job) -> String {
            self.record("reason");
            self.reason.clone()
        }

        fn is_dynamic(&self, _job: &Job) -> bool {
            self.record("is_dynamic");
            self.dynamic
        }

        fn has_dynamic_output_jobs(&self) -> bool {
            self.record("has_dynamic_output_jobs");
            self.dynamic_output_jobs
        }

        fn handle_touch(&self, _job: &Job) {
            self.record("handle_touch");
        }

        fn check_output(&self, _job: &Job, _wait: Duration) -> Result<(), WorkflowError> {
            self.record("check_output");
            match self.check_output_result.lock().take() {
                Some(result) => result,
                None => Ok(()),
            }
        }

        fn handle_protected(&self, _job: &Job) {
            self.record("handle_protected");
        }

        fn handle_temp(&self, _job: &Job) {
            self.record("handle_temp");
        }
    }
}

#[cfg(test)]
#[path = "dag_tests.rs"]
mod tests;
