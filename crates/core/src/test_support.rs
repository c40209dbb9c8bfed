// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

pub use crate::dag::FakeDag;
use crate::job::Job;
use crate::workflow::Workflow;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core domain types.
pub mod strategies {
    use crate::job::JobId;
    use proptest::prelude::*;

    /// Arbitrary ASCII rule names, the shape a Snakemake rule identifier
    /// actually takes (`[a-z][a-z0-9_]*`).
    pub fn arb_rule_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,15}"
    }

    pub fn arb_priority() -> impl Strategy<Value = i64> {
        prop_oneof![Just(JobId::HIGHEST_PRIORITY), any::<i64>(),]
    }
}

/// Builds a minimal `Workflow` pointed at a scratch directory, suitable
/// for executor tests that don't exercise workdir overrides.
pub fn test_workflow(workdir: impl Into<std::path::PathBuf>) -> Workflow {
    Workflow::builder("/usr/bin/oj-engine", "Snakefile")
        .workdir_init(workdir.into())
        .build()
}

/// A job with every field at a sane default, for tests that only care
/// about one or two fields.
pub fn test_job(rule_name: &str) -> Job {
    Job::builder().rule_name(rule_name).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_has_requested_rule_name() {
        let job = test_job("align_reads");
        assert_eq!(job.rule_name, "align_reads");
    }

    #[test]
    fn test_workflow_resolves_workdir() {
        let wf = test_workflow("/tmp/scratch");
        assert_eq!(wf.workdir(), std::path::Path::new("/tmp/scratch"));
    }
}
