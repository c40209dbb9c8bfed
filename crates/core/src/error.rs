// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy for the job execution layer.
//!
//! Three kinds, matching spec.md §7: a [`WorkflowError`] for
//! misconfiguration and infrastructure failures that halt the run, a
//! [`RuleError`] for a user rule body raising, and a [`ClusterJobError`]
//! for a remote job that failed after submission.

use crate::job::JobId;
use std::path::PathBuf;

/// Misconfiguration, unreadable template, missing placeholder, non-zero
/// submit exit, benchmark write failure, or DRMAA load failure. Propagates
/// to the caller of `run` rather than through an error callback.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("job script template {path} is missing required placeholder {placeholder:?}")]
    MissingPlaceholder { path: PathBuf, placeholder: String },

    #[error("jobname must contain the literal placeholder \"jobid\": {jobname:?}")]
    InvalidJobname { jobname: String },

    #[error("submit command exited with status {status}: {stderr}")]
    SubmitFailed { status: i32, stderr: String },

    #[error("failed to write benchmark file {path}: {source}")]
    BenchmarkWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load DRMAA library at {path}: {source}")]
    DrmaaLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("DRMAA session initialization failed: {0}")]
    DrmaaInit(String),

    #[error("output {path} was not produced within the latency window")]
    OutputNotFound { path: PathBuf },

    #[error(transparent)]
    Protected(#[from] ProtectedOutputError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A user rule body raised during `run_wrapper`. Carries the source
/// location recovered from `Workflow::linemaps`, when available.
#[derive(Debug, thiserror::Error)]
#[error("rule {rule} failed{}", .location.as_ref().map(|l| format!(" at {}:{}", l.0.display(), l.1)).unwrap_or_default())]
pub struct RuleError {
    pub rule: String,
    pub message: String,
    pub location: Option<(PathBuf, u32)>,
}

impl RuleError {
    pub fn new(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, path: PathBuf, line: u32) -> Self {
        self.location = Some((path, line));
        self
    }
}

/// A remote job that failed after submission: sentinel, non-zero exit, or
/// non-zero DRMAA exit status. Surfaced through the error callback with
/// the job id and jobscript path, per spec.md §7.
#[derive(Debug, thiserror::Error)]
#[error("cluster job {job_id} failed (script: {jobscript})")]
pub struct ClusterJobError {
    pub job_id: JobId,
    pub jobscript: PathBuf,
    pub detail: Option<String>,
}

impl ClusterJobError {
    pub fn new(job_id: JobId, jobscript: PathBuf) -> Self {
        Self {
            job_id,
            jobscript,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// A declared output still carries the read-only protection marker.
#[derive(Debug, thiserror::Error)]
#[error("output {path} of job {job_id} is protected")]
pub struct ProtectedOutputError {
    pub job_id: JobId,
    pub path: PathBuf,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
