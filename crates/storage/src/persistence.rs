// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sentinel-marker-file persistence: one empty file per job per state,
//! mirroring the Python original's `persistence` module rather than the
//! teacher's own write-ahead log (which solves a different problem —
//! replaying a richer event stream, not per-job start/finish markers).

use oj_core::Job;
use std::io;
use std::path::{Path, PathBuf};

/// Records that a job started and finished, and removes its markers on
/// cleanup. Implementors may be backed by a filesystem, a database, or
/// (in tests) nothing at all.
pub trait Persistence: Send + Sync {
    fn path(&self) -> &Path;
    fn started(&self, job: &Job) -> io::Result<()>;
    fn finished(&self, job: &Job) -> io::Result<()>;
    fn cleanup(&self, job: &Job);
}

/// `<path>/started/<jobid>` and `<path>/finished/<jobid>` sentinel files.
pub struct FilePersistence {
    root: PathBuf,
}

impl FilePersistence {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join("started"))?;
        std::fs::create_dir_all(root.join("finished"))?;
        Ok(Self { root })
    }

    fn started_marker(&self, job: &Job) -> PathBuf {
        self.root.join("started").join(job.id.as_str())
    }

    fn finished_marker(&self, job: &Job) -> PathBuf {
        self.root.join("finished").join(job.id.as_str())
    }
}

impl Persistence for FilePersistence {
    fn path(&self) -> &Path {
        &self.root
    }

    fn started(&self, job: &Job) -> io::Result<()> {
        std::fs::write(self.started_marker(job), b"")
    }

    fn finished(&self, job: &Job) -> io::Result<()> {
        std::fs::write(self.finished_marker(job), b"")
    }

    fn cleanup(&self, job: &Job) {
        for marker in [self.started_marker(job), self.finished_marker(job)] {
            if marker.exists() {
                if let Err(e) = std::fs::remove_file(&marker) {
                    tracing::warn!(job_id = %job.id, marker = %marker.display(), error = %e, "failed to remove persistence marker");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "persistence_tests.rs"]
mod tests;
