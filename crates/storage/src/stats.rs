// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock start/end accumulator, reported into by every executor
//! backend's post-run protocol.

use oj_core::{Job, JobId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct Stats {
    starts: Mutex<HashMap<JobId, Instant>>,
    durations: Mutex<HashMap<JobId, Duration>>,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_job_start(&self, job: &Job) {
        self.starts.lock().insert(job.id, Instant::now());
    }

    pub fn report_job_end(&self, job: &Job) {
        let start = self.starts.lock().remove(&job.id);
        if let Some(start) = start {
            self.durations.lock().insert(job.id, start.elapsed());
        }
    }

    pub fn duration(&self, job_id: JobId) -> Option<Duration> {
        self.durations.lock().get(&job_id).copied()
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
