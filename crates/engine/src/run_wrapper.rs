// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executes a rule's in-process body one or more times (for
//! benchmarking), captures wall-clock timings, and writes the benchmark
//! TSV in the exact two-column format the original Snakemake produces
//! (`executors.py` lines 734-741).

use oj_core::{Job, LineMaps, RuleError, RunFunc, WorkflowError};
use std::io::Write;
use std::time::{Duration, Instant};

/// Runs `run_func` the number of times determined by the job's
/// benchmarking configuration (`runs = benchmark_repeats` if a benchmark
/// path is set, else 1), forwarding the job's fields as positional
/// `RunContext` arguments, matching the Python `run_wrapper` signature.
///
/// `linemaps` is the Rust stand-in for `get_exception_origin`: a
/// `RuleError` the rule body raises may carry the raw source location it
/// was detected at (e.g. a panic-catch site); that location is resolved
/// through `linemaps` back to the rule definition site in the snakefile
/// before the error is surfaced, exactly as the original walks the
/// exception's traceback through its own `linemaps` dict.
pub fn run_wrapper(
    job: &Job,
    run_func: &dyn RunFunc,
    linemaps: &LineMaps,
) -> Result<(), RunWrapperError> {
    let runs = if job.benchmark.is_some() {
        job.benchmark_repeats.max(1)
    } else {
        1
    };

    let ctx = oj_core::RunContext {
        input: job.input.clone(),
        output: job.output.clone(),
        params: job.params.clone(),
        wildcards: job.wildcards.clone(),
        threads: job.threads,
        resources: job.resources.clone(),
        log: job.log.clone(),
        version: job.rule_version.clone(),
    };

    let mut samples = Vec::with_capacity(runs as usize);
    for _ in 0..runs {
        let start = Instant::now();
        run_func
            .call(&ctx)
            .map_err(|e| attribute_rule_error(job, linemaps, e))?;
        samples.push(start.elapsed());
    }

    if let Some(path) = &job.benchmark {
        write_benchmark(path, &samples).map_err(|source| WorkflowError::BenchmarkWrite {
            path: path.clone(),
            source,
        })?;
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum RunWrapperError {
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

fn attribute_rule_error(job: &Job, linemaps: &LineMaps, mut err: RuleError) -> RunWrapperError {
    err.rule = job.rule_name.clone();
    if let Some((file, line)) = err.location {
        if let Some(origin) = linemaps.locate(&file, line) {
            err.location = Some(origin);
        }
    }
    RunWrapperError::Rule(err)
}

/// Writes the two-column (`s`, `h:m:s`) benchmark TSV, one row per
/// repeat. `s` is the raw float seconds; `h:m:s` mirrors Python's
/// `datetime.timedelta` default string form.
fn write_benchmark(path: &std::path::Path, samples: &[Duration]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "s\th:m:s")?;
    for sample in samples {
        writeln!(file, "{:.6}\t{}", sample.as_secs_f64(), format_timedelta(*sample))?;
    }
    Ok(())
}

/// Whole-second durations render as `H:MM:SS`; fractional durations
/// append `.` plus 6-digit microseconds, matching `str(timedelta(...))`.
pub fn format_timedelta(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let micros = d.subsec_micros();

    if micros == 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours}:{minutes:02}:{seconds:02}.{micros:06}")
    }
}

#[cfg(test)]
#[path = "run_wrapper_tests.rs"]
mod tests;
