// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-stage job-script template expansion: first the remote `exec_job`
//! command line that re-invokes the engine binary, then the job-script
//! wrapper template that embeds it alongside the job's JSON properties.

use oj_core::{Job, Workflow, WorkflowError};

/// The bundled default job-script template, used when
/// `Workflow.jobscript` is unset.
pub fn default_jobscript() -> &'static str {
    include_str!("../assets/jobscript.sh")
}

/// Build the remote command line that re-invokes the engine binary for a
/// single job, per the fragment in spec.md §4.6.
#[allow(clippy::too_many_arguments)]
pub fn render_exec_job(
    job: &Job,
    workflow: &Workflow,
    cores: u32,
    target: &str,
    any_dynamic_output_jobs: bool,
    suffix: Option<&str>,
) -> String {
    let mut parts = vec![format!(
        "cd {} && {} --snakefile {}",
        workflow.workdir().display(),
        workflow.snakemakepath.display(),
        workflow.snakefile.display(),
    )];

    parts.push(format!(
        "--force -j{cores} --keep-target-files --wait-for-files {inputs} --latency-wait {latency}",
        cores = cores,
        inputs = job.plainstrings_input().join(" "),
        latency = workflow.latency_wait.as_secs(),
    ));
    parts.push(format!(
        "--benchmark-repeats {}",
        workflow.benchmark_repeats
    ));

    if let Some(dir) = &workflow.overwrite_workdir {
        parts.push(format!("--directory {}", dir.display()));
    }
    if let Some(cfg) = &workflow.overwrite_configfile {
        parts.push(format!("--configfile {}", cfg.display()));
    }
    if !workflow.config_args.is_empty() {
        parts.push(format!("--config {}", workflow.config_args.join(" ")));
    }

    parts.push("--nocolor --notemp --quiet --no-hooks --nolock".to_string());

    if workflow.printshellcmds {
        parts.push("--printshellcmds".to_string());
    }

    if !any_dynamic_output_jobs {
        parts.push(format!("--allowed-rules {}", job.rule_name));
    }

    parts.push(target.to_string());

    if let Some(suffix) = suffix {
        parts.push(suffix.to_string());
    }

    parts.join(" ")
}

/// Render the job-script wrapper template, substituting `{exec_job}` with
/// `exec_job` and `{properties}` with the job's JSON properties blob.
/// Any other placeholder present in the template fails the render rather
/// than being silently dropped (spec.md §9).
pub fn render_jobscript(
    template: &str,
    job: &Job,
    exec_job: &str,
) -> Result<String, WorkflowError> {
    let properties = job.json().to_string();
    oj_core::workflow::expand_placeholders(template, |name| match name {
        "exec_job" => Some(exec_job.to_string()),
        "properties" => Some(properties.clone()),
        _ => None,
    })
}

/// The target passed to the remote invocation: the job's own outputs, or
/// (if it produces none) the bare rule name.
pub fn render_target(job: &Job) -> String {
    if job.output.is_empty() {
        job.rule_name.clone()
    } else {
        job.plainstrings_output().join(" ")
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
