use super::*;
use oj_core::test_support::test_job;
use parking_lot::Mutex;
use std::path::PathBuf;
use tempfile::tempdir;

struct CountingRunFunc {
    calls: Mutex<u32>,
    fail: bool,
}

impl RunFunc for CountingRunFunc {
    fn call(&self, _ctx: &oj_core::RunContext) -> Result<(), RuleError> {
        *self.calls.lock() += 1;
        if self.fail {
            Err(RuleError::new("align", "boom"))
        } else {
            Ok(())
        }
    }
}

#[test]
fn test_run_wrapper_runs_once_without_benchmark() {
    let job = test_job("align");
    let run_func = CountingRunFunc { calls: Mutex::new(0), fail: false };

    run_wrapper(&job, &run_func, &LineMaps::new()).unwrap();

    assert_eq!(*run_func.calls.lock(), 1);
}

#[test]
fn test_run_wrapper_runs_benchmark_repeats_times() {
    let dir = tempdir().unwrap();
    let bench_path = dir.path().join("bench.tsv");
    let job = oj_core::Job::new(
        oj_core::JobConfig::builder("align")
            .benchmark(bench_path.clone())
            .benchmark_repeats(3)
            .build(),
    );
    let run_func = CountingRunFunc { calls: Mutex::new(0), fail: false };

    run_wrapper(&job, &run_func, &LineMaps::new()).unwrap();

    assert_eq!(*run_func.calls.lock(), 3);
    let contents = std::fs::read_to_string(&bench_path).unwrap();
    assert_eq!(contents.lines().count(), 4); // header + 3 rows
    assert!(contents.starts_with("s\th:m:s\n"));
}

#[test]
fn test_run_wrapper_propagates_rule_error() {
    let job = test_job("align");
    let run_func = CountingRunFunc { calls: Mutex::new(0), fail: true };

    let err = run_wrapper(&job, &run_func, &LineMaps::new()).unwrap_err();
    assert!(matches!(err, RunWrapperError::Rule(_)));
}

#[test]
fn test_run_wrapper_resolves_location_through_linemaps() {
    let job = test_job("align");
    let generated = PathBuf::from(".snakemake/generated_align.py");
    let origin = PathBuf::from("workflow/rules/align.smk");
    let mut linemaps = LineMaps::new();
    linemaps.insert(generated.clone(), 12, (origin.clone(), 34));

    struct LocatedRunFunc(PathBuf);
    impl RunFunc for LocatedRunFunc {
        fn call(&self, _ctx: &oj_core::RunContext) -> Result<(), RuleError> {
            Err(RuleError::new("align", "boom").with_location(self.0.clone(), 12))
        }
    }
    let run_func = LocatedRunFunc(generated);

    let err = run_wrapper(&job, &run_func, &linemaps).unwrap_err();
    let RunWrapperError::Rule(rule_err) = err else {
        panic!("expected a rule error");
    };
    assert_eq!(rule_err.location, Some((origin, 34)));
}

#[test]
fn test_format_timedelta_whole_seconds() {
    assert_eq!(format_timedelta(Duration::from_secs(3725)), "1:02:05");
}

#[test]
fn test_format_timedelta_with_fraction() {
    assert_eq!(
        format_timedelta(Duration::from_micros(5_250_000)),
        "0:00:05.250000"
    );
}
