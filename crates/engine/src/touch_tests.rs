use super::*;
use oj_core::test_support::FakeDag;
use oj_storage::{FilePersistence, Stats};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

fn test_executor(dir: &std::path::Path) -> TouchExecutor<FakeDag> {
    let ctx = ExecContext {
        dag: Arc::new(FakeDag::new()),
        persistence: Arc::new(FilePersistence::new(dir).unwrap()),
        stats: Arc::new(Stats::new()),
        latency_wait: Duration::from_secs(1),
    };
    TouchExecutor::new(ctx)
}

#[tokio::test]
async fn test_touch_creates_missing_outputs_and_calls_success() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let executor = test_executor(dir.path());
    let job = oj_core::Job::new(
        oj_core::JobConfig::builder("a").output(vec![out.clone()]).build(),
    );
    let job_id = job.id;

    let called = Arc::new(Mutex::new(false));
    let called2 = called.clone();

    executor
        .run(
            job,
            Arc::new(move |_job| *called2.lock().unwrap() = true),
            None,
            Arc::new(|_job| {}),
        )
        .await
        .unwrap();

    assert!(out.exists());
    assert!(*called.lock().unwrap());
    // started marker is written before the touch and left in place;
    // finished is written by the post-run protocol on success.
    assert!(dir.path().join("started").join(job_id.as_str()).exists());
    assert!(dir.path().join("finished").join(job_id.as_str()).exists());
}
