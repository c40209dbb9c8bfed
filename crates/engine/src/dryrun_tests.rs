use super::*;
use oj_core::test_support::FakeDag;
use oj_storage::FilePersistence;
use oj_storage::Stats;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

fn test_executor(dir: &std::path::Path) -> DryRunExecutor<FakeDag> {
    let ctx = ExecContext {
        dag: Arc::new(FakeDag::new()),
        persistence: Arc::new(FilePersistence::new(dir).unwrap()),
        stats: Arc::new(Stats::new()),
        latency_wait: std::time::Duration::from_secs(1),
    };
    let workflow = oj_core::Workflow::builder("/usr/bin/oj-engine", "Snakefile")
        .workdir_init(PathBuf::from(dir))
        .build();
    DryRunExecutor::new(ctx, workflow, 4)
}

#[tokio::test]
async fn test_dry_run_invokes_on_success_without_touching_outputs() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let executor = test_executor(dir.path());
    let job = oj_core::Job::new(
        oj_core::JobConfig::builder("a").output(vec![out.clone()]).build(),
    );

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

    assert!(*called.lock().unwrap());
    assert!(!out.exists());
}

#[tokio::test]
async fn test_dry_run_never_writes_persistence_marker() {
    let dir = tempdir().unwrap();
    let executor = test_executor(dir.path());
    let job = oj_core::Job::new(oj_core::JobConfig::builder("a").build());

    executor
        .run(job.clone(), Arc::new(|_job| {}), None, Arc::new(|_job| {}))
        .await
        .unwrap();

    let started_marker = dir.path().join("started").join(job.id.as_str());
    assert!(!started_marker.exists());
}

#[tokio::test]
async fn test_dry_run_fails_on_protected_output() {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let out = dir.path().join("locked.bin");
        std::fs::write(&out, b"done").unwrap();
        std::fs::set_permissions(&out, std::fs::Permissions::from_mode(0o444)).unwrap();

        let executor = test_executor(dir.path());
        let job = oj_core::Job::new(
            oj_core::JobConfig::builder("a").output(vec![out]).build(),
        );

        let result = executor
            .run(job, Arc::new(|_| {}), None, Arc::new(|_| {}))
            .await;
        assert!(result.is_err());
    }
}
