use super::*;
use oj_core::test_support::FakeDag;
use oj_storage::{FilePersistence, Stats};
use std::path::PathBuf;
use std::sync::Mutex as StdMutex;
use tempfile::tempdir;
use tokio::sync::oneshot;

fn test_executor(dir: &std::path::Path, workers: u32) -> CpuExecutor<FakeDag> {
    let ctx = ExecContext {
        dag: Arc::new(FakeDag::new()),
        persistence: Arc::new(FilePersistence::new(dir).unwrap()),
        stats: Arc::new(Stats::new()),
        latency_wait: std::time::Duration::from_secs(1),
    };
    CpuExecutor::new(ctx, workers, true, oj_core::LineMaps::new())
}

#[tokio::test]
async fn test_cpu_happy_path_runs_shell_command() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let executor = test_executor(dir.path(), 1);

    let job = oj_core::Job::new(
        oj_core::JobConfig::builder("a")
            .output(vec![out.clone()])
            .shellcmd(format!("echo hi > {}", out.display()))
            .build(),
    );

    let (tx, rx) = oneshot::channel();
    let tx = StdMutex::new(Some(tx));

    executor
        .run(
            job,
            Arc::new(move |_job| {
                if let Some(tx) = tx.lock().unwrap().take() {
                    let _ = tx.send(());
                }
            }),
            None,
            Arc::new(|_job| {}),
        )
        .await
        .unwrap();

    rx.await.unwrap();
    assert!(out.exists());
}

#[tokio::test]
async fn test_cpu_shell_failure_invokes_on_error() {
    let dir = tempdir().unwrap();
    let executor = test_executor(dir.path(), 1);

    let job = oj_core::Job::new(
        oj_core::JobConfig::builder("a")
            .shellcmd("exit 1".to_string())
            .build(),
    );

    let (tx, rx) = oneshot::channel();
    let tx = StdMutex::new(Some(tx));

    executor
        .run(
            job,
            Arc::new(|_job| {}),
            None,
            Arc::new(move |_job| {
                if let Some(tx) = tx.lock().unwrap().take() {
                    let _ = tx.send(());
                }
            }),
        )
        .await
        .unwrap();

    rx.await.unwrap();
}

#[tokio::test]
async fn test_cpu_runs_inprocess_run_func() {
    struct WritesMarker(PathBuf);
    impl oj_core::RunFunc for WritesMarker {
        fn call(&self, _ctx: &oj_core::RunContext) -> Result<(), oj_core::RuleError> {
            std::fs::write(&self.0, b"done").map_err(|e| oj_core::RuleError::new("a", e.to_string()))
        }
    }

    let dir = tempdir().unwrap();
    let out = dir.path().join("out.marker");
    let executor = test_executor(dir.path(), 1);

    let job = oj_core::Job::new(
        oj_core::JobConfig::builder("a")
            .output(vec![out.clone()])
            .run_func(Some(Arc::new(WritesMarker(out.clone()))))
            .build(),
    );

    let (tx, rx) = oneshot::channel();
    let tx = StdMutex::new(Some(tx));

    executor
        .run(
            job,
            Arc::new(move |_job| {
                if let Some(tx) = tx.lock().unwrap().take() {
                    let _ = tx.send(());
                }
            }),
            None,
            Arc::new(|_job| {}),
        )
        .await
        .unwrap();

    rx.await.unwrap();
    assert!(out.exists());
}

#[tokio::test]
async fn test_cpu_rejects_protected_output() {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let out = dir.path().join("locked.bin");
        std::fs::write(&out, b"done").unwrap();
        std::fs::set_permissions(&out, std::fs::Permissions::from_mode(0o444)).unwrap();

        let executor = test_executor(dir.path(), 1);
        let job = oj_core::Job::new(
            oj_core::JobConfig::builder("a").output(vec![out]).build(),
        );

        let result = executor
            .run(job, Arc::new(|_| {}), None, Arc::new(|_| {}))
            .await;
        assert!(result.is_err());
    }
}
