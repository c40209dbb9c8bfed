use super::*;

#[test]
fn test_missing_placeholder_message_names_both() {
    let err = WorkflowError::MissingPlaceholder {
        path: PathBuf::from("job.sh"),
        placeholder: "jobid".into(),
    };
    let message = err.to_string();
    assert!(message.contains("job.sh"));
    assert!(message.contains("jobid"));
}

#[test]
fn test_invalid_jobname_message() {
    let err = WorkflowError::InvalidJobname { jobname: "my-job".into() };
    assert!(err.to_string().contains("jobid"));
}

#[test]
fn test_rule_error_without_location() {
    let err = RuleError::new("align", "division by zero");
    assert_eq!(err.to_string(), "rule align failed");
}

#[test]
fn test_rule_error_with_location() {
    let err = RuleError::new("align", "boom").with_location(PathBuf::from("Snakefile"), 42);
    assert_eq!(err.to_string(), "rule align failed at Snakefile:42");
}

#[test]
fn test_cluster_job_error_message() {
    let job_id = JobId::new();
    let err = ClusterJobError::new(job_id, PathBuf::from("/tmp/job.sh"));
    assert!(err.to_string().contains("/tmp/job.sh"));
    assert!(err.to_string().contains(job_id.as_str()));
}
