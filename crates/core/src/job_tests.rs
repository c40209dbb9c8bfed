use super::*;
use tempfile::tempdir;

#[test]
fn test_is_highest_priority() {
    let job = Job::builder().rule_name("a").priority(JobId::HIGHEST_PRIORITY).build();
    assert!(job.is_highest_priority());

    let job = Job::builder().rule_name("a").priority(5).build();
    assert!(!job.is_highest_priority());
}

#[test]
fn test_prepare_creates_output_directories() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("nested/deep");
    let job = Job::builder()
        .rule_name("a")
        .output(vec![nested.join("out.txt")])
        .build();

    job.prepare().unwrap();
    assert!(nested.is_dir());
}

#[test]
fn test_cleanup_removes_existing_outputs() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out.txt");
    std::fs::write(&out, b"partial").unwrap();

    let job = Job::builder().rule_name("a").output(vec![out.clone()]).build();
    job.cleanup();

    assert!(!out.exists());
}

#[test]
fn test_cleanup_tolerates_missing_outputs() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("never-existed.txt");
    let job = Job::builder().rule_name("a").output(vec![out]).build();

    job.cleanup();
}

#[cfg(unix)]
#[test]
fn test_check_protected_output_detects_read_only_file() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let out = dir.path().join("out.txt");
    std::fs::write(&out, b"done").unwrap();
    std::fs::set_permissions(&out, std::fs::Permissions::from_mode(0o444)).unwrap();

    let job = Job::builder().rule_name("a").output(vec![out]).build();
    assert!(job.check_protected_output().is_err());
}

#[cfg(unix)]
#[test]
fn test_check_protected_output_allows_writable_file() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out.txt");
    std::fs::write(&out, b"done").unwrap();

    let job = Job::builder().rule_name("a").output(vec![out]).build();
    assert!(job.check_protected_output().is_ok());
}

#[test]
fn test_touch_outputs_creates_missing_files() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let job = Job::builder().rule_name("a").output(vec![out.clone()]).build();

    job.touch_outputs().unwrap();
    assert!(out.exists());
}

#[test]
fn test_json_includes_core_fields() {
    let job = Job::builder()
        .rule_name("align")
        .input(vec![PathBuf::from("a.fq")])
        .output(vec![PathBuf::from("a.bam")])
        .threads(4)
        .build();

    let value = job.json();
    assert_eq!(value["rule"], "align");
    assert_eq!(value["threads"], 4);
    assert_eq!(value["input"][0], "a.fq");
    assert_eq!(value["output"][0], "a.bam");
}

#[test]
fn test_format_wildcards_substitutes_known_names() {
    let mut wildcards = IndexMap::new();
    wildcards.insert("sample".to_string(), "s1".to_string());
    let job = Job::builder().rule_name("align").wildcards(wildcards).build();

    let rendered = job
        .format_wildcards("{rulename}-{sample}", &IndexMap::new())
        .unwrap();
    assert_eq!(rendered, "align-s1");
}

#[test]
fn test_format_wildcards_fails_on_unknown_name() {
    let job = Job::builder().rule_name("align").build();
    let result = job.format_wildcards("{missing}", &IndexMap::new());
    assert!(result.is_err());
}

#[test]
fn test_plainstrings_render_display_form() {
    let job = Job::builder()
        .rule_name("a")
        .input(vec![PathBuf::from("in/a.txt")])
        .build();
    assert_eq!(job.plainstrings_input(), vec!["in/a.txt".to_string()]);
}
