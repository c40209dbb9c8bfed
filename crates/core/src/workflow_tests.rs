use super::*;

#[test]
fn test_is_local_matches_declared_rules() {
    let wf = Workflow::builder("/usr/bin/oj-engine", "Snakefile")
        .local_rules(vec!["all".to_string(), "report".to_string()])
        .build();

    assert!(wf.is_local("all"));
    assert!(!wf.is_local("align"));
}

#[test]
fn test_workdir_prefers_override() {
    let wf = Workflow::builder("/usr/bin/oj-engine", "Snakefile")
        .workdir_init(PathBuf::from("/default"))
        .overwrite_workdir(PathBuf::from("/override"))
        .build();

    assert_eq!(wf.workdir(), Path::new("/override"));
}

#[test]
fn test_workdir_falls_back_to_init() {
    let wf = Workflow::builder("/usr/bin/oj-engine", "Snakefile")
        .workdir_init(PathBuf::from("/default"))
        .build();

    assert_eq!(wf.workdir(), Path::new("/default"));
}

#[test]
fn test_linemaps_locate_resolves_known_line() {
    let mut maps = LineMaps::new();
    maps.insert(PathBuf::from("rules/align.smk"), 10, (PathBuf::from("Snakefile"), 3));

    let origin = maps.locate(Path::new("rules/align.smk"), 10);
    assert_eq!(origin, Some((PathBuf::from("Snakefile"), 3)));
}

#[test]
fn test_linemaps_locate_returns_none_for_unknown_line() {
    let maps = LineMaps::new();
    assert_eq!(maps.locate(Path::new("rules/align.smk"), 10), None);
}

#[test]
fn test_expand_placeholders_substitutes_known_names() {
    let rendered = expand_placeholders("{greeting}, {name}!", |name| match name {
        "greeting" => Some("hello".to_string()),
        "name" => Some("world".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(rendered, "hello, world!");
}

#[test]
fn test_expand_placeholders_fails_on_unknown_name() {
    let result = expand_placeholders("{unknown}", |_| None);
    assert!(result.is_err());
}

#[test]
fn test_expand_placeholders_preserves_literal_braces_without_close() {
    let rendered = expand_placeholders("trailing {", |_| None).unwrap();
    assert_eq!(rendered, "trailing {");
}
