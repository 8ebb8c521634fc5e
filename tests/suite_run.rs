//! End-to-end runs of `exec` documents loaded from a directory.

use docket::{Context, LoadError, ParseError, RunReport, Runnable};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

fn load(ctx: &Context, dir: &TempDir) -> Runnable {
    docket::from_path(ctx, dir.path()).unwrap()
}

fn file_names(report: &RunReport) -> Vec<String> {
    report.files().iter().map(|f| f.name.clone()).collect()
}

#[test]
fn files_run_in_lexical_order_and_failures_do_not_stop_the_suite() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "b_second.yaml",
        r#"
tests:
  - name: greet
    exec: echo second
    expect:
      stdout: "second\n"
"#,
    );
    write(
        dir.path(),
        "a_first.yaml",
        r#"
tests:
  - name: wrong exit
    exec: "false"
  - name: still runs
    exec: echo first
    expect:
      stdout: { contains: first }
"#,
    );

    let ctx = Context::new();
    let tree = load(&ctx, &dir);
    let report = tree.execute(&ctx);

    assert_eq!(file_names(&report), vec!["a_first.yaml", "b_second.yaml"]);
    assert!(!report.passed());

    let files = report.files();
    assert_eq!(files[0].units.len(), 2);
    assert!(!files[0].units[0].passed);
    assert!(files[0].units[1].passed);
    assert!(files[1].passed());

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].location.ends_with("a_first.yaml/wrong exit"));
    assert_eq!(failures[0].message, "exit code: expected 0, got 1");

    let counts = report.counts();
    assert_eq!(counts.files, 2);
    assert_eq!(counts.units, 3);
    assert_eq!(counts.failed_units, 1);

    let err = tree.run(&ctx).unwrap_err();
    assert_eq!(err.failures().len(), 1);
}

#[test]
fn previous_output_chains_within_a_file_only() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "a.yaml",
        r#"
tests:
  - exec: echo hello
  - run: { cmd: cat, stdin: $PREV_STDOUT }
    expect: { stdout: "hello\n" }
"#,
    );
    write(
        dir.path(),
        "b.yaml",
        r#"
tests:
  - name: no previous output here
    run: { cmd: cat, stdin: $PREV_STDOUT }
"#,
    );

    let ctx = Context::new();
    let report = load(&ctx, &dir).execute(&ctx);

    let files = report.files();
    assert!(files[0].passed(), "{:?}", files[0]);
    assert!(!files[1].passed());
    assert!(files[1].units[0].failures[0].contains("$PREV_STDOUT used before any command ran"));
}

#[test]
fn large_output_chains_without_stalling() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "big.yaml",
        r#"
defaults:
  timeout: 5
tests:
  - name: produce
    run: { cmd: sh, args: ["-c", "head -c 300000 /dev/zero | tr '\\0' q"] }
  - name: relay
    run: { cmd: cat, stdin: $PREV_STDOUT }
  - name: measure
    run: { cmd: wc, args: ["-c"], stdin: $PREV_STDOUT }
    expect:
      stdout: { regex: '^\s*300000\s*$' }
"#,
    );

    let ctx = Context::new();
    let report = load(&ctx, &dir).execute(&ctx);
    assert!(report.passed(), "{:?}", report.failures());
    assert_eq!(report.counts().units, 3);
}

#[test]
fn missing_fixture_fails_only_that_file() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "a.yaml",
        "require: [books_api]\ntests:\n  - exec: echo never\n",
    );
    write(dir.path(), "b.yaml", "tests:\n  - exec: echo fine\n");

    let ctx = Context::new();
    let report = load(&ctx, &dir).execute(&ctx);

    let files = report.files();
    assert_eq!(
        files[0].error.as_deref(),
        Some("required fixture 'books_api' not found")
    );
    assert!(files[0].units.is_empty());
    assert!(files[1].passed());
    assert_eq!(report.counts().file_errors, 1);

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].location.ends_with("a.yaml"));
}

#[test]
fn unknown_type_fails_the_load() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.yaml", "type: carrier-pigeon\ntests: []\n");

    let err = docket::from_path(&Context::new(), dir.path()).unwrap_err();
    assert!(err.to_string().ends_with("unknown test type 'carrier-pigeon'"));
    assert!(err.to_string().contains("a.yaml"));
    assert!(matches!(err, LoadError::Parse { source: ParseError::UnknownType(_), .. }));
}

#[test]
fn single_file_path_loads_as_file() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "one.yml",
        "name: just one\ndescription: a lone document\ntests:\n  - exec: \"true\"\n",
    );

    let ctx = Context::new();
    let tree = docket::from_path(&ctx, dir.path().join("one.yml")).unwrap();
    let Runnable::File(file) = &tree else {
        panic!("expected a file, got {tree:?}");
    };
    assert_eq!(file.name(), "just one");
    assert_eq!(file.description(), "a lone document");

    let report = tree.run(&ctx).unwrap();
    assert_eq!(report.counts().units, 1);
}

#[test]
fn in_memory_documents_run_without_a_path() {
    let ctx = Context::new();
    let file = docket::from_bytes(
        &ctx,
        b"type: EXEC\ntests:\n  - exec: echo mem\n    expect: { stdout: \"mem\\n\" }\n",
    )
    .unwrap();
    assert_eq!(file.name(), "");
    assert!(file.path().is_none());

    let report = Runnable::File(file).run(&ctx).unwrap();
    assert!(report.passed());
}

#[test]
fn relative_cwd_is_the_document_directory() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("work")).unwrap();
    write(dir.path().join("work").as_path(), "marker.txt", "found me");
    write(
        dir.path(),
        "cwd.yaml",
        r#"
defaults:
  cwd: work
tests:
  - exec: cat marker.txt
    expect: { stdout: "found me" }
"#,
    );

    let ctx = Context::new();
    let report = load(&ctx, &dir).execute(&ctx);
    assert!(report.passed(), "{:?}", report.failures());
}

#[test]
fn junit_report_from_a_real_run() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "a.yaml",
        "tests:\n  - name: ok\n    exec: \"true\"\n  - name: bad <one>\n    exec: \"false\"\n",
    );

    let ctx = Context::new();
    let xml = load(&ctx, &dir).execute(&ctx).to_junit_xml();
    assert!(xml.contains("tests=\"2\" failures=\"1\" errors=\"0\""));
    assert!(xml.contains("<testcase name=\"bad &lt;one&gt;\""));
    assert!(xml.contains("exit code: expected 0, got 1"));
}

#[test]
fn report_serializes_to_json() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.yaml", "tests:\n  - exec: echo x\n");

    let ctx = Context::new();
    let report = load(&ctx, &dir).execute(&ctx);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["kind"], "suite");
    assert_eq!(json["children"][0]["name"], "a.yaml");
    assert_eq!(json["children"][0]["units"][0]["name"], "echo x");
    assert_eq!(json["children"][0]["units"][0]["passed"], true);
}
