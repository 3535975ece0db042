#![forbid(unsafe_code)]

use kiln_api::{codify, write_report, Config, Layout, Sink};
use kiln_decode::Source;
use kiln_registry::builtin;

const STACK: &str = r#"
apiVersion: v1
kind: Namespace
metadata:
  name: web
---
apiVersion: v1
kind: Service
metadata:
  name: web
  namespace: web
spec:
  selector:
    app: web
  ports:
    - port: 80
      targetPort: http
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: web
spec:
  replicas: 1
  selector:
    matchLabels:
      app: web
  template:
    metadata:
      labels:
        app: web
    spec:
      containers:
        - name: web
          image: nginx:1.25
"#;

fn reader(text: &'static str) -> Source {
    Source::Reader(Box::new(text.as_bytes()))
}

#[test]
fn per_resource_layout_emits_one_file_per_declaration() {
    let report = codify(reader(STACK), builtin(), &Config::default()).unwrap();
    let paths: Vec<&str> = report.entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, ["app/mod.rs", "app/web_deploy.rs", "app/web_ns.rs", "app/web_svc.rs"]);

    let modfile = String::from_utf8(report.entries[0].data.clone()).unwrap();
    assert!(modfile.contains("pub mod web_deploy;"));
    assert!(modfile.contains("pub mod web_svc;"));

    let deploy = report.entries.iter().find(|e| e.path.ends_with("web_deploy.rs")).unwrap();
    let text = String::from_utf8(deploy.data.clone()).unwrap();
    assert!(text.contains("use k8s_openapi::api::apps::v1::Deployment;"));
    assert!(text.contains("pub fn web_deploy() -> Deployment {"));
    assert!(text.starts_with("// Code generated by app. DO NOT EDIT."));
}

#[test]
fn grouped_layout_bundles_declarations_by_kind() {
    let cfg = Config { layout: Layout::Grouped, module_name: "stack".into(), ..Default::default() };
    let report = codify(reader(STACK), builtin(), &cfg).unwrap();
    let paths: Vec<&str> = report.entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, ["stack/deployment.rs", "stack/mod.rs", "stack/namespace.rs", "stack/service.rs"]);
}

#[test]
fn single_file_layout_holds_everything() {
    let cfg = Config {
        layout: Layout::SingleDocument,
        module_name: "stack".into(),
        convenience: true,
        ..Default::default()
    };
    let report = codify(reader(STACK), builtin(), &cfg).unwrap();
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].path, "stack.rs");
    let text = String::from_utf8(report.entries[0].data.clone()).unwrap();
    assert!(text.contains("pub fn web_ns() -> Namespace {"));
    assert!(text.contains("pub fn web_svc() -> Service {"));
    assert!(text.contains("pub fn manifest() -> Vec<serde_json::Value>"));
    assert!(text.contains("serde_json::to_value(web_deploy())"));
}

#[test]
fn ignore_mode_collects_failures_and_keeps_going() {
    let stream = r#"
apiVersion: v1
kind: Namespace
metadata:
  name: ok
---
apiVersion: widgets.example.com/v1
kind: Widget
metadata:
  name: unknown
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: also-ok
data: {k: v}
"#;
    let strict = Config::default();
    assert!(codify(Source::Reader(Box::new(stream.as_bytes())), builtin(), &strict).is_err());

    let lenient = Config { ignore_errors: true, ..Default::default() };
    let report = codify(Source::Reader(Box::new(stream.as_bytes())), builtin(), &lenient).unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].to_string().contains("Widget"));
    let paths: Vec<&str> = report.entries.iter().map(|e| e.path.as_str()).collect();
    assert!(paths.iter().any(|p| p.ends_with("ok_ns.rs")));
    assert!(paths.iter().any(|p| p.ends_with("also-ok_cm.rs") || p.ends_with("also_ok_cm.rs")));
}

#[test]
fn codify_runs_are_byte_identical() {
    let run = || codify(reader(STACK), builtin(), &Config::default()).unwrap().entries;
    assert_eq!(run(), run());
}

#[test]
fn concurrent_runs_never_share_session_state() {
    let spawn = || {
        std::thread::spawn(|| codify(reader(STACK), builtin(), &Config::default()).unwrap().entries)
    };
    let a = spawn();
    let b = spawn();
    let sequential = codify(reader(STACK), builtin(), &Config::default()).unwrap().entries;
    assert_eq!(a.join().unwrap(), sequential);
    assert_eq!(b.join().unwrap(), sequential);
}

#[test]
fn missing_input_files_are_recoverable_only_in_ignore_mode() {
    let missing = std::path::PathBuf::from("/definitely/not/here.yaml");
    let strict = Config::default();
    let err = codify(Source::Files(vec![missing.clone()]), builtin(), &strict).unwrap_err();
    assert!(err.to_string().contains("not/here.yaml"));

    let lenient = Config { ignore_errors: true, ..Default::default() };
    let report = codify(Source::Files(vec![missing]), builtin(), &lenient).unwrap();
    assert!(report.entries.is_empty());
    assert_eq!(report.skipped.len(), 1);
}

#[test]
fn write_report_fills_a_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let report = codify(reader(STACK), builtin(), &Config::default()).unwrap();
    let mut sink = Sink::Directory(tmp.path().to_path_buf());
    write_report(&report, &mut sink).unwrap();
    assert!(tmp.path().join("app/mod.rs").is_file());
    assert!(tmp.path().join("app/web_deploy.rs").is_file());
}
