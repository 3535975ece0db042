#![forbid(unsafe_code)]

use kiln_api::{export, Config, ResourceSet};
use kiln_core::Resource;
use kiln_decode::{decode_str, split_documents};
use kiln_registry::builtin;
use serde_json::Value as Json;

const FIVE: &str = r#"
apiVersion: v1
kind: Namespace
metadata:
  name: argo
---
apiVersion: v1
kind: ServiceAccount
metadata:
  name: argo-server
  namespace: argo
  creationTimestamp: "2024-01-01T00:00:00Z"
---
apiVersion: rbac.authorization.k8s.io/v1
kind: ClusterRole
metadata:
  name: argo-cluster-role
rules:
  - apiGroups: [""]
    resources: ["pods"]
    verbs: ["get", "list", "watch"]
---
apiVersion: rbac.authorization.k8s.io/v1
kind: ClusterRoleBinding
metadata:
  name: argo-binding
roleRef:
  apiGroup: rbac.authorization.k8s.io
  kind: ClusterRole
  name: argo-cluster-role
subjects:
  - kind: ServiceAccount
    name: argo-server
    namespace: argo
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: argo-server
  namespace: argo
  labels:
    app: argo-server
spec:
  replicas: 2
  selector:
    matchLabels:
      app: argo-server
  template:
    metadata:
      labels:
        app: argo-server
    spec:
      serviceAccountName: argo-server
      containers:
        - name: argo-server
          image: argoproj/argocli:v3.0
          ports:
            - containerPort: 2746
status:
  replicas: 2
  readyReplicas: 2
"#;

fn decode_all(stream: &str) -> Vec<Resource> {
    let mut out = Vec::new();
    for chunk in split_documents(stream) {
        out.extend(decode_str(&chunk, builtin()).unwrap());
    }
    out
}

/// The comparison baseline: a raw document minus its non-authoritative
/// fields.
fn authoritative(mut v: Json) -> Json {
    let obj = v.as_object_mut().unwrap();
    obj.remove("status");
    if let Some(meta) = obj.get_mut("metadata").and_then(Json::as_object_mut) {
        meta.remove("creationTimestamp");
        meta.remove("managedFields");
    }
    v
}

fn parse_yaml(text: &str) -> Json {
    let v: serde_yaml::Value = serde_yaml::from_str(text).unwrap();
    serde_json::to_value(v).unwrap()
}

#[test]
fn five_resource_round_trip_preserves_content() {
    let resources = decode_all(FIVE);
    assert_eq!(resources.len(), 5);

    let mut set = ResourceSet::new("argo");
    for r in resources {
        set.push(r);
    }
    let report = export(&set, &Config::default()).unwrap();
    assert_eq!(report.entries.len(), 5);
    assert!(report.skipped.is_empty());

    // Every emitted document equals the original's authoritative content.
    let originals: Vec<Json> = split_documents(FIVE)
        .iter()
        .map(|c| authoritative(parse_yaml(c)))
        .collect();
    for entry in &report.entries {
        let text = String::from_utf8(entry.data.clone()).unwrap();
        assert!(!text.contains("status:"), "{}: status leaked", entry.path);
        assert!(!text.contains("creationTimestamp"), "{}: timestamp leaked", entry.path);
        let emitted = parse_yaml(&text);
        assert!(
            originals.contains(&emitted),
            "{} does not match any input document:\n{text}",
            entry.path
        );
    }
}

#[test]
fn namespace_sorts_before_its_tenants() {
    let resources = decode_all(FIVE);
    let mut set = ResourceSet::new("argo");
    for r in resources {
        set.push(r);
    }
    let report = export(&set, &Config::default()).unwrap();
    let paths: Vec<&str> = report.entries.iter().map(|e| e.path.as_str()).collect();
    let ns = paths.iter().position(|p| p.contains("argo_ns")).unwrap();
    let sa = paths.iter().position(|p| p.contains("_sa")).unwrap();
    let deploy = paths.iter().position(|p| p.contains("_deploy")).unwrap();
    assert!(ns < sa && ns < deploy, "namespace must come first: {paths:?}");
}

#[test]
fn export_runs_are_byte_identical() {
    let run = || {
        let mut set = ResourceSet::new("argo");
        for r in decode_all(FIVE) {
            set.push(r);
        }
        export(&set, &Config::default()).unwrap().entries
    };
    let a = run();
    let b = run();
    assert_eq!(a, b);
}

#[test]
fn duplicate_identity_leaves_no_output() {
    let resources = decode_all(FIVE);
    let mut set = ResourceSet::new("argo");
    let dup = resources[0].clone();
    for r in resources {
        set.push(r);
    }
    set.push(dup);
    let err = export(&set, &Config::default()).unwrap_err();
    assert!(err.is_structural(), "{err}");
}

#[test]
fn collision_suffixed_resources_keep_their_identities() {
    // Same name and kind in two namespaces: identifiers diverge, identities
    // survive in the emitted documents.
    let stream = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: conf
  namespace: one
data: {k: "1"}
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: conf
  namespace: two
data: {k: "2"}
"#;
    let mut set = ResourceSet::new("app");
    for r in decode_all(stream) {
        set.push(r);
    }
    let report = export(&set, &Config::default()).unwrap();
    let paths: Vec<&str> = report.entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, ["2_conf_cm.yaml", "2_conf_cm1.yaml"]);
    let namespaces: Vec<String> = report
        .entries
        .iter()
        .map(|e| parse_yaml(&String::from_utf8(e.data.clone()).unwrap())["metadata"]["namespace"]
            .as_str()
            .unwrap()
            .to_string())
        .collect();
    assert!(namespaces.contains(&"one".to_string()));
    assert!(namespaces.contains(&"two".to_string()));
}
