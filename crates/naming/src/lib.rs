//! Kiln naming and ranking: collision-free identifiers, file paths, and a
//! partial application order.
//!
//! Every function here is pure except for the collision counters, which live
//! in the caller's [`Session`] and are scoped to one run.

#![forbid(unsafe_code)]

use kiln_core::Session;

/// Kind abbreviations used as identifier suffixes. Unlisted kinds fall back
/// to the lowercased kind.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("Namespace", "ns"),
    ("Deployment", "deploy"),
    ("StatefulSet", "sts"),
    ("DaemonSet", "ds"),
    ("ReplicaSet", "rs"),
    ("Pod", "pod"),
    ("Job", "job"),
    ("CronJob", "cj"),
    ("Service", "svc"),
    ("ServiceAccount", "sa"),
    ("ConfigMap", "cm"),
    ("Secret", "secret"),
    ("Role", "role"),
    ("RoleBinding", "rb"),
    ("ClusterRole", "cr"),
    ("ClusterRoleBinding", "crb"),
    ("PersistentVolume", "pv"),
    ("PersistentVolumeClaim", "pvc"),
    ("StorageClass", "sc"),
    ("CustomResourceDefinition", "crd"),
    ("Ingress", "ing"),
    ("NetworkPolicy", "netpol"),
    ("HorizontalPodAutoscaler", "hpa"),
    ("PodDisruptionBudget", "pdb"),
    ("ValidatingWebhookConfiguration", "vwc"),
    ("MutatingWebhookConfiguration", "mwc"),
    ("PriorityClass", "pc"),
];

pub fn abbreviate(kind: &str) -> String {
    ABBREVIATIONS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, a)| (*a).to_string())
        .unwrap_or_else(|| kind.to_ascii_lowercase())
}

/// Camel-case kind to its separated form: `ClusterRole` → `cluster-role`.
fn kebab(kind: &str) -> String {
    let mut out = String::with_capacity(kind.len() + 4);
    for (i, ch) in kind.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Derives the base identifier for a named resource of a kind.
///
/// The kind's abbreviation is appended with `_`; if the name already ends
/// with the kind (full, separated, or abbreviated form, behind a `-`/`_`
/// separator), that suffix is dropped first so the kind never repeats.
pub fn basic_name(name: &str, kind: &str) -> String {
    let abbrev = abbreviate(kind);
    let kebab = kebab(kind);
    let mut forms = vec![kebab.replace('-', ""), kebab.replace('-', "_"), kebab, abbrev.clone()];
    forms.sort_by_key(|f| std::cmp::Reverse(f.len()));

    let lower = name.to_ascii_lowercase();
    let mut stem = name;
    for form in &forms {
        if lower == *form {
            stem = "";
            break;
        }
        for sep in ['-', '_'] {
            if lower.ends_with(form.as_str()) {
                let cut = lower.len() - form.len();
                if lower[..cut].ends_with(sep) {
                    stem = &name[..cut - 1];
                }
            }
        }
        if stem.len() != name.len() {
            break;
        }
    }

    if stem.is_empty() {
        abbrev
    } else {
        format!("{stem}_{abbrev}")
    }
}

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "crate", "do", "dyn", "else",
    "enum", "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod",
    "move", "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while",
];

/// Maps an arbitrary name onto a legal snake_case identifier.
pub fn sanitize(base: &str) -> String {
    let mut out = String::with_capacity(base.len());
    for ch in base.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }
    if out.is_empty() || out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if KEYWORDS.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

/// Collision counters recycle past this bound so suffixes stay short.
pub const COLLISION_BOUND: u32 = 1000;

/// Collision-free identifier within the session's output unit. Repeated
/// bases get a numeric suffix from the session counter.
pub fn identifier(session: &mut Session, base: &str) -> String {
    let base = sanitize(base);
    let n = session.counters.entry(base.clone()).or_insert(0);
    *n += 1;
    if *n > COLLISION_BOUND {
        *n = 2;
    }
    match *n {
        1 => base,
        n => format!("{base}{}", n - 1),
    }
}

/// Integer ordering class: owners precede dependents. A hint, not a
/// correctness guarantee beyond that.
pub fn rank(kind: &str) -> u8 {
    match kind {
        "Namespace" => 0,
        // Cluster-scoped resources nothing else needs to exist first.
        "CustomResourceDefinition" | "ClusterRole" | "PersistentVolume" | "StorageClass"
        | "PriorityClass" | "IngressClass" | "RuntimeClass" => 1,
        // Namespaced plumbing workloads depend on.
        "ServiceAccount" | "ClusterRoleBinding" | "Role" | "RoleBinding" | "ConfigMap"
        | "Secret" | "Service" | "PersistentVolumeClaim" | "NetworkPolicy"
        | "PodDisruptionBudget" | "HorizontalPodAutoscaler" => 2,
        "Deployment" | "StatefulSet" | "DaemonSet" | "ReplicaSet" | "Pod" | "Job" | "CronJob" => 3,
        _ => 4,
    }
}

/// Directory bucket for the exploded layout.
///
/// Namespaced resources bucket by namespace (sentinel when absent);
/// cluster-scoped resources fall into fixed categories.
pub fn classify(kind: &str, namespace: Option<&str>, namespaced: bool) -> String {
    if namespaced {
        return namespace.unwrap_or("_no_namespace").to_string();
    }
    match kind {
        "Namespace" => "namespaces".to_string(),
        "ClusterRole" | "ClusterRoleBinding" => "rbac".to_string(),
        "ValidatingWebhookConfiguration" | "MutatingWebhookConfiguration" => "admission".to_string(),
        "PersistentVolume" | "StorageClass" | "CSIDriver" | "VolumeAttachment" => "storage".to_string(),
        "CustomResourceDefinition" => "crds".to_string(),
        _ => "cluster".to_string(),
    }
}

/// Default manifest file name. The rank prefix makes the archive's path
/// sort a valid application order.
pub fn manifest_file(name: &str, kind: &str) -> String {
    format!("{}_{}.yaml", rank(kind), basic_name(name, kind))
}

/// Snake-case form of a kind, for grouped file names.
pub fn kind_slug(kind: &str) -> String {
    kebab(kind).replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_name_appends_abbreviation() {
        assert_eq!(basic_name("super-duper-app", "Deployment"), "super-duper-app_deploy");
    }

    #[test]
    fn basic_name_drops_trailing_kind() {
        assert_eq!(basic_name("super-duper-deployment", "Deployment"), "super-duper_deploy");
        assert_eq!(basic_name("queue_worker_deploy", "Deployment"), "queue_worker_deploy");
    }

    #[test]
    fn basic_name_handles_separated_kinds() {
        assert_eq!(basic_name("argo-cluster-role", "ClusterRole"), "argo_cr");
        assert_eq!(basic_name("argo-clusterrole", "ClusterRole"), "argo_cr");
    }

    #[test]
    fn basic_name_survives_name_equal_to_kind() {
        assert_eq!(basic_name("deployment", "Deployment"), "deploy");
    }

    #[test]
    fn identifiers_get_distinct_suffixes() {
        let mut s = Session::new();
        assert_eq!(identifier(&mut s, "web_svc"), "web_svc");
        assert_eq!(identifier(&mut s, "web_svc"), "web_svc1");
        assert_eq!(identifier(&mut s, "web_svc"), "web_svc2");
        assert_eq!(identifier(&mut s, "api_svc"), "api_svc");
    }

    #[test]
    fn identifiers_are_legal_rust() {
        let mut s = Session::new();
        assert_eq!(identifier(&mut s, "super-duper-app_deploy"), "super_duper_app_deploy");
        assert_eq!(identifier(&mut s, "9lives"), "_9lives");
        assert_eq!(identifier(&mut s, "use"), "use_");
    }

    #[test]
    fn counters_recycle_past_the_bound() {
        let mut s = Session::new();
        for _ in 0..COLLISION_BOUND {
            identifier(&mut s, "x");
        }
        // Wrapped back to the first suffix rather than growing unbounded.
        assert_eq!(identifier(&mut s, "x"), "x1");
    }

    #[test]
    fn namespace_ranks_before_everything_namespaced() {
        for kind in ["ServiceAccount", "ConfigMap", "Deployment", "Certificate"] {
            assert!(rank("Namespace") < rank(kind), "Namespace must precede {kind}");
        }
        assert!(rank("ClusterRole") < rank("ClusterRoleBinding"));
        assert!(rank("ServiceAccount") < rank("Deployment"));
    }

    #[test]
    fn exploded_buckets() {
        assert_eq!(classify("ConfigMap", Some("prod"), true), "prod");
        assert_eq!(classify("ConfigMap", None, true), "_no_namespace");
        assert_eq!(classify("Namespace", None, false), "namespaces");
        assert_eq!(classify("ClusterRole", None, false), "rbac");
        assert_eq!(classify("CustomResourceDefinition", None, false), "crds");
        assert_eq!(classify("APIService", None, false), "cluster");
    }

    #[test]
    fn kind_slugs_are_snake_case() {
        assert_eq!(kind_slug("Deployment"), "deployment");
        assert_eq!(kind_slug("ClusterRoleBinding"), "cluster_role_binding");
    }

    #[test]
    fn manifest_files_sort_in_apply_order() {
        let ns = manifest_file("argo", "Namespace");
        let dep = manifest_file("argo-server", "Deployment");
        assert_eq!(ns, "0_argo_ns.yaml");
        assert_eq!(dep, "3_argo-server_deploy.yaml");
        assert!(ns < dep);
    }
}
