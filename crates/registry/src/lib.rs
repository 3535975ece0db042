//! Kiln type registry: maps a document's identity to a concrete decodable
//! type and its shape table.
//!
//! The registry is a collaborator of the core pipeline: anything
//! implementing [`TypeRegistry`] can be supplied. The built-in registry
//! covers the common core/apps/rbac kinds, decoding through the matching
//! `k8s-openapi` type so documents are validated and canonicalized by serde
//! rather than by hand.

#![forbid(unsafe_code)]

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use kiln_core::TypeDesc;

pub mod tables;

/// A registered concrete type: its shape table, scope, and decode routine.
pub struct Registered {
    pub desc: &'static TypeDesc,
    pub namespaced: bool,
    /// Validates a parsed document against the concrete type and returns
    /// the canonical body.
    pub decode: fn(serde_json::Value) -> Result<serde_json::Value, String>,
}

/// Maps (kind, apiVersion) to a concrete type.
pub trait TypeRegistry {
    fn resolve(&self, kind: &str, api_version: &str) -> Option<&Registered>;
}

/// Round-trips a document through the concrete type. Field-level type
/// mismatches surface here; the output is the type's canonical rendering
/// with key-sorted maps.
fn canonical<T>(v: serde_json::Value) -> Result<serde_json::Value, String>
where
    T: DeserializeOwned + Serialize,
{
    let typed: T = serde_json::from_value(v).map_err(|e| e.to_string())?;
    serde_json::to_value(&typed).map_err(|e| e.to_string())
}

/// Built-in registry over `k8s-openapi` types.
pub struct BuiltinRegistry {
    entries: FxHashMap<(String, String), Registered>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        use crate::tables as t;
        use k8s_openapi::api::{apps::v1 as apps, core::v1 as core, rbac::v1 as rbac};

        let mut r = Self { entries: FxHashMap::default() };
        r.add("v1", "Namespace", false, &t::NAMESPACE, canonical::<core::Namespace>);
        r.add("v1", "ServiceAccount", true, &t::SERVICE_ACCOUNT, canonical::<core::ServiceAccount>);
        r.add("v1", "ConfigMap", true, &t::CONFIG_MAP, canonical::<core::ConfigMap>);
        r.add("v1", "Secret", true, &t::SECRET, canonical::<core::Secret>);
        r.add("v1", "Service", true, &t::SERVICE, canonical::<core::Service>);
        r.add("v1", "Pod", true, &t::POD, canonical::<core::Pod>);
        r.add("apps/v1", "Deployment", true, &t::DEPLOYMENT, canonical::<apps::Deployment>);
        r.add("apps/v1", "StatefulSet", true, &t::STATEFUL_SET, canonical::<apps::StatefulSet>);
        r.add("apps/v1", "DaemonSet", true, &t::DAEMON_SET, canonical::<apps::DaemonSet>);
        let rbac_gv = "rbac.authorization.k8s.io/v1";
        r.add(rbac_gv, "ClusterRole", false, &t::CLUSTER_ROLE, canonical::<rbac::ClusterRole>);
        r.add(rbac_gv, "ClusterRoleBinding", false, &t::CLUSTER_ROLE_BINDING, canonical::<rbac::ClusterRoleBinding>);
        r.add(rbac_gv, "Role", true, &t::ROLE, canonical::<rbac::Role>);
        r.add(rbac_gv, "RoleBinding", true, &t::ROLE_BINDING, canonical::<rbac::RoleBinding>);
        r
    }

    fn add(
        &mut self,
        api_version: &str,
        kind: &str,
        namespaced: bool,
        desc: &'static TypeDesc,
        decode: fn(serde_json::Value) -> Result<serde_json::Value, String>,
    ) {
        self.entries.insert(
            (kind.to_string(), api_version.to_string()),
            Registered { desc, namespaced, decode },
        );
    }

    pub fn kinds(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.keys().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry for BuiltinRegistry {
    fn resolve(&self, kind: &str, api_version: &str) -> Option<&Registered> {
        self.entries.get(&(kind.to_string(), api_version.to_string()))
    }
}

/// Shared built-in registry. Immutable after construction, so process-wide
/// sharing is safe — run-scoped state lives in `Session`, never here.
pub fn builtin() -> &'static BuiltinRegistry {
    static BUILTIN: Lazy<BuiltinRegistry> = Lazy::new(BuiltinRegistry::new);
    &BUILTIN
}
