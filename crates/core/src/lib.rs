//! Kiln core types: resource identity, structural shapes, and the error taxonomy.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

mod error;
mod session;
mod shape;

pub use error::{Error, Result};
pub use session::Session;
pub use shape::{FieldDesc, ScalarKind, Shape, TypeDesc};

/// Placeholder substituted for secret payloads when redaction is on.
pub const REDACTED: &str = "<redacted>";

/// Identity fields pulled from a manifest without decoding it fully.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Meta {
    pub kind: String,
    pub group: String,
    pub version: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl Meta {
    /// Renders `group/version`, or bare `version` for the core group.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// GVK key, e.g. "apps/v1/Deployment" or "v1/ConfigMap".
    pub fn gvk_key(&self) -> String {
        format!("{}/{}", self.api_version(), self.kind)
    }

    pub fn identity(&self) -> Identity {
        Identity {
            kind: self.kind.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            api_version: self.api_version(),
        }
    }
}

/// (Kind, Namespace, Name, APIVersion) — unique within one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Identity {
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
    pub api_version: String,
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.namespace.as_deref() {
            Some(ns) => write!(f, "{}/{} {}/{}", self.api_version, self.kind, ns, self.name),
            None => write!(f, "{}/{} {}", self.api_version, self.kind, self.name),
        }
    }
}

/// A decoded, registry-validated resource: identity plus canonical body.
///
/// The body is the document round-tripped through the registered concrete
/// type, with `apiVersion`/`kind` re-attached. Maps inside the body are
/// key-sorted, which both encoders rely on for determinism.
#[derive(Debug, Clone)]
pub struct Resource {
    pub meta: Meta,
    pub body: serde_json::Value,
    /// Shape table for declaration emission, when the registry provides one.
    pub desc: Option<&'static TypeDesc>,
    pub namespaced: bool,
}

impl Resource {
    pub fn is_zero(&self) -> bool {
        is_zero_value(&self.body)
    }
}

/// Per-kind redaction hook for document export. Returning `None` consumes
/// the resource: it is excluded from the output entirely.
pub type RedactFn = fn(&Resource) -> Option<Resource>;

/// Zero-value check mirroring suppression rules for optional fields:
/// null, empty text, zero numbers, false, and empty collections all
/// count as absent.
pub fn is_zero_value(v: &serde_json::Value) -> bool {
    use serde_json::Value;
    match v {
        Value::Null => true,
        Value::Bool(b) => !*b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
