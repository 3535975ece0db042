//! Per-run mutable state.
//!
//! The three run-scoped caches (current custom module, naming-collision
//! counters, seen-identity set) are bundled here and threaded explicitly
//! through every call. A `Session` is created fresh per invocation, so
//! concurrent independent runs never observe each other.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::Identity;

#[derive(Debug, Default)]
pub struct Session {
    /// First externally-defined module path seen this run; resolves custom
    /// types whose declared apiVersion maps to no known core module.
    pub custom_module: Option<String>,
    /// Identifier collision counters, keyed by base identifier.
    pub counters: FxHashMap<String, u32>,
    /// Identities already appended to this run's archive.
    pub seen: FxHashSet<Identity>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the first non-core module path encountered.
    pub fn note_module(&mut self, module: &str) {
        if self.custom_module.is_none() && !module.is_empty() && !is_core_module(module) {
            self.custom_module = Some(module.to_string());
        }
    }

    /// Marks an identity as emitted; false if it was already present.
    pub fn admit(&mut self, id: Identity) -> bool {
        self.seen.insert(id)
    }
}

/// Module paths that ship with kiln's stack rather than a user crate.
pub fn is_core_module(module: &str) -> bool {
    module.starts_with("k8s_openapi") || module.starts_with("std") || module.starts_with("serde_json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_custom_module_wins() {
        let mut s = Session::new();
        s.note_module("k8s_openapi::api::core::v1");
        assert_eq!(s.custom_module, None);
        s.note_module("certmgr_types::v1");
        s.note_module("other_types::v2");
        assert_eq!(s.custom_module.as_deref(), Some("certmgr_types::v1"));
    }

    #[test]
    fn admit_rejects_repeats() {
        let mut s = Session::new();
        let id = Identity { kind: "ConfigMap".into(), namespace: None, name: "c".into(), api_version: "v1".into() };
        assert!(s.admit(id.clone()));
        assert!(!s.admit(id));
    }
}
