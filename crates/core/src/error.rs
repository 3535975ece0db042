//! Error taxonomy shared by every kiln crate.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or incompatible options; detected before any decoding.
    #[error("configuration: {0}")]
    Configuration(String),

    /// Missing file or unreadable input, attached to the offending source.
    #[error("input {path}: {reason}")]
    Input { path: String, reason: String },

    /// Document that cannot be structurally scanned for its metadata.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// The registry has no mapping for this identity.
    #[error("no type registered for {kind} ({api_version})")]
    UnregisteredType { kind: String, api_version: String },

    /// The registered type rejected the document.
    #[error("decoding {what}: {reason}")]
    DecodeFailure { what: String, reason: String },

    /// A container field meant to hold a resource or group has no value.
    #[error("container field {container}.{field} has no value")]
    MissingField { container: String, field: String },

    /// The same identity resolved twice within one run.
    #[error("duplicate resource identity {0}")]
    DuplicateIdentity(String),

    /// A quantity string that does not re-derive through the canonical parse.
    #[error("invalid quantity {0:?}")]
    InvalidQuantity(String),

    /// Ignore-mode end-of-run aggregation of per-document failures.
    #[error("run finished with {} document error(s)", .0.len())]
    Collected(Vec<Error>),
}

impl Error {
    /// Structural errors abort the run regardless of ignore-mode: a
    /// partially built archive must never look usable.
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::MissingField { .. } | Error::DuplicateIdentity(_))
    }

    /// Document-level failures that ignore-mode may skip and collect.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Input { .. }
                | Error::MalformedDocument(_)
                | Error::UnregisteredType { .. }
                | Error::DecodeFailure { .. }
                | Error::InvalidQuantity(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_errors_are_never_recoverable() {
        let m = Error::MissingField { container: "app".into(), field: "deploy".into() };
        let d = Error::DuplicateIdentity("v1/ConfigMap prod/conf".into());
        assert!(m.is_structural() && !m.is_recoverable());
        assert!(d.is_structural() && !d.is_recoverable());

        let u = Error::UnregisteredType { kind: "Foo".into(), api_version: "x/v1".into() };
        assert!(!u.is_structural() && u.is_recoverable());
    }

    #[test]
    fn collected_reports_count() {
        let e = Error::Collected(vec![
            Error::MalformedDocument("bad".into()),
            Error::UnregisteredType { kind: "Foo".into(), api_version: "v9".into() },
        ]);
        assert_eq!(e.to_string(), "run finished with 2 document error(s)");
    }
}
