//! Structural shape tables: the closed dispatch both encoders walk.
//!
//! A `TypeDesc` describes one concrete record type (where it lives, how its
//! fields map between document keys and Rust identifiers); `Shape` is the
//! tagged union over structural kinds. Tables are plain statics supplied by
//! the registry, replacing any runtime type inspection.

/// Primitive scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Str,
    Int,
    Float,
    Bool,
}

/// Structural kind of a field value.
#[derive(Debug, Clone, Copy)]
pub enum Shape {
    Scalar(ScalarKind),
    /// Named wrapper over a primitive; emitted through its constructor so
    /// the distinct type survives.
    Alias(&'static TypeDesc, ScalarKind),
    /// The int-or-string union; emitted through its variant constructors.
    IntOrString,
    /// Resource quantity, carried as its canonical string form.
    Quantity,
    /// Base64 byte payload.
    Bytes,
    Seq(&'static Shape),
    /// String-keyed mapping.
    Map(&'static Shape),
    Record(&'static TypeDesc),
    /// Nullable reference: suppressed when null, wrapped when present.
    Optional(&'static Shape),
    /// Opaque slot holding arbitrary structured data.
    Dynamic,
}

/// One concrete record type.
#[derive(Debug)]
pub struct TypeDesc {
    /// Fully-qualified module path, e.g. "k8s_openapi::api::apps::v1".
    /// Empty for custom types resolved through the session's module cache.
    pub module: &'static str,
    pub name: &'static str,
    pub fields: &'static [FieldDesc],
}

impl TypeDesc {
    pub const fn new(module: &'static str, name: &'static str, fields: &'static [FieldDesc]) -> Self {
        Self { module, name, fields }
    }

    pub fn field(&self, doc: &str) -> Option<&'static FieldDesc> {
        self.fields.iter().find(|f| f.doc == doc)
    }
}

/// Per-field descriptor: document key, declaration identifier, shape.
#[derive(Debug)]
pub struct FieldDesc {
    /// Key in the document form.
    pub doc: &'static str,
    /// Field name in the declaration form.
    pub ident: &'static str,
    pub shape: Shape,
    /// Required fields are emitted even when zero and never wrapped in
    /// `Some`; optional fields are suppressed when zero.
    pub required: bool,
    /// Secret payload: replaced by a placeholder under redaction.
    pub secret: bool,
}

impl FieldDesc {
    pub const fn new(doc: &'static str, ident: &'static str, shape: Shape) -> Self {
        Self { doc, ident, shape, required: false, secret: false }
    }

    pub const fn required(doc: &'static str, ident: &'static str, shape: Shape) -> Self {
        Self { doc, ident, shape, required: true, secret: false }
    }

    pub const fn secret(doc: &'static str, ident: &'static str, shape: Shape) -> Self {
        Self { doc, ident, shape, required: false, secret: true }
    }
}
