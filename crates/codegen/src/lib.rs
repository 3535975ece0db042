//! Kiln declaration encoder: walks a typed object graph and emits Rust
//! source reproducing it.
//!
//! Dispatch is over the closed [`Shape`] union from the registry's tables.
//! Zero-valued optional fields are suppressed and absence propagates
//! upward; nullable references emit through `Some(..)` (Rust options own
//! their values, so the pointer-helper of pointer-based hosts degenerates
//! to the wrap). The one deliberately lossy path is an unsupported field,
//! which is skipped with a `warn!` diagnostic and never aborts the run.

#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use base64::Engine as _;
use serde_json::Value as Json;
use tracing::warn;

use kiln_core::{Error, FieldDesc, Resource, Result, ScalarKind, Session, Shape, TypeDesc, REDACTED};

mod module;
pub mod quantity;

pub use module::{header, mod_file, render_file};

const IND: &str = "    ";
const BTREE_MAP: &str = "std::collections::BTreeMap";
const BYTE_STRING: &str = "k8s_openapi::ByteString";
const INT_OR_STRING: &str = "k8s_openapi::apimachinery::pkg::util::intstr::IntOrString";
const QUANTITY: &str = "k8s_openapi::apimachinery::pkg::api::resource::Quantity";

/// Document keys that are identity or server bookkeeping, never shape-table
/// fields; skipped without a diagnostic.
const SILENT_KEYS: &[&str] = &[
    "apiVersion",
    "kind",
    "status",
    "creationTimestamp",
    "resourceVersion",
    "generation",
    "uid",
    "selfLink",
    "managedFields",
    "ownerReferences",
];

#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    /// Replace secret payloads with the fixed placeholder.
    pub redact_secrets: bool,
    /// Override for the base identifier derived from (name, kind).
    pub identifier_fn: Option<fn(&str, &str) -> String>,
    /// Override for record field identifiers.
    pub field_fn: Option<fn(&str) -> String>,
}

/// One emitted binding plus the type reference needed to use it elsewhere.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub ident: String,
    pub kind: String,
    pub name: String,
    pub type_name: String,
    pub module: String,
    pub source: String,
    pub imports: BTreeSet<String>,
}

/// Encodes one resource into a `pub fn` declaration.
pub fn declaration(res: &Resource, session: &mut Session, opts: &EmitOptions) -> Result<Declaration> {
    let desc = res.desc.ok_or_else(|| Error::UnregisteredType {
        kind: res.meta.kind.clone(),
        api_version: res.meta.api_version(),
    })?;

    let base = match opts.identifier_fn {
        Some(f) => f(&res.meta.name, &res.meta.kind),
        None => kiln_naming::basic_name(&res.meta.name, &res.meta.kind),
    };
    let ident = kiln_naming::identifier(session, &base);

    let mut enc = Emitter { session, opts, imports: BTreeSet::new() };
    let module = enc.resolve_module(desc);
    let literal = enc.value(&Shape::Record(desc), &res.body, 1, false)?;
    let source = format!("pub fn {ident}() -> {} {{\n{IND}{literal}\n}}\n", desc.name);

    Ok(Declaration {
        ident,
        kind: res.meta.kind.clone(),
        name: res.meta.name.clone(),
        type_name: desc.name.to_string(),
        module,
        source,
        imports: enc.imports,
    })
}

struct Emitter<'a> {
    session: &'a mut Session,
    opts: &'a EmitOptions,
    imports: BTreeSet<String>,
}

impl Emitter<'_> {
    /// Resolves the module path for a record type, maintaining the
    /// session's current-custom-module cache: the first externally-defined
    /// path seen wins, and descriptor entries without a module fall back
    /// to it.
    fn resolve_module(&mut self, desc: &TypeDesc) -> String {
        if desc.module.is_empty() {
            match &self.session.custom_module {
                Some(m) => m.clone(),
                None => {
                    warn!(type_name = desc.name, "no module known for custom type");
                    String::new()
                }
            }
        } else {
            self.session.note_module(desc.module);
            desc.module.to_string()
        }
    }

    fn import(&mut self, path: &str) {
        self.imports.insert(path.to_string());
    }

    fn value(&mut self, shape: &Shape, v: &Json, indent: usize, secret: bool) -> Result<String> {
        match *shape {
            Shape::Scalar(k) => Ok(self.scalar(k, v, secret)),
            Shape::Alias(desc, prim) => {
                let module = self.resolve_module(desc);
                if !module.is_empty() {
                    self.import(&format!("{module}::{}", desc.name));
                }
                Ok(format!("{}({})", desc.name, self.scalar(prim, v, secret)))
            }
            Shape::IntOrString => {
                self.import(INT_OR_STRING);
                match v {
                    Json::Number(n) => Ok(format!("IntOrString::Int({n})")),
                    Json::String(s) => Ok(format!("IntOrString::String({}.to_string())", str_literal(s))),
                    other => Ok(self.unsupported("int-or-string", other)),
                }
            }
            Shape::Quantity => {
                let s = v.as_str().ok_or_else(|| Error::InvalidQuantity(v.to_string()))?;
                if !quantity::is_valid(s) {
                    return Err(Error::InvalidQuantity(s.to_string()));
                }
                self.import(QUANTITY);
                Ok(format!("Quantity({}.to_string())", str_literal(s)))
            }
            Shape::Bytes => {
                self.import(BYTE_STRING);
                if secret && self.opts.redact_secrets {
                    return Ok(format!("ByteString(b\"{REDACTED}\".to_vec())"));
                }
                // Base64 text in documents, or an inline numeric sequence.
                let raw = match v {
                    Json::String(s) => base64::engine::general_purpose::STANDARD.decode(s).ok(),
                    Json::Array(items) => items
                        .iter()
                        .map(|i| i.as_u64().and_then(|n| u8::try_from(n).ok()))
                        .collect::<Option<Vec<u8>>>(),
                    _ => None,
                };
                match raw {
                    Some(bytes) => Ok(format!("ByteString({})", bytes_literal(&bytes))),
                    None => Ok(self.unsupported("byte payload", v)),
                }
            }
            Shape::Seq(inner) => match v {
                Json::Array(items) => self.seq(inner, items, indent, secret),
                other => Ok(self.unsupported("sequence", other)),
            },
            Shape::Map(inner) => match v {
                Json::Object(map) => self.map(inner, map, indent, secret),
                other => Ok(self.unsupported("mapping", other)),
            },
            Shape::Record(desc) => match v {
                Json::Object(map) => self.record(desc, map, indent),
                other => Ok(self.unsupported(desc.name, other)),
            },
            Shape::Optional(inner) => Ok(format!("Some({})", self.value(inner, v, indent, secret)?)),
            Shape::Dynamic => {
                if kiln_core::is_zero_value(v) {
                    Ok("serde_json::Value::Null".to_string())
                } else {
                    // Explicit dynamic-type coercion around the encoded value.
                    Ok(format!("serde_json::json!({v})"))
                }
            }
        }
    }

    fn scalar(&mut self, kind: ScalarKind, v: &Json, secret: bool) -> String {
        if secret && self.opts.redact_secrets && kind == ScalarKind::Str {
            return format!("\"{REDACTED}\".to_string()");
        }
        match (kind, v) {
            (ScalarKind::Str, Json::String(s)) => format!("{}.to_string()", str_literal(s)),
            (ScalarKind::Int, Json::Number(n)) => n.to_string(),
            (ScalarKind::Float, Json::Number(n)) => {
                let f = n.as_f64().unwrap_or(0.0);
                if f.fract() == 0.0 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            (ScalarKind::Bool, Json::Bool(b)) => b.to_string(),
            (_, other) => self.unsupported("scalar", other),
        }
    }

    fn seq(&mut self, inner: &Shape, items: &[Json], indent: usize, secret: bool) -> Result<String> {
        let rendered: Vec<String> = items
            .iter()
            .map(|i| self.value(inner, i, indent + 1, secret))
            .collect::<Result<_>>()?;
        if rendered.iter().all(|r| !r.contains('\n'))
            && rendered.iter().map(String::len).sum::<usize>() < 60
        {
            return Ok(format!("vec![{}]", rendered.join(", ")));
        }
        let pad = IND.repeat(indent);
        let inner_pad = IND.repeat(indent + 1);
        let mut out = String::from("vec![\n");
        for r in rendered {
            out.push_str(&format!("{inner_pad}{r},\n"));
        }
        out.push_str(&format!("{pad}]"));
        Ok(out)
    }

    fn map(
        &mut self,
        inner: &Shape,
        map: &serde_json::Map<String, Json>,
        indent: usize,
        secret: bool,
    ) -> Result<String> {
        self.import(BTREE_MAP);
        let pad = IND.repeat(indent);
        let inner_pad = IND.repeat(indent + 1);
        let mut out = String::from("BTreeMap::from([\n");
        for (k, v) in map {
            let value = self.value(inner, v, indent + 1, secret)?;
            out.push_str(&format!("{inner_pad}({}.to_string(), {value}),\n", str_literal(k)));
        }
        out.push_str(&format!("{pad}])"));
        Ok(out)
    }

    fn record(
        &mut self,
        desc: &'static TypeDesc,
        map: &serde_json::Map<String, Json>,
        indent: usize,
    ) -> Result<String> {
        let module = self.resolve_module(desc);
        if !module.is_empty() {
            self.import(&format!("{module}::{}", desc.name));
        }

        for key in map.keys() {
            if desc.field(key).is_none() && !SILENT_KEYS.contains(&key.as_str()) {
                warn!(type_name = desc.name, field = %key, "no shape for field; skipping");
            }
        }

        let pad = IND.repeat(indent);
        let inner_pad = IND.repeat(indent + 1);
        let mut lines = Vec::new();
        for f in desc.fields {
            let v = map.get(f.doc);
            let absent = v.map_or(true, kiln_core::is_zero_value);
            if absent && !f.required {
                continue;
            }
            let ident = match self.opts.field_fn {
                Some(rename) => rename(f.ident),
                None => f.ident.to_string(),
            };
            let value = match v {
                Some(v) if !absent => self.field_value(f, v, indent + 1)?,
                // Required but unset: fall back to the type's default.
                _ => "Default::default()".to_string(),
            };
            lines.push(format!("{inner_pad}{ident}: {value},\n"));
        }

        let exhaustive = lines.len() == desc.fields.len() && desc.fields.iter().all(|f| f.required);
        let mut out = format!("{} {{\n", desc.name);
        for l in &lines {
            out.push_str(l);
        }
        if !exhaustive {
            out.push_str(&format!("{inner_pad}..Default::default()\n"));
        }
        out.push_str(&format!("{pad}}}"));
        Ok(out)
    }

    /// Nullable references wrap in `Some`; the shape-level `Optional` and
    /// the field-level optionality collapse into exactly one wrap.
    fn field_value(&mut self, f: &FieldDesc, v: &Json, indent: usize) -> Result<String> {
        match f.shape {
            Shape::Optional(inner) => Ok(format!("Some({})", self.value(inner, v, indent, f.secret)?)),
            shape if !f.required => Ok(format!("Some({})", self.value(&shape, v, indent, f.secret)?)),
            shape => self.value(&shape, v, indent, f.secret),
        }
    }

    /// The deliberately lossy path: log and fall back to a default value.
    fn unsupported(&mut self, what: &str, v: &Json) -> String {
        warn!(expected = what, got = %json_kind(v), "unsupported value while encoding; emitting default");
        "Default::default()".to_string()
    }
}

fn json_kind(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

/// Renders a string literal; multi-line text becomes a raw block literal
/// with enough hashes to stay unambiguous.
fn str_literal(s: &str) -> String {
    if !s.contains('\n') {
        return format!("{s:?}");
    }
    let mut hashes = 1usize;
    while s.contains(&format!("\"{}", "#".repeat(hashes))) {
        hashes += 1;
    }
    let h = "#".repeat(hashes);
    format!("r{h}\"{s}\"{h}")
}

fn printable(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(|b| matches!(b, 0x20..=0x7e | b'\n' | b'\t'))
}

fn byte_str(bytes: &[u8]) -> String {
    let mut out = String::from("b\"");
    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            _ => out.push(b as char),
        }
    }
    out.push('"');
    out
}

fn bytes_literal(bytes: &[u8]) -> String {
    if printable(bytes) {
        format!("{}.to_vec()", byte_str(bytes))
    } else {
        let nums: Vec<String> = bytes.iter().map(|b| format!("{b:#04x}")).collect();
        format!("vec![{}]", nums.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_decode::decode_str;
    use kiln_registry::builtin;

    fn one(yaml: &str) -> Resource {
        decode_str(yaml, builtin()).unwrap().remove(0)
    }

    const DEPLOY: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: prod
  labels: {app: web}
spec:
  replicas: 3
  selector:
    matchLabels: {app: web}
  strategy:
    type: RollingUpdate
    rollingUpdate:
      maxUnavailable: 25%
  template:
    metadata:
      labels: {app: web}
    spec:
      containers:
        - name: web
          image: nginx:1.25
          ports:
            - containerPort: 8080
          resources:
            limits: {cpu: 500m}
"#;

    #[test]
    fn deployment_declaration_reads_like_source() {
        let res = one(DEPLOY);
        let mut session = Session::new();
        let d = declaration(&res, &mut session, &EmitOptions::default()).unwrap();

        assert_eq!(d.ident, "web_deploy");
        assert!(d.source.starts_with("pub fn web_deploy() -> Deployment {"));
        assert!(d.source.contains("replicas: Some(3)"));
        assert!(d.source.contains("container_port: 8080"));
        assert!(d.source.contains("IntOrString::String(\"25%\".to_string())"));
        assert!(d.source.contains("Quantity(\"500m\".to_string())"));
        assert!(d.source.contains("..Default::default()"));
        assert!(d.imports.contains("k8s_openapi::api::apps::v1::Deployment"));
        assert!(d.imports.contains("std::collections::BTreeMap"));
        assert!(d.imports.contains(QUANTITY));
    }

    #[test]
    fn zero_valued_optional_fields_are_suppressed() {
        let res = one("apiVersion: v1\nkind: Namespace\nmetadata:\n  name: argo\n");
        let mut session = Session::new();
        let d = declaration(&res, &mut session, &EmitOptions::default()).unwrap();
        assert!(!d.source.contains("spec:"));
        assert!(!d.source.contains("labels:"));
        assert!(d.source.contains("name: Some(\"argo\".to_string())"));
    }

    #[test]
    fn multi_line_text_uses_raw_literals() {
        let res = one(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: conf\ndata:\n  app.conf: |\n    line one\n    line two\n",
        );
        let mut session = Session::new();
        let d = declaration(&res, &mut session, &EmitOptions::default()).unwrap();
        assert!(d.source.contains("r#\"line one"), "{}", d.source);
    }

    #[test]
    fn secret_payloads_redact_behind_the_flag() {
        let yaml = "apiVersion: v1\nkind: Secret\nmetadata:\n  name: creds\ndata:\n  token: aGVsbG8=\n";
        let mut session = Session::new();
        let open = declaration(&one(yaml), &mut session, &EmitOptions::default()).unwrap();
        assert!(open.source.contains("ByteString(b\"hello\".to_vec())"), "{}", open.source);

        let mut session = Session::new();
        let opts = EmitOptions { redact_secrets: true, ..Default::default() };
        let shut = declaration(&one(yaml), &mut session, &opts).unwrap();
        assert!(shut.source.contains(REDACTED));
        assert!(!shut.source.contains("hello"));
    }

    #[test]
    fn invalid_quantities_fail_the_run() {
        let yaml = r#"
apiVersion: apps/v1
kind: Deployment
metadata: {name: web}
spec:
  selector: {matchLabels: {app: web}}
  template:
    spec:
      containers:
        - name: web
          resources:
            limits: {cpu: watts}
"#;
        let mut session = Session::new();
        let err = declaration(&one(yaml), &mut session, &EmitOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidQuantity(q) if q == "watts"));
    }

    #[test]
    fn colliding_identifiers_get_suffixes() {
        let a = one("apiVersion: v1\nkind: ConfigMap\nmetadata: {name: conf, namespace: one}\ndata: {k: v}\n");
        let b = one("apiVersion: v1\nkind: ConfigMap\nmetadata: {name: conf, namespace: two}\ndata: {k: v}\n");
        let mut session = Session::new();
        let opts = EmitOptions::default();
        let d1 = declaration(&a, &mut session, &opts).unwrap();
        let d2 = declaration(&b, &mut session, &opts).unwrap();
        assert_eq!(d1.ident, "conf_cm");
        assert_eq!(d2.ident, "conf_cm1");
    }

    #[test]
    fn unsupported_fields_are_skipped_not_fatal() {
        let mut res = one("apiVersion: v1\nkind: ConfigMap\nmetadata: {name: conf}\ndata: {k: v}\n");
        res.body["wholly-unknown"] = serde_json::json!({"x": 1});
        let mut session = Session::new();
        let d = declaration(&res, &mut session, &EmitOptions::default()).unwrap();
        assert!(!d.source.contains("wholly-unknown"));
        assert!(d.source.contains("\"k\".to_string()"));
    }

    #[test]
    fn custom_types_use_the_session_module_cache() {
        static SIZE: TypeDesc = TypeDesc::new("widgets_types::v1", "Size", &[]);
        static WIDGET: TypeDesc = TypeDesc::new(
            "widgets_types::v1",
            "Widget",
            &[
                FieldDesc::required("metadata", "metadata", Shape::Record(&kiln_registry::tables::OBJECT_META)),
                FieldDesc::new("size", "size", Shape::Alias(&SIZE, ScalarKind::Int)),
                FieldDesc::new("config", "config", Shape::Dynamic),
            ],
        );
        let res = Resource {
            meta: kiln_core::Meta {
                kind: "Widget".into(),
                group: "widgets.example.com".into(),
                version: "v1".into(),
                namespace: Some("prod".into()),
                name: "gadget".into(),
            },
            body: serde_json::json!({
                "apiVersion": "widgets.example.com/v1",
                "kind": "Widget",
                "metadata": {"name": "gadget", "namespace": "prod"},
                "size": 5,
                "config": {"mode": "fast", "retries": 2}
            }),
            desc: Some(&WIDGET),
            namespaced: true,
        };
        let mut session = Session::new();
        let d = declaration(&res, &mut session, &EmitOptions::default()).unwrap();
        assert_eq!(session.custom_module.as_deref(), Some("widgets_types::v1"));
        assert!(d.imports.contains("widgets_types::v1::Widget"));
        // Named alias goes through its constructor; the opaque slot through
        // an explicit dynamic coercion.
        assert!(d.source.contains("size: Some(Size(5))"), "{}", d.source);
        assert!(d.source.contains("serde_json::json!("), "{}", d.source);
    }

    #[test]
    fn string_literals_escape_or_go_raw() {
        assert_eq!(str_literal("plain"), "\"plain\"");
        assert_eq!(str_literal("with \"quotes\""), "\"with \\\"quotes\\\"\"");
        assert_eq!(str_literal("a\nb"), "r#\"a\nb\"#");
        // Embedded terminator forces more hashes.
        assert_eq!(str_literal("x\ny\"#z"), "r##\"x\ny\"#z\"##");
    }

    #[test]
    fn byte_payloads_prefer_printable_literals() {
        assert_eq!(bytes_literal(b"hello"), "b\"hello\".to_vec()");
        assert_eq!(bytes_literal(&[0x00, 0xff]), "vec![0x00, 0xff]");
    }
}
