//! Kiln document encoder: walks an aggregate container and emits normalized
//! manifests into an archive.
//!
//! Every field of a container is mandatory: a null or zero-valued slot
//! fails the run with `MissingField`, and a repeated identity fails with
//! `DuplicateIdentity`. Both are structural — a partially built archive is
//! unsafe to apply, so nothing is ever returned alongside them.

#![forbid(unsafe_code)]

use metrics::counter;
use rustc_hash::FxHashMap;
use serde_json::Value as Json;
use tracing::debug;

use kiln_archive::Archive;
use kiln_core::{Error, RedactFn, Resource, Result, Session, REDACTED};

/// An aggregate container: a named composite bundling resources and nested
/// groups into one deployable unit. Composition is explicit — a group
/// exposes its own fields to walk, and nothing is promoted.
pub trait Container {
    fn name(&self) -> &str;
    fn fields(&self) -> Vec<Field<'_>>;
}

pub struct Field<'a> {
    pub name: &'a str,
    pub slot: Slot<'a>,
}

pub enum Slot<'a> {
    /// A single resource; must be present and non-zero.
    Resource(Option<&'a Resource>),
    /// A nested container; must be present, then walked transitively.
    Group(Option<&'a dyn Container>),
}

/// Ad-hoc container over an ordered resource list; field names are the
/// resource names.
#[derive(Default)]
pub struct ResourceSet {
    name: String,
    items: Vec<Resource>,
}

impl ResourceSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), items: Vec::new() }
    }

    pub fn push(&mut self, r: Resource) {
        self.items.push(r);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Container for ResourceSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> Vec<Field<'_>> {
        self.items
            .iter()
            .map(|r| Field { name: r.meta.name.as_str(), slot: Slot::Resource(Some(r)) })
            .collect()
    }
}

/// Output layouts for an encode run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// One archive entry per resource.
    #[default]
    PerResource,
    /// One entry per kind, holding every document of that kind.
    Grouped,
    /// Directory layout bucketed by namespace or cluster category.
    Exploded,
    /// One concatenated document stream.
    SingleDocument,
    /// One JSON array of documents.
    JsonArray,
}

pub struct ExportOptions {
    pub layout: Layout,
    pub app_name: String,
    /// Replace secret payloads with the fixed placeholder.
    pub redact_secrets: bool,
    /// Also strip server-populated default fields from metadata.
    pub strip_defaults: bool,
    /// Emit a kustomization-style index listing every manifest.
    pub write_index: bool,
    /// Override for per-resource file names.
    pub file_fn: Option<fn(&Resource) -> String>,
    /// Per-kind redaction hooks; a hook returning `None` consumes the
    /// resource and it is excluded from the output entirely.
    pub redactors: FxHashMap<String, RedactFn>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            layout: Layout::PerResource,
            app_name: "app".into(),
            redact_secrets: false,
            strip_defaults: false,
            write_index: false,
            file_fn: None,
            redactors: FxHashMap::default(),
        }
    }
}

fn collect<'a>(c: &'a dyn Container, out: &mut Vec<&'a Resource>) -> Result<()> {
    for f in c.fields() {
        match f.slot {
            Slot::Resource(Some(r)) if !r.is_zero() => out.push(r),
            Slot::Resource(_) => {
                return Err(Error::MissingField {
                    container: c.name().to_string(),
                    field: f.name.to_string(),
                })
            }
            Slot::Group(Some(g)) => collect(g, out)?,
            Slot::Group(None) => {
                return Err(Error::MissingField {
                    container: c.name().to_string(),
                    field: f.name.to_string(),
                })
            }
        }
    }
    Ok(())
}

/// Strips non-authoritative fields from a canonical body.
pub fn normalize(body: &Json, strip_defaults: bool) -> Json {
    let mut v = body.clone();
    if let Some(obj) = v.as_object_mut() {
        obj.remove("status");
        if let Some(meta) = obj.get_mut("metadata").and_then(Json::as_object_mut) {
            meta.remove("creationTimestamp");
            meta.remove("managedFields");
            if strip_defaults {
                meta.remove("resourceVersion");
                meta.remove("generation");
                meta.remove("uid");
                meta.remove("selfLink");
                if meta.get("annotations").is_some_and(|a| a.as_object().is_some_and(|o| o.is_empty())) {
                    meta.remove("annotations");
                }
                if meta.get("labels").is_some_and(|l| l.as_object().is_some_and(|o| o.is_empty())) {
                    meta.remove("labels");
                }
            }
        }
    }
    v
}

fn redact_secret_payload(body: &mut Json) {
    for key in ["data", "stringData"] {
        if let Some(map) = body.get_mut(key).and_then(Json::as_object_mut) {
            for v in map.values_mut() {
                *v = Json::String(REDACTED.to_string());
            }
        }
    }
}

struct Doc {
    resource: Resource,
    body: Json,
}

/// Walks the container and assembles the archive for the chosen layout.
/// The returned archive is unfinished; callers sort it via
/// `Archive::finish`.
pub fn export(container: &dyn Container, session: &mut Session, opts: &ExportOptions) -> Result<Archive> {
    let mut resources = Vec::new();
    collect(container, &mut resources)?;
    debug!(container = container.name(), resources = resources.len(), "export walk complete");

    let mut docs: Vec<Doc> = Vec::new();
    for r in resources {
        let mut r = r.clone();
        r.body = normalize(&r.body, opts.strip_defaults);

        // The per-kind hook sees the normalized resource; it may rewrite it
        // or consume it outright.
        let r = match opts.redactors.get(&r.meta.kind) {
            Some(hook) => match hook(&r) {
                Some(replaced) => replaced,
                None => {
                    debug!(identity = %r.meta.identity(), "resource consumed by redaction hook");
                    continue;
                }
            },
            None => r,
        };

        let mut body = r.body.clone();
        if opts.redact_secrets && r.meta.kind == "Secret" {
            redact_secret_payload(&mut body);
        }

        let id = r.meta.identity();
        if !session.admit(id.clone()) {
            return Err(Error::DuplicateIdentity(id.to_string()));
        }
        counter!("kiln_resources_exported", 1u64);
        docs.push(Doc { resource: r, body });
    }

    let mut archive = Archive::new();
    match opts.layout {
        Layout::PerResource => {
            for d in &docs {
                let path = unique_path(session, file_name(d, opts));
                archive.push(path, render_yaml(&d.body)?)?;
            }
        }
        Layout::Exploded => {
            for d in &docs {
                let m = &d.resource.meta;
                let bucket =
                    kiln_naming::classify(&m.kind, m.namespace.as_deref(), d.resource.namespaced);
                let path = unique_path(session, format!("{bucket}/{}", file_name(d, opts)));
                archive.push(path, render_yaml(&d.body)?)?;
            }
        }
        Layout::Grouped => {
            let mut groups: Vec<(&str, Vec<&Doc>)> = Vec::new();
            for d in &docs {
                let kind = d.resource.meta.kind.as_str();
                match groups.iter().position(|(k, _)| *k == kind) {
                    Some(i) => groups[i].1.push(d),
                    None => groups.push((kind, vec![d])),
                }
            }
            for (kind, mut members) in groups {
                members.sort_by(|a, b| doc_order(a).cmp(&doc_order(b)));
                let path = format!("{}_{}.yaml", kiln_naming::rank(kind), kiln_naming::kind_slug(kind));
                archive.push(path, render_stream(&members)?)?;
            }
        }
        Layout::SingleDocument => {
            let mut members: Vec<&Doc> = docs.iter().collect();
            members.sort_by(|a, b| apply_order(a).cmp(&apply_order(b)));
            archive.push(format!("{}.yaml", opts.app_name), render_stream(&members)?)?;
        }
        Layout::JsonArray => {
            let mut members: Vec<&Doc> = docs.iter().collect();
            members.sort_by(|a, b| apply_order(a).cmp(&apply_order(b)));
            let bodies: Vec<&Json> = members.iter().map(|d| &d.body).collect();
            let json = serde_json::to_vec_pretty(&bodies)
                .map_err(|e| Error::DecodeFailure { what: "json array".into(), reason: e.to_string() })?;
            archive.push(format!("{}.json", opts.app_name), json)?;
        }
    }

    if opts.write_index && opts.layout != Layout::JsonArray {
        let mut paths: Vec<&str> = archive.paths().collect();
        paths.sort();
        let index = serde_json::json!({
            "apiVersion": "kustomize.config.k8s.io/v1beta1",
            "kind": "Kustomization",
            "resources": paths,
        });
        let text = serde_yaml::to_string(&index)
            .map_err(|e| Error::DecodeFailure { what: "index".into(), reason: e.to_string() })?;
        archive.push("kustomization.yaml", text)?;
    }

    Ok(archive)
}

/// Path collisions append a numeric suffix from the session counters, so
/// two resources sharing a name and kind both survive.
fn unique_path(session: &mut Session, path: String) -> String {
    let n = session.counters.entry(path.clone()).or_insert(0);
    *n += 1;
    if *n == 1 {
        return path;
    }
    match path.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}{}.{ext}", *n - 1),
        None => format!("{path}{}", *n - 1),
    }
}

fn file_name(d: &Doc, opts: &ExportOptions) -> String {
    match opts.file_fn {
        Some(f) => f(&d.resource),
        None => kiln_naming::manifest_file(&d.resource.meta.name, &d.resource.meta.kind),
    }
}

fn doc_order(d: &Doc) -> (String, String) {
    let m = &d.resource.meta;
    (m.namespace.clone().unwrap_or_default(), m.name.clone())
}

fn apply_order(d: &Doc) -> (u8, String, String) {
    let (ns, name) = doc_order(d);
    (kiln_naming::rank(&d.resource.meta.kind), ns, name)
}

fn render_yaml(body: &Json) -> Result<String> {
    serde_yaml::to_string(body)
        .map_err(|e| Error::DecodeFailure { what: "document".into(), reason: e.to_string() })
}

fn render_stream(docs: &[&Doc]) -> Result<String> {
    let mut out = String::new();
    for (i, d) in docs.iter().enumerate() {
        if i > 0 {
            out.push_str("---\n");
        }
        out.push_str(&render_yaml(&d.body)?);
    }
    Ok(out)
}
