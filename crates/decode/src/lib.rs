//! Kiln document intake: stream splitting, metadata extraction, and decoding
//! into typed resources.
//!
//! Everything here is a pure function of its input plus the registry; the
//! only I/O is in [`Source::load`], which turns files/directories/readers
//! into raw document text.

#![forbid(unsafe_code)]

use metrics::counter;
use serde_json::Value as Json;
use tracing::debug;

use kiln_core::{Error, Meta, Resource, Result};
use kiln_registry::TypeRegistry;

mod source;

pub use source::{RawInput, Source};

fn max_doc_bytes() -> usize {
    std::env::var("KILN_MAX_DOC_BYTES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1_000_000)
}

fn max_doc_nodes() -> usize {
    std::env::var("KILN_MAX_DOC_NODES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(100_000)
}

fn node_budget_exceeded(v: &Json, max: usize) -> bool {
    // Running counter with an early bail once the budget is spent.
    fn walk(v: &Json, cur: &mut usize, max: usize) {
        if *cur >= max {
            return;
        }
        *cur += 1;
        match v {
            Json::Object(map) => {
                for (_k, vv) in map.iter() {
                    if *cur >= max {
                        break;
                    }
                    walk(vv, cur, max);
                }
            }
            Json::Array(arr) => {
                for vv in arr.iter() {
                    if *cur >= max {
                        break;
                    }
                    walk(vv, cur, max);
                }
            }
            _ => {}
        }
    }
    let mut count = 0usize;
    walk(v, &mut count, max);
    count >= max
}

/// Splits a manifest stream on `---` separator lines. Chunks holding only
/// blank or comment lines are dropped.
pub fn split_documents(text: &str) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut cur = String::new();
    for line in text.lines() {
        if line.trim_end() == "---" {
            chunks.push(std::mem::take(&mut cur));
        } else {
            cur.push_str(line);
            cur.push('\n');
        }
    }
    chunks.push(cur);
    chunks.retain(|c| {
        c.lines().any(|l| {
            let t = l.trim();
            !t.is_empty() && !t.starts_with('#')
        })
    });
    chunks
}

/// Parses one document to JSON, enforcing the byte and node budgets.
pub fn parse_document(text: &str) -> Result<Json> {
    if text.len() > max_doc_bytes() {
        return Err(Error::MalformedDocument(format!(
            "document too large (>{} bytes)",
            max_doc_bytes()
        )));
    }
    let val: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| Error::MalformedDocument(e.to_string()))?;
    let json = serde_json::to_value(val).map_err(|e| Error::MalformedDocument(e.to_string()))?;
    if node_budget_exceeded(&json, max_doc_nodes()) {
        return Err(Error::MalformedDocument(format!(
            "document too complex (>{} nodes)",
            max_doc_nodes()
        )));
    }
    if !json.is_object() {
        return Err(Error::MalformedDocument("document is not a mapping".into()));
    }
    Ok(json)
}

fn is_list(kind: &str, json: &Json) -> bool {
    kind.ends_with("List") && json.get("items").is_some_and(Json::is_array)
}

fn meta_of(json: &Json) -> Result<Meta> {
    let api_version = json
        .get("apiVersion")
        .and_then(Json::as_str)
        .ok_or_else(|| Error::MalformedDocument("missing apiVersion".into()))?;
    let kind = json
        .get("kind")
        .and_then(Json::as_str)
        .ok_or_else(|| Error::MalformedDocument("missing kind".into()))?
        .to_string();
    let (group, version) = match api_version.split_once('/') {
        Some((g, v)) => (g.to_string(), v.to_string()),
        None => (String::new(), api_version.to_string()),
    };
    let meta = json.get("metadata");
    let name = meta
        .and_then(|m| m.get("name"))
        .and_then(Json::as_str)
        .unwrap_or("")
        .to_string();
    if name.is_empty() && !is_list(&kind, json) {
        return Err(Error::MalformedDocument("missing metadata.name".into()));
    }
    let namespace = meta
        .and_then(|m| m.get("namespace"))
        .and_then(Json::as_str)
        .map(|s| s.to_string());
    Ok(Meta { kind, group, version, namespace, name })
}

/// Metadata Extractor: identity fields via a generic structural scan, no
/// concrete type needed.
pub fn extract_metadata(text: &str) -> Result<Meta> {
    meta_of(&parse_document(text)?)
}

/// Decodes one document (or list wrapper) into typed resources.
pub fn decode_value(json: Json, registry: &dyn TypeRegistry, out: &mut Vec<Resource>) -> Result<()> {
    let meta = meta_of(&json)?;

    // A list wrapper fans into N independent documents, each re-submitted.
    if is_list(&meta.kind, &json) {
        let Json::Object(mut map) = json else { unreachable!("checked above") };
        let Some(Json::Array(items)) = map.remove("items") else { unreachable!("checked above") };
        debug!(kind = %meta.kind, items = items.len(), "expanding list document");
        for item in items {
            decode_value(item, registry, out)?;
        }
        return Ok(());
    }

    let reg = registry
        .resolve(&meta.kind, &meta.api_version())
        .ok_or_else(|| Error::UnregisteredType {
            kind: meta.kind.clone(),
            api_version: meta.api_version(),
        })?;
    let mut body = (reg.decode)(json).map_err(|reason| Error::DecodeFailure {
        what: meta.identity().to_string(),
        reason,
    })?;

    // The typed round trip may drop identity fields; re-attach them.
    if let Some(map) = body.as_object_mut() {
        map.insert("apiVersion".into(), Json::String(meta.api_version()));
        map.insert("kind".into(), Json::String(meta.kind.clone()));
    }

    counter!("kiln_documents_decoded", 1u64);
    out.push(Resource { meta, body, desc: Some(reg.desc), namespaced: reg.namespaced });
    Ok(())
}

/// Decodes one raw document chunk.
pub fn decode_str(text: &str, registry: &dyn TypeRegistry) -> Result<Vec<Resource>> {
    let mut out = Vec::new();
    decode_value(parse_document(text)?, registry, &mut out)?;
    Ok(out)
}
