//! Assembles declarations into source files and module indexes.

use std::collections::BTreeSet;

use crate::Declaration;

/// Conventional generated-code marker; tooling keys off the phrase.
pub fn header(app: &str) -> String {
    format!("// Code generated by {app}. DO NOT EDIT.\n")
}

/// Renders one source file: header, deduplicated sorted imports, then the
/// declarations. With `convenience`, a `manifest()` collector returning
/// every declared resource as a document value is appended.
pub fn render_file(header: &str, decls: &[Declaration], convenience: bool) -> String {
    let mut imports: BTreeSet<&str> = BTreeSet::new();
    for d in decls {
        for i in &d.imports {
            imports.insert(i);
        }
    }

    let mut out = String::new();
    out.push_str(header);
    out.push('\n');
    for i in &imports {
        out.push_str(&format!("use {i};\n"));
    }
    if !imports.is_empty() {
        out.push('\n');
    }
    for (i, d) in decls.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&d.source);
    }

    if convenience && !decls.is_empty() {
        out.push('\n');
        out.push_str("/// Every resource declared in this file, as document values.\n");
        out.push_str("pub fn manifest() -> Vec<serde_json::Value> {\n    vec![\n");
        for d in decls {
            out.push_str(&format!(
                "        serde_json::to_value({}()).expect(\"serializable resource\"),\n",
                d.ident
            ));
        }
        out.push_str("    ]\n}\n");
    }
    out
}

/// Renders the module index (`mod.rs`). With `convenience`, a top-level
/// `manifest()` chains every submodule's collector.
pub fn mod_file(header: &str, modules: &[String], convenience: bool) -> String {
    let mut sorted = modules.to_vec();
    sorted.sort();

    let mut out = String::new();
    out.push_str(header);
    out.push('\n');
    for m in &sorted {
        out.push_str(&format!("pub mod {m};\n"));
    }
    if convenience && !sorted.is_empty() {
        out.push('\n');
        out.push_str("/// Every resource in this module tree, as document values.\n");
        out.push_str("pub fn manifest() -> Vec<serde_json::Value> {\n    let mut all = Vec::new();\n");
        for m in &sorted {
            out.push_str(&format!("    all.extend({m}::manifest());\n"));
        }
        out.push_str("    all\n}\n");
    }
    out
}
