//! Kiln run orchestration.
//!
//! This crate owns the configuration surface and drives both transcoding
//! directions: documents to declarations ([`codify`]) and an aggregate
//! container to documents ([`export`]). Option validation short-circuits
//! before any work; a fresh [`Session`] is created per run so nothing leaks
//! between invocations.

#![forbid(unsafe_code)]

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use metrics::{counter, histogram};
use rustc_hash::FxHashMap;
use tracing::{info, warn};

use kiln_archive::Entry;
use kiln_codegen::{declaration, Declaration, EmitOptions};
use kiln_core::{Error, RedactFn, Resource, Result, Session};
use kiln_decode::{decode_str, split_documents, RawInput, Source};
use kiln_manifest::{export as export_container, Container, ExportOptions};
use kiln_registry::TypeRegistry;

pub use kiln_manifest::{Layout, ResourceSet};

/// Which way a run transcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Documents in, Rust declarations out.
    Codify,
    /// Container in, documents out.
    Export,
}

/// The full configuration surface. Every field has a documented default.
pub struct Config {
    /// Application name; used for headers and single-entry file names.
    pub app_name: String,
    /// Module name for generated code; must not contain `-`.
    pub module_name: String,
    pub layout: Layout,
    pub redact_secrets: bool,
    pub ignore_errors: bool,
    pub verbose: bool,
    /// Emit convenience `manifest()` collectors in generated code.
    pub convenience: bool,
    /// Strip server-populated defaults alongside status/timestamps.
    pub strip_defaults: bool,
    /// Emit a kustomization-style index of generated manifests.
    pub write_index: bool,
    pub identifier_fn: Option<fn(&str, &str) -> String>,
    pub field_fn: Option<fn(&str) -> String>,
    pub file_fn: Option<fn(&Resource) -> String>,
    pub redactors: FxHashMap<String, RedactFn>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "app".into(),
            module_name: "app".into(),
            layout: Layout::PerResource,
            redact_secrets: false,
            ignore_errors: false,
            verbose: false,
            convenience: false,
            strip_defaults: false,
            write_index: false,
            identifier_fn: None,
            field_fn: None,
            file_fn: None,
            redactors: FxHashMap::default(),
        }
    }
}

impl Config {
    /// Validates the option set for a direction. Problems are aggregated
    /// into one error so the caller sees everything at once.
    pub fn validate(&self, direction: Direction) -> Result<()> {
        let mut problems: Vec<String> = Vec::new();
        if self.app_name.is_empty() {
            problems.push("application name must not be empty".into());
        }
        if self.module_name.is_empty() {
            problems.push("module name must not be empty".into());
        } else if self.module_name.contains('-') || self.module_name.contains("::") {
            problems.push(format!(
                "module name {:?} must not contain a path separator",
                self.module_name
            ));
        }
        if direction == Direction::Codify
            && matches!(self.layout, Layout::Exploded | Layout::JsonArray)
        {
            problems.push("exploded and json-array layouts apply to document output only".into());
        }
        if direction == Direction::Codify && self.write_index {
            problems.push("the index file applies to document output only".into());
        }
        if self.layout == Layout::JsonArray && self.write_index {
            problems.push("json-array output is incompatible with an index file".into());
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Configuration(problems.join("; ")))
        }
    }
}

/// Outcome of a successful run: the finished archive plus, under
/// ignore-mode, the per-document failures that were skipped.
#[derive(Debug)]
pub struct RunReport {
    pub entries: Vec<Entry>,
    pub skipped: Vec<Error>,
}

/// Documents → Rust declarations.
pub fn codify(source: Source, registry: &dyn TypeRegistry, cfg: &Config) -> Result<RunReport> {
    cfg.validate(Direction::Codify)?;
    let t0 = Instant::now();
    let mut session = Session::new();
    let mut skipped: Vec<Error> = Vec::new();
    let emit = EmitOptions {
        redact_secrets: cfg.redact_secrets,
        identifier_fn: cfg.identifier_fn,
        field_fn: cfg.field_fn,
    };

    let mut decls: Vec<Declaration> = Vec::new();
    for input in source.load_each() {
        let input = match input {
            Ok(i) => i,
            Err(e) => {
                recover(e, cfg, &mut skipped)?;
                continue;
            }
        };
        for chunk in split_documents(&input.text) {
            match codify_chunk(&chunk, &input, registry, &mut session, &emit) {
                Ok(mut d) => decls.append(&mut d),
                Err(e) => recover(e, cfg, &mut skipped)?,
            }
        }
    }

    let archive = assemble_code(&decls, cfg)?;
    let entries = archive.finish();
    histogram!("kiln_codify_ms", t0.elapsed().as_secs_f64() * 1000.0);
    counter!("kiln_codify_runs", 1u64);
    info!(
        declarations = decls.len(),
        entries = entries.len(),
        skipped = skipped.len(),
        took_ms = %t0.elapsed().as_millis(),
        "codify run complete"
    );
    Ok(RunReport { entries, skipped })
}

fn codify_chunk(
    chunk: &str,
    input: &RawInput,
    registry: &dyn TypeRegistry,
    session: &mut Session,
    emit: &EmitOptions,
) -> Result<Vec<Declaration>> {
    let resources = decode_str(chunk, registry)?;
    let mut out = Vec::with_capacity(resources.len());
    for r in &resources {
        tracing::debug!(origin = %input.origin, identity = %r.meta.identity(), "encoding declaration");
        out.push(declaration(r, session, emit)?);
    }
    Ok(out)
}

/// Ignore-mode keeps recoverable failures for the end-of-run list;
/// everything else aborts immediately.
fn recover(e: Error, cfg: &Config, skipped: &mut Vec<Error>) -> Result<()> {
    if cfg.ignore_errors && e.is_recoverable() {
        warn!(error = %e, "skipping document");
        skipped.push(e);
        Ok(())
    } else {
        Err(e)
    }
}

fn assemble_code(decls: &[Declaration], cfg: &Config) -> Result<kiln_archive::Archive> {
    let mut archive = kiln_archive::Archive::new();
    if decls.is_empty() {
        return Ok(archive);
    }
    let header = kiln_codegen::header(&cfg.app_name);
    let module = &cfg.module_name;

    match cfg.layout {
        Layout::SingleDocument => {
            archive.push(
                format!("{module}.rs"),
                kiln_codegen::render_file(&header, decls, cfg.convenience),
            )?;
        }
        Layout::Grouped => {
            let mut stems: Vec<String> = Vec::new();
            let mut groups: Vec<(String, Vec<Declaration>)> = Vec::new();
            for d in decls {
                let stem = kiln_naming::kind_slug(&d.kind);
                match groups.iter().position(|(s, _)| *s == stem) {
                    Some(i) => groups[i].1.push(d.clone()),
                    None => {
                        stems.push(stem.clone());
                        groups.push((stem, vec![d.clone()]));
                    }
                }
            }
            for (stem, members) in &groups {
                archive.push(
                    format!("{module}/{stem}.rs"),
                    kiln_codegen::render_file(&header, members, cfg.convenience),
                )?;
            }
            archive.push(
                format!("{module}/mod.rs"),
                kiln_codegen::mod_file(&header, &stems, cfg.convenience),
            )?;
        }
        // PerResource; exploded/json-array were rejected by validation.
        _ => {
            let mut stems: Vec<String> = Vec::new();
            for d in decls {
                archive.push(
                    format!("{module}/{}.rs", d.ident),
                    kiln_codegen::render_file(&header, std::slice::from_ref(d), cfg.convenience),
                )?;
                stems.push(d.ident.clone());
            }
            archive.push(
                format!("{module}/mod.rs"),
                kiln_codegen::mod_file(&header, &stems, cfg.convenience),
            )?;
        }
    }
    Ok(archive)
}

fn export_opts(cfg: &Config) -> ExportOptions {
    ExportOptions {
        layout: cfg.layout,
        app_name: cfg.app_name.clone(),
        redact_secrets: cfg.redact_secrets,
        strip_defaults: cfg.strip_defaults,
        write_index: cfg.write_index,
        file_fn: cfg.file_fn,
        redactors: cfg.redactors.clone(),
    }
}

/// Container → documents.
pub fn export(container: &dyn Container, cfg: &Config) -> Result<RunReport> {
    cfg.validate(Direction::Export)?;
    let t0 = Instant::now();
    let mut session = Session::new();
    let archive = export_container(container, &mut session, &export_opts(cfg))?;
    let entries = archive.finish();
    histogram!("kiln_export_ms", t0.elapsed().as_secs_f64() * 1000.0);
    counter!("kiln_export_runs", 1u64);
    info!(entries = entries.len(), took_ms = %t0.elapsed().as_millis(), "export run complete");
    Ok(RunReport { entries, skipped: Vec::new() })
}

/// Documents → normalized documents: decode, then export through an
/// ad-hoc container, giving manifests canonical shape, naming, and order.
pub fn normalize(source: Source, registry: &dyn TypeRegistry, cfg: &Config) -> Result<RunReport> {
    cfg.validate(Direction::Export)?;
    let t0 = Instant::now();
    let mut skipped: Vec<Error> = Vec::new();
    let mut set = ResourceSet::new(cfg.app_name.clone());
    for input in source.load_each() {
        let input = match input {
            Ok(i) => i,
            Err(e) => {
                recover(e, cfg, &mut skipped)?;
                continue;
            }
        };
        for chunk in split_documents(&input.text) {
            match decode_str(&chunk, registry) {
                Ok(resources) => {
                    for r in resources {
                        set.push(r);
                    }
                }
                Err(e) => recover(e, cfg, &mut skipped)?,
            }
        }
    }

    let mut session = Session::new();
    let archive = export_container(&set, &mut session, &export_opts(cfg))?;
    let entries = archive.finish();
    histogram!("kiln_normalize_ms", t0.elapsed().as_secs_f64() * 1000.0);
    info!(
        entries = entries.len(),
        skipped = skipped.len(),
        took_ms = %t0.elapsed().as_millis(),
        "normalize run complete"
    );
    Ok(RunReport { entries, skipped })
}

/// Where a finished archive goes. Success means it was fully written.
pub enum Sink {
    Directory(PathBuf),
    Writer(Box<dyn Write>),
}

pub fn write_report(report: &RunReport, sink: &mut Sink) -> Result<()> {
    match sink {
        Sink::Directory(dir) => kiln_archive::write_dir(&report.entries, dir),
        Sink::Writer(w) => kiln_archive::write_stream(&report.entries, w),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_problems_are_aggregated() {
        let cfg = Config {
            module_name: "my-app".into(),
            layout: Layout::JsonArray,
            write_index: true,
            ..Default::default()
        };
        let err = cfg.validate(Direction::Codify).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("path separator"), "{msg}");
        assert!(msg.contains("document output only"), "{msg}");
        assert!(msg.contains("incompatible with an index file"), "{msg}");
    }

    #[test]
    fn export_accepts_what_codify_rejects() {
        let cfg = Config { layout: Layout::Exploded, ..Default::default() };
        assert!(cfg.validate(Direction::Codify).is_err());
        assert!(cfg.validate(Direction::Export).is_ok());
    }

    #[test]
    fn default_config_passes_both_directions() {
        let cfg = Config::default();
        assert!(cfg.validate(Direction::Codify).is_ok());
        assert!(cfg.validate(Direction::Export).is_ok());
    }
}
