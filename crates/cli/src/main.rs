use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use kiln_api::{Config, Layout, RunReport, Sink};
use kiln_decode::Source;
use kiln_registry::builtin;

#[derive(Parser, Debug)]
#[command(name = "kilnctl", version, about = "Transcode resource manifests to Rust declarations and back")]
struct Cli {
    /// Verbose diagnostics (KILN_LOG overrides)
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CodeLayout {
    PerResource,
    Grouped,
    SingleFile,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum DocLayout {
    PerResource,
    Grouped,
    Exploded,
    Single,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate Rust declarations from manifests
    Codify {
        /// Input files, a directory, or "-" for stdin
        inputs: Vec<PathBuf>,
        /// Output directory (stdout when omitted)
        #[arg(long = "out")]
        out: Option<PathBuf>,
        /// Application name used in generated headers
        #[arg(long = "app", default_value = "app")]
        app: String,
        /// Module name for generated code
        #[arg(long = "module", default_value = "app")]
        module: String,
        #[arg(long = "layout", value_enum, default_value_t = CodeLayout::PerResource)]
        layout: CodeLayout,
        /// Replace secret payloads with a placeholder
        #[arg(long = "redact-secrets", action = ArgAction::SetTrue)]
        redact_secrets: bool,
        /// Skip documents that fail to decode and report them at the end
        #[arg(long = "ignore-errors", action = ArgAction::SetTrue)]
        ignore_errors: bool,
        /// Emit convenience manifest() collectors
        #[arg(long = "convenience", action = ArgAction::SetTrue)]
        convenience: bool,
    },
    /// Re-emit manifests in canonical form, named and ordered for apply
    Normalize {
        /// Input files, a directory, or "-" for stdin
        inputs: Vec<PathBuf>,
        /// Output directory (stdout when omitted)
        #[arg(long = "out")]
        out: Option<PathBuf>,
        /// Application name used for single-entry output files
        #[arg(long = "app", default_value = "app")]
        app: String,
        #[arg(long = "layout", value_enum, default_value_t = DocLayout::Single)]
        layout: DocLayout,
        /// Emit a kustomization-style index alongside the manifests
        #[arg(long = "index", action = ArgAction::SetTrue)]
        index: bool,
        /// Also strip server-populated default fields
        #[arg(long = "strip-defaults", action = ArgAction::SetTrue)]
        strip_defaults: bool,
        /// Replace secret payloads with a placeholder
        #[arg(long = "redact-secrets", action = ArgAction::SetTrue)]
        redact_secrets: bool,
        /// Skip documents that fail to decode and report them at the end
        #[arg(long = "ignore-errors", action = ArgAction::SetTrue)]
        ignore_errors: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env = std::env::var("KILN_LOG").unwrap_or_else(|_| default.to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn source_from(inputs: Vec<PathBuf>) -> Result<Source> {
    if inputs.len() == 1 {
        let only = &inputs[0];
        if only.as_os_str() == "-" {
            return Ok(Source::Reader(Box::new(std::io::stdin())));
        }
        if only.is_dir() {
            return Ok(Source::Directory(only.clone()));
        }
    }
    if inputs.is_empty() {
        anyhow::bail!("no inputs given; pass files, a directory, or \"-\" for stdin");
    }
    Ok(Source::Files(inputs))
}

fn sink_from(out: Option<PathBuf>) -> Sink {
    match out {
        Some(dir) => Sink::Directory(dir),
        None => Sink::Writer(Box::new(std::io::stdout())),
    }
}

fn finish(report: RunReport, out: Option<PathBuf>) -> Result<()> {
    let mut sink = sink_from(out);
    kiln_api::write_report(&report, &mut sink).context("writing archive")?;
    info!(entries = report.entries.len(), "archive written");
    for e in &report.skipped {
        warn!(error = %e, "document skipped");
        eprintln!("skipped: {e}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Codify {
            inputs,
            out,
            app,
            module,
            layout,
            redact_secrets,
            ignore_errors,
            convenience,
        } => {
            let cfg = Config {
                app_name: app,
                module_name: module,
                layout: match layout {
                    CodeLayout::PerResource => Layout::PerResource,
                    CodeLayout::Grouped => Layout::Grouped,
                    CodeLayout::SingleFile => Layout::SingleDocument,
                },
                redact_secrets,
                ignore_errors,
                verbose: cli.verbose,
                convenience,
                ..Default::default()
            };
            let source = source_from(inputs)?;
            let report = kiln_api::codify(source, builtin(), &cfg).context("codify run failed")?;
            finish(report, out)
        }
        Commands::Normalize {
            inputs,
            out,
            app,
            layout,
            index,
            strip_defaults,
            redact_secrets,
            ignore_errors,
        } => {
            let cfg = Config {
                app_name: app.clone(),
                module_name: app.replace('-', "_"),
                layout: match layout {
                    DocLayout::PerResource => Layout::PerResource,
                    DocLayout::Grouped => Layout::Grouped,
                    DocLayout::Exploded => Layout::Exploded,
                    DocLayout::Single => Layout::SingleDocument,
                    DocLayout::Json => Layout::JsonArray,
                },
                redact_secrets,
                ignore_errors,
                verbose: cli.verbose,
                strip_defaults,
                write_index: index,
                ..Default::default()
            };
            let source = source_from(inputs)?;
            let report =
                kiln_api::normalize(source, builtin(), &cfg).context("normalize run failed")?;
            finish(report, out)
        }
    }
}
