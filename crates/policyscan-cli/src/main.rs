//! CLI entry point for policyscan.
//!
//! This module is intentionally thin: it handles argument parsing, I/O, and exit codes.
//! All business logic lives in the `policyscan-app` crate.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand, ValueEnum};
use policyscan_app::{
    FixInput, ScanInput, exit_code, render_annotations, render_markdown, render_status,
    run_explain, run_fix, run_scan, serialize_report, set_policy,
};
use policyscan_domain::model::FindingKind;
use policyscan_domain::policy::{FindingKey, PolicyDecision};
use policyscan_settings::Overrides;

#[derive(Parser, Debug)]
#[command(
    name = "policyscan",
    version,
    about = "Dependency and CI directive policy scanner for multi-repository corpora"
)]
struct Cli {
    /// Corpus root: every directory directly under it is one repository.
    #[arg(long, default_value = ".")]
    corpus: Utf8PathBuf,

    /// Path to the policyscan config TOML.
    #[arg(long, default_value = "policyscan.toml")]
    config: Utf8PathBuf,

    /// Override the per-query match cutoff.
    #[arg(long)]
    max_results: Option<u32>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Markdown,
    Annotations,
    Status,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan the corpus and report every unapproved finding.
    Scan {
        #[arg(long, value_enum, default_value = "json")]
        format: Format,

        /// Write the output to a file instead of stdout.
        #[arg(long, short)]
        out: Option<Utf8PathBuf>,

        /// Maximum number of annotations to emit.
        #[arg(long, default_value = "10")]
        max_annotations: usize,
    },

    /// Apply every offered remediation across the corpus.
    Fix {
        /// Kind id to fix (repeatable); all enabled kinds when omitted.
        #[arg(long = "kind")]
        kinds: Vec<String>,

        /// Print the documents that would change without writing them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Record an `allow` decision for a finding.
    Allow {
        /// Kind id (e.g. "npm_dependency").
        kind: String,
        /// Finding name (e.g. "left-pad").
        name: String,
    },

    /// Record a `forbid` decision for a finding.
    Forbid {
        kind: String,
        name: String,
    },

    /// Show what a kind scans for and how the current config classifies and fixes it.
    Explain {
        /// The kind id (e.g. "travis_go_version") or tag (e.g. "TRAVIS_GO") to explain.
        identifier: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let overrides = Overrides {
        max_results: cli.max_results,
    };

    match cli.cmd {
        Commands::Scan {
            format,
            ref out,
            max_annotations,
        } => {
            cmd_scan(
                &cli.corpus,
                &cli.config,
                overrides,
                format,
                out.as_deref(),
                max_annotations,
            )
            .await
        }
        Commands::Fix { ref kinds, dry_run } => {
            cmd_fix(&cli.corpus, &cli.config, overrides, kinds, dry_run).await
        }
        Commands::Allow { ref kind, ref name } => {
            cmd_policy(&cli.config, kind, name, PolicyDecision::Allowed).await
        }
        Commands::Forbid { ref kind, ref name } => {
            cmd_policy(&cli.config, kind, name, PolicyDecision::Forbidden).await
        }
        Commands::Explain { ref identifier } => {
            cmd_explain(&cli.config, overrides, identifier).await
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("POLICYSCAN_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn ensure_corpus(corpus: &Utf8Path) -> anyhow::Result<()> {
    if !corpus.is_dir() {
        anyhow::bail!("corpus root does not exist: {}", corpus);
    }
    Ok(())
}

async fn cmd_scan(
    corpus: &Utf8Path,
    config: &Utf8Path,
    overrides: Overrides,
    format: Format,
    out: Option<&Utf8Path>,
    max_annotations: usize,
) -> anyhow::Result<()> {
    ensure_corpus(corpus)?;
    let output = run_scan(ScanInput {
        corpus_root: corpus,
        config_path: config,
        overrides,
    })
    .await?;
    let report = &output.report;
    tracing::info!(
        documents = report.summary.documents_scanned,
        diagnostics = report.summary.diagnostics_total,
        cache_hits = output.cache.hits,
        cache_misses = output.cache.misses,
        "scan finished"
    );

    let text = match format {
        Format::Json => {
            let mut data = serialize_report(report)?;
            data.push(b'\n');
            String::from_utf8(data).context("report is not UTF-8")?
        }
        Format::Markdown => render_markdown(report),
        Format::Annotations => render_annotations(report, max_annotations)
            .into_iter()
            .map(|line| line + "\n")
            .collect(),
        Format::Status => render_status(report),
    };

    match out {
        Some(path) => write_text_file(path, &text).context("write scan output")?,
        None => print!("{}", text),
    }

    let code = exit_code(&report.summary);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

async fn cmd_fix(
    corpus: &Utf8Path,
    config: &Utf8Path,
    overrides: Overrides,
    kinds: &[String],
    dry_run: bool,
) -> anyhow::Result<()> {
    ensure_corpus(corpus)?;
    let kinds = kinds
        .iter()
        .map(|k| parse_kind(k))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let output = run_fix(FixInput {
        corpus_root: corpus,
        config_path: config,
        overrides,
        kinds,
        dry_run,
    })
    .await?;

    if dry_run {
        for uri in output.edit.documents() {
            println!("would fix {}", uri);
        }
    } else {
        for uri in &output.written {
            println!("fixed {}", uri);
        }
    }

    if !output.failures.is_empty() {
        for (uri, message) in &output.failures {
            eprintln!("policyscan: could not fix {}: {}", uri, message);
        }
        anyhow::bail!("{} document(s) could not be fixed", output.failures.len());
    }
    Ok(())
}

async fn cmd_policy(
    config: &Utf8Path,
    kind: &str,
    name: &str,
    decision: PolicyDecision,
) -> anyhow::Result<()> {
    let key = FindingKey::new(parse_kind(kind)?, name);
    set_policy(config, &key, decision)
        .await
        .with_context(|| format!("update {}", config))?;
    println!("{} {} in {}", decision, key, config);
    Ok(())
}

async fn cmd_explain(
    config: &Utf8Path,
    overrides: Overrides,
    identifier: &str,
) -> anyhow::Result<()> {
    let explanation = run_explain(config, overrides, identifier).await?;
    print!("{}", explanation);
    Ok(())
}

fn parse_kind(id: &str) -> anyhow::Result<FindingKind> {
    FindingKind::from_id(id).with_context(|| {
        let known: Vec<&str> = FindingKind::ALL.iter().map(|k| k.id()).collect();
        format!("unknown kind: {id} (expected one of: {})", known.join(", "))
    })
}

fn write_text_file(path: &Utf8Path, text: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| format!("create directory: {}", parent))?;
    }
    std::fs::write(path, text).with_context(|| format!("write text: {}", path))?;
    Ok(())
}
