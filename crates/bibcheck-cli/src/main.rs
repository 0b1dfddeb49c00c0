use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

mod output;

use output::ColorMode;

/// Hard cap on citations verified in one run.
const MAX_CITATIONS_LIMIT: usize = 200;

/// Bibliography Checker - Verify document citations against academic metadata indexes
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a document's bibliography against CrossRef
    Check {
        /// Path to the document text file containing the bibliography
        file_path: PathBuf,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Contact email for the CrossRef polite pool
        #[arg(long)]
        mailto: Option<String>,

        /// Path to write the JSON report
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum number of citations to verify
        #[arg(long)]
        max_citations: Option<usize>,

        /// Seconds to wait on each metadata request
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Dry run: extract and print citations without querying CrossRef
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Check {
            file_path,
            no_color,
            mailto,
            output,
            max_citations,
            timeout_secs,
            dry_run,
        } => {
            if dry_run {
                dry_run_check(file_path)
            } else {
                check(file_path, no_color, mailto, output, max_citations, timeout_secs).await
            }
        }
    }
}

/// Read the document and extract citations; both failure modes here are
/// fatal to the run (nothing to verify).
fn load_citations(file_path: &PathBuf) -> anyhow::Result<Vec<bibcheck_core::Citation>> {
    if !file_path.exists() {
        anyhow::bail!("File not found: {}", file_path.display());
    }

    let text = std::fs::read_to_string(file_path).map_err(|e| {
        anyhow::anyhow!("Could not extract text from {}: {}", file_path.display(), e)
    })?;
    if text.trim().is_empty() {
        anyhow::bail!("Document is empty: {}", file_path.display());
    }

    let citations = bibcheck_extract::extract_citations(&text).map_err(|_| {
        anyhow::anyhow!("No citations found - check that the document contains a bibliography")
    })?;
    Ok(citations)
}

async fn check(
    file_path: PathBuf,
    no_color: bool,
    mailto: Option<String>,
    output: Option<PathBuf>,
    max_citations: Option<usize>,
    timeout_secs: Option<u64>,
) -> anyhow::Result<()> {
    // Resolve configuration: CLI flags > env vars > config file > defaults
    let file_cfg = bibcheck_core::config_file::load_config();

    let mut config = bibcheck_core::VerifyConfig::default();
    file_cfg.apply_to(&mut config);

    if let Some(mailto) = mailto.or_else(|| std::env::var("CROSSREF_MAILTO").ok()) {
        config.crossref_mailto = Some(mailto);
    }
    if let Some(secs) = timeout_secs.or_else(|| {
        std::env::var("REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
    }) {
        config.request_timeout_secs = secs;
    }

    let max_citations = max_citations
        .or_else(|| {
            file_cfg
                .processing
                .as_ref()
                .and_then(|p| p.max_citations)
        })
        .unwrap_or(50)
        .min(MAX_CITATIONS_LIMIT);

    let color = ColorMode(!no_color);
    let mut w: Box<dyn Write> = Box::new(std::io::stdout());

    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file_path.display().to_string());

    let mut citations = load_citations(&file_path)?;
    let capped_from = if citations.len() > max_citations {
        let raw_total = citations.len();
        citations.truncate(max_citations);
        Some(raw_total)
    } else {
        None
    };

    output::print_extraction_summary(&mut w, &file_name, citations.len(), capped_from, color)?;

    // Ctrl+C cancels between citations; results so far are still reported.
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let bar = ProgressBar::new(citations.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("valid progress template"),
    );

    let progress_bar = bar.clone();
    let progress = move |event: bibcheck_core::ProgressEvent| {
        if let Some(line) = output::format_progress(&event, color) {
            progress_bar.println(line);
        }
        if let bibcheck_core::ProgressEvent::Result { .. } = event {
            progress_bar.inc(1);
        }
    };

    let results = bibcheck_core::verify_citations(&citations, config, progress, cancel).await?;
    bar.finish_and_clear();

    let stats = bibcheck_core::CheckStats::from_results(&results);

    output::print_problem_report(&mut w, &citations, &results, color)?;
    output::print_summary(&mut w, &stats, color)?;

    if let Some(report_path) = output {
        let report = bibcheck_report::build_report(&file_name, &citations, &results);
        report.write_to(&report_path)?;
        writeln!(w, "Report written to {}", report_path.display())?;
    }

    Ok(())
}

fn dry_run_check(file_path: PathBuf) -> anyhow::Result<()> {
    let citations = load_citations(&file_path)?;
    let mut w: Box<dyn Write> = Box::new(std::io::stdout());

    writeln!(w, "Extracted {} citations:\n", citations.len())?;
    for (i, citation) in citations.iter().enumerate() {
        output::print_extracted_citation(&mut w, i + 1, citation)?;
    }
    Ok(())
}
