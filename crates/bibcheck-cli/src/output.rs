use std::io::Write;

use bibcheck_core::{
    CheckStats, Citation, ProgressEvent, VerificationResult, VerificationStatus,
};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the extraction summary after parsing the document.
pub fn print_extraction_summary(
    w: &mut dyn Write,
    file_name: &str,
    total_citations: usize,
    capped_from: Option<usize>,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w, "Extracting citations from {}...", file_name)?;
    writeln!(w, "Found {} citations to verify", total_citations)?;

    if let Some(raw_total) = capped_from {
        let msg = format!(
            "(Limited to the first {} of {} citations)",
            total_citations, raw_total
        );
        if color.enabled() {
            writeln!(w, "{}", msg.yellow())?;
        } else {
            writeln!(w, "{}", msg)?;
        }
    }
    writeln!(w)?;
    Ok(())
}

/// One-line rendering of a progress event, if it should be shown.
pub fn format_progress(event: &ProgressEvent, color: ColorMode) -> Option<String> {
    match event {
        ProgressEvent::Checking { index, total, text } => {
            let short = truncate(text, 60);
            Some(format!("[{}/{}] Checking: {}", index + 1, total, short))
        }
        ProgressEvent::Result {
            index,
            total,
            result,
        } => {
            let label = status_label(result.status, color);
            Some(format!(
                "[{}/{}] -> {} (score {:.2})",
                index + 1,
                total,
                label,
                result.score
            ))
        }
    }
}

fn status_label(status: VerificationStatus, color: ColorMode) -> String {
    if color.enabled() {
        match status {
            VerificationStatus::Verified => "VERIFIED".green().to_string(),
            VerificationStatus::Uncertain => "UNCERTAIN".yellow().to_string(),
            VerificationStatus::Error => "LOW CONFIDENCE".red().to_string(),
            VerificationStatus::NotFound => "NOT FOUND".red().to_string(),
        }
    } else {
        match status {
            VerificationStatus::Verified => "VERIFIED".to_string(),
            VerificationStatus::Uncertain => "UNCERTAIN".to_string(),
            VerificationStatus::Error => "LOW CONFIDENCE".to_string(),
            VerificationStatus::NotFound => "NOT FOUND".to_string(),
        }
    }
}

/// Print the drill-down block for every non-verified citation, with its
/// recorded messages and the best available match for manual correction.
pub fn print_problem_report(
    w: &mut dyn Write,
    citations: &[Citation],
    results: &[VerificationResult],
    color: ColorMode,
) -> std::io::Result<()> {
    for (i, (citation, result)) in citations.iter().zip(results).enumerate() {
        if result.status == VerificationStatus::Verified {
            continue;
        }
        print_problem_block(w, i + 1, citation, result, color)?;
    }
    Ok(())
}

fn print_problem_block(
    w: &mut dyn Write,
    id: usize,
    citation: &Citation,
    result: &VerificationResult,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold().red())?;
        writeln!(
            w,
            "{}",
            format!("PROBLEM CITATION #{}", id).bold().red()
        )?;
        writeln!(w, "{}", sep.bold().red())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "PROBLEM CITATION #{}", id)?;
        writeln!(w, "{}", sep)?;
    }
    writeln!(w)?;

    if color.enabled() {
        writeln!(w, "{}:", "Citation".bold())?;
        writeln!(w, "  {}", citation.original_text.cyan())?;
    } else {
        writeln!(w, "Citation:")?;
        writeln!(w, "  {}", citation.original_text)?;
    }
    writeln!(w)?;

    writeln!(
        w,
        "Status: {} (confidence {:.2})",
        status_label(result.status, color),
        result.score
    )?;

    for message in &result.error_messages {
        writeln!(w, "  - {}", message)?;
    }

    if let Some(best) = &result.best_match {
        writeln!(w)?;
        if color.enabled() {
            writeln!(w, "{}", "Best available match:".bold())?;
        } else {
            writeln!(w, "Best available match:")?;
        }
        writeln!(w, "  Title:   {}", best.title)?;
        if !best.authors.is_empty() {
            writeln!(w, "  Authors: {}", best.authors.join("; "))?;
        }
        if let Some(year) = &best.year {
            writeln!(w, "  Year:    {}", year)?;
        }
        if let Some(journal) = &best.journal {
            writeln!(w, "  Journal: {}", journal)?;
        }
        if !best.doi.is_empty() {
            writeln!(w, "  DOI:     https://doi.org/{}", best.doi)?;
        }
        writeln!(w, "  Source:  {}", best.source_name)?;
    }

    writeln!(w)?;
    Ok(())
}

/// Print the final summary with aggregate accuracy.
pub fn print_summary(
    w: &mut dyn Write,
    stats: &CheckStats,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", "SUMMARY".bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "SUMMARY")?;
        writeln!(w, "{}", sep)?;
    }

    writeln!(w, "  Citations verified: {}", stats.total)?;
    writeln!(w)?;

    let verified_line = format!(
        "Verified: {} ({:.1}% accuracy)",
        stats.verified,
        stats.accuracy_pct()
    );
    if color.enabled() {
        writeln!(w, "  {}", verified_line.green())?;
    } else {
        writeln!(w, "  {}", verified_line)?;
    }
    if stats.uncertain > 0 {
        let msg = format!("Uncertain (manual review): {}", stats.uncertain);
        if color.enabled() {
            writeln!(w, "  {}", msg.yellow())?;
        } else {
            writeln!(w, "  {}", msg)?;
        }
    }
    if stats.errors > 0 {
        let msg = format!("Low confidence: {}", stats.errors);
        if color.enabled() {
            writeln!(w, "  {}", msg.red())?;
        } else {
            writeln!(w, "  {}", msg)?;
        }
    }
    if stats.not_found > 0 {
        let msg = format!("Not found: {}", stats.not_found);
        if color.enabled() {
            writeln!(w, "  {}", msg.red())?;
        } else {
            writeln!(w, "  {}", msg)?;
        }
    }

    writeln!(w)?;
    Ok(())
}

/// Print one extracted citation with its parsed fields (dry-run mode).
pub fn print_extracted_citation(
    w: &mut dyn Write,
    id: usize,
    citation: &Citation,
) -> std::io::Result<()> {
    writeln!(w, "[{}] {}", id, truncate(&citation.original_text, 90))?;
    if !citation.authors.is_empty() {
        writeln!(w, "     authors: {}", citation.authors.join("; "))?;
    }
    if let Some(year) = &citation.year {
        writeln!(w, "     year:    {}", year)?;
    }
    if let Some(title) = &citation.title {
        writeln!(w, "     title:   {}", title)?;
    }
    if let Some(doi) = &citation.doi {
        writeln!(w, "     doi:     {}", doi)?;
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}
