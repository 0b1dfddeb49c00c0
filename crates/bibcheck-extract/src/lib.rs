//! Citation extraction from raw document text.
//!
//! Pipeline:
//! 1. Locate the bibliography/reference section
//! 2. Segment it into candidate citation lines
//! 3. Parse structural fields (authors, year, title, DOI) out of each line
//!
//! Extraction is best-effort pattern matching over common Western citation
//! formats, not grammar-based parsing: a line that yields no structure is
//! still kept as a citation record, since its presence in the bibliography
//! is itself meaningful.

use thiserror::Error;

pub mod fields;
pub mod section;
pub mod segment;

// Re-export the domain type from core (canonical definition lives there)
pub use bibcheck_core::Citation;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("no citation candidates found in document text")]
    NoCitations,
}

/// Extract citations from full document text.
///
/// Fails only when no line of the located section qualifies as a citation
/// candidate; callers treat that as "nothing to verify" and stop before
/// any external lookup.
pub fn extract_citations(text: &str) -> Result<Vec<Citation>, ExtractError> {
    let section = section::bibliography_section(text);
    let candidates = segment::segment(section);
    if candidates.is_empty() {
        return Err(ExtractError::NoCitations);
    }
    Ok(candidates.iter().map(|line| fields::extract(line)).collect())
}
