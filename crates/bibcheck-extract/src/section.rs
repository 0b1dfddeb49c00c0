use once_cell::sync::Lazy;
use regex::Regex;

/// Fraction of the document skipped when no heading is found; reference
/// lists sit near the end, so the fallback keeps the last 30%.
const FALLBACK_FRACTION: f64 = 0.7;

/// Ordered heading patterns, highest priority first. Each is anchored to
/// the start of a line and must be followed by a line break. The first
/// pattern with any match wins; among its matches the earliest occurrence
/// in the text is used.
static HEADING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?im)^[ \t]*references?\s*?\n",
        r"(?im)^[ \t]*bibliography\s*?\n",
        r"(?im)^[ \t]*works?[ \t]+cited\s*?\n",
        r"(?im)^[ \t]*literature[ \t]+cited\s*?\n",
        r"(?im)^[ \t]*riferimenti[ \t]+bibliografici?\s*?\n",
        r"(?im)^[ \t]*bibliografia\s*?\n",
        r"(?im)^[ \t]*bibliographie\s*?\n",
        r"(?im)^[ \t]*literatur\s*?\n",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Byte offset where the bibliography section starts.
///
/// Tries each heading pattern in priority order. If none matches, falls
/// back to 70% of the text length; this is a degrade-gracefully policy,
/// not a parser, and is lossy on documents with atypical headings.
/// Never fails: every input yields a valid offset.
pub fn locate(text: &str) -> usize {
    for pattern in HEADING_PATTERNS.iter() {
        if let Some(m) = pattern.find(text) {
            return m.start();
        }
    }

    let cutoff = (text.len() as f64 * FALLBACK_FRACTION) as usize;
    // Don't split in the middle of a UTF-8 codepoint.
    text.char_indices()
        .map(|(i, _)| i)
        .find(|&i| i >= cutoff)
        .unwrap_or(text.len())
}

/// The bibliography section: everything from the located offset to the
/// end of the document.
pub fn bibliography_section(text: &str) -> &str {
    &text[locate(text)..]
}
