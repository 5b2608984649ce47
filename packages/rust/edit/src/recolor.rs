//! Bulk color replacement.

use regex::{NoExpand, RegexBuilder};
use serde::Serialize;
use tracing::{debug, instrument, warn};

/// Result of a bulk recolor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecolorResult {
    pub html: String,
    /// Number of occurrences replaced.
    pub replacements: usize,
}

/// Replace every occurrence of one hex color with another, case-insensitively.
///
/// Both colors must be six-digit hex, with or without the leading `#`.
/// Anything else leaves the document untouched.
#[instrument(skip(html), fields(bytes = html.len()))]
pub fn replace_color(html: &str, from: &str, to: &str) -> RecolorResult {
    let unchanged = || RecolorResult {
        html: html.to_string(),
        replacements: 0,
    };

    let (Some(from), Some(to)) = (normalize_hex(from), normalize_hex(to)) else {
        warn!(from, to, "not a six-digit hex color, nothing replaced");
        return unchanged();
    };

    let pattern = match RegexBuilder::new(&regex::escape(&from))
        .case_insensitive(true)
        .build()
    {
        Ok(pattern) => pattern,
        Err(e) => {
            warn!(error = %e, "could not build color pattern");
            return unchanged();
        }
    };

    let replacements = pattern.find_iter(html).count();
    if replacements == 0 {
        debug!(%from, "color not present");
        return unchanged();
    }

    let html = pattern.replace_all(html, NoExpand(&to)).into_owned();
    debug!(%from, %to, replacements, "recolored");
    RecolorResult { html, replacements }
}

/// `#RRGGBB` or `rrggbb` → `#rrggbb`.
fn normalize_hex(value: &str) -> Option<String> {
    let digits = value.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);
    (digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| format!("#{}", digits.to_ascii_lowercase()))
}
