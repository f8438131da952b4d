//! Recovers the "Tests Ordered" manifest: the panel names a report says it
//! contains, in document order.

use std::sync::LazyLock;

use regex::Regex;

use super::patterns::{is_instructional_text, MEASUREMENT};

/// "CBC With Differential/Platelet (005009)": name before the last numeric code.
static PANEL_WITH_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)\(\d+\)").expect("Invalid panel code regex"));

static TESTS_ORDERED_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)tests?\s+ordered").expect("Invalid heading regex"));

/// Words that mark the end of the manifest section.
const SECTION_END_WORDS: &[&str] = &["patient", "specimen", "physician", "test", "result"];

/// Keywords for the last-resort scan when no manifest is printed.
const PANEL_KEYWORDS: &[&str] = &["panel", "cbc", "count", "metabolic", "lipid", "hepatitis"];

const MIN_CODED_NAME_LEN: usize = 5;
const MIN_SEGMENT_LEN: usize = 5;
const MIN_UNCODED_NAME_LEN: usize = 10;

/// Extract ordered panel names, de-duplicated in first-seen order.
///
/// 1. Lines after a "Tests Ordered" heading, until a line that opens the
///    next section.
/// 2. Any line listing several coded panels separated by `;`.
/// 3. Only when both found nothing: lines that mention a panel keyword.
pub fn extract_ordered_panels(text: &str) -> Vec<String> {
    let mut panels = Vec::new();
    let mut in_section = false;

    for line in text.lines().map(str::trim) {
        if TESTS_ORDERED_HEADING.is_match(line) {
            in_section = true;
            panels.extend(panels_from_line(line));
            continue;
        }
        if !in_section || line.is_empty() {
            continue;
        }
        if ends_manifest_section(line) {
            in_section = false;
            continue;
        }
        panels.extend(panels_from_line(line));
    }

    for line in text.lines().map(str::trim) {
        if line.contains(';') && line.contains('(') && line.contains(')') {
            panels.extend(panels_from_line(line));
        }
    }

    if panels.is_empty() {
        panels = keyword_panel_lines(text);
    }

    dedupe_preserving_order(panels)
}

fn ends_manifest_section(line: &str) -> bool {
    let lower = line.to_lowercase();
    let mentions_section = SECTION_END_WORDS.iter().any(|w| lower.contains(w));
    mentions_section && (!lower.contains("test") || lower.contains("result"))
}

/// Panels on one manifest line; `;` separates several. A leading
/// "Tests Ordered:" heading is not part of the first name.
pub fn panels_from_line(line: &str) -> Vec<String> {
    let body = match TESTS_ORDERED_HEADING.find(line) {
        Some(heading) => line[heading.end()..].trim_start_matches([':', ' ', '\t']),
        None => line,
    };
    body.split(';').filter_map(panel_from_segment).collect()
}

/// A panel name from one manifest segment: the text before a trailing
/// numeric code, or a long digit-free segment without a code.
pub fn panel_from_segment(segment: &str) -> Option<String> {
    let segment = segment.trim();
    if segment.chars().count() < MIN_SEGMENT_LEN || is_instructional_text(segment) {
        return None;
    }

    if let Some(caps) = PANEL_WITH_CODE.captures(segment) {
        let name = caps[1].trim();
        return (name.chars().count() > MIN_CODED_NAME_LEN).then(|| name.to_string());
    }

    let digit_free = !segment.chars().any(|c| c.is_ascii_digit());
    (digit_free && segment.chars().count() > MIN_UNCODED_NAME_LEN).then(|| segment.to_string())
}

fn keyword_panel_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| {
            let lower = line.to_lowercase();
            line.chars().count() > MIN_UNCODED_NAME_LEN
                && PANEL_KEYWORDS.iter().any(|k| lower.contains(k))
                && !MEASUREMENT.is_match(line)
                && !is_instructional_text(line)
        })
        .map(str::to_string)
        .collect()
}

fn dedupe_preserving_order(panels: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    panels
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}
