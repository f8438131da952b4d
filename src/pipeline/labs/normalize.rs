use std::sync::LazyLock;

use regex::Regex;

use super::fallbacks::{fallback_reference_range, fallback_unit, KnownFallback};
use super::patterns::{clean_pagination_text, QUALITATIVE_STANDARDS, QUALITATIVE_VOCABULARY};
use crate::models::{ReferenceRange, TestRecord};
use crate::pipeline::extraction::normalize_whitespace;

/// "87 H" in a combined "Result and Flag" column.
static RESULT_WITH_FLAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([<>]?\d[\d.]*)\s+([HLAC]{1,2})$").expect("Invalid result/flag regex")
});

/// Fields of a test as located on the page, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTestFields {
    pub name: String,
    pub result: String,
    pub unit: Option<String>,
    pub reference: Option<String>,
    pub flag: Option<String>,
}

/// Whether a result is qualitative: its upper-cased form contains a term
/// from the qualitative vocabulary.
pub fn is_qualitative_result(result: &str) -> bool {
    let upper = result.trim().to_uppercase();
    if upper.is_empty() {
        return false;
    }
    QUALITATIVE_VOCABULARY.iter().any(|term| upper.contains(term))
}

/// Map a qualitative result onto Negative / Positive / Indeterminate.
/// Text outside those families passes through trimmed.
pub fn standardize_qualitative_result(result: &str) -> String {
    let upper = result.trim().to_uppercase();

    for (standard, variants) in QUALITATIVE_STANDARDS {
        if variants.iter().any(|v| upper.contains(v)) {
            return (*standard).to_string();
        }
    }

    result.trim().to_string()
}

/// Parse a numeric result, ignoring `<`/`>` qualifiers. Non-numbers yield `None`.
pub fn parse_numeric_result(result: &str) -> Option<f64> {
    let numeric_part: String = result.chars().filter(|c| !matches!(c, '<' | '>')).collect();
    parse_finite(&numeric_part)
}

/// Parse a printed reference range.
///
/// `A-B` → `Range`, `<B` → `LessThan`, `>A` → `GreaterThan`, empty → `Absent`,
/// anything else is kept verbatim as `Unparsed`.
pub fn parse_reference_range(text: &str) -> ReferenceRange {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ReferenceRange::Absent;
    }
    let normalized = trimmed.replace('\u{2013}', "-");

    if let Some(rest) = normalized.strip_prefix('<') {
        if let Some(value) = parse_finite(rest) {
            return ReferenceRange::LessThan { value };
        }
    } else if let Some(rest) = normalized.strip_prefix('>') {
        if let Some(value) = parse_finite(rest) {
            return ReferenceRange::GreaterThan { value };
        }
    } else if normalized.contains('-') {
        let parts: Vec<&str> = normalized.split('-').collect();
        if let [low, high] = parts.as_slice() {
            if let (Some(low), Some(high)) = (parse_finite(low), parse_finite(high)) {
                return ReferenceRange::Range { low, high };
            }
        }
    }

    ReferenceRange::Unparsed {
        text: trimmed.to_string(),
    }
}

fn parse_finite(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Split a trailing flag off a combined result cell ("87 H" → "87", "H").
pub fn split_result_flag(result: &str) -> (String, Option<String>) {
    match RESULT_WITH_FLAG.captures(result.trim()) {
        Some(caps) => (caps[1].to_string(), Some(caps[2].to_string())),
        None => (result.trim().to_string(), None),
    }
}

/// Clean a unit cell; falls back to the known unit for the test when the
/// document printed none.
pub fn normalize_unit(test_name: &str, unit: Option<&str>, fallbacks: &[KnownFallback]) -> String {
    let cleaned = unit
        .map(|u| clean_pagination_text(&normalize_whitespace(u)))
        .unwrap_or_default();

    if !cleaned.is_empty() {
        return cleaned;
    }

    fallback_unit(test_name, fallbacks)
        .map(str::to_string)
        .unwrap_or_default()
}

/// Turn located fields into a `TestRecord`: classify the result, parse the
/// range, and apply known fallbacks where the document is silent.
pub fn build_test_record(raw: RawTestFields, fallbacks: &[KnownFallback]) -> TestRecord {
    let name = normalize_whitespace(&raw.name);
    let result = raw.result.trim().to_string();
    let unit = normalize_unit(&name, raw.unit.as_deref(), fallbacks);

    let (result_text, numeric_value) = if is_qualitative_result(&result) {
        (Some(standardize_qualitative_result(&result)), None)
    } else {
        (None, parse_numeric_result(&result))
    };

    let mut reference_range = parse_reference_range(raw.reference.as_deref().unwrap_or_default());
    if reference_range.is_absent() {
        if let Some(known) = fallback_reference_range(&name, fallbacks) {
            reference_range = known.clone();
        }
    }

    let flag = raw
        .flag
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());

    TestRecord {
        name,
        result,
        result_text,
        numeric_value,
        unit,
        reference_range,
        panel_name: None,
        flag,
    }
}
