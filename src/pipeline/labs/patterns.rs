//! Lookup tables shared by every extraction stage.
//!
//! Each table is policy, not algorithm: extend a list here and every stage
//! that consults it picks the change up.

use std::sync::LazyLock;

use regex::Regex;

/// Text that is instructions, comments, column headers, or standalone
/// result flags. Never a test name or a panel name.
static INSTRUCTIONAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"Comments?:",
        r"Interpretation:",
        r"Please note",
        r"Note:",
        r"Important:",
        r"Instructions?:",
        r"Disclaimer:",
        r"Warning:",
        r"Request Problem",
        r"^\s*Borderline\s+High\s*$",
        r"^\s*Very\s+High\s*$",
        r"^\s*High\s*$",
        r"^\s*Low\s*$",
        r"^\s*Normal\s*$",
        r"^\s*Abnormal\s*$",
        r"^\s*High\s+Risk\s*$",
        r"^\s*Moderate\s+Risk\s*$",
        r"^\s*Low\s+Risk\s*$",
        r"insufficiency\s+as\s+a\s+level",
        r"guideline\.\s*JCEM",
        r"between\s*$",
        r"^\s*Reference\s+Range\s*$",
        r"^\s*Flag\s*$",
        r"^\s*Units?\s*$",
        r"^\s*Result\s*$",
        r"^\s*Test\s*$",
        r"^\s*Component\s*$",
        r"^\s*Status\s*$",
    ]
    .iter()
    .map(|p| case_insensitive(p))
    .collect()
});

/// Page counters that leak into wrapped cells ("mg/dL Page 1 of 2").
static PAGINATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\s*page\s+\d+\s+of\s+\d+",
        r"\s*\d+\s+of\s+\d+",
        r"\s*p\.\s*\d+\s*/\s*\d+",
        r"\s*\(\s*\d+\s*/\s*\d+\s*\)",
    ]
    .iter()
    .map(|p| case_insensitive(p))
    .collect()
});

/// Words that disqualify a candidate test name when they appear as whole words.
pub const INVALID_NAME_ARTIFACTS: &[&str] = &[
    "borderline high",
    "high",
    "low",
    "normal",
    "abnormal",
    "very high",
    "high risk",
    "moderate risk",
    "low risk",
    "risk",
    "result",
    "flag",
    "units",
    "reference",
    "interval",
    "component",
    "status",
    "test",
    "range",
    "insufficiency",
    "guideline",
    "jcem",
    "between",
    "previous",
    "current",
    "date",
    "collected",
];

static INVALID_NAME_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives = INVALID_NAME_ARTIFACTS
        .iter()
        .map(|a| regex::escape(a))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternatives})\b")).expect("Invalid artifact word regex")
});

/// Minimum length of a test name.
pub const MIN_TEST_NAME_LEN: usize = 3;

/// Upper-cased vocabulary that marks a result as qualitative.
pub const QUALITATIVE_VOCABULARY: &[&str] = &[
    "NEGATIVE",
    "POSITIVE",
    "NON REACTIVE",
    "REACTIVE",
    "INDETERMINATE",
    "NOT DETECTED",
    "DETECTED",
    "BORDERLINE",
    "ABNORMAL",
    "NORMAL",
    "SATISFACTORY",
    "UNSATISFACTORY",
    "PRESENT",
    "ABSENT",
    "HIGH",
    "LOW",
    "CRITICAL",
    "TOXIC",
    "THERAPEUTIC",
];

/// Standardized qualitative values, checked in order: a negative-family term
/// wins over the positive term it contains ("NON REACTIVE" ⊃ "REACTIVE").
pub const QUALITATIVE_STANDARDS: &[(&str, &[&str])] = &[
    ("Negative", &["NEGATIVE", "NON REACTIVE", "NOT DETECTED", "ABSENT"]),
    ("Positive", &["POSITIVE", "REACTIVE", "DETECTED", "PRESENT"]),
    ("Indeterminate", &["INDETERMINATE", "BORDERLINE", "INCONCLUSIVE"]),
];

/// Markers of a vendor "official" report layout.
pub const VENDOR_REPORT_MARKERS: &[&str] = &[
    "Patient Report",
    "Date Collected:",
    "Date Received:",
    "Ordering Physician:",
    "Reference Interval",
];

/// A numeric-looking result cell: optional `<`/`>` then digits and dots.
pub static NUMERIC_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[<>]?[\d.]+$").expect("Invalid numeric cell regex"));

/// A unit-shaped cell: letters and unit punctuation only.
pub static UNIT_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z/%\-().]+$").expect("Invalid unit cell regex"));

/// A measurement embedded in prose ("87 mg/dL", "6.1 x10E3").
pub static MEASUREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+\.?\d*\s*(mg/dL|mmol/L|g/dL|%|x10E\d|uIU/mL)")
        .expect("Invalid measurement regex")
});

fn case_insensitive(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("Invalid lab text regex pattern")
}

/// Whether text is instructional, a column header, or a standalone flag.
pub fn is_instructional_text(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    INSTRUCTIONAL_PATTERNS.iter().any(|re| re.is_match(text))
}

/// Remove page counters mixed into a cell or line.
pub fn clean_pagination_text(text: &str) -> String {
    let mut cleaned = text.to_string();
    for re in PAGINATION_PATTERNS.iter() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    cleaned.trim().to_string()
}

/// Whether a candidate is a real test name rather than a header or artifact.
pub fn is_valid_test_name(name: &str) -> bool {
    if name.chars().count() < MIN_TEST_NAME_LEN {
        return false;
    }
    if is_instructional_text(name) {
        return false;
    }
    !INVALID_NAME_WORDS.is_match(name)
}

/// Whether the text carries one of the vendor report markers.
pub fn has_vendor_markers(text: &str) -> bool {
    VENDOR_REPORT_MARKERS.iter().any(|m| text.contains(m))
}
