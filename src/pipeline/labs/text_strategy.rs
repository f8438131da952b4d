//! Flowed-text fallback: recovers records one line at a time when no
//! results table is available.
//!
//! Two grammars exist. Vendor "official" reports print a lab-site code, the
//! previous result, and its date on every line, under panel headings; every
//! other report goes through the generic `name result [unit] [range]` line.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::config::ParserConfig;
use super::metadata::{extract_collection_date, extract_physician};
use super::normalize::{build_test_record, RawTestFields};
use super::ordered_panels::extract_ordered_panels;
use super::panel_inference::infer_panel;
use super::patterns::{clean_pagination_text, has_vendor_markers, is_instructional_text, is_valid_test_name};
use super::types::{ExtractionStrategy, SourceDocument};
use super::LabParseError;
use crate::models::{ParsedDocument, TestRecord};

/// A name word starts with a letter (or an opening parenthesis, "(NIH)").
const NAME_WORD: &str = r"[A-Za-z(][\w,/().\-]*";
/// A unit starts with a letter, `%` or `µ` ("mg/dL", "x10E3/uL", "mL/min/1.73").
const UNIT: &str = r"[A-Za-z%µ][\w/%\-().²³µ^*]*";
/// A single bound or a low-high range, each optionally `<`/`>` prefixed.
const REFERENCE: &str = r"[<>]?[\d.]+(?:-[<>]?[\d.]+)?";
/// Vendor names may carry digits after the first letter ("Vitamin B12").
const VENDOR_NAME: &str = r"[A-Za-z][A-Za-z0-9\s.,/()'\-]*?";
const QUALITATIVE_RESULT: &str =
    r"(?i:non[\s-]?reactive|reactive|negative|positive|not\s+detected|detected|indeterminate|equivocal)";

/// `Name Result [Unit] [Reference]`.
static GENERIC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    line_regex(&format!(
        r"^({NAME_WORD}(?:\s+{NAME_WORD})*?)\s+([<>]?[\d.]+)(?:\s+({UNIT}))?(?:\s+({REFERENCE}))?\s*$"
    ))
});

/// `Name LL Negative [Previous MM/DD/YYYY] [Reference]`. The lab code is
/// required and the tail holds only qualitative words and a date.
static VENDOR_QUALITATIVE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    line_regex(&format!(
        r"^({NAME_WORD}(?:\s+{NAME_WORD}){{0,4}}?)\s+\d{{2}}\s+({QUALITATIVE_RESULT})(?:(?:\s+{QUALITATIVE_RESULT})?\s+\d{{2}}/\d{{2}}/\d{{4}})?(?:\s+({QUALITATIVE_RESULT}))?\s*$"
    ))
});

/// `Name LL Value [Flag] [Previous] MM/DD/YYYY [Unit] [Reference]`.
static VENDOR_FULL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    line_regex(&format!(
        r"^({VENDOR_NAME})\s+\d{{2}}\s+([<>]?[\d.]+)(?:\s+([A-Za-z]+))?(?:\s+[<>]?[\d.]+\*?)?\s+\d{{2}}/\d{{2}}/\d{{4}}(?:\s+({UNIT}))?(?:\s+({REFERENCE}))?\s*$"
    ))
});

/// `Name LL Value [Flag] [Unit] [Reference]`, first-time results with no
/// previous value printed.
static VENDOR_CODED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    line_regex(&format!(
        r"^({VENDOR_NAME})\s+\d{{2}}\s+([<>]?[\d.]+)(?:\s+([A-Za-z]+))??(?:\s+({UNIT}))?(?:\s+({REFERENCE}))?\s*$"
    ))
});

/// `Name Value [Token]` where a lone H/L/A is a flag and anything else a unit.
static VENDOR_SIMPLE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    line_regex(&format!(r"^({VENDOR_NAME})\s+([<>]?[\d.]+)(?:\s+(\S+))?(?:\s+({REFERENCE}))?\s*$"))
});

static VENDOR_PANEL_HEADINGS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^(Comp\. Metabolic Panel[^:;]*)$",
        r"(?i)^(Lipid Panel[^:;]*)$",
        r"(?i)^([A-Za-z][A-Za-z\s.,/()+]+Panel[^:;]*)$",
        r"(?i)^([A-Za-z][A-Za-z\s.,/()+]+\(\d+\))$",
    ]
    .iter()
    .map(|p| line_regex(p))
    .collect()
});

/// Column headings repeated at the top of vendor result pages.
static VENDOR_COLUMN_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    line_regex(r"(?i)\b(?:tests?|current\s+result|reference\s+interval|units)\b")
});

/// Lines that never name a panel even when panel-shaped.
const VENDOR_PANEL_EXCLUDES: &[&str] = &["high", "low", "mg/dl", "ordered items"];

const VENDOR_FLAG_TOKENS: &[&str] = &["H", "L", "A"];

fn line_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid text grammar regex pattern")
}

fn group(caps: &Captures<'_>, index: usize) -> Option<String> {
    caps.get(index)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Build a record from located fields after the name and artifact checks.
fn accept(fields: RawTestFields, config: &ParserConfig) -> Option<TestRecord> {
    let name = clean_pagination_text(&fields.name);
    if !is_valid_test_name(&name) || name.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if config.is_artifact_row(&name, &fields.result) {
        return None;
    }
    Some(build_test_record(RawTestFields { name, ..fields }, &config.known_fallbacks))
}

// ═══════════════════════════════════════════════════════════════════════════
// Generic grammar
// ═══════════════════════════════════════════════════════════════════════════

/// Parse one line with the generic grammar. Only numeric results qualify;
/// qualitative words alone are too common in prose.
pub fn parse_generic_line(line: &str, config: &ParserConfig) -> Option<TestRecord> {
    let line = clean_pagination_text(line.trim());
    if line.is_empty() || is_instructional_text(&line) {
        return None;
    }

    let caps = GENERIC_LINE.captures(&line)?;
    accept(
        RawTestFields {
            name: caps[1].to_string(),
            result: caps[2].to_string(),
            unit: group(&caps, 3),
            reference: group(&caps, 4),
            flag: None,
        },
        config,
    )
}

/// Records from every line of the text, each assigned a panel by inference.
pub fn extract_line_tests(text: &str, ordered_panels: &[String], config: &ParserConfig) -> Vec<TestRecord> {
    text.lines()
        .filter_map(|line| parse_generic_line(line, config))
        .map(|mut record| {
            record.panel_name = infer_panel(&record.name, ordered_panels);
            record
        })
        .collect()
}

pub fn parse_generic_report(text: &str, config: &ParserConfig) -> ParsedDocument {
    let ordered_panels = extract_ordered_panels(text);
    let tests = extract_line_tests(text, &ordered_panels, config);

    ParsedDocument {
        date_collected: extract_collection_date(text),
        physician: extract_physician(text),
        tests,
        ordered_panels,
        errors: Vec::new(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Vendor grammar
// ═══════════════════════════════════════════════════════════════════════════

/// The panel a vendor heading line opens, whitespace-normalized.
pub fn vendor_panel_heading(line: &str) -> Option<String> {
    VENDOR_PANEL_HEADINGS.iter().find_map(|re| {
        re.captures(line)
            .map(|caps| caps[1].split_whitespace().collect::<Vec<_>>().join(" "))
    })
}

/// Parse one vendor result line: full form, then coded, then simple.
pub fn parse_vendor_line(line: &str, config: &ParserConfig) -> Option<TestRecord> {
    let line = line.trim();
    if line.chars().count() < 3 || is_instructional_text(line) {
        return None;
    }

    if let Some(caps) = VENDOR_FULL_LINE
        .captures(line)
        .or_else(|| VENDOR_CODED_LINE.captures(line))
    {
        return accept(
            RawTestFields {
                name: caps[1].to_string(),
                result: caps[2].to_string(),
                unit: group(&caps, 4),
                reference: group(&caps, 5),
                flag: group(&caps, 3),
            },
            config,
        );
    }

    if let Some(caps) = VENDOR_QUALITATIVE_LINE.captures(line) {
        return accept(
            RawTestFields {
                name: caps[1].to_string(),
                result: caps[2].to_string(),
                reference: group(&caps, 3),
                ..Default::default()
            },
            config,
        );
    }

    let caps = VENDOR_SIMPLE_LINE.captures(line)?;
    let token = group(&caps, 3);
    let (unit, flag) = match token {
        Some(t) if VENDOR_FLAG_TOKENS.contains(&t.as_str()) => (None, Some(t)),
        other => (other, None),
    };

    accept(
        RawTestFields {
            name: caps[1].to_string(),
            result: caps[2].to_string(),
            unit,
            reference: group(&caps, 4),
            flag,
        },
        config,
    )
}

/// Records from a vendor report. Headings set the current panel; records
/// under no heading get one by inference.
pub fn extract_vendor_tests(text: &str, ordered_panels: &[String], config: &ParserConfig) -> Vec<TestRecord> {
    let mut tests = Vec::new();
    let mut current_panel: Option<String> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(panel) = vendor_panel_heading(line) {
            current_panel = Some(panel);
            continue;
        }
        if VENDOR_COLUMN_HEADER.is_match(line) {
            continue;
        }
        let Some(mut record) = parse_vendor_line(line, config) else {
            continue;
        };
        record.panel_name = current_panel
            .clone()
            .or_else(|| infer_panel(&record.name, ordered_panels));
        tests.push(record);
    }

    tests
}

/// Standalone panel heading lines of a vendor report, in order.
pub fn extract_vendor_panels(text: &str) -> Vec<String> {
    let mut panels: Vec<String> = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.chars().count() < 5 || is_instructional_text(line) {
            continue;
        }
        let Some(panel) = vendor_panel_heading(line) else {
            continue;
        };
        let lower = panel.to_lowercase();
        if VENDOR_PANEL_EXCLUDES.iter().any(|x| lower.contains(x)) || panels.contains(&panel) {
            continue;
        }
        panels.push(panel);
    }

    panels
}

pub fn parse_vendor_report(text: &str, config: &ParserConfig) -> ParsedDocument {
    let mut ordered_panels = extract_ordered_panels(text);
    for panel in extract_vendor_panels(text) {
        if !ordered_panels.contains(&panel) {
            ordered_panels.push(panel);
        }
    }

    let tests = extract_vendor_tests(text, &ordered_panels, config);

    ParsedDocument {
        date_collected: extract_collection_date(text),
        physician: extract_physician(text),
        tests,
        ordered_panels,
        errors: Vec::new(),
    }
}

/// Reads the whole document as flowed text, picking the vendor grammar when
/// vendor markers are present.
pub struct TextStrategy<'a> {
    config: &'a ParserConfig,
}

impl<'a> TextStrategy<'a> {
    pub fn new(config: &'a ParserConfig) -> Self {
        Self { config }
    }
}

impl ExtractionStrategy for TextStrategy<'_> {
    fn name(&self) -> &'static str {
        "text"
    }

    fn preflight(&self, source: &SourceDocument) -> Result<(), LabParseError> {
        let length = source.text_length();
        if length < self.config.min_text_length {
            return Err(LabParseError::UnreadableText {
                length,
                minimum: self.config.min_text_length,
            });
        }
        Ok(())
    }

    fn try_extract(&self, source: &SourceDocument) -> Option<ParsedDocument> {
        let text = &source.full_text;
        let vendor = has_vendor_markers(text);
        tracing::debug!(vendor, "Parsing flowed text");

        let parsed = if vendor {
            parse_vendor_report(text, self.config)
        } else {
            parse_generic_report(text, self.config)
        };
        Some(parsed)
    }
}
