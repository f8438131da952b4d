use super::config::ParserConfig;
use super::metadata::{extract_collection_date, extract_physician};
use super::normalize::{build_test_record, is_qualitative_result, split_result_flag, RawTestFields};
use super::ordered_panels::extract_ordered_panels;
use super::panel_inference::infer_panel;
use super::patterns::{
    clean_pagination_text, is_instructional_text, is_valid_test_name, NUMERIC_CELL, UNIT_CELL,
};
use super::text_strategy::extract_line_tests;
use super::types::{ExtractionStrategy, SourceDocument};
use crate::models::{ParsedDocument, TestRecord};
use crate::pipeline::extraction::{normalize_whitespace, TableGrid};

/// Substrings that identify the header row of a results table.
const HEADER_MARKERS: &[&str] = &["test", "result", "reference"];

/// Header words of tables that describe the patient or specimen, not results.
const NON_RESULT_HEADERS: &[&str] = &["SPECIMEN", "PATIENT", "ACCOUNT", "CONTROL"];

/// Panel names shorter than this only match a panel-header row exactly.
const MIN_PANEL_CONTAINMENT_LEN: usize = 5;

// ═══════════════════════════════════════════════════════════════════════════
// Column roles
// ═══════════════════════════════════════════════════════════════════════════

/// Which column holds which field. The first header claiming a role keeps it,
/// so "Current Result" wins over a later "Previous Result".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnRoles {
    pub test: Option<usize>,
    pub result: Option<usize>,
    pub unit: Option<usize>,
    pub reference: Option<usize>,
    /// Captured into `TestRecord::flag` only; never read as a value.
    pub flag: Option<usize>,
}

impl ColumnRoles {
    pub fn from_headers(headers: &[String]) -> Self {
        let mut roles = Self::default();

        for (index, header) in headers.iter().enumerate() {
            let upper = header.to_uppercase();
            let slot = if upper.contains("TEST") {
                &mut roles.test
            } else if upper.contains("RESULT") {
                &mut roles.result
            } else if upper.contains("UNIT") {
                &mut roles.unit
            } else if upper.contains("REFERENCE") || upper.contains("INTERVAL") {
                &mut roles.reference
            } else if upper.contains("FLAG") {
                &mut roles.flag
            } else {
                // LAB (site code) and anything unrecognized carry no role.
                continue;
            };
            slot.get_or_insert(index);
        }

        roles
    }
}

/// Index of the first row with a test/result/reference header cell, else 0.
pub fn find_header_row(rows: &[Vec<String>]) -> usize {
    rows.iter()
        .position(|row| {
            row.iter().any(|cell| {
                let lower = cell.to_lowercase();
                HEADER_MARKERS.iter().any(|m| lower.contains(m))
            })
        })
        .unwrap_or(0)
}

/// Whether a header row belongs to a results table.
pub fn is_results_table(headers: &[String]) -> bool {
    let upper: Vec<String> = headers.iter().map(|h| h.to_uppercase()).collect();

    let non_empty: Vec<&String> = upper.iter().filter(|h| !h.is_empty()).collect();
    if non_empty.len() == 1 && non_empty[0].contains("TESTS ORDERED") {
        return false;
    }

    let has_test = upper.iter().any(|h| h.contains("TEST"));
    let has_result = upper.iter().any(|h| h.contains("RESULT"));
    let describes_patient = upper
        .iter()
        .any(|h| NON_RESULT_HEADERS.iter().any(|m| h.contains(m)));

    has_test && has_result && !describes_patient
}

// ═══════════════════════════════════════════════════════════════════════════
// Rows
// ═══════════════════════════════════════════════════════════════════════════

/// The ordered panel a panel-header row names, if the row is one.
///
/// The first non-empty cell must equal a panel name (case-insensitive) or
/// contain / be contained by one, and no other cell may carry a result.
pub fn match_panel_header_row(row: &[String], ordered_panels: &[String]) -> Option<String> {
    let (first_index, first) = row.iter().enumerate().find(|(_, c)| !c.is_empty())?;

    let carries_result = row
        .iter()
        .enumerate()
        .any(|(i, c)| i != first_index && (NUMERIC_CELL.is_match(c) || is_qualitative_result(c)));
    if carries_result {
        return None;
    }

    let candidate = first.to_lowercase();
    ordered_panels
        .iter()
        .find(|panel| {
            let panel = panel.to_lowercase();
            panel == candidate
                || (candidate.chars().count() > MIN_PANEL_CONTAINMENT_LEN
                    && (panel.contains(&candidate) || candidate.contains(&panel)))
        })
        .cloned()
}

fn cell(row: &[String], index: Option<usize>) -> &str {
    index
        .and_then(|i| row.get(i))
        .map(String::as_str)
        .unwrap_or_default()
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Extract one data row through the column roles, falling back to the
/// positional heuristic when the name or result column comes up empty.
pub fn extract_row(row: &[String], roles: &ColumnRoles, config: &ParserConfig) -> Option<TestRecord> {
    if row.first().is_some_and(|c| is_instructional_text(c)) {
        return None;
    }

    let name = clean_pagination_text(cell(row, roles.test));
    if !name.is_empty() && !is_valid_test_name(&name) {
        return None;
    }

    let result = cell(row, roles.result).trim();
    if name.is_empty() || result.is_empty() {
        return extract_row_positionally(row, config);
    }

    let (result, combined_flag) = split_result_flag(result);
    if config.is_artifact_row(&name, &result) {
        tracing::debug!(test = %name, result = %result, "Skipping layout artifact row");
        return None;
    }

    Some(build_test_record(
        RawTestFields {
            name,
            result,
            unit: non_empty(cell(row, roles.unit)),
            reference: non_empty(cell(row, roles.reference)),
            flag: non_empty(cell(row, roles.flag)).or(combined_flag),
        },
        &config.known_fallbacks,
    ))
}

/// First non-numeric cell is the name, then the first numeric (or
/// qualitative) cell, unit-shaped cell, and range-shaped cell.
pub fn extract_row_positionally(row: &[String], config: &ParserConfig) -> Option<TestRecord> {
    let (name_index, name) = row
        .iter()
        .enumerate()
        .find(|(_, c)| !c.is_empty() && !NUMERIC_CELL.is_match(c))?;
    let name = clean_pagination_text(name);
    if !is_valid_test_name(&name) {
        return None;
    }

    let mut fields = RawTestFields {
        name,
        ..Default::default()
    };

    for value in row.iter().skip(name_index + 1).filter(|c| !c.is_empty()) {
        if fields.result.is_empty() && (NUMERIC_CELL.is_match(value) || is_qualitative_result(value)) {
            fields.result = value.clone();
        } else if fields.unit.is_none() && UNIT_CELL.is_match(value) {
            fields.unit = Some(value.clone());
        } else if fields.reference.is_none() && value.contains(['-', '<', '>']) {
            fields.reference = Some(value.clone());
        }
    }

    if fields.result.is_empty() || config.is_artifact_row(&fields.name, &fields.result) {
        return None;
    }

    Some(build_test_record(fields, &config.known_fallbacks))
}

// ═══════════════════════════════════════════════════════════════════════════
// Tables
// ═══════════════════════════════════════════════════════════════════════════

/// Records from one table, or `None` when the table is not a results table.
/// Panel context flows down the table: a panel-header row sets it, and an
/// inferred panel is adopted for the unpaneled rows that follow.
pub fn extract_table_tests(
    table: &TableGrid,
    ordered_panels: &[String],
    config: &ParserConfig,
) -> Option<Vec<TestRecord>> {
    if table.len() < 2 {
        return None;
    }

    let rows: Vec<Vec<String>> = table
        .iter()
        .map(|row| {
            row.iter()
                .map(|c| c.as_deref().map(normalize_whitespace).unwrap_or_default())
                .collect()
        })
        .collect();

    let header_index = find_header_row(&rows);
    let headers = &rows[header_index];
    if !is_results_table(headers) {
        tracing::debug!(headers = ?headers, "Table is not a results table");
        return None;
    }
    let roles = ColumnRoles::from_headers(headers);

    let mut current_panel: Option<String> = None;
    let mut tests = Vec::new();

    for row in &rows[header_index + 1..] {
        if row.iter().all(String::is_empty) {
            continue;
        }
        if let Some(panel) = match_panel_header_row(row, ordered_panels) {
            current_panel = Some(panel);
            continue;
        }
        let Some(mut record) = extract_row(row, &roles, config) else {
            continue;
        };

        if current_panel.is_none() {
            current_panel = infer_panel(&record.name, ordered_panels);
        }
        record.panel_name = current_panel.clone();
        tests.push(record);
    }

    Some(tests)
}

/// Reads results from the table reader's grids. Pages without a results
/// table are read line by line instead. Declines documents with no tables.
pub struct TableStrategy<'a> {
    config: &'a ParserConfig,
}

impl<'a> TableStrategy<'a> {
    pub fn new(config: &'a ParserConfig) -> Self {
        Self { config }
    }
}

impl ExtractionStrategy for TableStrategy<'_> {
    fn name(&self) -> &'static str {
        "table"
    }

    fn try_extract(&self, source: &SourceDocument) -> Option<ParsedDocument> {
        if !source.has_tables() {
            tracing::debug!("No tables detected, deferring to text strategy");
            return None;
        }

        let ordered_panels = extract_ordered_panels(&source.full_text);
        let mut tests = Vec::new();

        for page in &source.pages {
            let mut page_tests = Vec::new();
            let mut has_results_table = false;

            for table in &page.tables {
                if let Some(records) = extract_table_tests(table, &ordered_panels, self.config) {
                    has_results_table = true;
                    page_tests.extend(records);
                }
            }

            if !has_results_table {
                page_tests = extract_line_tests(&page.text, &ordered_panels, self.config);
            }

            tracing::debug!(
                page = page.page_number,
                tests = page_tests.len(),
                from_tables = has_results_table,
                "Page extracted"
            );
            tests.extend(page_tests);
        }

        if tests.is_empty() {
            return None;
        }

        Some(ParsedDocument {
            date_collected: extract_collection_date(&source.full_text),
            physician: extract_physician(&source.full_text),
            tests,
            ordered_panels,
            errors: Vec::new(),
        })
    }
}
