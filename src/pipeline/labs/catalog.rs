//! Helpers for consumers that file parsed records into a catalog of test
//! definitions.

use serde::{Deserialize, Serialize};

use crate::models::{ReferenceRange, TestRecord};

/// Panel given to new catalog entries whose record carries no panel.
pub const DEFAULT_IMPORT_PANEL: &str = "Imported Tests";

/// Characters that may follow a test name inside a longer catalog name.
const NAME_DELIMITERS: &[char] = &['(', ')', ',', '-'];

/// Shape of a catalog entry created for an unmatched record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub panel_name: String,
    pub unit: String,
    pub reference_range: ReferenceRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    /// The record cannot be imported.
    Critical,
    /// The record imports, but needs a look.
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportIssue {
    pub severity: IssueSeverity,
    pub message: String,
}

/// Whether a catalog name refers to the parsed test name.
///
/// Case-insensitive exact match, or the catalog name starts with the test
/// name followed by a delimiter (`(`, `)`, `,`, `-`, or a space then one of
/// those). "Hemoglobin" matches "Hemoglobin (Hgb)" but not "Hemoglobin A1c".
pub fn catalog_name_matches(catalog_name: &str, test_name: &str) -> bool {
    let catalog = catalog_name.trim().to_lowercase();
    let test = test_name.trim().to_lowercase();
    if test.is_empty() {
        return false;
    }
    if catalog == test {
        return true;
    }

    let Some(rest) = catalog.strip_prefix(&test) else {
        return false;
    };
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if NAME_DELIMITERS.contains(&c) => true,
        Some(' ') => chars.next().is_some_and(|c| NAME_DELIMITERS.contains(&c)),
        _ => false,
    }
}

/// The catalog name a test belongs to: an exact match anywhere in the
/// catalog beats a prefix match.
pub fn find_catalog_match<'a>(test_name: &str, catalog_names: &'a [String]) -> Option<&'a str> {
    let test = test_name.trim().to_lowercase();
    if test.is_empty() {
        return None;
    }

    catalog_names
        .iter()
        .find(|name| name.trim().to_lowercase() == test)
        .or_else(|| {
            catalog_names
                .iter()
                .find(|name| catalog_name_matches(name, test_name))
        })
        .map(String::as_str)
}

/// The catalog entry to create for a record that matched nothing.
pub fn draft_catalog_entry(record: &TestRecord) -> CatalogEntry {
    CatalogEntry {
        name: record.name.clone(),
        panel_name: record
            .panel_name
            .clone()
            .unwrap_or_else(|| DEFAULT_IMPORT_PANEL.to_string()),
        unit: record.unit.clone(),
        reference_range: record.reference_range.clone(),
    }
}

/// Problems with importing one record. `matched` says whether a catalog
/// entry was found for it.
pub fn review_record(record: &TestRecord, matched: bool) -> Vec<ImportIssue> {
    let mut issues = Vec::new();

    if record.name.trim().is_empty() {
        issues.push(ImportIssue {
            severity: IssueSeverity::Critical,
            message: "Test name is missing".to_string(),
        });
    }

    let has_value = !record.result.trim().is_empty()
        || record.numeric_value.is_some()
        || record.result_text.is_some();
    if !has_value {
        issues.push(ImportIssue {
            severity: IssueSeverity::Critical,
            message: format!("No result value for '{}'", record.name),
        });
    }

    if !matched {
        let panel = record.panel_name.as_deref().unwrap_or(DEFAULT_IMPORT_PANEL);
        issues.push(ImportIssue {
            severity: IssueSeverity::Warning,
            message: format!("'{}' not in catalog, a new test will be created under '{panel}'", record.name),
        });
    }

    issues
}
