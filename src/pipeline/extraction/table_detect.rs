//! Table reconstruction from laid-out page text.
//!
//! pdf-extract keeps the horizontal spacing between text runs, so a results
//! table comes back as consecutive lines whose columns are separated by tabs,
//! pipes, or wide space gaps. Those runs are turned into cell grids here.

use super::types::{PageExtraction, PageTables, TableExtractor, TableGrid};
use super::ExtractionError;

/// Minimum number of consecutive tabular lines that make up a table.
const MIN_TABLE_ROWS: usize = 2;

/// Minimum run of spaces that separates two cells.
const MIN_GAP_WIDTH: usize = 2;

/// Maximum distance (characters) between a cell start and the column anchor it snaps to.
const COLUMN_TOLERANCE: usize = 4;

/// Virtual column width for tab and pipe rows, whose cells carry no usable offset.
const POSITIONAL_STRIDE: usize = 1000;

/// Non-tabular lines (panel headings, wrapped names) a table may absorb
/// between two tabular lines before the run ends.
const MAX_INTERRUPTION_LINES: usize = 2;

/// Table reader that derives grids from the text reader's layout output.
/// It never touches the PDF bytes, so each document is decoded only once.
pub struct LayoutTableExtractor;

impl TableExtractor for LayoutTableExtractor {
    fn extract_tables(
        &self,
        _pdf_bytes: &[u8],
        text_pages: &[PageExtraction],
    ) -> Result<Vec<PageTables>, ExtractionError> {
        let page_tables: Vec<PageTables> = text_pages
            .iter()
            .map(|page| PageTables {
                page_number: page.page_number,
                tables: detect_tables(&page.text),
            })
            .collect();

        tracing::debug!(
            pages = page_tables.len(),
            tables = page_tables.iter().map(|p| p.tables.len()).sum::<usize>(),
            "Layout table detection complete"
        );

        Ok(page_tables)
    }
}

/// Split page text into tables: each maximal run of tabular lines (blank
/// lines tolerated) with at least MIN_TABLE_ROWS rows becomes one grid.
///
/// Up to MAX_INTERRUPTION_LINES non-tabular lines between two tabular lines
/// stay in the table as single-cell rows, which is how panel headings
/// printed across a results table come back.
pub fn detect_tables(text: &str) -> Vec<TableGrid> {
    let mut tables = Vec::new();
    let mut run: Vec<&str> = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if is_tabular_line(line) {
            run.append(&mut pending);
            run.push(line);
        } else if !run.is_empty() && pending.len() < MAX_INTERRUPTION_LINES {
            pending.push(line);
        } else {
            pending.clear();
            flush_run(&mut run, &mut tables);
        }
    }
    flush_run(&mut run, &mut tables);

    tables
}

fn flush_run(run: &mut Vec<&str>, tables: &mut Vec<TableGrid>) {
    if run.len() >= MIN_TABLE_ROWS {
        tables.push(build_grid(run));
    }
    run.clear();
}

/// Heuristic: a line looks tabular if it has multiple columns separated by
/// tabs, pipes, or multi-space gaps.
///
/// Patterns detected:
/// - Tab-separated: "Glucose\t87\tmg/dL"
/// - Pipe-separated: "Glucose | 87 | mg/dL"
/// - Multi-space aligned: "Potassium    4.2    mmol/L"
fn is_tabular_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.len() < 5 {
        return false;
    }

    if trimmed.contains('\t') {
        return true;
    }

    if trimmed.matches('|').count() >= 2 {
        return true;
    }

    count_multi_space_gaps(trimmed) >= 1
}

/// Count runs of MIN_GAP_WIDTH+ consecutive spaces that separate non-empty text segments.
fn count_multi_space_gaps(text: &str) -> usize {
    split_cells(text).len().saturating_sub(1)
}

/// A cell with the character offset where it starts in its line.
#[derive(Debug, Clone, PartialEq)]
struct PositionedCell {
    start: usize,
    text: String,
}

/// Split one line into cells. Pipe and tab rows are positional; space-aligned
/// rows keep the start offset of each cell so they can be snapped to columns.
fn split_cells(line: &str) -> Vec<PositionedCell> {
    let trimmed_end = line.trim_end();

    if trimmed_end.matches('|').count() >= 2 {
        let mut parts: Vec<&str> = trimmed_end.trim().split('|').collect();
        if parts.first().is_some_and(|p| p.trim().is_empty()) {
            parts.remove(0);
        }
        if parts.last().is_some_and(|p| p.trim().is_empty()) {
            parts.pop();
        }
        return positional(parts);
    }

    if trimmed_end.contains('\t') {
        return positional(trimmed_end.trim_start().split('\t').collect());
    }

    let chars: Vec<char> = trimmed_end.chars().collect();
    let mut cells = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == ' ' {
            i += 1;
            continue;
        }
        let start = i;
        let mut end = i;
        while i < chars.len() {
            if chars[i] == ' ' {
                let gap_start = i;
                while i < chars.len() && chars[i] == ' ' {
                    i += 1;
                }
                if i - gap_start >= MIN_GAP_WIDTH || i == chars.len() {
                    break;
                }
            } else {
                i += 1;
                end = i;
            }
        }
        cells.push(PositionedCell {
            start,
            text: chars[start..end].iter().collect(),
        });
    }

    cells
}

fn positional(parts: Vec<&str>) -> Vec<PositionedCell> {
    parts
        .into_iter()
        .enumerate()
        .map(|(i, p)| PositionedCell {
            start: i * POSITIONAL_STRIDE,
            text: p.trim().to_string(),
        })
        .collect()
}

/// Build a grid whose columns are anchored on the row with the most cells.
fn build_grid(lines: &[&str]) -> TableGrid {
    let rows: Vec<Vec<PositionedCell>> = lines.iter().map(|l| split_cells(l)).collect();

    let widest = rows.iter().map(Vec::len).max().unwrap_or(0);
    let anchors: Vec<usize> = rows
        .iter()
        .find(|row| row.len() == widest)
        .map(|row| row.iter().map(|c| c.start).collect())
        .unwrap_or_default();

    rows.into_iter()
        .map(|row| snap_to_columns(row, &anchors))
        .collect()
}

/// Assign each cell to the right-most column whose anchor is at or before
/// the cell start (within tolerance). Cells landing in the same column are
/// joined with a space.
fn snap_to_columns(row: Vec<PositionedCell>, anchors: &[usize]) -> Vec<Option<String>> {
    let mut grid_row: Vec<Option<String>> = vec![None; anchors.len().max(1)];

    for cell in row {
        if cell.text.is_empty() {
            continue;
        }
        let column = anchors
            .iter()
            .rposition(|&anchor| anchor <= cell.start + COLUMN_TOLERANCE)
            .unwrap_or(0);

        if let Some(existing) = grid_row[column].as_mut() {
            existing.push(' ');
            existing.push_str(&cell.text);
        } else {
            grid_row[column] = Some(cell.text);
        }
    }

    grid_row
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(text: &str) -> Option<String> {
        Some(text.to_string())
    }

    // --- is_tabular_line tests ---

    #[test]
    fn tab_separated_is_tabular() {
        assert!(is_tabular_line("Glucose\t87\tmg/dL"));
        assert!(is_tabular_line("Potassium\t4.2\tmmol/L\t3.5-5.0"));
    }

    #[test]
    fn pipe_separated_is_tabular() {
        assert!(is_tabular_line("Test | Result | Unit"));
        assert!(is_tabular_line("| K | 4.2 | mmol/L |"));
    }

    #[test]
    fn multi_space_is_tabular() {
        assert!(is_tabular_line("Potassium    4.2    mmol/L"));
        assert!(is_tabular_line("Sodium  140"));
    }

    #[test]
    fn single_space_not_tabular() {
        assert!(!is_tabular_line("This is a normal sentence."));
        assert!(!is_tabular_line("Ordering Physician: John Smith"));
    }

    #[test]
    fn empty_or_short_not_tabular() {
        assert!(!is_tabular_line(""));
        assert!(!is_tabular_line("   "));
        assert!(!is_tabular_line("A  B"));
    }

    // --- count_multi_space_gaps tests ---

    #[test]
    fn counts_multiple_gaps() {
        assert_eq!(count_multi_space_gaps("Aa   Bb   Cc"), 2);
        assert_eq!(count_multi_space_gaps("A     B     C     D"), 3);
    }

    #[test]
    fn no_gaps() {
        assert_eq!(count_multi_space_gaps("Hello World"), 0);
        assert_eq!(count_multi_space_gaps("NoSpaces"), 0);
    }

    // --- split_cells tests ---

    #[test]
    fn split_keeps_single_spaces_inside_cells() {
        let cells = split_cells("Vitamin D, 25-Hydroxy    38.1    ng/mL");
        let texts: Vec<&str> = cells.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Vitamin D, 25-Hydroxy", "38.1", "ng/mL"]);
        assert_eq!(cells[0].start, 0);
    }

    #[test]
    fn split_pipe_row_drops_outer_pipes() {
        let cells = split_cells("| K | 4.2 | mmol/L |");
        let texts: Vec<&str> = cells.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["K", "4.2", "mmol/L"]);
    }

    // --- detect_tables tests ---

    #[test]
    fn aligned_results_table_becomes_grid() {
        let text = "Patient Report\n\
                    TEST          RESULT   FLAG   REFERENCE INTERVAL   UNIT\n\
                    Glucose       87              70-99                mg/dL\n\
                    BUN           25       H      6-20                 mg/dL\n\
                    End of report";

        let tables = detect_tables(text);
        assert_eq!(tables.len(), 1);
        let grid = &tables[0];
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[0][0], cell("TEST"));
        assert_eq!(grid[1], vec![cell("Glucose"), cell("87"), None, cell("70-99"), cell("mg/dL")]);
        assert_eq!(grid[2][2], cell("H"));
    }

    #[test]
    fn right_shifted_values_snap_within_tolerance() {
        let text = "TEST        RESULT    UNIT\n\
                    Sodium        140     mmol/L";
        let grid = &detect_tables(text)[0];
        assert_eq!(grid[1], vec![cell("Sodium"), cell("140"), cell("mmol/L")]);
    }

    #[test]
    fn blank_lines_do_not_split_a_table() {
        let text = "TEST\tRESULT\tUNIT\n\nGlucose\t87\tmg/dL\n\nSodium\t140\tmmol/L";
        let tables = detect_tables(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].len(), 3);
    }

    #[test]
    fn prose_yields_no_tables() {
        let text = "The patient was seen today.\nNo significant findings.\nFollow up in 3 months.";
        assert!(detect_tables(text).is_empty());
    }

    #[test]
    fn single_tabular_line_is_not_a_table() {
        let text = "Intro text\nGlucose    87    mg/dL\nClosing text";
        assert!(detect_tables(text).is_empty());
    }

    #[test]
    fn prose_between_runs_splits_tables() {
        let text = "Name\tValue\nK\t4.2\nSome prose here\nMore prose here\nAnd a third line\nTEST\tRESULT\nNa\t140";
        let tables = detect_tables(text);
        assert_eq!(tables.len(), 2);
    }

    #[test]
    fn panel_heading_inside_table_becomes_single_cell_row() {
        let text = "TEST          RESULT   UNIT\n\
                    Comp. Metabolic Panel (14)\n\
                    Glucose       87       mg/dL\n\
                    Trailing note";
        let tables = detect_tables(text);
        assert_eq!(tables.len(), 1);
        let grid = &tables[0];
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[1], vec![cell("Comp. Metabolic Panel (14)"), None, None]);
        assert_eq!(grid[2], vec![cell("Glucose"), cell("87"), cell("mg/dL")]);
    }

    // --- LayoutTableExtractor tests ---

    fn text_pages(texts: &[&str]) -> Vec<PageExtraction> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| PageExtraction {
                page_number: i + 1,
                text: t.to_string(),
            })
            .collect()
    }

    #[test]
    fn layout_reader_reports_tables_per_page() {
        let pages = text_pages(&["TEST\tRESULT\nGlucose\t87", "Narrative page only."]);
        let tables = LayoutTableExtractor.extract_tables(b"%PDF", &pages).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].tables.len(), 1);
        assert!(tables[1].tables.is_empty());
        assert_eq!(tables[1].page_number, 2);
    }

    #[test]
    fn layout_reader_works_from_text_pages_alone() {
        let pages = text_pages(&["Name\tValue\nK\t4.2"]);
        let tables = LayoutTableExtractor.extract_tables(&[], &pages).unwrap();
        assert_eq!(tables[0].tables[0][1], vec![cell("K"), cell("4.2")]);
        assert!(LayoutTableExtractor.extract_tables(&[], &[]).unwrap().is_empty());
    }
}
