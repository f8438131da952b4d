//! Document assembler: reads a PDF with both readers and runs the extraction
//! strategies in priority order.

use std::collections::BTreeMap;

use super::config::ParserConfig;
use super::table_strategy::TableStrategy;
use super::text_strategy::TextStrategy;
use super::types::{ExtractionStrategy, SourceDocument, SourcePage};
use super::LabParseError;
use crate::models::ParsedDocument;
use crate::pipeline::extraction::{
    ensure_pdf_header, sanitize_extracted_text, LayoutTableExtractor, PdfExtractor, PdfTextExtractor,
    TableExtractor, TableGrid,
};

/// Parses lab-report PDFs into `ParsedDocument`s.
///
/// Holds no per-parse state: one parser can serve any number of documents,
/// from any number of threads.
pub struct LabReportParser {
    text_reader: Box<dyn PdfExtractor + Send + Sync>,
    table_reader: Box<dyn TableExtractor + Send + Sync>,
    config: ParserConfig,
}

impl Default for LabReportParser {
    fn default() -> Self {
        Self::with_config(ParserConfig::default())
    }
}

impl LabReportParser {
    pub fn new(
        text_reader: Box<dyn PdfExtractor + Send + Sync>,
        table_reader: Box<dyn TableExtractor + Send + Sync>,
        config: ParserConfig,
    ) -> Self {
        Self {
            text_reader,
            table_reader,
            config,
        }
    }

    /// The pdf-extract text reader and the layout table reader with the
    /// given configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self::new(Box::new(PdfTextExtractor), Box::new(LayoutTableExtractor), config)
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse one PDF held fully in memory.
    ///
    /// The table strategy runs first and wins whenever it yields a record;
    /// otherwise the flowed text is parsed, provided there is enough of it.
    /// A document with neither tests nor a collection date is an error.
    pub fn parse(&self, pdf_bytes: &[u8]) -> Result<ParsedDocument, LabParseError> {
        if pdf_bytes.is_empty() {
            return Err(LabParseError::EmptyInput);
        }
        ensure_pdf_header(pdf_bytes)?;

        let source = self.read_source(pdf_bytes)?;
        tracing::debug!(
            pages = source.pages.len(),
            text_length = source.text_length(),
            has_tables = source.has_tables(),
            "PDF read"
        );

        let table = TableStrategy::new(&self.config);
        let text = TextStrategy::new(&self.config);
        let strategies: [&dyn ExtractionStrategy; 2] = [&table, &text];

        for strategy in strategies {
            strategy.preflight(&source)?;

            match strategy.try_extract(&source) {
                Some(parsed) if parsed.has_signal() => {
                    tracing::info!(
                        strategy = strategy.name(),
                        tests = parsed.tests.len(),
                        ordered_panels = parsed.ordered_panels.len(),
                        date_found = parsed.date_collected.is_some(),
                        "Lab report parsed"
                    );
                    return Ok(parsed);
                }
                _ => tracing::debug!(strategy = strategy.name(), "Strategy produced no signal"),
            }
        }

        tracing::warn!("No tests or collection date recovered from PDF");
        Err(LabParseError::NoExtractableData)
    }

    /// Run both readers and merge their output per page. The table reader
    /// gets the text pages already read. Text reader errors propagate; a
    /// table reader error only costs the tables.
    fn read_source(&self, pdf_bytes: &[u8]) -> Result<SourceDocument, LabParseError> {
        let text_pages = self.text_reader.extract_text(pdf_bytes)?;

        let table_pages = match self.table_reader.extract_tables(pdf_bytes, &text_pages) {
            Ok(pages) => pages,
            Err(e) => {
                tracing::warn!(error = %e, "Table reader failed, continuing with flowed text only");
                Vec::new()
            }
        };

        let mut pages: BTreeMap<usize, SourcePage> = BTreeMap::new();
        for page in text_pages {
            pages.insert(
                page.page_number,
                SourcePage {
                    page_number: page.page_number,
                    text: sanitize_extracted_text(&page.text),
                    tables: Vec::new(),
                },
            );
        }
        for page in table_pages {
            let tables: Vec<TableGrid> = page.tables;
            pages
                .entry(page.page_number)
                .or_insert_with(|| SourcePage {
                    page_number: page.page_number,
                    ..Default::default()
                })
                .tables
                .extend(tables);
        }

        let pages: Vec<SourcePage> = pages.into_values().collect();
        let full_text = pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(SourceDocument { pages, full_text })
    }
}

/// Parse with the default readers and configuration.
pub fn parse_pdf(pdf_bytes: &[u8]) -> Result<ParsedDocument, LabParseError> {
    LabReportParser::default().parse(pdf_bytes)
}

/// Parse on tokio's blocking pool so a CPU-bound parse never stalls the
/// calling executor.
pub async fn parse_pdf_blocking_task(
    pdf_bytes: Vec<u8>,
    config: ParserConfig,
) -> Result<ParsedDocument, LabParseError> {
    tokio::task::spawn_blocking(move || LabReportParser::with_config(config).parse(&pdf_bytes))
        .await
        .map_err(|e| LabParseError::ParseFailed(format!("Parse task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferenceRange;
    use crate::pipeline::extraction::pdf::test_pdf::make_test_pdf;
    use crate::pipeline::extraction::{ExtractionError, PageExtraction, PageTables};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const FAKE_PDF: &[u8] = b"%PDF-1.4 fake body";

    struct FakeTextReader {
        pages: Vec<&'static str>,
        fail: bool,
    }

    impl PdfExtractor for FakeTextReader {
        fn extract_text(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
            if self.fail {
                return Err(ExtractionError::PdfParsing("broken xref table".into()));
            }
            Ok(self
                .pages
                .iter()
                .enumerate()
                .map(|(i, text)| PageExtraction {
                    page_number: i + 1,
                    text: text.to_string(),
                })
                .collect())
        }

        fn page_count(&self, _pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
            Ok(self.pages.len())
        }
    }

    struct FakeTableReader {
        pages: Vec<Vec<TableGrid>>,
        fail: bool,
    }

    impl TableExtractor for FakeTableReader {
        fn extract_tables(
            &self,
            _pdf_bytes: &[u8],
            _text_pages: &[PageExtraction],
        ) -> Result<Vec<PageTables>, ExtractionError> {
            if self.fail {
                return Err(ExtractionError::ReaderPanic("index out of bounds".into()));
            }
            Ok(self
                .pages
                .iter()
                .enumerate()
                .map(|(i, tables)| PageTables {
                    page_number: i + 1,
                    tables: tables.clone(),
                })
                .collect())
        }
    }

    fn grid(rows: &[&[&str]]) -> TableGrid {
        rows.iter()
            .map(|row| {
                row.iter()
                    .map(|c| if c.is_empty() { None } else { Some(c.to_string()) })
                    .collect()
            })
            .collect()
    }

    fn parser(pages: Vec<&'static str>, tables: Vec<Vec<TableGrid>>) -> LabReportParser {
        LabReportParser::new(
            Box::new(FakeTextReader { pages, fail: false }),
            Box::new(FakeTableReader { pages: tables, fail: false }),
            ParserConfig::default(),
        )
    }

    const GENERIC_REPORT: &str = "Lab Results\n\
                                  Collection Date: 2024-01-15\n\
                                  Glucose 87 mg/dL 70-99\n\
                                  Sodium 140 mmol/L 136-145\n";

    fn results_table() -> TableGrid {
        grid(&[
            &["TEST", "RESULT", "UNIT", "REFERENCE INTERVAL"],
            &["Glucose", "87", "mg/dL", "70-99"],
        ])
    }

    #[test]
    fn empty_input_rejected() {
        let result = parser(vec![GENERIC_REPORT], vec![]).parse(&[]);
        assert!(matches!(result, Err(LabParseError::EmptyInput)));
    }

    #[test]
    fn non_pdf_input_is_unreadable_container() {
        let result = parser(vec![GENERIC_REPORT], vec![]).parse(b"GIF89a not a pdf");
        assert!(matches!(result, Err(LabParseError::UnreadableContainer(_))));
    }

    #[test]
    fn text_reader_failure_propagates_as_container_error() {
        let parser = LabReportParser::new(
            Box::new(FakeTextReader { pages: vec![], fail: true }),
            Box::new(FakeTableReader { pages: vec![], fail: false }),
            ParserConfig::default(),
        );
        match parser.parse(FAKE_PDF) {
            Err(LabParseError::UnreadableContainer(msg)) => assert!(msg.contains("broken xref")),
            other => panic!("expected UnreadableContainer, got {other:?}"),
        }
    }

    #[test]
    fn table_reader_failure_falls_back_to_text() {
        let parser = LabReportParser::new(
            Box::new(FakeTextReader { pages: vec![GENERIC_REPORT], fail: false }),
            Box::new(FakeTableReader { pages: vec![], fail: true }),
            ParserConfig::default(),
        );
        let parsed = parser.parse(FAKE_PDF).unwrap();
        let names: Vec<&str> = parsed.tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Glucose", "Sodium"]);
        assert_eq!(parsed.date_collected.as_deref(), Some("2024-01-15"));
    }

    #[test]
    fn short_text_without_tables_is_unreadable() {
        let result = parser(vec!["Glucose 87"], vec![vec![]]).parse(FAKE_PDF);
        match result {
            Err(LabParseError::UnreadableText { length, minimum }) => {
                assert_eq!(length, 10);
                assert_eq!(minimum, 50);
            }
            other => panic!("expected UnreadableText, got {other:?}"),
        }
    }

    #[test]
    fn table_strategy_wins_even_with_short_text() {
        let parsed = parser(vec!["Glucose 87"], vec![vec![results_table()]])
            .parse(FAKE_PDF)
            .unwrap();
        assert_eq!(parsed.tests.len(), 1);
        assert_eq!(parsed.tests[0].reference_range, ReferenceRange::Range { low: 70.0, high: 99.0 });
    }

    #[test]
    fn tables_take_priority_over_flowed_text() {
        let parsed = parser(vec![GENERIC_REPORT], vec![vec![results_table()]])
            .parse(FAKE_PDF)
            .unwrap();
        let names: Vec<&str> = parsed.tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Glucose"]);
        assert_eq!(parsed.date_collected.as_deref(), Some("2024-01-15"));
    }

    #[test]
    fn non_results_tables_fall_through_to_text() {
        let patient_table = grid(&[&["PATIENT", "ACCOUNT"], &["Jane Doe", "12345"]]);
        let parsed = parser(vec![GENERIC_REPORT], vec![vec![patient_table]])
            .parse(FAKE_PDF)
            .unwrap();
        assert_eq!(parsed.tests.len(), 2);
    }

    #[test]
    fn zero_signal_is_no_extractable_data() {
        let prose = "This letter confirms your appointment next week with the clinic staff.";
        let result = parser(vec![prose], vec![vec![]]).parse(FAKE_PDF);
        assert!(matches!(result, Err(LabParseError::NoExtractableData)));
    }

    #[test]
    fn date_alone_is_enough_signal() {
        let text = "Collection Date: 2024-03-02\nThe specimen was received and is pending review.";
        let parsed = parser(vec![text], vec![]).parse(FAKE_PDF).unwrap();
        assert!(parsed.tests.is_empty());
        assert_eq!(parsed.date_collected.as_deref(), Some("2024-03-02"));
    }

    #[test]
    fn pages_joined_into_full_text() {
        let parsed = parser(
            vec!["Collection Date: 2024-01-15\nGlucose 87 mg/dL 70-99", "Sodium 140 mmol/L 136-145"],
            vec![],
        )
        .parse(FAKE_PDF)
        .unwrap();
        assert_eq!(parsed.tests.len(), 2);
    }

    #[test]
    fn parsing_is_idempotent() {
        let parser = parser(vec![GENERIC_REPORT], vec![vec![results_table()]]);
        let first = parser.parse(FAKE_PDF).unwrap();
        let second = parser.parse(FAKE_PDF).unwrap();
        assert_eq!(first, second);
    }

    struct CountingTextReader {
        calls: Arc<AtomicUsize>,
    }

    impl PdfExtractor for CountingTextReader {
        fn extract_text(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![PageExtraction {
                page_number: 1,
                text: "TEST        RESULT    UNIT\nGlucose     87        mg/dL".into(),
            }])
        }

        fn page_count(&self, _pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
            Ok(1)
        }
    }

    #[test]
    fn layout_tables_reuse_the_text_pass() {
        let calls = Arc::new(AtomicUsize::new(0));
        let parser = LabReportParser::new(
            Box::new(CountingTextReader { calls: Arc::clone(&calls) }),
            Box::new(LayoutTableExtractor),
            ParserConfig::default(),
        );

        let parsed = parser.parse(FAKE_PDF).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(parsed.tests.iter().any(|t| t.name == "Glucose"));
    }

    #[test]
    fn min_text_length_is_configurable() {
        let config = ParserConfig {
            min_text_length: 5,
            ..ParserConfig::default()
        };
        let parser = LabReportParser::new(
            Box::new(FakeTextReader { pages: vec!["Glucose 87 mg/dL"], fail: false }),
            Box::new(FakeTableReader { pages: vec![], fail: false }),
            config,
        );
        assert_eq!(parser.config().min_text_length, 5);
        let parsed = parser.parse(FAKE_PDF).unwrap();
        assert_eq!(parsed.tests[0].numeric_value, Some(87.0));
    }

    #[test]
    fn end_to_end_with_real_pdf() {
        let pdf = make_test_pdf(&[
            "Lab Results Summary",
            "Collection Date: 2024-01-15",
            "Glucose 87 mg/dL 70-99",
            "Sodium 140 mmol/L 136-145",
        ]);
        let parsed = parse_pdf(&pdf).unwrap();
        assert!(parsed.has_signal());
    }

    #[test]
    fn real_reader_rejects_corrupt_pdf() {
        let result = parse_pdf(b"%PDF-1.4 truncated garbage");
        assert!(matches!(result, Err(LabParseError::UnreadableContainer(_))));
    }

    #[tokio::test]
    async fn blocking_task_parses_off_the_executor() {
        let pdf = make_test_pdf(&[
            "Lab Results Summary",
            "Collection Date: 2024-01-15",
            "Glucose 87 mg/dL 70-99",
            "Sodium 140 mmol/L 136-145",
        ]);
        let parsed = parse_pdf_blocking_task(pdf, ParserConfig::default()).await.unwrap();
        assert!(parsed.has_signal());
    }

    #[tokio::test]
    async fn blocking_task_reports_empty_input() {
        let result = parse_pdf_blocking_task(Vec::new(), ParserConfig::default()).await;
        assert!(matches!(result, Err(LabParseError::EmptyInput)));
    }
}
