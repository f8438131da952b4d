use serde::{Deserialize, Serialize};

/// Normal bounds printed next to a result.
///
/// One-sided bounds keep the single threshold they carry; `Unparsed` keeps
/// whatever the document printed so it can still be displayed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceRange {
    Range { low: f64, high: f64 },
    GreaterThan { value: f64 },
    LessThan { value: f64 },
    Unparsed { text: String },
    #[default]
    Absent,
}

impl ReferenceRange {
    /// Lower bound in the flat `{low, high}` representation.
    pub fn low(&self) -> Option<f64> {
        match self {
            Self::Range { low, .. } => Some(*low),
            Self::GreaterThan { value } => Some(*value),
            _ => None,
        }
    }

    /// Upper bound in the flat `{low, high}` representation.
    pub fn high(&self) -> Option<f64> {
        match self {
            Self::Range { high, .. } => Some(*high),
            Self::LessThan { value } => Some(*value),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// One extracted lab test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    pub name: String,
    /// Result exactly as printed, `<`/`>` included.
    pub result: String,
    /// Standardized qualitative value; set only for qualitative results.
    pub result_text: Option<String>,
    /// Set only for numeric results.
    pub numeric_value: Option<f64>,
    pub unit: String,
    pub reference_range: ReferenceRange,
    pub panel_name: Option<String>,
    /// Vendor abnormal marker ("H", "L"), never interpreted.
    pub flag: Option<String>,
}

impl TestRecord {
    pub fn is_numeric(&self) -> bool {
        self.numeric_value.is_some()
    }

    pub fn is_qualitative(&self) -> bool {
        self.result_text.is_some()
    }
}

/// Everything recovered from one lab-report PDF.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// ISO `YYYY-MM-DD`.
    pub date_collected: Option<String>,
    pub physician: Option<String>,
    pub tests: Vec<TestRecord>,
    /// Panel names from the "Tests Ordered" manifest, in document order.
    pub ordered_panels: Vec<String>,
    pub errors: Vec<String>,
}

impl ParsedDocument {
    /// A document with no tests and no collection date carries no signal.
    pub fn has_signal(&self) -> bool {
        !self.tests.is_empty() || self.date_collected.is_some()
    }
}
