//! Known unit and reference-range defaults for tests whose vendor output
//! omits them.
//!
//! These are lab-specific clinical defaults, so they live in configuration
//! (`ParserConfig::known_fallbacks`) and can be replaced wholesale from JSON.

use serde::{Deserialize, Serialize};

use crate::models::ReferenceRange;

/// One fallback entry, matched on lower-cased test-name substrings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownFallback {
    /// Matches when the test name contains any of these (case-insensitive).
    pub name_contains: Vec<String>,
    /// An additional substring that must also be present.
    #[serde(default)]
    pub also_contains: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub reference_range: Option<ReferenceRange>,
}

impl KnownFallback {
    pub fn matches(&self, test_name: &str) -> bool {
        let lower = test_name.to_lowercase();
        let primary = self
            .name_contains
            .iter()
            .any(|needle| lower.contains(&needle.to_lowercase()));
        let secondary = self
            .also_contains
            .as_ref()
            .map_or(true, |needle| lower.contains(&needle.to_lowercase()));
        primary && secondary
    }
}

pub fn default_known_fallbacks() -> Vec<KnownFallback> {
    vec![
        KnownFallback {
            name_contains: vec!["egfr".into()],
            also_contains: None,
            unit: Some("mL/min/1.73m²".into()),
            reference_range: Some(ReferenceRange::GreaterThan { value: 90.0 }),
        },
        KnownFallback {
            name_contains: vec!["bun/creatinine".into(), "bun/crea".into()],
            also_contains: None,
            unit: Some("ratio".into()),
            reference_range: Some(ReferenceRange::Range { low: 8.0, high: 27.0 }),
        },
        KnownFallback {
            name_contains: vec!["a/g ratio".into()],
            also_contains: None,
            unit: Some("ratio".into()),
            reference_range: Some(ReferenceRange::Range { low: 1.2, high: 2.2 }),
        },
        KnownFallback {
            name_contains: vec!["globulin".into()],
            also_contains: Some("total".into()),
            unit: Some("g/dL".into()),
            reference_range: Some(ReferenceRange::Range { low: 1.5, high: 4.5 }),
        },
    ]
}

/// First known unit for the test, if any entry matches.
pub fn fallback_unit<'a>(test_name: &str, fallbacks: &'a [KnownFallback]) -> Option<&'a str> {
    fallbacks
        .iter()
        .filter(|f| f.matches(test_name))
        .find_map(|f| f.unit.as_deref())
}

/// First known reference range for the test, if any entry matches.
pub fn fallback_reference_range<'a>(
    test_name: &str,
    fallbacks: &'a [KnownFallback],
) -> Option<&'a ReferenceRange> {
    fallbacks
        .iter()
        .filter(|f| f.matches(test_name))
        .find_map(|f| f.reference_range.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn egfr_defaults() {
        let table = default_known_fallbacks();
        assert_eq!(fallback_unit("eGFR If Africn Am", &table), Some("mL/min/1.73m²"));
        assert_eq!(
            fallback_reference_range("eGFR", &table),
            Some(&ReferenceRange::GreaterThan { value: 90.0 })
        );
    }

    #[test]
    fn ratio_defaults() {
        let table = default_known_fallbacks();
        assert_eq!(fallback_unit("BUN/Creatinine Ratio", &table), Some("ratio"));
        assert_eq!(
            fallback_reference_range("BUN/Creatinine Ratio", &table),
            Some(&ReferenceRange::Range { low: 8.0, high: 27.0 })
        );
        assert_eq!(fallback_unit("A/G Ratio", &table), Some("ratio"));
        assert_eq!(
            fallback_reference_range("A/G Ratio", &table),
            Some(&ReferenceRange::Range { low: 1.2, high: 2.2 })
        );
    }

    #[test]
    fn globulin_requires_total() {
        let table = default_known_fallbacks();
        assert_eq!(fallback_unit("Globulin, Total", &table), Some("g/dL"));
        assert_eq!(fallback_unit("Globulin", &table), None);
    }

    #[test]
    fn unrecognized_test_has_no_fallback() {
        let table = default_known_fallbacks();
        assert_eq!(fallback_unit("Glucose", &table), None);
        assert_eq!(fallback_reference_range("Glucose", &table), None);
    }

    #[test]
    fn fallback_entries_deserialize_from_json() {
        let json = r#"[{
            "name_contains": ["ferritin"],
            "unit": "ng/mL",
            "reference_range": {"kind": "range", "low": 30.0, "high": 400.0}
        }]"#;
        let table: Vec<KnownFallback> = serde_json::from_str(json).unwrap();
        assert_eq!(fallback_unit("Ferritin, Serum", &table), Some("ng/mL"));
        assert_eq!(table[0].also_contains, None);
    }
}
