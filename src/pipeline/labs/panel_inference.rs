//! Assigns a test to one of the ordered panels when the document itself
//! gives no panel context for it.

use crate::pipeline::extraction::normalize_whitespace;

/// One panel family: keywords scored against the test name, and the words
/// an ordered panel name must carry to belong to the family.
#[derive(Debug, Clone, Copy)]
pub struct PanelFamily {
    pub name: &'static str,
    pub test_keywords: &'static [&'static str],
    /// The ordered panel must contain at least one of these.
    pub panel_requires: &'static [&'static str],
    /// The ordered panel must contain none of these.
    pub panel_excludes: &'static [&'static str],
}

pub const PANEL_FAMILIES: &[PanelFamily] = &[
    PanelFamily {
        name: "cbc",
        test_keywords: &[
            "wbc", "rbc", "hemoglobin", "hematocrit", "mcv", "mch", "mchc", "rdw", "platelets",
            "neutrophils", "lymphs", "monocytes", "eos", "basos", "immature",
        ],
        panel_requires: &["cbc", "blood count"],
        panel_excludes: &["metabolic"],
    },
    PanelFamily {
        name: "metabolic",
        test_keywords: &[
            "glucose", "bun", "creatinine", "egfr", "sodium", "potassium", "chloride",
            "carbon dioxide", "calcium", "protein", "albumin", "globulin", "bilirubin",
            "alkaline phosphatase", "ast", "alt",
        ],
        panel_requires: &["metabolic", "cmp"],
        panel_excludes: &[],
    },
    PanelFamily {
        name: "lipid",
        test_keywords: &["cholesterol", "triglycerides", "hdl", "ldl", "vldl"],
        panel_requires: &["lipid"],
        panel_excludes: &[],
    },
    PanelFamily {
        name: "hepatitis",
        test_keywords: &["hep", "hbsag", "hcv", "hav", "hepatitis"],
        panel_requires: &["hepatitis"],
        panel_excludes: &[],
    },
    PanelFamily {
        name: "thyroid",
        test_keywords: &["tsh", "t3", "t4", "thyroid"],
        panel_requires: &["thyroid", "tsh"],
        panel_excludes: &[],
    },
    PanelFamily {
        name: "vitamin",
        test_keywords: &["vitamin", "b12", "folate", "d,"],
        panel_requires: &["vitamin"],
        panel_excludes: &[],
    },
    PanelFamily {
        name: "hormone",
        test_keywords: &["testosterone", "estradiol", "lh", "fsh"],
        panel_requires: &["hormone", "testosterone"],
        panel_excludes: &[],
    },
    PanelFamily {
        name: "diabetes",
        test_keywords: &["a1c", "hemoglobin a1c", "glucose"],
        panel_requires: &["a1c"],
        panel_excludes: &[],
    },
];

impl PanelFamily {
    fn score(&self, test_name: &str) -> usize {
        self.test_keywords
            .iter()
            .filter(|k| test_name.contains(*k))
            .count()
    }

    fn accepts_panel(&self, panel_name: &str) -> bool {
        let lower = panel_name.to_lowercase();
        self.panel_requires.iter().any(|w| lower.contains(w))
            && !self.panel_excludes.iter().any(|w| lower.contains(w))
    }
}

/// Pick the ordered panel for a test with no panel context.
///
/// Only families with an accepted ordered panel compete; each offers the
/// first ordered panel it accepts. The most keyword hits wins and ties keep
/// the earlier family. `None` when nothing scores or no ordered panel fits.
pub fn infer_panel(test_name: &str, ordered_panels: &[String]) -> Option<String> {
    if ordered_panels.is_empty() {
        return None;
    }
    let normalized = normalize_whitespace(test_name).to_lowercase();

    let mut best: Option<(&String, usize)> = None;
    for family in PANEL_FAMILIES {
        let hits = family.score(&normalized);
        if hits == 0 || hits <= best.map_or(0, |(_, top)| top) {
            continue;
        }
        if let Some(panel) = ordered_panels.iter().find(|p| family.accepts_panel(p)) {
            best = Some((panel, hits));
        }
    }

    best.map(|(panel, _)| panel.clone())
}
