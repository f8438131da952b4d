//! Report-level metadata: collection date and ordering physician.
//!
//! Both extractors walk ordered pattern lists, most specific first, and
//! keep scanning past candidates that fail validation.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};

/// A date shape and how to turn its captures into a calendar date.
struct DatePattern {
    regex: Regex,
    parse: fn(&Captures<'_>) -> Option<NaiveDate>,
}

/// Labels that introduce the collection date; the date follows on the same line.
static COLLECTION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)(?:date\s*(?:/\s*time\s*)?collected|collection\s+date|collected\s+on|specimen\s+collected)[ \t]*:?[ \t]*([^\n]*)",
    )
    .expect("Invalid collection label regex")
});

static DATE_PATTERNS: LazyLock<Vec<DatePattern>> = LazyLock::new(|| {
    vec![
        // 01/15/2024
        DatePattern {
            regex: date_regex(r"\b(\d{1,2}/\d{1,2}/\d{4})\b"),
            parse: |caps| NaiveDate::parse_from_str(&caps[1], "%m/%d/%Y").ok(),
        },
        // 2024-01-15
        DatePattern {
            regex: date_regex(r"\b(\d{4}-\d{2}-\d{2})\b"),
            parse: |caps| NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok(),
        },
        // January 15, 2024 / Jan. 15 2024
        DatePattern {
            regex: date_regex(r"\b([A-Za-z]{3,9})\.?\s+(\d{1,2}),?\s+(\d{4})\b"),
            parse: |caps| {
                let joined = format!("{} {} {}", &caps[1], &caps[2], &caps[3]);
                NaiveDate::parse_from_str(&joined, "%B %d %Y").ok()
            },
        },
        // 15-Jan-2024
        DatePattern {
            regex: date_regex(r"\b(\d{1,2}-[A-Za-z]{3}-\d{4})\b"),
            parse: |caps| NaiveDate::parse_from_str(&caps[1], "%d-%b-%Y").ok(),
        },
    ]
});

/// Capitalized name tokens ("John A. Smith", "SMITH, JOHN").
const NAME: &str = r"([A-Z][A-Za-z'\-]*\.?(?:,?[ \t]+[A-Z][A-Za-z'\-]*\.?){0,4})";

static PHYSICIAN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        format!(r"\b(?i:ordering\s+physician|physician|doctor|provider)\b[ \t]*:?[ \t]*{NAME}"),
        format!(r"{NAME}[ \t]*,?[ \t]*(?:MD\b|M\.D\.)"),
        format!(r"\b(?i:dr)\.?[ \t]+{NAME}"),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid physician regex pattern"))
    .collect()
});

/// Tokens that end a physician name: credentials, identifiers, and the next
/// field label on the same line.
const NAME_STOP_WORDS: &[&str] = &[
    "md", "m.d.", "do", "d.o.", "npi", "phd", "date", "collected", "received", "reported",
    "patient", "name", "test", "tests", "result", "results", "report", "specimen", "account",
    "phone", "fax", "dob", "id", "physician", "doctor",
];

fn date_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid date regex pattern")
}

/// First parseable date in the text, as ISO `YYYY-MM-DD`. Formats are tried
/// in order; within a format, every match is tried until one is a real date.
pub fn parse_first_date(text: &str) -> Option<String> {
    DATE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .regex
            .captures_iter(text)
            .find_map(|caps| (pattern.parse)(&caps))
            .map(|date| date.format("%Y-%m-%d").to_string())
    })
}

/// Collection date: a labeled date ("Date Collected: ...") wins, otherwise
/// the first date found anywhere in the text.
pub fn extract_collection_date(text: &str) -> Option<String> {
    COLLECTION_LABEL
        .captures_iter(text)
        .find_map(|caps| parse_first_date(&caps[1]))
        .or_else(|| parse_first_date(text))
}

/// Ordering physician, with titles, credentials, and identifiers removed.
/// Names never span lines.
pub fn extract_physician(text: &str) -> Option<String> {
    PHYSICIAN_PATTERNS.iter().find_map(|re| {
        re.captures_iter(text)
            .find_map(|caps| clean_physician_name(&caps[1]))
    })
}

/// Cut a captured name at the first stop word and drop a leading "Dr".
fn clean_physician_name(raw: &str) -> Option<String> {
    let tokens: Vec<&str> = raw
        .split_whitespace()
        .skip_while(|t| matches!(normalize_token(t).as_str(), "dr" | "dr."))
        .take_while(|t| !NAME_STOP_WORDS.contains(&normalize_token(t).as_str()))
        .collect();

    let name = tokens.join(" ");
    let name = name.trim_end_matches([',', ' ']).to_string();

    if name.chars().filter(|c| c.is_alphabetic()).count() <= 2 {
        return None;
    }
    Some(name)
}

fn normalize_token(token: &str) -> String {
    token.trim_end_matches([',', ':']).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- dates ---

    #[test]
    fn us_date_to_iso() {
        assert_eq!(extract_collection_date("Collected 01/15/2024 08:30").as_deref(), Some("2024-01-15"));
    }

    #[test]
    fn iso_date_kept() {
        assert_eq!(extract_collection_date("Drawn on 2024-03-05").as_deref(), Some("2024-03-05"));
    }

    #[test]
    fn long_month_names() {
        assert_eq!(parse_first_date("January 15, 2024").as_deref(), Some("2024-01-15"));
        assert_eq!(parse_first_date("Report of Jan. 15 2024").as_deref(), Some("2024-01-15"));
    }

    #[test]
    fn day_month_abbrev_year() {
        assert_eq!(parse_first_date("15-Jan-2024").as_deref(), Some("2024-01-15"));
    }

    #[test]
    fn impossible_dates_skipped() {
        assert_eq!(parse_first_date("13/45/2024 then 02/03/2024").as_deref(), Some("2024-02-03"));
        assert_eq!(parse_first_date("Page 1 2024"), None);
    }

    #[test]
    fn labeled_collection_date_wins_over_earlier_dates() {
        let text = "DOB: 01/01/1970\nDate Collected: 08/19/2022\nDate Reported: 08/21/2022";
        assert_eq!(extract_collection_date(text).as_deref(), Some("2022-08-19"));
    }

    #[test]
    fn date_time_collected_label() {
        let text = "Date/Time Collected: 2023-11-02 07:45";
        assert_eq!(extract_collection_date(text).as_deref(), Some("2023-11-02"));
    }

    #[test]
    fn no_date_is_none() {
        assert_eq!(extract_collection_date("Glucose 87 mg/dL"), None);
    }

    // --- physicians ---

    #[test]
    fn labeled_physician() {
        assert_eq!(
            extract_physician("Ordering Physician: John Smith").as_deref(),
            Some("John Smith")
        );
    }

    #[test]
    fn credentials_and_npi_removed() {
        assert_eq!(
            extract_physician("Physician: Jane Doe MD NPI 1234567890").as_deref(),
            Some("Jane Doe")
        );
        assert_eq!(
            extract_physician("Physician: Jane Doe NPI: 1234567890").as_deref(),
            Some("Jane Doe")
        );
    }

    #[test]
    fn dr_prefix_removed() {
        assert_eq!(extract_physician("Physician: Dr. Alan Grant").as_deref(), Some("Alan Grant"));
        assert_eq!(extract_physician("Seen by Dr. Ellie Sattler").as_deref(), Some("Ellie Sattler"));
    }

    #[test]
    fn name_followed_by_md() {
        assert_eq!(extract_physician("Signed: Ian Malcolm, M.D.").as_deref(), Some("Ian Malcolm"));
    }

    #[test]
    fn name_does_not_cross_lines() {
        let text = "Ordering Physician: John Smith\nPatient Name: Mary Jones";
        assert_eq!(extract_physician(text).as_deref(), Some("John Smith"));
    }

    #[test]
    fn next_label_on_same_line_ends_name() {
        let text = "Physician: John Smith Date Collected: 01/15/2024";
        assert_eq!(extract_physician(text).as_deref(), Some("John Smith"));
    }

    #[test]
    fn vendor_uppercase_name() {
        assert_eq!(
            extract_physician("Ordering Physician: SMITH, JOHN").as_deref(),
            Some("SMITH, JOHN")
        );
    }

    #[test]
    fn header_words_rejected() {
        assert_eq!(extract_physician("Physician Name"), None);
        assert_eq!(extract_physician("Glucose 87 mg/dL"), None);
    }

    #[test]
    fn street_names_are_not_doctors() {
        assert_eq!(extract_physician("1200 Main Drive"), None);
    }
}
