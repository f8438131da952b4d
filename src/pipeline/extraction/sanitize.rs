/// Sanitize flowed text before the line grammars see it.
/// Strips control characters, drops blank lines, trims each line, and keeps
/// the punctuation lab reports rely on (range dashes, `<`/`>`, `≥`/`≤`, unit symbols).
pub fn sanitize_extracted_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| {
            c.is_alphanumeric()
                || c.is_whitespace()
                || matches!(
                    c,
                    '.' | ','
                        | ';'
                        | ':'
                        | '-'
                        | '/'
                        | '('
                        | ')'
                        | '['
                        | ']'
                        | '+'
                        | '='
                        | '%'
                        | '#'
                        | '@'
                        | '&'
                        | '\''
                        | '"'
                        | '!'
                        | '?'
                        | '<'
                        | '>'
                        | '*'
                        | '_'
                        | '^'
                        | '|'
                        | '°'
                        | '²'
                        | '³'
                        | 'µ'
                        | '\u{2265}' // ≥
                        | '\u{2264}' // ≤
                        | '\u{00B1}' // ±
                        | '\u{00D7}' // ×
                        | '\u{2013}' // En-dash, printed in some ranges
                )
        })
        .collect::<String>()
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse any run of whitespace (including wrapped lines inside a table
/// cell) into single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
