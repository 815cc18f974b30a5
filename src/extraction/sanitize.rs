/// Sanitize the rendered character stream before any pattern pass.
/// Strips control characters, trims each line, collapses blank lines, and
/// keeps the punctuation clinical reports actually use — including the `*`
/// out-of-range marker and measurement symbols.
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
                        | '°'
                        | '²'
                        | '³'
                        | 'µ'
                        | '§'
                        | '\u{2013}' // En-dash –
                        | '\u{2019}' // Right single quotation mark '
                )
        })
        .collect::<String>()
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
