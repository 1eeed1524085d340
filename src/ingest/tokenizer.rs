//! Quote-aware splitting of one physical line into fields.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Unquoted,
    Quoted,
}

/// Split a single line on commas, honouring double-quoted fields.
///
/// Inside a quoted section a doubled quote (`""`) yields one literal quote and
/// the scanner stays quoted; any other quote toggles the quoted state. Commas
/// only separate fields outside quotes. The scanner never looks past the line
/// it is given, so a quoted field cannot contain a line break.
///
/// # Examples
///
/// ```
/// use storemap::ingest::split_fields;
///
/// let fields = split_fields(r#"1,"a,""b""",c"#);
/// assert_eq!(fields, vec!["1", r#"a,"b""#, "c"]);
/// ```
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut state = ScanState::Unquoted;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, state) {
            ('"', ScanState::Quoted) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', ScanState::Quoted) => state = ScanState::Unquoted,
            ('"', ScanState::Unquoted) => state = ScanState::Quoted,
            (',', ScanState::Unquoted) => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    fields
}

/// Quote a value for output so that `split_fields` reads it back unchanged.
pub fn quote_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
