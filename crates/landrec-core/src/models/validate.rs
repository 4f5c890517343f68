//! Field validators for the record entry form.
//!
//! These mirror the rules the registry office enforces at the counter;
//! the backend re-validates everything, so failures here only short-cut
//! a doomed submission.

/// Owner names accept Latin letters, the Ethiopic syllabary and spaces.
pub fn is_valid_owner_name(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphabetic() || ('\u{1200}'..='\u{135A}').contains(&c) || c.is_whitespace())
}

/// National id (Fayda) numbers are exactly 12 digits.
pub fn is_valid_national_id(value: &str) -> bool {
    let value = value.trim();
    value.len() == 12 && value.chars().all(|c| c.is_ascii_digit())
}

/// Phone numbers: `+251` or `0`, then a mobile prefix (7 or 9) and 8 digits.
pub fn is_valid_phone(value: &str) -> bool {
    let rest = if let Some(rest) = value.strip_prefix("+251") {
        rest
    } else if let Some(rest) = value.strip_prefix('0') {
        rest
    } else {
        return false;
    };
    let mut chars = rest.chars();
    if !matches!(chars.next(), Some('7') | Some('9')) {
        return false;
    }
    let remainder: Vec<char> = chars.collect();
    remainder.len() == 8 && remainder.iter().all(|c| c.is_ascii_digit())
}
