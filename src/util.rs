pub(crate) fn compare_lowercase_ascii(a: &str, lowercased: &str) -> bool {
    if a.len() != lowercased.len() {
        return false;
    }

    for (a, b) in a.chars().zip(lowercased.chars()) {
        if !a.is_ascii() {
            return false;
        }
        let norm = a.to_ascii_lowercase();
        if norm != b {
            return false;
        }
    }

    true
}

/// Tell if a comma separated header value contains `token` (lowercase).
pub(crate) fn has_token(value: &str, token: &str) -> bool {
    value
        .split(',')
        .map(|v| v.trim())
        .any(|v| compare_lowercase_ascii(v, token))
}

pub(crate) fn find_crlf(b: &[u8]) -> Option<usize> {
    let cr = b.iter().position(|c| *c == b'\r')?;
    let maybe_lf = b.get(cr + 1)?;
    (*maybe_lf == b'\n').then_some(cr)
}
