//! Character-bounded truncation with a visible marker.

/// Truncate `value` to at most `max_chars` characters.
///
/// Over-long values are cut on a character boundary, trailing whitespace is
/// trimmed, and a `\n[truncated at N chars]` marker is appended. Applying the
/// same cap to an already truncated value returns it unchanged.
pub fn truncate(value: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return marker(0).trim_start().to_string();
    }

    let Some((cut, _)) = value.char_indices().nth(max_chars) else {
        return value.to_string();
    };

    let marker = marker(max_chars);
    if let Some(body) = value.strip_suffix(marker.as_str())
        && body.chars().count() <= max_chars
    {
        return value.to_string();
    }

    format!("{}{}", value[..cut].trim_end(), marker)
}

fn marker(max_chars: usize) -> String {
    format!("\n[truncated at {max_chars} chars]")
}
