/// Get at most the first `max_chars` characters of a string
pub fn truncate_chars(full_str: &str, max_chars: usize) -> &str {
    match full_str.char_indices().nth(max_chars) {
        Some((end, _)) => &full_str[..end],
        None => full_str,
    }
}
