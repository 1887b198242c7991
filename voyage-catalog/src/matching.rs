use voyage_core::catalog::Location;

/// Case-insensitive substring match of a search term against a location's
/// name, code or city.
pub fn location_matches(location: &Location, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    [&location.name, &location.code, &location.city]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// `%term%` for ILIKE, with LIKE metacharacters escaped.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
