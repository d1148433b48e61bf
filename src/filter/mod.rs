//! WHERE-clause assembly for repository and dispatcher queries.
//!
//! Column identifiers are `&'static str` so they can only come from
//! server-side lists; request values always travel as bound parameters.

pub mod filter_where;
pub mod types;

pub use filter_where::FilterWhere;
pub use types::SqlResult;

/// Wrap a search term in `%..%`, escaping LIKE metacharacters so the
/// term matches literally.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_wraps_and_escapes() {
        assert_eq!(like_pattern("smith"), "%smith%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
