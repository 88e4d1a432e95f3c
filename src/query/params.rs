//! Lenient access to request query parameters
//!
//! Read endpoints never fail on malformed parameters: a value that does not
//! parse is treated exactly like a missing one.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    values: HashMap<String, String>,
}

impl QueryParams {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Trimmed, non-empty text value
    pub fn text(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.text(name).and_then(|v| v.parse().ok())
    }

    /// Integer that also fits the `publication_year` column type
    pub fn year(&self, name: &str) -> Option<i32> {
        self.text(name).and_then(|v| v.parse().ok())
    }

    /// Boolean flag; anything unrecognized is absent
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.text(name)? {
            "true" | "True" | "1" => Some(true),
            "false" | "False" | "0" => Some(false),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<HashMap<String, String>> for QueryParams {
    fn from(values: HashMap<String, String>) -> Self {
        Self::new(values)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for QueryParams {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_is_absent() {
        let params = QueryParams::from([("title", "   "), ("search", " dune ")]);
        assert_eq!(params.text("title"), None);
        assert_eq!(params.text("search"), Some("dune"));
        assert_eq!(params.text("missing"), None);
    }

    #[test]
    fn test_malformed_integers_are_absent() {
        let params = QueryParams::from([
            ("author", "abc"),
            ("year_from", "1949.5"),
            ("year_to", " 1960 "),
        ]);
        assert_eq!(params.int("author"), None);
        assert_eq!(params.year("year_from"), None);
        assert_eq!(params.year("year_to"), Some(1960));
    }

    #[test]
    fn test_year_out_of_range_is_absent() {
        let params = QueryParams::from([("publication_year", "99999999999")]);
        assert_eq!(params.year("publication_year"), None);
        assert_eq!(params.int("publication_year"), Some(99_999_999_999));
    }

    #[test]
    fn test_flags() {
        let params = QueryParams::from([("a", "true"), ("b", "False"), ("c", "1"), ("d", "yes")]);
        assert_eq!(params.flag("a"), Some(true));
        assert_eq!(params.flag("b"), Some(false));
        assert_eq!(params.flag("c"), Some(true));
        assert_eq!(params.flag("d"), None);
    }
}
