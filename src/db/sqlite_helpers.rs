//! SQLite helper utilities for type conversion
//!
//! SQLite has no native timestamp type; timestamps are stored as RFC 3339 text.

use chrono::Utc;

/// Current time as a SQLite-compatible string
#[inline]
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_rfc3339() {
        let now = now_iso8601();
        assert!(chrono::DateTime::parse_from_rfc3339(&now).is_ok());
    }
}
