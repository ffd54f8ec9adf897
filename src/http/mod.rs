//! Request and response models shared by both transports.

pub mod request;
pub mod response;

pub use request::{Body, Request};
pub use response::{Response, ResponseBody};

/// Case-insensitive header lookup.
pub(crate) fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Case-insensitive header replace-or-insert.
pub(crate) fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    match headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
        Some((_, v)) => *v = value,
        None => headers.push((name.to_string(), value)),
    }
}

/// Truncate long values for log lines.
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{} + {} chars", &s[..idx], s.len() - idx),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let headers = vec![("Content-Type".to_string(), "text/plain".to_string())];
        assert_eq!(header_value(&headers, "content-type"), Some("text/plain"));
        assert_eq!(header_value(&headers, "CONTENT-TYPE"), Some("text/plain"));
        assert_eq!(header_value(&headers, "digest"), None);
    }

    #[test]
    fn test_set_header_replaces_existing() {
        let mut headers = vec![("Authorization".to_string(), "old".to_string())];
        set_header(&mut headers, "authorization", "new".to_string());
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].1, "new");

        set_header(&mut headers, "digest", "SHA-256=abc".to_string());
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("0123456789", 4), "0123 + 6 chars");
    }
}
