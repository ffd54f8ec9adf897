//! Canonical signing string construction.
//!
//! The canonical string is the exact byte sequence over which a request
//! signature is computed. Both sides must derive it identically, so the
//! rules here are deliberately rigid: fixed pseudo-headers, case-folded
//! names, a fixed ignore set, and first-seen grouping of repeated values.

use reqwest::Method;

/// Headers never included in the canonical signing string.
pub const IGNORED_HEADERS: [&str; 3] = ["keep-alive", "transfer-encoding", "connection"];

/// Canonical signing input plus the ordered names it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalString {
    /// Bytes over which the signature is computed.
    pub bytes: Vec<u8>,
    /// Header names actually signed, in canonical order. Rendered
    /// space-separated into the signature header so the verifier can
    /// rebuild the same string.
    pub signed_headers: Vec<String>,
}

/// Build the canonical signing string for a request.
///
/// Two pseudo-headers are prepended to the supplied list: `(created)` with
/// the signing timestamp and `(request-target)` with the lowercased verb
/// and path (query string included). Names are case-folded, headers in
/// [`IGNORED_HEADERS`] are dropped, and repeated values for the same name
/// are grouped in first-seen order and joined with `", "`.
pub fn build_canonical_string(
    method: &Method,
    path: &str,
    headers: &[(String, String)],
    created: u64,
) -> CanonicalString {
    let pseudo_headers = [
        ("(created)".to_string(), created.to_string()),
        (
            "(request-target)".to_string(),
            format!("{} {}", method.as_str().to_lowercase(), path),
        ),
    ];

    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (name, value) in pseudo_headers.iter().chain(headers.iter()) {
        let name = name.to_lowercase();
        if IGNORED_HEADERS.contains(&name.as_str()) {
            continue;
        }
        match grouped.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, values)) => values.push(value.trim().to_string()),
            None => grouped.push((name, vec![value.trim().to_string()])),
        }
    }

    let lines: Vec<String> = grouped
        .iter()
        .map(|(name, values)| format!("{}: {}", name, values.join(", ")))
        .collect();

    CanonicalString {
        bytes: lines.join("\n").into_bytes(),
        signed_headers: grouped.into_iter().map(|(name, _)| name).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_canonical_string_layout() {
        let canonical = build_canonical_string(
            &Method::POST,
            "/app/log?id=42",
            &headers(&[("Digest", "SHA-256=abc"), ("Content-Length", "5")]),
            1000,
        );
        assert_eq!(
            String::from_utf8(canonical.bytes).unwrap(),
            "(created): 1000\n\
             (request-target): post /app/log?id=42\n\
             digest: SHA-256=abc\n\
             content-length: 5"
        );
        assert_eq!(
            canonical.signed_headers,
            vec!["(created)", "(request-target)", "digest", "content-length"]
        );
    }

    #[test]
    fn test_deterministic_for_fixed_timestamp() {
        let hs = headers(&[("Digest", "SHA-256=abc"), ("Content-Length", "0")]);
        let first = build_canonical_string(&Method::GET, "/node/tx", &hs, 1234);
        let second = build_canonical_string(&Method::GET, "/node/tx", &hs, 1234);
        assert_eq!(first, second);
    }

    #[test]
    fn test_ignored_headers_are_dropped() {
        let canonical = build_canonical_string(
            &Method::POST,
            "/app/log",
            &headers(&[
                ("Connection", "keep-alive"),
                ("Keep-Alive", "timeout=5"),
                ("Transfer-Encoding", "chunked"),
                ("Digest", "SHA-256=abc"),
            ]),
            1,
        );
        assert_eq!(
            canonical.signed_headers,
            vec!["(created)", "(request-target)", "digest"]
        );
    }

    #[test]
    fn test_repeated_headers_grouped_in_first_seen_order() {
        let canonical = build_canonical_string(
            &Method::POST,
            "/app/log",
            &headers(&[("x-a", "1"), ("x-b", "2"), ("X-A", " 3 ")]),
            1,
        );
        let text = String::from_utf8(canonical.bytes).unwrap();
        assert!(text.contains("x-a: 1, 3"));
        assert!(text.contains("x-b: 2"));
        assert_eq!(
            canonical.signed_headers,
            vec!["(created)", "(request-target)", "x-a", "x-b"]
        );
    }
}
