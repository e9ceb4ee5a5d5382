//! Scheme downgrading and root-relative link rewriting.

use std::borrow::Cow;

use url::Url;

const SECURE_PREFIX: &str = "https://";
const PLAIN_PREFIX: &str = "http://";

/// Replace every `https://` (any ASCII case) in `text` with `http://`.
///
/// Purely textual: quoting context is ignored, so prose mentioning a secure
/// URL is rewritten as well.
pub fn downgrade_secure_urls(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let needle = SECURE_PREFIX.as_bytes();

    let Some(first) = find_ignore_case(bytes, needle, 0) else {
        return Cow::Borrowed(text);
    };

    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut next = Some(first);
    while let Some(at) = next {
        out.push_str(&text[copied..at]);
        out.push_str(PLAIN_PREFIX);
        copied = at + needle.len();
        next = find_ignore_case(bytes, needle, copied);
    }
    out.push_str(&text[copied..]);
    Cow::Owned(out)
}

// Needle is ASCII, so any match starts on a char boundary.
fn find_ignore_case(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len())
        .find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// Origin links are anchored at, always on the plain scheme.
///
/// `https://example.com/a` and `http://example.com/a` both give
/// `http://example.com`. An explicit port is kept.
pub fn plain_origin(url: &Url) -> String {
    let mut plain = url.clone();
    if plain.scheme() == "https" {
        // https -> http is always a permitted scheme change
        let _ = plain.set_scheme("http");
    }
    plain.origin().ascii_serialization()
}

/// `/path` is root-relative; `//host/path` is protocol-relative and is not.
pub fn is_root_relative(href: &str) -> bool {
    href.starts_with('/') && !href.starts_with("//")
}

/// Anchor a root-relative href at `origin`, or `None` if it is not root-relative.
pub fn absolutize(href: &str, origin: &str) -> Option<String> {
    is_root_relative(href).then(|| format!("{}{}", origin.trim_end_matches('/'), href))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downgrade_secure_urls() {
        let html = r#"<a href="https://a.example/x">HTTPS://B.example</a><img src='https://c/'>"#;
        assert_eq!(
            downgrade_secure_urls(html),
            r#"<a href="http://a.example/x">http://B.example</a><img src='http://c/'>"#
        );
    }

    #[test]
    fn test_downgrade_without_match_borrows() {
        let text = "<p>http://already.plain/ and https:/ not a url</p>";
        assert!(matches!(downgrade_secure_urls(text), Cow::Borrowed(_)));
    }

    #[test]
    fn test_downgrade_keeps_multibyte_text() {
        assert_eq!(
            downgrade_secure_urls("héllo https://ü.example/ñ wörld"),
            "héllo http://ü.example/ñ wörld"
        );
    }

    #[test]
    fn test_plain_origin() {
        let secure = Url::parse("https://example.com/page?q=1").unwrap();
        assert_eq!(plain_origin(&secure), "http://example.com");

        let ported = Url::parse("http://example.com:8080/page").unwrap();
        assert_eq!(plain_origin(&ported), "http://example.com:8080");
    }

    #[test]
    fn test_absolutize() {
        let origin = "http://example.com";
        assert_eq!(
            absolutize("/about?x=1", origin).as_deref(),
            Some("http://example.com/about?x=1")
        );
        assert_eq!(absolutize("//cdn.example.com/a.css", origin), None);
        assert_eq!(absolutize("relative/page", origin), None);
        assert_eq!(absolutize("http://other/", origin), None);
    }
}
