//! URL canonicalizer (component A).
//!
//! Maps any URL string, optionally resolved against a base, to a stable
//! canonical key string. Two URLs that canonicalize to the same string are
//! the same resource for all crawler bookkeeping — see spec §4.1.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use thiserror::Error;
use url::Url;

/// Characters that must stay percent-encoded in a canonicalized path. Every
/// unreserved character plus `/` is left alone. `%` is deliberately absent:
/// `decode_unreserved` already leaves every surviving `%XX` escape intact
/// (uppercased), and re-escaping it here would percent-encode that `%` again
/// on every pass, breaking idempotence.
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanonicalizeError {
    #[error("invalid URL: {0}")]
    Parse(String),
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
}

/// Canonicalize `input`, resolving it against `base` if it is relative.
pub fn canonicalize(input: &str, base: Option<&str>) -> Result<String, CanonicalizeError> {
    let url = resolve(input, base)?;
    canonicalize_url(&url)
}

fn resolve(input: &str, base: Option<&str>) -> Result<Url, CanonicalizeError> {
    match Url::parse(input) {
        Ok(url) => Ok(url),
        Err(_) => {
            let base =
                base.ok_or_else(|| CanonicalizeError::Parse(format!("relative URL with no base: {input}")))?;
            let base_url = Url::parse(base).map_err(|e| CanonicalizeError::Parse(e.to_string()))?;
            base_url
                .join(input)
                .map_err(|e| CanonicalizeError::Parse(e.to_string()))
        }
    }
}

/// Canonicalize an already-parsed [`Url`].
pub fn canonicalize_url(url: &Url) -> Result<String, CanonicalizeError> {
    let scheme = url.scheme().to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(CanonicalizeError::UnsupportedScheme(scheme));
    }

    let host = url
        .host_str()
        .ok_or_else(|| CanonicalizeError::Parse("missing host".into()))?
        .to_ascii_lowercase();

    let default_port = match scheme.as_str() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    };
    let port = url.port().filter(|p| Some(*p) != default_port);

    let path = canonical_path(url.path());
    let query = canonical_query(url.query());

    let mut out = format!("{scheme}://{host}");
    if let Some(p) = port {
        out.push(':');
        out.push_str(&p.to_string());
    }
    out.push_str(&path);
    if let Some(q) = query {
        out.push('?');
        out.push_str(&q);
    }
    Ok(out)
}

fn canonical_path(raw: &str) -> String {
    let decoded = decode_unreserved(raw);
    let collapsed = collapse_dot_segments(&decoded);

    let mut path = if collapsed.is_empty() {
        "/".to_string()
    } else {
        collapsed
    };

    if path != "/" && path.ends_with('/') {
        path.pop();
    }

    path.split('/')
        .map(|seg| utf8_percent_encode(seg, PATH_ENCODE_SET).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Percent-decode only the unreserved characters (`A-Za-z0-9-._~`); any other
/// `%XX` escape is left intact (with the hex digits upper-cased), per the
/// RFC 3986 normalization spec §4.1 rule 4 calls for.
fn decode_unreserved(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                let byte = hi * 16 + lo;
                if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
                    out.push(byte);
                } else {
                    out.push(b'%');
                    out.push(bytes[i + 1].to_ascii_uppercase());
                    out.push(bytes[i + 2].to_ascii_uppercase());
                }
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Resolve `.` and `..` segments the way a browser would, without consulting
/// the filesystem. Leading slash is preserved; segments above root are
/// dropped silently rather than erroring.
fn collapse_dot_segments(path: &str) -> String {
    let absolute = path.starts_with('/');
    let trailing_slash = path.len() > 1 && path.ends_with('/');

    let mut stack: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => continue,
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }

    let mut out = String::new();
    if absolute {
        out.push('/');
    }
    out.push_str(&stack.join("/"));
    if trailing_slash && !out.ends_with('/') {
        out.push('/');
    }
    out
}

fn canonical_query(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if raw.is_empty() {
        return Some(String::new());
    }

    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    // Stable sort keeps equal-key pairs in their original relative order.
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in pairs {
        serializer.append_pair(&k, &v);
    }
    Some(serializer.finish())
}

/// The host portion of a canonical URL, used for same-host comparisons.
pub fn host_of(canonical: &str) -> Option<String> {
    Url::parse(canonical).ok().and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_scheme_and_host() {
        assert_eq!(
            canonicalize("HTTP://Example.COM/Path", None).unwrap(),
            "http://example.com/Path"
        );
    }

    #[test]
    fn drops_default_ports() {
        assert_eq!(canonicalize("http://example.com:80/", None).unwrap(), "http://example.com/");
        assert_eq!(canonicalize("https://example.com:443/", None).unwrap(), "https://example.com/");
        assert_eq!(
            canonicalize("http://example.com:8080/", None).unwrap(),
            "http://example.com:8080/"
        );
    }

    #[test]
    fn empty_path_becomes_root() {
        assert_eq!(canonicalize("http://example.com", None).unwrap(), "http://example.com/");
    }

    #[test]
    fn strips_single_trailing_slash_except_root() {
        assert_eq!(canonicalize("http://example.com/a/", None).unwrap(), "http://example.com/a");
        assert_eq!(canonicalize("http://example.com/", None).unwrap(), "http://example.com/");
    }

    #[test]
    fn collapses_dot_segments() {
        assert_eq!(
            canonicalize("http://example.com/a/../b/./c", None).unwrap(),
            "http://example.com/b/c"
        );
    }

    #[test]
    fn sorts_query_params_preserving_blank_values() {
        assert_eq!(
            canonicalize("http://example.com/?b=2&a=&c=3", None).unwrap(),
            "http://example.com/?a=&b=2&c=3"
        );
    }

    #[test]
    fn stable_sort_preserves_order_of_equal_keys() {
        assert_eq!(
            canonicalize("http://example.com/?a=2&a=1", None).unwrap(),
            "http://example.com/?a=2&a=1"
        );
    }

    #[test]
    fn drops_fragment() {
        assert_eq!(
            canonicalize("http://example.com/page#section", None).unwrap(),
            "http://example.com/page"
        );
    }

    #[test]
    fn resolves_relative_against_base() {
        assert_eq!(
            canonicalize("/page1", Some("http://example.com/dir/")).unwrap(),
            "http://example.com/page1"
        );
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(matches!(
            canonicalize("ftp://example.com/", None),
            Err(CanonicalizeError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            canonicalize("mailto:foo@example.com", None),
            Err(CanonicalizeError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn is_idempotent() {
        let once = canonicalize("HTTP://Example.com:80/a/../b/?z=1&y=2#frag", None).unwrap();
        let twice = canonicalize(&once, None).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn is_idempotent_over_reserved_percent_escapes() {
        let once = canonicalize("http://example.com/a%20b%2Fc", None).unwrap();
        let twice = canonicalize(&once, None).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, "http://example.com/a%20b%2Fc");
    }

    #[test]
    fn root_and_root_with_slash_equivalent() {
        assert_eq!(
            canonicalize("http://example.com", None).unwrap(),
            canonicalize("http://example.com/", None).unwrap()
        );
    }
}
