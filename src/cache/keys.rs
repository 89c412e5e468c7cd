//! Cache key derivation.
//!
//! A request is cacheable when its path contains the configured namespace
//! (`/static/docs/` by default). The key is everything after the namespace,
//! percent-decoded except for escapes of URI reserved characters, which stay
//! encoded. Query strings and headers never take part in the key.

use std::fmt;

use percent_encoding::percent_decode;

/// Characters whose escapes survive decoding (`%2F` must not become a new segment).
const URI_RESERVED: &[u8] = b";/?:@&=+$,#";

/// Key under which a captured payload is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Derive the cache key for `path`, or `None` when the path is outside the
/// namespace.
///
/// `path` is the raw (still percent-encoded) URI path. The first occurrence
/// of `namespace` wins, so the layer keeps working when the router is nested
/// under another prefix. An empty suffix and suffixes that do not decode to
/// UTF-8 are not cacheable.
pub fn classify(namespace: &str, path: &str) -> Option<CacheKey> {
    let start = path.find(namespace)? + namespace.len();
    let suffix = &path[start..];
    if suffix.is_empty() {
        return None;
    }

    decode_uri(suffix).map(CacheKey)
}

/// Percent-decode `input`, leaving escapes of [`URI_RESERVED`] bytes as they
/// were written. Returns `None` when the result is not UTF-8.
fn decode_uri(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut run_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 3 <= bytes.len() {
            let mut escape = percent_decode(&bytes[i..i + 3]);
            if let (Some(byte), None) = (escape.next(), escape.next())
                && URI_RESERVED.contains(&byte)
            {
                decoded.extend(percent_decode(&bytes[run_start..i]));
                decoded.extend_from_slice(&bytes[i..i + 3]);
                i += 3;
                run_start = i;
                continue;
            }
        }
        i += 1;
    }
    decoded.extend(percent_decode(&bytes[run_start..]));

    String::from_utf8(decoded).ok()
}
