use std::fmt::{self, Display};

/// Normalized cache key of a served object.
///
/// Built from the request host, the canonical path (the identifier without
/// extension or filename) and the values of the request headers that take
/// part in the key. Header names are lowercased and a missing header is
/// recorded as an empty value, so two requests that differ only in the
/// suffix of their path share one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new<'a>(
        host: &str,
        canonical_path: &str,
        vary: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let mut key = format!("{}{}", host.to_ascii_lowercase(), canonical_path);
        for (name, value) in vary {
            key.push('\n');
            key.push_str(&name.to_ascii_lowercase());
            key.push(':');
            key.push_str(value);
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.replace('\n', " "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_is_case_insensitive() {
        let a = CacheKey::new("Paste.Example", "/abc", []);
        let b = CacheKey::new("paste.example", "/abc", []);
        assert_eq!(a, b);
    }

    #[test]
    fn vary_headers_take_part_in_the_key() {
        let a = CacheKey::new("h", "/abc", [("Origin", "https://a.example")]);
        let b = CacheKey::new("h", "/abc", [("origin", "https://b.example")]);
        let c = CacheKey::new("h", "/abc", [("origin", "https://a.example")]);
        assert_ne!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn display_is_single_line() {
        let key = CacheKey::new("h", "/abc", [("origin", "")]);
        assert_eq!(key.to_string(), "h/abc origin:");
    }
}
