use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::Display;

/// A short identifier for a stored object.
///
/// The first character is the date code, the second the check code and the
/// rest is the random payload. Values are only produced by
/// [`IdentifierCodec`](crate::codec::IdentifierCodec), either freshly generated
/// or accepted by its path validation, so every `Identifier` is at least two
/// characters long.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier(SmolStr);

impl Identifier {
    /// Wraps a string without checking it against any codec settings.
    ///
    /// Use this only for values produced by trusted internal sources.
    pub fn new_unchecked(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The character encoding the time bucket the identifier was issued in.
    pub fn date_code(&self) -> char {
        self.0.chars().next().unwrap_or_default()
    }

    /// The character derived from the keyed checksum of the payload.
    pub fn check_code(&self) -> char {
        self.0.chars().nth(1).unwrap_or_default()
    }

    /// Everything after the date and check codes.
    pub fn payload(&self) -> &str {
        let mut chars = self.0.char_indices().skip(2);
        match chars.next() {
            Some((offset, _)) => &self.0[offset..],
            None => "",
        }
    }

    /// Number of characters (not bytes) in the identifier.
    pub(crate) fn len(&self) -> usize {
        self.0.chars().count()
    }
}

impl std::fmt::Debug for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Identifier").field(&self.0).finish()
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
