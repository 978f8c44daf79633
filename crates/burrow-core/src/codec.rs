//! Generation and validation of short identifiers.
//!
//! An identifier is `date code + check code + random payload`. The date code
//! buckets issue time so identifiers minted in the same window share their
//! first character. The check code is derived from a SHA-256 digest of the
//! secret and the payload.
//!
//! The check code is an integrity tag that rejects typos and casual
//! enumeration. With at most 256 distinct values it is not a capability token
//! and must never gate access to anything.

use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::error::{CoreError, Result};
use crate::identifier::Identifier;
use jiff::Timestamp;
use rand::Rng;
use sha2::{Digest, Sha256};

/// The optional part of a served path after the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suffix {
    /// `/<id>.<ext>`
    Extension(String),
    /// `/<id>/<filename>`, percent-decoded but not sanitized.
    FileName(String),
}

/// A served path accepted by [`IdentifierCodec::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    pub identifier: Identifier,
    pub suffix: Option<Suffix>,
}

/// Mints and checks identifiers for one effective configuration.
#[derive(Debug, Clone)]
pub struct IdentifierCodec<C: Clock = SystemClock> {
    alphabet: Vec<char>,
    id_len: usize,
    date_offset: i64,
    date_rotation: i64,
    padding_len: usize,
    secret: Vec<u8>,
    clock: C,
}

impl IdentifierCodec<SystemClock> {
    /// Creates a codec backed by the system clock.
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> IdentifierCodec<C> {
    /// Creates a codec reading the time from `clock`.
    ///
    /// Fails when the settings could not produce verifiable identifiers, most
    /// notably when `paddingLen` cannot hold the secret plus a payload.
    pub fn with_clock(settings: &Settings, clock: C) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            alphabet: settings.characters.chars().collect(),
            id_len: settings.id_len,
            date_offset: settings.date_offset,
            date_rotation: settings.date_rotation,
            padding_len: settings.padding_len,
            secret: settings.secret.as_bytes().to_vec(),
            clock,
        })
    }

    /// Generates a new identifier using the thread-local RNG.
    pub fn generate(&self) -> Result<Identifier> {
        self.generate_with(&mut rand::thread_rng())
    }

    /// Generates a new identifier drawing the payload from `rng`.
    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Identifier> {
        let payload: String = (0..self.id_len - 2)
            .map(|_| self.alphabet[rng.gen_range(0..self.alphabet.len())])
            .collect();

        let mut id = String::with_capacity(payload.len() + 8);
        id.push(self.date_code_at(self.clock.now()));
        id.push(self.check_code(&payload)?);
        id.push_str(&payload);

        Ok(Identifier::new_unchecked(id))
    }

    /// The date code an identifier issued at `at` receives.
    pub fn date_code_at(&self, at: Timestamp) -> char {
        let elapsed = at.as_millisecond() - self.date_offset;
        let bucket = elapsed.div_euclid(self.date_rotation);
        self.char_at(bucket)
    }

    /// First byte of `SHA-256(secret ++ input ++ zero padding)`, where the
    /// buffer is exactly `paddingLen` bytes long.
    pub fn checksum(&self, input: &str) -> Result<u8> {
        let text = input.as_bytes();
        let used = self.secret.len() + text.len();
        if used > self.padding_len {
            return Err(CoreError::PaddingTooShort {
                input: used,
                padding_len: self.padding_len,
            });
        }

        let mut buffer = Vec::with_capacity(self.padding_len);
        buffer.extend_from_slice(&self.secret);
        buffer.extend_from_slice(text);
        buffer.resize(self.padding_len, 0);

        let digest = Sha256::digest(&buffer);
        Ok(digest[0])
    }

    /// The alphabet character a payload's checksum maps to.
    pub fn check_code(&self, payload: &str) -> Result<char> {
        Ok(self.char_at(i64::from(self.checksum(payload)?)))
    }

    /// Accepts `/<id>[.<ext>]` (tried first) or `/<id>/<filename>` and checks
    /// the identifier's length and check code.
    pub fn validate(&self, path: &str) -> Option<PathMatch> {
        let (candidate, suffix) = split_path(path)?;
        let identifier = self.verify(candidate)?;
        Some(PathMatch { identifier, suffix })
    }

    /// Checks a bare identifier string. The date code is not verified.
    pub fn verify(&self, candidate: &str) -> Option<Identifier> {
        if !candidate.chars().all(|c| self.alphabet.contains(&c)) {
            return None;
        }

        let identifier = Identifier::new_unchecked(candidate);
        if identifier.len() != self.id_len {
            return None;
        }

        // Alphabet-only input always fits the validated padding.
        let expected = self.check_code(identifier.payload()).ok()?;
        (identifier.check_code() == expected).then_some(identifier)
    }

    pub fn id_len(&self) -> usize {
        self.id_len
    }

    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    fn char_at(&self, value: i64) -> char {
        let index = value.rem_euclid(self.alphabet.len() as i64) as usize;
        self.alphabet[index]
    }
}

fn split_path(path: &str) -> Option<(&str, Option<Suffix>)> {
    let rest = path.strip_prefix('/').unwrap_or(path);

    let head = rest.strip_suffix('/').unwrap_or(rest);
    if !head.contains('/') {
        return match head.split_once('.') {
            None => Some((head, None)),
            Some((id, ext)) => {
                if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return None;
                }
                Some((id, Some(Suffix::Extension(ext.to_string()))))
            }
        };
    }

    let (id, file) = rest.split_once('/')?;
    if file.is_empty() || file.contains('/') {
        return None;
    }
    let decoded = urlencoding::decode(file).ok()?;
    if decoded.is_empty() {
        return None;
    }
    Some((id, Some(Suffix::FileName(decoded.into_owned()))))
}
