use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Symbols a payload is drawn from: digits, lowercase, uppercase.
pub const PAYLOAD_ALPHABET: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Symbols a selector is drawn from: digits and lowercase only.
pub const SELECTOR_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Number of payload characters in a short code.
pub const PAYLOAD_LEN: usize = 6;

/// Total length of a short code (payload plus selector).
pub const CODE_LEN: usize = PAYLOAD_LEN + 1;

/// The single character naming the partition that owns a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Selector(u8);

impl Selector {
    /// Creates a selector, rejecting characters outside `[0-9a-z]`.
    pub fn new(c: char) -> Result<Self, CodecError> {
        if c.is_ascii() && SELECTOR_ALPHABET.contains(&(c as u8)) {
            Ok(Self(c as u8))
        } else {
            Err(CodecError::InvalidSelector(c))
        }
    }

    /// Returns the selector at `index` in the selector alphabet.
    pub fn from_index(index: usize) -> Option<Self> {
        SELECTOR_ALPHABET.get(index).map(|b| Self(*b))
    }

    /// Iterates over all 36 selectors in alphabet order.
    pub fn all() -> impl Iterator<Item = Selector> {
        SELECTOR_ALPHABET.iter().map(|b| Self(*b))
    }

    pub fn as_char(self) -> char {
        self.0 as char
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl TryFrom<char> for Selector {
    type Error = CodecError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        Self::new(c)
    }
}

/// A validated 7-character short code: a 6-character payload followed by
/// a 1-character [`Selector`].
///
/// The payload is only unique inside the partition named by the selector;
/// the full code is globally unique by construction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShortCode(String);

impl ShortCode {
    /// Parses a code string into a `ShortCode`.
    ///
    /// Fails with [`CodecError::MalformedCode`] unless the input is exactly
    /// 7 characters, the last of which is in the selector alphabet and the
    /// first six in the payload alphabet.
    pub fn parse(code: &str) -> Result<Self, CodecError> {
        let bytes = code.as_bytes();
        // Both alphabets are ASCII, so byte length equals character length
        // for every code that can pass the checks below.
        if bytes.len() != CODE_LEN {
            return Err(CodecError::MalformedCode(format!(
                "expected {} characters, got '{}'",
                CODE_LEN, code
            )));
        }

        let (payload, selector) = bytes.split_at(PAYLOAD_LEN);
        if !SELECTOR_ALPHABET.contains(&selector[0]) {
            return Err(CodecError::MalformedCode(format!(
                "invalid selector character in '{}'",
                code
            )));
        }
        if !payload.iter().all(|b| PAYLOAD_ALPHABET.contains(b)) {
            return Err(CodecError::MalformedCode(format!(
                "invalid payload character in '{}'",
                code
            )));
        }

        Ok(Self(code.to_owned()))
    }

    /// Returns `true` iff [`ShortCode::parse`] would succeed. Never fails.
    pub fn is_well_formed(code: &str) -> bool {
        Self::parse(code).is_ok()
    }

    /// Builds a code from parts without validating the payload in release
    /// builds.
    ///
    /// Use this only for payloads produced by trusted internal sources
    /// (e.g. generators drawing from [`PAYLOAD_ALPHABET`]). Debug builds
    /// panic here on a payload that is not [`PAYLOAD_LEN`] alphabet symbols,
    /// instead of later in [`ShortCode::payload`].
    pub fn new_unchecked(payload: &str, selector: Selector) -> Self {
        debug_assert!(
            payload.len() == PAYLOAD_LEN && payload.bytes().all(|b| PAYLOAD_ALPHABET.contains(&b)),
            "payload must be {PAYLOAD_LEN} alphabet symbols, got '{payload}'"
        );
        let mut code = String::with_capacity(CODE_LEN);
        code.push_str(payload);
        code.push(selector.as_char());
        Self(code)
    }

    /// The partition-local key.
    pub fn payload(&self) -> &str {
        &self.0[..PAYLOAD_LEN]
    }

    pub fn selector(&self) -> Selector {
        Selector(self.0.as_bytes()[PAYLOAD_LEN])
    }

    /// Splits the code into `(payload, selector)`.
    pub fn parts(&self) -> (&str, Selector) {
        (self.payload(), self.selector())
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self)
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ShortCode {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ShortCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ShortCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
