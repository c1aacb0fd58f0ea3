use crate::error::ShortenerError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Length of every code minted by the random generator.
pub const CODE_LENGTH: usize = 8;

/// A validated short code identifier for a shortened URL.
///
/// Short codes are exactly [`CODE_LENGTH`] characters drawn from the
/// unpadded URL-safe base64 alphabet (`[A-Za-z0-9_-]`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShortCode(String);

impl ShortCode {
    /// Creates a new `ShortCode` after validating the input.
    pub fn new(code: impl Into<String>) -> std::result::Result<Self, ShortenerError> {
        let code = code.into();
        Self::validate(&code)?;
        Ok(Self(code))
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes produced by trusted internal sources
    /// (generators, rows read back from a store).
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(code: &str) -> std::result::Result<(), ShortenerError> {
        if code.len() != CODE_LENGTH {
            return Err(ShortenerError::InvalidShortCode(format!(
                "length must be {}, got {}",
                CODE_LENGTH,
                code.len()
            )));
        }

        if !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ShortenerError::InvalidShortCode(format!(
                "must contain only url-safe base64 characters: '{}'",
                code
            )));
        }

        Ok(())
    }
}

impl TryFrom<String> for ShortCode {
    type Error = ShortenerError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ShortCode> for String {
    fn from(value: ShortCode) -> Self {
        value.0
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
