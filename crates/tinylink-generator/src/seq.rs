use crate::Generator;
use std::sync::atomic::{AtomicU64, Ordering};
use tinylink_core::{ShortCode, ShortenerError, CODE_LENGTH};

/// A short code generator using a sequential counter.
///
/// Produces codes like "wh000000", "wh000001", padded so that prefix and
/// counter together fill [`CODE_LENGTH`] characters. Codes are unique within
/// a single instance until the counter outgrows its digits; it then wraps to
/// zero and repeated codes surface as collisions in the store.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    prefix: String,
    width: usize,
}

impl Clone for SeqGenerator {
    fn clone(&self) -> Self {
        Self {
            counter: AtomicU64::new(self.counter.load(Ordering::SeqCst)),
            prefix: self.prefix.clone(),
            width: self.width,
        }
    }
}

impl SeqGenerator {
    /// Creates a new sequential generator with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Result<Self, ShortenerError> {
        Self::with_offset(prefix, 0)
    }

    /// Creates a new sequential generator starting from a specific counter value.
    ///
    /// The prefix must leave room for at least one digit and use only
    /// short-code characters.
    pub fn with_offset(prefix: impl Into<String>, offset: u64) -> Result<Self, ShortenerError> {
        let prefix = prefix.into();
        if prefix.len() >= CODE_LENGTH {
            return Err(ShortenerError::InvalidShortCode(format!(
                "prefix '{prefix}' leaves no room for a counter"
            )));
        }
        let width = CODE_LENGTH - prefix.len();
        ShortCode::new(format!("{prefix}{:0width$}", 0))?;

        Ok(Self {
            counter: AtomicU64::new(offset),
            prefix,
            width,
        })
    }
}

impl Generator for SeqGenerator {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        let count = self.counter.fetch_add(1, Ordering::SeqCst) % 10u64.pow(self.width as u32);
        let width = self.width;
        ShortCode::new_unchecked(format!("{}{:0width$}", self.prefix, count))
    }
}
