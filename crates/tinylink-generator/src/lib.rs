//! Short code generators.

pub mod random;
pub mod seq;

pub use random::RandomGenerator;
pub use seq::SeqGenerator;

use tinylink_core::ShortCode;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage.
/// They do not check for collisions; uniqueness is enforced by the store.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShortCode>;

    /// Generates a candidate short code.
    fn generate(&self) -> Self::Output;
}
