pub mod random;
pub mod seq;

pub use random::RandomGenerator;
pub use seq::ReplayGenerator;

use linkshard_core::{CodecError, Selector, ShortCode};

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage:
/// a generated code may already be taken, and the caller is responsible
/// for probing uniqueness against the owning partition.
pub trait Generator: Send + Sync + 'static {
    /// Generates a code with a random payload and a random selector.
    fn generate(&self) -> ShortCode;

    /// Generates a code with a random payload for a fixed selector.
    fn generate_for_selector(&self, selector: Selector) -> ShortCode;

    /// Like [`Generator::generate_for_selector`], taking a raw character.
    ///
    /// Fails with [`CodecError::InvalidSelector`] if `c` is outside the
    /// selector alphabet.
    fn generate_for(&self, c: char) -> Result<ShortCode, CodecError> {
        let selector = Selector::new(c)?;
        Ok(self.generate_for_selector(selector))
    }
}

impl<G: Generator> Generator for std::sync::Arc<G> {
    fn generate(&self) -> ShortCode {
        (**self).generate()
    }

    fn generate_for_selector(&self, selector: Selector) -> ShortCode {
        (**self).generate_for_selector(selector)
    }
}
