use crate::Generator;
use linkshard_core::{Selector, ShortCode};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A deterministic generator that replays a fixed list of codes in order,
/// wrapping around at the end.
///
/// Useful to force collisions: replaying the same code twice makes the
/// second creation collide with the first.
#[derive(Debug)]
pub struct ReplayGenerator {
    codes: Vec<ShortCode>,
    issued: AtomicUsize,
}

impl ReplayGenerator {
    /// Creates a generator replaying `codes`.
    ///
    /// # Panics
    ///
    /// Panics if `codes` is empty.
    pub fn new(codes: impl IntoIterator<Item = ShortCode>) -> Self {
        let codes: Vec<_> = codes.into_iter().collect();
        assert!(!codes.is_empty(), "replay generator needs at least one code");
        Self {
            codes,
            issued: AtomicUsize::new(0),
        }
    }

    /// Number of codes handed out so far.
    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    fn next(&self) -> &ShortCode {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        &self.codes[n % self.codes.len()]
    }
}

impl Generator for ReplayGenerator {
    fn generate(&self) -> ShortCode {
        self.next().clone()
    }

    fn generate_for_selector(&self, selector: Selector) -> ShortCode {
        ShortCode::new_unchecked(self.next().payload(), selector)
    }
}
