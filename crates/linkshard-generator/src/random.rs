use crate::Generator;
use linkshard_core::shortcode::{PAYLOAD_ALPHABET, PAYLOAD_LEN, SELECTOR_ALPHABET};
use linkshard_core::{Selector, ShortCode};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Draws payload and selector uniformly at random from their alphabets.
///
/// Each of the six payload characters is an independent draw with
/// replacement; the selector is drawn independently of the payload.
#[derive(Debug)]
pub struct RandomGenerator<R = StdRng> {
    rng: Mutex<R>,
}

impl RandomGenerator<StdRng> {
    /// Creates a generator backed by `StdRng` seeded from OS entropy.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Creates a reproducible generator; the same seed yields the same codes.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for RandomGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore + Send + 'static> RandomGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    fn payload(rng: &mut R) -> String {
        (0..PAYLOAD_LEN)
            .map(|_| PAYLOAD_ALPHABET[rng.gen_range(0..PAYLOAD_ALPHABET.len())] as char)
            .collect()
    }
}

impl<R: RngCore + Send + 'static> Generator for RandomGenerator<R> {
    fn generate(&self) -> ShortCode {
        let mut rng = self.rng.lock();
        let payload = Self::payload(&mut rng);
        let index = rng.gen_range(0..SELECTOR_ALPHABET.len());
        let selector =
            Selector::from_index(index).expect("index is drawn within the selector alphabet");
        ShortCode::new_unchecked(&payload, selector)
    }

    fn generate_for_selector(&self, selector: Selector) -> ShortCode {
        let mut rng = self.rng.lock();
        let payload = Self::payload(&mut rng);
        ShortCode::new_unchecked(&payload, selector)
    }
}
