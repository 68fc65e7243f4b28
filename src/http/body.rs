use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng, thread_rng};
use serde::Serialize;

use crate::error::{AppError, AppResult, HttpError};

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const DIGITS: &[u8] = b"0123456789";

pub(crate) const FIELD_LEN: usize = 10;
pub(crate) const HASH_LEN: usize = 32;

/// Source of uniformly distributed indices used to pick characters.
pub trait RandomSource: Send + Sync + std::fmt::Debug {
    /// Returns an index in `0..bound`, or 0 when `bound` is 0.
    fn next_index(&self, bound: usize) -> usize;
}

/// Non-deterministic source backed by the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_index(&self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        thread_rng().gen_range(0..bound)
    }
}

/// Reproducible source for tests and repeatable runs.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_index(&self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_range(0..bound)
    }
}

/// Body posted to the signup targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignupBody {
    pub name: String,
    pub roll: String,
    pub phone: String,
    pub captcha: String,
    pub hash: String,
}

/// Produces a fresh random [`SignupBody`] per call.
#[derive(Debug, Clone)]
pub struct RequestTemplater {
    random: Arc<dyn RandomSource>,
}

impl Default for RequestTemplater {
    fn default() -> Self {
        Self::new(Arc::new(ThreadRandom))
    }
}

impl RequestTemplater {
    #[must_use]
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    #[must_use]
    pub fn build(&self) -> SignupBody {
        SignupBody {
            name: self.random_string(ALPHANUMERIC, FIELD_LEN),
            roll: self.random_string(ALPHANUMERIC, FIELD_LEN),
            phone: self.random_string(ALPHANUMERIC, FIELD_LEN),
            captcha: self.random_string(ALPHANUMERIC, FIELD_LEN),
            hash: self.random_string(DIGITS, HASH_LEN),
        }
    }

    /// Builds a body and serializes it to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error when the body cannot be serialized.
    pub fn build_json(&self) -> AppResult<Vec<u8>> {
        serde_json::to_vec(&self.build())
            .map_err(|source| AppError::http(HttpError::SerializeBody { source }))
    }

    fn random_string(&self, alphabet: &[u8], len: usize) -> String {
        (0..len)
            .filter_map(|_| {
                alphabet
                    .get(self.random.next_index(alphabet.len()))
                    .copied()
                    .map(char::from)
            })
            .collect()
    }
}
