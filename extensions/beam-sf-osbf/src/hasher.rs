//! Turns a token stream into orthogonal sparse bigram features.
//!
//! Every token is combined with each of the previous `WINDOW_LEN - 1` tokens.
//! The pair is hashed twice with distance dependent coefficients: the first
//! hash picks the home slot of the feature, the second one tells features
//! sharing a slot apart.

use std::collections::VecDeque;

/// Number of tokens in the sliding window, the current one included
pub const WINDOW_LEN: usize = 5;

/// Coefficients used to combine token hashes. Relatively prime and
/// superincreasing; pairs at distance `d` use entries `2d - 1` and `2d`.
pub const HASH_COEFF: [u32; 20] = [
    1, 7, 3, 13, 5, 29, 11, 51, 23, 101, 47, 203, 97, 407, 197, 817, 397, 1637, 797, 3277,
];

/// Weight of a feature by the distance between its two tokens
pub const FEATURE_WEIGHT: [u32; 6] = [0, 3125, 256, 27, 4, 1];

/// Hash the window is primed with before the first token arrives
pub const WINDOW_SENTINEL: u32 = 0xDEAD_BEEF;

/// A weighted feature derived from a token pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Feature {
    /// Full hash, selects the home slot
    pub hash: u32,
    /// Collision tag
    pub key: u32,
    /// Distance between the two tokens
    pub distance: usize,
    pub weight: u32,
}

impl Feature {
    pub fn id(&self) -> (u32, u32) {
        (self.hash, self.key)
    }
}

/// Stable 32 bit hash of a token.
pub fn token_hash(token: &str) -> u32 {
    let bytes = token.as_bytes();
    let mut hval = bytes.len() as u32;

    for &byte in bytes {
        let b = byte as u32;
        hval ^= b | (b << 8) | (b << 16) | (b << 24);
        hval = hval.wrapping_add((hval >> 12) & 0x0000_ffff);
        let swapped = (hval << 24) | ((hval >> 24) & 0xff);
        hval = (hval & 0x00ff_ff00) | swapped;
        hval = hval.rotate_left(3);
    }

    hval
}

/// Combines the current token hash with the hash `distance` tokens back
pub fn combine(current: u32, lagged: u32, distance: usize) -> Feature {
    let hash = current
        .wrapping_mul(HASH_COEFF[0])
        .wrapping_add(lagged.wrapping_mul(HASH_COEFF[distance << 1]));
    let key = current
        .wrapping_mul(HASH_COEFF[1])
        .wrapping_add(lagged.wrapping_mul(HASH_COEFF[(distance << 1) - 1]));

    Feature {
        hash,
        key,
        distance,
        weight: FEATURE_WEIGHT[distance],
    }
}

/// Sliding window of token hashes, newest first
#[derive(Debug, Clone)]
pub struct HashPipe {
    window: VecDeque<u32>,
}

impl HashPipe {
    /// An empty window. The first token produces no features.
    pub fn empty() -> Self {
        HashPipe {
            window: VecDeque::with_capacity(WINDOW_LEN),
        }
    }

    /// A window filled with [`WINDOW_SENTINEL`], so every token produces a full group
    pub fn primed() -> Self {
        HashPipe {
            window: std::iter::repeat(WINDOW_SENTINEL).take(WINDOW_LEN).collect(),
        }
    }

    /// Pushes the hash of a new token and returns the features it forms
    /// with the tokens already in the window.
    pub fn push(&mut self, hash: u32) -> Vec<Feature> {
        if self.window.len() == WINDOW_LEN {
            self.window.pop_back();
        }
        self.window.push_front(hash);

        self.window
            .iter()
            .enumerate()
            .skip(1)
            .map(|(distance, &lagged)| combine(hash, lagged, distance))
            .collect()
    }
}

/// Lazily hashes a token stream into features, one group per token
#[derive(Debug, Clone)]
pub struct Features<I> {
    tokens: I,
    pipe: HashPipe,
    pending: std::vec::IntoIter<Feature>,
}

impl<I> Features<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    pub fn new(tokens: I, prime_window: bool) -> Self {
        let pipe = match prime_window {
            true => HashPipe::primed(),
            false => HashPipe::empty(),
        };
        Features {
            tokens,
            pipe,
            pending: Vec::new().into_iter(),
        }
    }
}

impl<I> Iterator for Features<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = Feature;

    fn next(&mut self) -> Option<Feature> {
        loop {
            if let Some(feature) = self.pending.next() {
                return Some(feature);
            }
            let token = self.tokens.next()?;
            self.pending = self.pipe.push(token_hash(token.as_ref())).into_iter();
        }
    }
}

/// Hashes the tokens of a text into its feature stream
pub fn features(text: &str, prime_window: bool) -> Features<crate::tokenizer::Tokens<'_>> {
    Features::new(crate::tokenizer::tokenize(text), prime_window)
}
