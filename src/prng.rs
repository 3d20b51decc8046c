//! Seeded pseudo-random number generator.
//!
//! This is the "Ultra High Entropy" lagged generator driven by the Mash string
//! hash. The arithmetic follows the browser implementation step by step,
//! including the `u32` truncations, so a permutation computed here matches the
//! one the content server computed for the same seed.

use std::fmt::Display;
use std::sync::LazyLock;

use regex::Regex;

const ORDER: usize = 48;

const MASH_INITIAL: f64 = 4022871197.0; // 0xEFC8249D
const MASH_MULTIPLIER: f64 = 0.02519603282416938;
const MULTIPLIER: f64 = 1768863.0;

const TWO_POW_32: f64 = 4294967296.0;
const TWO_POW_NEG_32: f64 = 2.3283064365386963e-10;
const TWO_POW_NEG_53: f64 = 1.1102230246251565e-16;
const TWO_POW_21: f64 = 2097152.0;

static CONTROL_CHARACTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x1F\x7F-\x9F]").unwrap());

/// ECMAScript `ToUint32`
fn to_uint32(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.trunc().rem_euclid(TWO_POW_32)
}

#[derive(Debug, Clone)]
struct Mash {
    n: f64,
}

impl Mash {
    fn new() -> Self {
        Mash { n: MASH_INITIAL }
    }

    fn reset(&mut self) {
        self.n = MASH_INITIAL;
    }

    /// Folds `data` into the hash state and returns a value in [0, 1).
    /// Empty input resets the state.
    fn mash(&mut self, data: &str) -> f64 {
        if data.is_empty() {
            self.reset();
            return 0.0;
        }

        for code in data.encode_utf16() {
            self.n += f64::from(code);
            let mut h = MASH_MULTIPLIER * self.n;
            self.n = to_uint32(h);
            h -= self.n;
            h *= self.n;
            self.n = to_uint32(h);
            h -= self.n;
            self.n += h * TWO_POW_32;
        }

        to_uint32(self.n) * TWO_POW_NEG_32
    }
}

/// Deterministic sequence of floats in [0, 1).
///
/// Two generators built from equal seeds yield identical sequences.
#[derive(Debug, Clone)]
pub struct Uheprng {
    mash: Mash,
    state: [f64; ORDER],
    carry: f64,
    phase: usize,
}

impl Uheprng {
    /// Create a generator from any seed. Numbers are hashed through their
    /// decimal form, strings as they are.
    pub fn new<S: Display>(seed: S) -> Self {
        let mut prng = Uheprng {
            mash: Mash::new(),
            state: [0.0; ORDER],
            carry: 1.0,
            phase: ORDER,
        };
        prng.seed(&seed.to_string());
        prng
    }

    fn clean_string(seed: &str) -> String {
        CONTROL_CHARACTERS.replace_all(seed.trim(), "").into_owned()
    }

    fn init_state(&mut self) {
        self.mash.reset();
        for i in 0..ORDER {
            self.state[i] = self.mash.mash(" ");
        }
        self.carry = 1.0;
        self.phase = ORDER;
    }

    fn hash(&mut self, data: &str) {
        for j in 0..ORDER {
            self.state[j] -= self.mash.mash(data);
            if self.state[j] < 0.0 {
                self.state[j] += 1.0;
            }
        }
    }

    fn seed(&mut self, seed: &str) {
        let seed = Self::clean_string(seed);

        self.init_state();
        self.mash.mash(&seed);
        for code in seed.encode_utf16() {
            self.hash(&code.to_string());
        }
    }

    fn raw(&mut self) -> f64 {
        self.phase += 1;
        if self.phase >= ORDER {
            self.phase = 0;
        }

        let t = MULTIPLIER * self.state[self.phase] + self.carry * TWO_POW_NEG_32;
        self.carry = t.trunc();
        self.state[self.phase] = t - self.carry;
        self.state[self.phase]
    }

    /// Next value in [0, 1) with 53 bits of precision.
    pub fn next_f64(&mut self) -> f64 {
        let high = self.raw();
        let low = (self.raw() * TWO_POW_21).trunc();
        high + low * TWO_POW_NEG_53
    }
}

impl Iterator for Uheprng {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.next_f64())
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_mash_reset_on_empty() {
        let mut mash = Mash::new();
        mash.mash("abc");
        assert_ne!(mash.n, MASH_INITIAL);
        mash.mash("");
        assert_eq!(mash.n, MASH_INITIAL);
    }

    #[test]
    fn test_mash_range() {
        let mut mash = Mash::new();
        for data in [" ", "0", "12345", "seed", "ユニコード"] {
            let value = mash.mash(data);
            assert!((0.0..1.0).contains(&value), "{data}: {value}");
        }
    }

    #[test]
    fn test_clean_string() {
        assert_eq!(Uheprng::clean_string("  12\u{1}34\n "), "1234");
        assert_eq!(Uheprng::clean_string("seed"), "seed");
    }

    #[test]
    fn test_number_and_string_seed_agree() {
        let a = Uheprng::new(4242).take(16).collect::<Vec<_>>();
        let b = Uheprng::new("4242").take(16).collect::<Vec<_>>();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_diverge() {
        let a = Uheprng::new(1).take(8).collect::<Vec<_>>();
        let b = Uheprng::new(2).take(8).collect::<Vec<_>>();
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn test_same_seed_same_sequence(seed in any::<i64>(), count in 1usize..200) {
            let a = Uheprng::new(seed).take(count).collect::<Vec<_>>();
            let b = Uheprng::new(seed).take(count).collect::<Vec<_>>();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn test_values_in_unit_interval(seed in ".{0,24}") {
            for value in Uheprng::new(&seed).take(100) {
                prop_assert!((0.0..1.0).contains(&value));
            }
        }
    }
}
