//! Human-verification challenge gating monetary operations.
//!
//! This is a UI gate, not a security boundary: the expected text lives in
//! the client and anyone with access to it can pass.

use crate::errors::{WalletError, WalletResult};
use rand::Rng;

pub const CHALLENGE_LENGTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationChallenge {
    expected: [char; CHALLENGE_LENGTH],
    user_input: String,
    passed: bool,
}

impl VerificationChallenge {
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Even positions are uppercase letters, odd positions single digits.
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut expected = ['A'; CHALLENGE_LENGTH];
        for (index, slot) in expected.iter_mut().enumerate() {
            *slot = random_character(index, rng);
        }

        Self {
            expected,
            user_input: String::new(),
            passed: false,
        }
    }

    /// Build a challenge with known characters, checking the letter/digit layout.
    pub fn from_chars(expected: [char; CHALLENGE_LENGTH]) -> WalletResult<Self> {
        for (index, c) in expected.iter().enumerate() {
            let valid = if index % 2 == 0 {
                c.is_ascii_uppercase()
            } else {
                c.is_ascii_digit()
            };
            if !valid {
                return Err(WalletError::ValidationError(format!(
                    "Invalid challenge character '{}' at position {}",
                    c, index
                )));
            }
        }

        Ok(Self {
            expected,
            user_input: String::new(),
            passed: false,
        })
    }

    pub fn characters(&self) -> &[char; CHALLENGE_LENGTH] {
        &self.expected
    }

    pub fn expected_text(&self) -> String {
        self.expected.iter().collect()
    }

    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    pub fn is_passed(&self) -> bool {
        self.passed
    }

    /// Exact, case-sensitive comparison; no trimming.
    pub fn submit(&mut self, input: &str) -> bool {
        self.user_input = input.to_string();
        self.passed = self.user_input == self.expected_text();
        self.passed
    }

    pub fn regenerate_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        *self = Self::generate_with(rng);
    }
}

fn random_character<R: Rng + ?Sized>(index: usize, rng: &mut R) -> char {
    if index % 2 == 0 {
        char::from(rng.gen_range(b'A'..=b'Z'))
    } else {
        char::from(b'0' + rng.gen_range(0..10u8))
    }
}
