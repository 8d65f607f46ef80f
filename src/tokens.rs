use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::config::{MAX_TOKEN_LENGTH, MIN_TOKEN_LENGTH};

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Substrings a marker must never contain, so a marker cannot hint at the
/// field it tags.
const SEMANTIC_WORDS: [&str; 8] = [
    "name", "email", "mail", "message", "msg", "honeypot", "company", "website",
];

/// Randomized attribute markers for one form construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTokenSet {
    name: String,
    email: String,
    message: String,
    honeypot: String,
}

impl FieldTokenSet {
    pub fn generate(length: usize) -> Self {
        Self::with_rng(length, &mut OsRng)
    }

    /// Draws four distinct markers. `length` is clamped to
    /// `MIN_TOKEN_LENGTH..=MAX_TOKEN_LENGTH` so distinct draws always exist.
    pub fn with_rng<R: RngCore + CryptoRng>(length: usize, rng: &mut R) -> Self {
        let length = length.clamp(MIN_TOKEN_LENGTH, MAX_TOKEN_LENGTH);
        let mut drawn: Vec<String> = Vec::with_capacity(4);
        while drawn.len() < 4 {
            let token = random_token(length, rng);
            if is_semantic(&token) || drawn.contains(&token) {
                continue;
            }
            drawn.push(token);
        }

        let honeypot = drawn.pop().unwrap_or_default();
        let message = drawn.pop().unwrap_or_default();
        let email = drawn.pop().unwrap_or_default();
        let name = drawn.pop().unwrap_or_default();
        Self {
            name,
            email,
            message,
            honeypot,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn honeypot(&self) -> &str {
        &self.honeypot
    }

    pub fn all(&self) -> [&str; 4] {
        [&self.name, &self.email, &self.message, &self.honeypot]
    }
}

/// Attribute name carrying a marker, e.g. `data-k3x9q0ab`.
pub fn marker_attribute(token: &str) -> String {
    format!("data-{token}")
}

fn random_token<R: RngCore>(length: usize, rng: &mut R) -> String {
    (0..length)
        .map(|_| {
            let idx = (rng.next_u32() % ALPHABET.len() as u32) as usize;
            ALPHABET[idx] as char
        })
        .collect()
}

fn is_semantic(token: &str) -> bool {
    SEMANTIC_WORDS.iter().any(|word| token.contains(word))
}
