use rand::Rng;
use thiserror::Error;

use crate::error::ShortenError;

/// `[0-9a-zA-Z]`, in that order, so that small ids encode to familiar digits.
pub const BASE62: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const NO_DIGIT: u8 = u8::MAX;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlphabetError {
    #[error("code alphabet needs at least 2 characters, got {0}")]
    TooShort(usize),

    #[error("code alphabet character {0:?} is not printable ASCII")]
    NotPrintableAscii(char),

    #[error("code alphabet contains {0:?} more than once")]
    Duplicate(char),
}

/// Bijective base-N encoding between sequence ids and short codes.
///
/// Only canonical codes decode: the first alphabet character plays the role
/// of zero, so a multi-character code may not start with it. Every `u64` has
/// exactly one code and every accepted code has exactly one `u64`.
#[derive(Debug, Clone)]
pub struct CodeEncoder {
    alphabet: Vec<u8>,
    // ASCII byte -> digit value, NO_DIGIT when not in the alphabet.
    digits: [u8; 128],
}

impl CodeEncoder {
    pub fn new(alphabet: &str) -> Result<Self, AlphabetError> {
        let mut seen = [false; 128];
        for ch in alphabet.chars() {
            if !ch.is_ascii_graphic() {
                return Err(AlphabetError::NotPrintableAscii(ch));
            }
            if std::mem::replace(&mut seen[ch as usize], true) {
                return Err(AlphabetError::Duplicate(ch));
            }
        }
        if alphabet.len() < 2 {
            return Err(AlphabetError::TooShort(alphabet.len()));
        }
        Ok(Self::build(alphabet.as_bytes()))
    }

    fn build(alphabet: &[u8]) -> Self {
        let mut digits = [NO_DIGIT; 128];
        for (value, &byte) in alphabet.iter().enumerate() {
            digits[byte as usize] = value as u8;
        }
        Self {
            alphabet: alphabet.to_vec(),
            digits,
        }
    }

    pub fn base(&self) -> u64 {
        self.alphabet.len() as u64
    }

    pub fn encode(&self, id: u64) -> String {
        let base = self.base();
        let mut remaining = id;
        let mut out = Vec::with_capacity(12);
        loop {
            out.push(self.alphabet[(remaining % base) as usize]);
            remaining /= base;
            if remaining == 0 {
                break;
            }
        }
        out.iter().rev().map(|&b| b as char).collect()
    }

    pub fn decode(&self, code: &str) -> Result<u64, ShortenError> {
        let bytes = code.as_bytes();
        if bytes.is_empty() {
            return Err(ShortenError::InvalidCodeFormat("empty code".into()));
        }
        if bytes.len() > 1 && bytes[0] == self.alphabet[0] {
            return Err(ShortenError::InvalidCodeFormat(format!(
                "{code:?} has a leading zero character"
            )));
        }

        let base = self.base();
        let mut value: u64 = 0;
        for ch in code.chars() {
            let digit = self.digit(ch).ok_or_else(|| {
                ShortenError::InvalidCodeFormat(format!("{ch:?} is not in the code alphabet"))
            })?;
            value = value
                .checked_mul(base)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| {
                    ShortenError::InvalidCodeFormat(format!("{code:?} is out of range"))
                })?;
        }
        Ok(value)
    }

    /// True when every character of `code` belongs to the alphabet.
    pub fn is_alphabet_code(&self, code: &str) -> bool {
        !code.is_empty() && code.chars().all(|ch| self.digit(ch).is_some())
    }

    /// Draw a uniformly random code of `len` characters.
    pub fn random_code(&self, len: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..len)
            .map(|_| self.alphabet[rng.gen_range(0..self.alphabet.len())] as char)
            .collect()
    }

    fn digit(&self, ch: char) -> Option<u64> {
        if !ch.is_ascii() {
            return None;
        }
        match self.digits[ch as usize] {
            NO_DIGIT => None,
            d => Some(d as u64),
        }
    }
}

impl Default for CodeEncoder {
    fn default() -> Self {
        Self::build(BASE62.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn base62_boundaries_round_trip() {
        let enc = CodeEncoder::default();
        assert_eq!(enc.base(), 62);

        assert_eq!(enc.encode(0), "0");
        assert_eq!(enc.encode(1), "1");
        assert_eq!(enc.encode(61), "Z");
        assert_eq!(enc.encode(62), "10");

        for id in [0, 1, 61, 62, 63, 3843, 3844, u64::MAX / 2, u64::MAX - 1, u64::MAX] {
            assert_eq!(enc.decode(&enc.encode(id)).unwrap(), id, "id {id}");
        }
    }

    #[test]
    fn longer_ids_never_get_shorter_codes() {
        let enc = CodeEncoder::default();
        let mut last_len = 0;
        for id in (0..200_000u64).step_by(97) {
            let len = enc.encode(id).len();
            assert!(len >= last_len);
            last_len = len;
        }
        assert_eq!(enc.encode(u64::MAX).len(), 11);
    }

    #[test]
    fn distinct_ids_encode_to_distinct_codes() {
        let enc = CodeEncoder::default();
        let codes: HashSet<String> = (0..20_000u64).map(|id| enc.encode(id)).collect();
        assert_eq!(codes.len(), 20_000);
    }

    #[test]
    fn decode_rejects_foreign_characters() {
        let enc = CodeEncoder::default();
        for bad in ["ab-c", "a b", "é", "abc/", "😀"] {
            assert!(
                matches!(enc.decode(bad), Err(ShortenError::InvalidCodeFormat(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn decode_rejects_non_canonical_codes() {
        let enc = CodeEncoder::default();
        assert!(enc.decode("").is_err());
        assert!(enc.decode("01").is_err());
        assert!(enc.decode("000").is_err());
        assert_eq!(enc.encode(u64::MAX), "lYGhA16ahyf");
        // One past u64::MAX.
        assert!(enc.decode("lYGhA16ahyg").is_err());
        assert!(enc.decode("ZZZZZZZZZZZZ").is_err());
    }

    #[test]
    fn decode_encode_decode_is_stable() {
        let enc = CodeEncoder::default();
        for code in ["1", "Z", "10", "abc", "Hello", "zzzzzz"] {
            let id = enc.decode(code).unwrap();
            assert_eq!(enc.decode(&enc.encode(id)).unwrap(), id);
            assert_eq!(enc.encode(id), code);
        }
    }

    #[test]
    fn custom_alphabet() {
        let enc = CodeEncoder::new("ab").unwrap();
        assert_eq!(enc.encode(0), "a");
        assert_eq!(enc.encode(5), "bab");
        assert_eq!(enc.decode("bab").unwrap(), 5);
        assert!(enc.decode("c").is_err());
    }

    #[test]
    fn invalid_alphabets_are_rejected() {
        assert_eq!(CodeEncoder::new("a").unwrap_err(), AlphabetError::TooShort(1));
        assert_eq!(CodeEncoder::new("").unwrap_err(), AlphabetError::TooShort(0));
        assert_eq!(
            CodeEncoder::new("abca").unwrap_err(),
            AlphabetError::Duplicate('a')
        );
        assert_eq!(
            CodeEncoder::new("ab c").unwrap_err(),
            AlphabetError::NotPrintableAscii(' ')
        );
    }

    #[test]
    fn random_codes_use_the_alphabet() {
        let enc = CodeEncoder::new("xyz").unwrap();
        for _ in 0..100 {
            let code = enc.random_code(7);
            assert_eq!(code.len(), 7);
            assert!(enc.is_alphabet_code(&code));
        }
    }
}
