//! Single-use passcode generation.
//!
//! Passcodes gate the one-time download of a protected document. They are
//! drawn from the OS random source, never from a seeded PRNG, so a code
//! cannot be predicted from previously issued ones.

use rand::rngs::OsRng;
use rand::Rng;

/// Number of digits in a generated passcode.
pub const PASSCODE_LEN: usize = 6;

const MIN_CODE: u32 = 100_000;
const MAX_CODE: u32 = 999_999;

/// Generates a 6-digit numeric passcode.
///
/// The code space (900,000 values) combined with single-use semantics and
/// a bounded validity window makes online guessing impractical.
pub fn generate() -> String {
    let code: u32 = OsRng.gen_range(MIN_CODE..=MAX_CODE);
    code.to_string()
}

/// Returns true if the input has the shape of a generated passcode.
///
/// Used at the redemption boundary to reject malformed input before any
/// store lookup happens.
pub fn is_well_formed(code: &str) -> bool {
    code.len() == PASSCODE_LEN && code.bytes().all(|b| b.is_ascii_digit()) && !code.starts_with('0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_length_and_digits() {
        for _ in 0..100 {
            let code = generate();
            assert_eq!(code.len(), PASSCODE_LEN);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_generate_in_range() {
        for _ in 0..100 {
            let code: u32 = generate().parse().unwrap();
            assert!((MIN_CODE..=MAX_CODE).contains(&code));
        }
    }

    #[test]
    fn test_generated_codes_are_well_formed() {
        for _ in 0..100 {
            assert!(is_well_formed(&generate()));
        }
    }

    #[test]
    fn test_generate_not_constant() {
        let first = generate();
        let varied = (0..50).map(|_| generate()).any(|c| c != first);
        assert!(varied, "100,000+ codes should not collapse to one value");
    }

    #[test]
    fn test_is_well_formed_rejects_bad_input() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("12345"));
        assert!(!is_well_formed("1234567"));
        assert!(!is_well_formed("12345a"));
        assert!(!is_well_formed("012345"));
        assert!(!is_well_formed("123 45"));
    }

    #[test]
    fn test_is_well_formed_accepts_valid() {
        assert!(is_well_formed("100000"));
        assert!(is_well_formed("999999"));
        assert!(is_well_formed("314159"));
    }
}
