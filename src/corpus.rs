//! Deterministic test and benchmark corpora.
//!
//! Everything here is reproducible from constants, so tests and benches can
//! assert exact behavior without shipping data files.

/// Classic placeholder-names paragraph, a small natural-language sample with
/// plenty of short repeats.
pub const PLACEHOLDER_NAMES: &[u8] = br#"The names "John Doe" for males, "Jane Doe" or "Jane Roe" for females, or "Jonnie Doe" and "Janie Doe" for children, or just "Doe" non-gender-specifically are used as placeholder names for a party whose true identity is unknown or must be withheld in a legal action, case, or discussion. The names are also used to refer to acorpse or hospital patient whose identity is unknown. This practice is widely used in the United States and Canada, but is rarely used in other English-speaking countries including the United Kingdom itself, from where the use of "John Doe" in a legal context originates. The names Joe Bloggs or John Smith are used in the UK instead, as well as in Australia and New Zealand."#;

/// `out[i] = i mod 256`: long-period structure that compresses extremely
/// well once the first period has been seen.
pub fn sawtooth(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i & 0xFF) as u8).collect()
}

/// Deterministic pseudo-random bytes (xorshift64*), effectively
/// incompressible.
pub fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut state = seed.max(1);
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let word = state.wrapping_mul(0x2545_F491_4F6C_DD1D);
        let take = (len - out.len()).min(8);
        out.extend_from_slice(&word.to_le_bytes()[..take]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraph_is_the_expected_size() {
        assert_eq!(PLACEHOLDER_NAMES.len(), 699);
    }

    #[test]
    fn sawtooth_wraps_at_256() {
        let data = sawtooth(600);
        assert_eq!(data[0], 0);
        assert_eq!(data[255], 255);
        assert_eq!(data[256], 0);
        assert_eq!(data[511], 255);
    }

    #[test]
    fn random_bytes_are_reproducible() {
        assert_eq!(random_bytes(42, 1000), random_bytes(42, 1000));
        assert_ne!(random_bytes(42, 1000), random_bytes(43, 1000));
    }
}
