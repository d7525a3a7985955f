//! Canonical DNA alphabet helpers shared by parts, filler and constructs.

/// Base-pair complement for the four canonical bases. Anything else maps to
/// `N` so a bad byte stays visible instead of silently becoming sequence.
#[inline(always)]
pub fn complement(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        _ => b'N',
    }
}

/// Complement then reverse.
pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
    sequence.iter().rev().map(|base| complement(*base)).collect()
}

#[inline(always)]
pub fn is_canonical_base(base: u8) -> bool {
    matches!(base.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T')
}

pub fn is_canonical_sequence(sequence: &[u8]) -> bool {
    sequence.iter().all(|base| is_canonical_base(*base))
}

/// Uppercase and strip whitespace. Inputs are pre-validated upstream; this
/// only absorbs line wrapping and case differences from plain-string
/// collaborators.
pub fn normalize(sequence: &str) -> Vec<u8> {
    sequence
        .bytes()
        .filter(|byte| !byte.is_ascii_whitespace())
        .map(|byte| byte.to_ascii_uppercase())
        .collect()
}
