//! Uppercase ASCII hex decoding.
//!
//! Lowercase digits are rejected. Records carry only `0-9` and `A-F`.

#[inline]
pub const fn is_digit(c: u8) -> bool {
    matches!(c, b'0'..=b'9' | b'A'..=b'F')
}

#[inline]
pub const fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decodes the two digits at the start of `pair`.
pub fn byte(pair: &[u8]) -> Option<u8> {
    match pair {
        [hi, lo, ..] => Some(nibble(*hi)? << 4 | nibble(*lo)?),
        _ => None,
    }
}

/// Decodes up to eight digits, most significant first.
pub fn value(digits: &[u8]) -> Option<u32> {
    if digits.len() > 8 {
        return None;
    }
    digits
        .iter()
        .try_fold(0u32, |acc, &c| Some(acc << 4 | nibble(c)? as u32))
}
