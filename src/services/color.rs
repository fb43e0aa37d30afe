//! Hex color parsing.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("color `{0}` must have exactly six hex digits")]
    InvalidLength(String),
    #[error("color `{0}` contains non-hex characters")]
    InvalidDigit(String),
}

/// Convert `#RRGGBB` or `RRGGBB` into an `(r, g, b)` triplet.
pub fn hex_to_rgb(hex: &str) -> Result<(u8, u8, u8), ColorError> {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 {
        return Err(ColorError::InvalidLength(hex.to_string()));
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidDigit(hex.to_string()));
    }

    let channel = |i: usize| {
        u8::from_str_radix(&digits[i..i + 2], 16)
            .map_err(|_| ColorError::InvalidDigit(hex.to_string()))
    };
    Ok((channel(0)?, channel(2)?, channel(4)?))
}
