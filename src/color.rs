//! Color resolution for the `color` option.
//!
//! Accepts either a known color name (fixed table, case-insensitive) or a
//! 3- or 6-digit hex code with an optional leading `#`.

use crate::error::CommandError;

/// Named colors and their 24-bit values.
///
/// Names are stored lowercase; lookup lowercases the input.
const COLOR_NAMES: &[(&str, u32)] = &[
    ("red", 0xED4245),
    ("blue", 0x3498DB),
    ("green", 0x57F287),
    ("yellow", 0xFEE75C),
    ("purple", 0x9B59B6),
    ("orange", 0xE67E22),
    ("black", 0x23272A),
    ("white", 0xFFFFFF),
    ("pink", 0xFFC0CB),
    ("teal", 0x1ABC9C),
    ("gold", 0xF1C40F),
    ("navy", 0x34495E),
];

/// Resolve a user-supplied color string to a 24-bit value.
///
/// Tries the name table first, then an optional `#` followed by exactly
/// 3 or 6 hex digits. A 3-digit code parses as-is (`fff` is `0xFFF`, not
/// `0xFFFFFF`).
pub fn resolve(input: &str) -> Result<u32, CommandError> {
    let lowered = input.to_lowercase();
    if let Some((_, value)) = COLOR_NAMES.iter().find(|(name, _)| *name == lowered) {
        return Ok(*value);
    }

    let digits = input.strip_prefix('#').unwrap_or(input);
    if matches!(digits.len(), 3 | 6) && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        // Length and digit checks above guarantee this parses.
        return u32::from_str_radix(digits, 16)
            .map_err(|_| CommandError::InvalidColorFormat(input.to_string()));
    }

    Err(CommandError::InvalidColorFormat(input.to_string()))
}
