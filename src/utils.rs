//! Display helpers for captured traffic.

// ============================================================================
// HexII
// ============================================================================

/// Renders bytes in HexII form.
///
/// Bytes in `'0'..='z'` print as `.` followed by the character; all others
/// print as two lowercase hex digits. Items are space-separated.
///
/// # Example
///
/// ```
/// use btlejuice::utils::hexii;
///
/// assert_eq!(hexii(b"A\x00z"), ".A 00 .z");
/// ```
#[must_use]
pub fn hexii(data: &[u8]) -> String {
    data.iter()
        .map(|&byte| match byte {
            b'0'..=b'z' => format!(".{}", byte as char),
            _ => format!("{byte:02x}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hexii_printable_range() {
        assert_eq!(hexii(b"0az"), ".0 .a .z");
    }

    #[test]
    fn test_hexii_outside_range() {
        assert_eq!(hexii(&[0x2f, 0x7b, 0xff, 0x64]), "2f 7b ff .d");
    }

    #[test]
    fn test_hexii_empty() {
        assert_eq!(hexii(&[]), "");
    }
}
